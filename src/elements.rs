//! Single-row parameter sets.

use serde_json::{Map, Value};

use crate::error::ConfigResult;
use crate::formats::{OutputFormat, csv};
use crate::report::ResultData;

/// One fixed row of named values, in declaration order.
///
/// Built from a namespace's raw field values: literal constants, and the *names* of source
/// properties for mapped fields. Serializes as a one-row CSV table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSet {
    fields: Map<String, Value>,
}

impl ElementSet {
    /// Create a set from a field -> value mapping, keeping its order.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Insert or overwrite `field`.
    ///
    /// An existing key keeps its position; new keys are appended.
    pub fn add_result(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of `field`, or `default` when it is absent or `null`.
    pub fn get_or(&self, field: &str, default: impl Into<Value>) -> Value {
        match self.fields.get(field) {
            Some(v) if !v.is_null() => v.clone(),
            _ => default.into(),
        }
    }

    /// Iterate field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Borrow the underlying mapping.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for ElementSet {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl ResultData for ElementSet {
    fn format(&self) -> OutputFormat {
        OutputFormat::Csv
    }

    fn is_iterable(&self) -> bool {
        false
    }

    fn serialize(&self) -> ConfigResult<String> {
        csv::write_single_row(&self.fields)
    }
}
