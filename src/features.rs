//! Feature iteration: merge configured fields with per-feature data.
//!
//! A [`FeatureSet`] is built from one namespace's [`FieldBinding`]s and, optionally, the data
//! file registered for that namespace:
//!
//! - mapped fields and a data file: the file is parsed as a feature collection and each feature
//!   yields one record
//! - no mapped fields: a one-feature collection is synthesized from the constants, so the
//!   namespace yields exactly one record
//! - mapped fields but no data file: there is nothing to iterate and zero records are produced
//!
//! Records are read with a [`FeatureCursor`]. Results added through the cursor are written into
//! the feature that produced the current record, and show up both in later iterations and in
//! [`FeatureSet::serialize`](crate::report::ResultData::serialize).
//!
//! ```rust
//! use serde_json::json;
//! use tool_job_config::features::FeatureSet;
//! use tool_job_config::types::FieldBinding;
//!
//! let bindings = vec![
//!     ("factor".to_string(), FieldBinding::Constant { value: json!(10) }),
//!     ("value".to_string(), FieldBinding::Mapped { source: "power".to_string() }),
//! ];
//! let doc = json!({"features": [{"properties": {"power": 2}}, {"properties": {"power": 3}}]});
//! let mut set = FeatureSet::from_document("computation", bindings, Some(doc)).unwrap();
//!
//! let mut cursor = set.cursor();
//! while let Some(record) = cursor.next_record() {
//!     let v = record["value"].as_i64().unwrap() * record["factor"].as_i64().unwrap();
//!     cursor.add_result("scaled", v).unwrap();
//! }
//! let rows: Vec<_> = set.records().map(|r| r["value"].clone()).collect();
//! assert_eq!(rows, vec![json!(2), json!(3)]);
//! ```

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::formats::OutputFormat;
use crate::formats::json::{
    check_feature_collection, feature_count, feature_properties, feature_properties_mut, read_json_from_path,
    single_feature_collection,
};
use crate::report::ResultData;
use crate::types::{FieldBinding, Record};

/// Iterable view of one namespace: constants, mapped fields and the parsed feature data.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSet {
    namespace: String,
    constant_fields: Map<String, Value>,
    /// (output field, source property)
    mapped_fields: Vec<(String, String)>,
    data: Option<Value>,
}

impl FeatureSet {
    /// Build a feature set, reading `data_file` only when mapped fields are declared.
    pub fn open(
        namespace: impl Into<String>,
        bindings: Vec<(String, FieldBinding)>,
        data_file: Option<&Path>,
    ) -> ConfigResult<Self> {
        let mut set = Self::partition(namespace.into(), bindings);
        set.data = match (set.mapped_fields.is_empty(), data_file) {
            (true, _) => Some(single_feature_collection(set.constant_fields.clone())),
            (false, Some(path)) => {
                let doc = read_json_from_path(path).map_err(|e| ConfigError::DataLoad {
                    namespace: set.namespace.clone(),
                    message: format!("{} ({})", e, path.display()),
                })?;
                Some(set.checked(doc)?)
            }
            (false, None) => None,
        };
        Ok(set)
    }

    /// Build a feature set over an already-parsed feature collection.
    ///
    /// `doc` is ignored when no fields are mapped, as with [`Self::open`].
    pub fn from_document(
        namespace: impl Into<String>,
        bindings: Vec<(String, FieldBinding)>,
        doc: Option<Value>,
    ) -> ConfigResult<Self> {
        let mut set = Self::partition(namespace.into(), bindings);
        set.data = match (set.mapped_fields.is_empty(), doc) {
            (true, _) => Some(single_feature_collection(set.constant_fields.clone())),
            (false, Some(doc)) => Some(set.checked(doc)?),
            (false, None) => None,
        };
        Ok(set)
    }

    fn partition(namespace: String, bindings: Vec<(String, FieldBinding)>) -> Self {
        let mut constant_fields = Map::new();
        let mut mapped_fields = Vec::new();
        for (field, binding) in bindings {
            match binding {
                FieldBinding::Mapped { source } => mapped_fields.push((field, source)),
                FieldBinding::Constant { value } => {
                    constant_fields.insert(field, value);
                }
            }
        }
        Self {
            namespace,
            constant_fields,
            mapped_fields,
            data: None,
        }
    }

    fn checked(&self, doc: Value) -> ConfigResult<Value> {
        check_feature_collection(&doc).map_err(|message| ConfigError::DataLoad {
            namespace: self.namespace.clone(),
            message,
        })?;
        Ok(doc)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Constant fields carried on every record.
    pub fn constant_fields(&self) -> &Map<String, Value> {
        &self.constant_fields
    }

    /// Mapped fields as (output field, source property) pairs.
    pub fn mapped_fields(&self) -> &[(String, String)] {
        &self.mapped_fields
    }

    /// True when there is feature data to iterate (always the case without mapped fields).
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Fail with [`ConfigError::MissingData`] if mapped fields have no data file behind them.
    pub fn require_data(&self) -> ConfigResult<()> {
        if self.has_data() {
            Ok(())
        } else {
            Err(ConfigError::MissingData {
                namespace: self.namespace.clone(),
            })
        }
    }

    /// Number of records an iteration will produce.
    pub fn feature_count(&self) -> usize {
        self.data.as_ref().map_or(0, feature_count)
    }

    /// Start (or restart) iteration at the first feature.
    pub fn cursor(&mut self) -> FeatureCursor<'_> {
        FeatureCursor {
            set: self,
            next: 0,
            current: None,
        }
    }

    /// Read-only iteration over the merged records.
    pub fn records(&self) -> Records<'_> {
        Records { set: self, next: 0 }
    }

    fn record_at(&self, idx: usize) -> Record {
        let props = self.data.as_ref().and_then(|doc| feature_properties(doc, idx));

        if self.mapped_fields.is_empty() {
            return props.cloned().unwrap_or_default();
        }

        let mut record = self.constant_fields.clone();
        for (field, source) in &self.mapped_fields {
            let v = props.and_then(|p| p.get(source)).cloned().unwrap_or(Value::Null);
            record.insert(field.clone(), v);
        }
        record
    }
}

impl ResultData for FeatureSet {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn is_iterable(&self) -> bool {
        true
    }

    /// The whole feature collection, including added results. A set with no data serializes as
    /// an empty collection.
    fn serialize(&self) -> ConfigResult<String> {
        match &self.data {
            Some(doc) => Ok(serde_json::to_string(doc)?),
            None => Ok(serde_json::to_string(&serde_json::json!({ "features": [] }))?),
        }
    }
}

/// Stateful iteration over a [`FeatureSet`].
///
/// [`Self::add_result`] targets the feature behind the record most recently returned by
/// [`Self::next_record`].
#[derive(Debug)]
pub struct FeatureCursor<'a> {
    set: &'a mut FeatureSet,
    next: usize,
    current: Option<usize>,
}

impl FeatureCursor<'_> {
    /// Produce the next merged record, or `None` once the features are exhausted.
    pub fn next_record(&mut self) -> Option<Record> {
        if self.next >= self.set.feature_count() {
            self.current = None;
            return None;
        }
        let idx = self.next;
        self.next += 1;
        self.current = Some(idx);
        Some(self.set.record_at(idx))
    }

    /// Index of the feature behind the current record.
    pub fn position(&self) -> Option<usize> {
        self.current
    }

    /// Write `value` into the current feature's properties under `field`, overwriting any
    /// existing value.
    pub fn add_result(&mut self, field: impl Into<String>, value: impl Into<Value>) -> ConfigResult<()> {
        let field = field.into();
        let props = match (self.current, self.set.data.as_mut()) {
            (Some(idx), Some(doc)) => feature_properties_mut(doc, idx),
            _ => None,
        };
        match props {
            Some(props) => {
                props.insert(field, value.into());
                Ok(())
            }
            None => Err(ConfigError::AnnotationState { field }),
        }
    }
}

/// Read-only record iterator returned by [`FeatureSet::records`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    set: &'a FeatureSet,
    next: usize,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.next >= self.set.feature_count() {
            return None;
        }
        let record = self.set.record_at(self.next);
        self.next += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.set.feature_count().saturating_sub(self.next);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Records<'_> {}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bindings() -> Vec<(String, FieldBinding)> {
        vec![
            ("factor".to_string(), FieldBinding::Constant { value: json!(10) }),
            (
                "value".to_string(),
                FieldBinding::Mapped {
                    source: "power".to_string(),
                },
            ),
        ]
    }

    fn power_doc() -> Value {
        json!({"features": [{"properties": {"power": 2}}, {"properties": {"power": 3}}]})
    }

    fn collect(set: &mut FeatureSet) -> Vec<Record> {
        let mut cursor = set.cursor();
        let mut out = Vec::new();
        while let Some(r) = cursor.next_record() {
            out.push(r);
        }
        out
    }

    #[test]
    fn merges_constants_with_mapped_values() {
        let mut set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        let rows = collect(&mut set);
        assert_eq!(
            serde_json::to_value(&rows).unwrap(),
            json!([{"factor": 10, "value": 2}, {"factor": 10, "value": 3}])
        );
    }

    #[test]
    fn missing_source_property_is_null() {
        let doc = json!({"features": [{"properties": {"other": 1}}, {"geometry": null}]});
        let set = FeatureSet::from_document("computation", bindings(), Some(doc)).unwrap();
        let rows: Vec<_> = set.records().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["value"], Value::Null);
        assert_eq!(rows[1]["value"], Value::Null);
        assert_eq!(rows[1]["factor"], json!(10));
    }

    #[test]
    fn constants_only_yields_exactly_one_record_and_ignores_data() {
        let only_constants = vec![
            ("a".to_string(), FieldBinding::Constant { value: json!(1) }),
            ("b".to_string(), FieldBinding::Constant { value: Value::Null }),
        ];
        let mut set = FeatureSet::from_document("page", only_constants, Some(power_doc())).unwrap();
        let rows = collect(&mut set);
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!([{"a": 1, "b": null}]));
    }

    #[test]
    fn mapped_without_data_yields_zero_records() {
        let mut set = FeatureSet::from_document("computation", bindings(), None).unwrap();
        assert!(collect(&mut set).is_empty());
        assert!(matches!(set.require_data(), Err(ConfigError::MissingData { .. })));
        assert_eq!(set.serialize().unwrap(), r#"{"features":[]}"#);
    }

    #[test]
    fn restarting_iteration_yields_same_sequence() {
        let mut set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        let first = collect(&mut set);
        let second = collect(&mut set);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn add_result_targets_current_feature() {
        let mut set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        {
            let mut cursor = set.cursor();
            let _ = cursor.next_record();
            let _ = cursor.next_record();
            assert_eq!(cursor.position(), Some(1));
            cursor.add_result("squared", 9).unwrap();
        }
        let doc: Value = serde_json::from_str(&set.serialize().unwrap()).unwrap();
        assert_eq!(doc["features"][0]["properties"], json!({"power": 2}));
        assert_eq!(doc["features"][1]["properties"], json!({"power": 3, "squared": 9}));
    }

    #[test]
    fn add_result_overwrites_source_property_visible_on_reiteration() {
        let mut set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        {
            let mut cursor = set.cursor();
            let _ = cursor.next_record();
            cursor.add_result("power", 5).unwrap();
        }
        let rows: Vec<_> = set.records().collect();
        assert_eq!(rows[0]["value"], json!(5));
        assert_eq!(rows[1]["value"], json!(3));
    }

    #[test]
    fn add_result_without_current_feature_fails() {
        let mut set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        let mut cursor = set.cursor();
        let err = cursor.add_result("x", 1).unwrap_err();
        assert!(matches!(err, ConfigError::AnnotationState { ref field } if field == "x"));

        while cursor.next_record().is_some() {}
        assert!(cursor.add_result("x", 1).is_err());
    }

    #[test]
    fn invalid_document_is_data_load_error() {
        let err = FeatureSet::from_document("computation", bindings(), Some(json!({"rows": []}))).unwrap_err();
        assert!(matches!(err, ConfigError::DataLoad { ref namespace, .. } if namespace == "computation"));
    }

    #[test]
    fn feature_set_is_iterable_json() {
        let set = FeatureSet::from_document("computation", bindings(), None).unwrap();
        assert!(set.is_iterable());
        assert_eq!(set.format().extension(), "json");
        assert_eq!(set.format().content_type(), "application/json");
    }

    #[test]
    fn records_reports_exact_size() {
        let set = FeatureSet::from_document("computation", bindings(), Some(power_doc())).unwrap();
        assert_eq!(set.records().len(), 2);
        assert_eq!(set.feature_count(), 2);
    }
}
