//! Core data model types for job configuration.
//!
//! A job's settings document is parsed into a [`ToolConfiguration`]: an ordered mapping from
//! namespace name to [`Namespace`], each holding the field descriptors declared for it. Each
//! descriptor resolves once into a [`FieldBinding`] that says whether the field is a literal
//! constant or a pointer into a per-feature property of an uploaded data file.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// One merged row produced by feature iteration (constants plus resolved mapped values).
pub type Record = Map<String, Value>;

/// Raw field descriptor as it appears in the settings document.
///
/// All keys are optional; unknown keys (labels, help text, UI hints) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ElementDescriptor {
    /// "Mapped to file data" flag. Any truthy JSON value counts.
    #[serde(default)]
    pub property: Value,
    /// Declared element type; `"property"` also marks the field as mapped.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Literal constant, or the source property name when the field is mapped.
    #[serde(default)]
    pub value: Option<Value>,
}

impl ElementDescriptor {
    /// Create a constant descriptor.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a descriptor mapped to the per-feature property `source`.
    pub fn mapped(source: impl Into<String>) -> Self {
        Self {
            property: Value::Bool(true),
            kind: None,
            value: Some(Value::String(source.into())),
        }
    }

    /// True when the descriptor declares the field as mapped, regardless of whether a source
    /// property name was supplied.
    pub fn declares_mapping(&self) -> bool {
        is_truthy(&self.property) || self.kind.as_deref() == Some("property")
    }

    /// The declared value, with a missing value reported as JSON `null`.
    pub fn value_or_null(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }

    /// Resolve the descriptor into a [`FieldBinding`].
    ///
    /// A field is mapped only if it declares a mapping AND names a non-null source. Anything
    /// else is a constant, contributing `null` when it has no value.
    pub fn binding(&self) -> FieldBinding {
        match (&self.value, self.declares_mapping()) {
            (Some(Value::String(source)), true) => FieldBinding::Mapped {
                source: source.clone(),
            },
            (Some(v), true) if !v.is_null() => FieldBinding::Mapped {
                source: v.to_string(),
            },
            _ => FieldBinding::Constant {
                value: self.value_or_null(),
            },
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// How a configured field obtains its value for each record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldBinding {
    /// Looked up per feature from `properties[source]`.
    Mapped { source: String },
    /// The same literal on every record.
    Constant { value: Value },
}

/// The ordered field descriptors of one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    /// Namespace name.
    pub name: String,
    /// Field name and descriptor, in declaration order.
    pub fields: Vec<(String, ElementDescriptor)>,
}

impl Namespace {
    /// Create a namespace from fields.
    pub fn new(name: impl Into<String>, fields: Vec<(String, ElementDescriptor)>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Field name -> declared value (source property names for mapped fields).
    pub fn raw_values(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(name, d)| (name.clone(), d.value_or_null()))
            .collect()
    }

    /// Field name -> resolved binding, in declaration order.
    pub fn bindings(&self) -> Vec<(String, FieldBinding)> {
        self.fields
            .iter()
            .map(|(name, d)| (name.clone(), d.binding()))
            .collect()
    }
}

/// Job settings: namespace name -> [`Namespace`]. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolConfiguration {
    namespaces: Vec<Namespace>,
}

impl ToolConfiguration {
    /// Create a configuration from namespaces.
    pub fn new(namespaces: Vec<Namespace>) -> Self {
        Self { namespaces }
    }

    /// Parse the settings sub-document (`{ ns: { field: descriptor } }`).
    pub fn from_settings(settings: &Map<String, Value>) -> ConfigResult<Self> {
        let mut namespaces = Vec::with_capacity(settings.len());
        for (ns, fields) in settings {
            let obj = fields.as_object().ok_or_else(|| ConfigError::ConfigLoad {
                message: format!("namespace '{ns}' is not a mapping of fields"),
            })?;
            let mut parsed = Vec::with_capacity(obj.len());
            for (field, raw) in obj {
                let descriptor: ElementDescriptor =
                    serde_json::from_value(raw.clone()).map_err(|e| ConfigError::ConfigLoad {
                        message: format!("invalid descriptor for '{ns}.{field}': {e}"),
                    })?;
                parsed.push((field.clone(), descriptor));
            }
            namespaces.push(Namespace::new(ns.clone(), parsed));
        }
        Ok(Self { namespaces })
    }

    /// Look up a namespace by name.
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.name == name)
    }

    /// Iterate namespace names in document order.
    pub fn namespace_names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|ns| ns.name.as_str())
    }
}

/// One uploaded file: its on-disk path plus whatever the platform attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Extra metadata supplied alongside the path. Not interpreted.
    pub metadata: Vec<Value>,
}

impl UploadedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metadata: Vec::new(),
        }
    }
}

/// Registry of uploaded files: namespace -> [`UploadedFile`], in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputFiles {
    files: Vec<(String, UploadedFile)>,
}

impl InputFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the file for `namespace`.
    pub fn insert(&mut self, namespace: impl Into<String>, file: UploadedFile) {
        let namespace = namespace.into();
        match self.files.iter_mut().find(|(ns, _)| *ns == namespace) {
            Some(slot) => slot.1 = file,
            None => self.files.push((namespace, file)),
        }
    }

    /// Builder-style [`Self::insert`] for a bare path.
    pub fn with_path(mut self, namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(namespace, UploadedFile::new(path));
        self
    }

    /// Parse the platform's registry shape.
    ///
    /// Accepts `{ "ns": ["/path", meta...] }` (the first element is the path) or
    /// `{ "ns": "/path" }`.
    pub fn from_json(value: &Value) -> ConfigResult<Self> {
        let obj = value.as_object().ok_or_else(|| ConfigError::ConfigLoad {
            message: "input file registry must be a mapping".to_string(),
        })?;

        let mut files = Self::new();
        for (ns, entry) in obj {
            let file = match entry {
                Value::String(p) => UploadedFile::new(p),
                Value::Array(items) => {
                    let (first, rest) = items.split_first().ok_or_else(|| ConfigError::ConfigLoad {
                        message: format!("input file entry for '{ns}' is empty"),
                    })?;
                    let path = first.as_str().ok_or_else(|| ConfigError::ConfigLoad {
                        message: format!("input file entry for '{ns}' does not start with a path"),
                    })?;
                    UploadedFile {
                        path: PathBuf::from(path),
                        metadata: rest.to_vec(),
                    }
                }
                _ => {
                    return Err(ConfigError::ConfigLoad {
                        message: format!("input file entry for '{ns}' must be a path or a list"),
                    });
                }
            };
            files.insert(ns.clone(), file);
        }
        Ok(files)
    }

    /// Path registered for `namespace`, if any.
    pub fn path(&self, namespace: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|(ns, _)| ns == namespace)
            .map(|(_, f)| f.path.as_path())
    }

    /// Iterate all registered paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(_, f)| f.path.as_path())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
