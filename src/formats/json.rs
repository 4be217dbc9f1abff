//! JSON document reading and feature-collection shape checks.
//!
//! A feature collection is `{"features": [{"properties": {...}}, ...]}`. Any other members
//! (`type`, `crs`, per-feature `geometry`, ...) are carried through untouched.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ConfigResult;

/// Read and parse a JSON document from disk.
pub fn read_json_from_path(path: impl AsRef<Path>) -> ConfigResult<Value> {
    let text = fs::read_to_string(path)?;
    read_json_from_str(&text)
}

/// Parse a JSON document from an in-memory string.
pub fn read_json_from_str(input: &str) -> ConfigResult<Value> {
    Ok(serde_json::from_str::<Value>(input)?)
}

/// Check that `doc` is a feature collection and return its feature count.
///
/// Features must be objects; a feature without `properties` is accepted and treated as having
/// none.
pub fn check_feature_collection(doc: &Value) -> Result<usize, String> {
    let obj = doc
        .as_object()
        .ok_or_else(|| "feature collection must be a json object".to_string())?;
    let features = obj
        .get("features")
        .ok_or_else(|| "feature collection has no 'features' member".to_string())?
        .as_array()
        .ok_or_else(|| "'features' must be an array".to_string())?;

    for (idx, feature) in features.iter().enumerate() {
        let f = feature
            .as_object()
            .ok_or_else(|| format!("feature {idx} is not a json object"))?;
        match f.get("properties") {
            None | Some(Value::Null) | Some(Value::Object(_)) => {}
            Some(_) => return Err(format!("feature {idx} has non-object 'properties'")),
        }
    }
    Ok(features.len())
}

/// Build a one-feature collection whose properties are `properties`.
pub fn single_feature_collection(properties: Map<String, Value>) -> Value {
    let mut feature = Map::new();
    feature.insert("properties".to_string(), Value::Object(properties));
    let mut doc = Map::new();
    doc.insert("features".to_string(), Value::Array(vec![Value::Object(feature)]));
    Value::Object(doc)
}

/// Properties of the feature at `idx`, if present.
pub(crate) fn feature_properties(doc: &Value, idx: usize) -> Option<&Map<String, Value>> {
    doc.get("features")?.get(idx)?.get("properties")?.as_object()
}

/// Mutable properties of the feature at `idx`, creating an empty object if the feature has none.
pub(crate) fn feature_properties_mut(doc: &mut Value, idx: usize) -> Option<&mut Map<String, Value>> {
    let feature = doc.get_mut("features")?.get_mut(idx)?.as_object_mut()?;
    let props = feature
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    if props.is_null() {
        *props = Value::Object(Map::new());
    }
    props.as_object_mut()
}

/// Number of features in a checked collection.
pub(crate) fn feature_count(doc: &Value) -> usize {
    doc.get("features")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}
