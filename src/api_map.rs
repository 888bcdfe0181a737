//! Read model for the API-map introspection endpoint.
//!
//! Serializes to
//! `{ path: { METHOD: { description, paramOrder, paramMap, params: { name: {...} } } } }`.
//! Callbacks are never exposed.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::config::EndpointConfig;
use crate::param::ParamSpec;
use crate::value::{serialize_number, ParamType, Value};

/// Compiled endpoints keyed by path, then upper-cased method.
pub type EndpointMap = HashMap<String, HashMap<String, Arc<EndpointConfig>>>;

/// Serializable description of every configured endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ApiMap(BTreeMap<String, BTreeMap<String, EndpointDoc>>);

impl ApiMap {
    /// Builds the map, joining `base` in front of every endpoint key.
    pub fn build(endpoints: &EndpointMap, base: &str) -> Self {
        let map = endpoints
            .iter()
            .map(|(path, methods)| {
                let docs = methods
                    .iter()
                    .map(|(method, config)| (method.clone(), EndpointDoc::from(config.as_ref())))
                    .collect();
                (join_path(base, path), docs)
            })
            .collect();
        ApiMap(map)
    }

    /// Returns the documentation for one endpoint.
    pub fn get(&self, path: &str, method: &str) -> Option<&EndpointDoc> {
        self.0.get(path)?.get(method)
    }

    /// Iterates documented paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Converts the map to JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization errors.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Documentation of one (path, method) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDoc {
    /// Endpoint description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source bag priority
    pub param_order: Vec<String>,
    /// Request slot for filled parameters
    pub param_map: String,
    /// Parameters in declaration order
    pub params: ParamDocs,
}

impl From<&EndpointConfig> for EndpointDoc {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            description: config.description.clone(),
            param_order: config.param_order.clone(),
            param_map: config.param_map.clone(),
            params: ParamDocs(
                config
                    .params
                    .iter()
                    .map(|(name, spec)| (name.clone(), ParamDoc::from(spec)))
                    .collect(),
            ),
        }
    }
}

/// Parameter docs, serialized as a map in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDocs(Vec<(String, ParamDoc)>);

impl ParamDocs {
    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParamDoc> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, doc)| doc)
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for ParamDocs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, doc) in &self.0 {
            map.serialize_entry(name, doc)?;
        }
        map.end()
    }
}

/// Public view of a [`ParamSpec`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDoc {
    /// Declared type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// List parameter
    pub array: bool,
    /// Absence is an error
    pub required: bool,
    /// Default value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Lower bound
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "opt_number")]
    pub min: Option<f64>,
    /// Upper bound
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "opt_number")]
    pub max: Option<f64>,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl From<&ParamSpec> for ParamDoc {
    fn from(spec: &ParamSpec) -> Self {
        Self {
            param_type: spec.param_type,
            array: spec.array,
            required: spec.required,
            default: spec.default.clone(),
            min: spec.min,
            max: spec.max,
            description: spec.description.clone(),
        }
    }
}

fn opt_number<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(n) => serialize_number(*n, serializer),
        None => serializer.serialize_none(),
    }
}

/// Joins a mount or prefix path with a route path without doubling slashes.
pub fn join_path(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() || path == "/" {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
