//! Extraction boundary traits for web integration.
//!
//! The verifier is generic over these traits and needs no knowledge of the
//! host framework's request type.

use std::collections::{BTreeMap, HashMap};

use crate::value::RawValue;
use crate::verifier::FilledParams;

/// A named bag of request-supplied key/value data (query, body, path
/// parameters, cookies).
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use param_gate::web::SourceBag;
/// use param_gate::RawValue;
///
/// let mut query = HashMap::new();
/// query.insert("page".to_string(), "2".to_string());
///
/// assert_eq!(query.get_raw("page"), Some(RawValue::from("2")));
/// assert_eq!(query.get_raw("missing"), None);
/// ```
pub trait SourceBag {
    /// Returns the raw value stored under `key`.
    fn get_raw(&self, key: &str) -> Option<RawValue>;

    /// Returns every key present in the bag.
    fn keys(&self) -> Vec<&str>;
}

impl SourceBag for HashMap<String, String> {
    fn get_raw(&self, key: &str) -> Option<RawValue> {
        self.get(key).cloned().map(RawValue::Single)
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

impl SourceBag for BTreeMap<String, String> {
    fn get_raw(&self, key: &str) -> Option<RawValue> {
        self.get(key).cloned().map(RawValue::Single)
    }

    fn keys(&self) -> Vec<&str> {
        BTreeMap::keys(self).map(String::as_str).collect()
    }
}

impl SourceBag for HashMap<String, Vec<String>> {
    fn get_raw(&self, key: &str) -> Option<RawValue> {
        self.get(key).map(|values| match values.as_slice() {
            [single] => RawValue::Single(single.clone()),
            many => RawValue::Many(many.to_vec()),
        })
    }

    fn keys(&self) -> Vec<&str> {
        HashMap::keys(self).map(String::as_str).collect()
    }
}

/// Access to a request's source bags by name.
///
/// This is all [`crate::verify`] needs from a request.
pub trait RequestSources {
    /// Returns the bag called `name` (e.g. `"query"`), if the request has one.
    fn source(&self, name: &str) -> Option<&dyn SourceBag>;
}

/// The request contract consumed by the pre-handler guard.
///
/// Framework integrations implement this for their request type, or build a
/// [`crate::web::RequestAdapter`] from it.
pub trait ParamRequest: RequestSources {
    /// HTTP method of the request.
    fn method(&self) -> &str;

    /// Path of the matched route.
    fn route_path(&self) -> &str;

    /// Stores the filled parameters under `slot` for downstream handlers.
    fn attach(&mut self, slot: &str, params: FilledParams);
}
