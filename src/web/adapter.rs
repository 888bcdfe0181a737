//! Request adapter for mapping HTTP requests to verifier inputs.

use std::collections::HashMap;

use url::form_urlencoded;

use crate::value::RawValue;
use crate::verifier::FilledParams;

use super::{ParamRequest, RequestSources, SourceBag};

/// A multi-valued source bag, as produced by a query string parser.
///
/// Adding the same key twice keeps both values, so `?a=1&a=2` reads back as
/// a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bag {
    entries: HashMap<String, Vec<String>>,
}

impl Bag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `key`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.entry(key.into()).or_default().push(value.into());
    }

    /// Replaces all values under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), vec![value.into()]);
    }

    /// Returns `true` if `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the bag has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses an `application/x-www-form-urlencoded` query string such as
    /// `a=1&b=2`, decoding `+` and percent escapes. Keys without `=` get an
    /// empty value.
    pub fn from_query(query: &str) -> Self {
        let mut bag = Self::new();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            bag.add(key, value);
        }
        bag
    }
}

impl SourceBag for Bag {
    fn get_raw(&self, key: &str) -> Option<RawValue> {
        self.entries.get_raw(key)
    }

    fn keys(&self) -> Vec<&str> {
        SourceBag::keys(&self.entries)
    }
}

/// Framework-neutral request carrying the standard source bags.
///
/// `RequestAdapter` is the integration point between a web framework and the
/// verifier. Framework-specific code copies the matched route, the method and
/// the request data into it; downstream handlers read the filled parameters
/// back with [`RequestAdapter::attached`].
///
/// # Examples
///
/// ```
/// use param_gate::web::{RequestAdapter, RequestSources};
///
/// let mut req = RequestAdapter::new("GET", "/users/:id");
/// req.add_path_param("id", "42");
/// req.add_query_param("tag", "a");
/// req.add_query_param("tag", "b");
///
/// assert!(req.source("params").is_some());
/// assert!(req.source("body").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestAdapter {
    method: String,
    route_path: String,
    sources: HashMap<String, Bag>,
    attachments: HashMap<String, FilledParams>,
}

impl RequestAdapter {
    /// Creates a request for the given method and matched route path.
    pub fn new(method: impl Into<String>, route_path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route_path: route_path.into(),
            ..Self::default()
        }
    }

    /// Adds a value to the named source bag, creating the bag if needed.
    pub fn add_source_value(
        &mut self,
        source: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.sources.entry(source.into()).or_default().add(key, value);
    }

    /// Replaces the named source bag.
    pub fn set_source(&mut self, source: impl Into<String>, bag: Bag) {
        self.sources.insert(source.into(), bag);
    }

    /// Adds a body field.
    pub fn add_body_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add_source_value("body", key, value);
    }

    /// Adds a query entry; repeated keys accumulate.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add_source_value("query", key, value);
    }

    /// Adds a path parameter from routing.
    pub fn add_path_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add_source_value("params", key, value);
    }

    /// Adds a cookie.
    pub fn add_cookie(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add_source_value("cookies", key, value);
    }

    /// Returns the parameters attached under `slot` by the guard.
    pub fn attached(&self, slot: &str) -> Option<&FilledParams> {
        self.attachments.get(slot)
    }
}

impl RequestSources for RequestAdapter {
    fn source(&self, name: &str) -> Option<&dyn SourceBag> {
        self.sources.get(name).map(|bag| bag as &dyn SourceBag)
    }
}

impl ParamRequest for RequestAdapter {
    fn method(&self) -> &str {
        &self.method
    }

    fn route_path(&self) -> &str {
        &self.route_path
    }

    fn attach(&mut self, slot: &str, params: FilledParams) {
        self.attachments.insert(slot.to_string(), params);
    }
}
