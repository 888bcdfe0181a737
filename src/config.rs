//! Router-wide and per-endpoint configuration.
//!
//! Precedence for callbacks and options is per-parameter > per-endpoint >
//! global. Resolution happens once, in [`merge_endpoint_config`], so the
//! verifier only ever reads a fully resolved [`EndpointConfig`].

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::callback::{ErrorHandler, SuccessHandler, Validator};
use crate::error::CompileError;
use crate::param::{compile, ParamDecl, ParamSpec};

/// Source bags consulted when an endpoint does not configure its own order.
pub const DEFAULT_PARAM_ORDER: [&str; 4] = ["body", "query", "params", "cookies"];

/// Request slot the filled parameters are attached to by default.
pub const DEFAULT_PARAM_MAP: &str = "args";

/// Environment variable selecting diagnostics mode.
pub const DIAGNOSTICS_ENV_VAR: &str = "PARAM_GATE_ENV";

/// Whether failure responses carry the structured error map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    /// 422 with an empty body
    #[default]
    Disabled,
    /// 422 with `{ error, params }` body
    Enabled,
}

impl Diagnostics {
    /// Reads [`DIAGNOSTICS_ENV_VAR`]; `development` enables diagnostics.
    pub fn from_env() -> Self {
        Self::from_env_value(std::env::var(DIAGNOSTICS_ENV_VAR).ok().as_deref())
    }

    fn from_env_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("development") => Diagnostics::Enabled,
            _ => Diagnostics::Disabled,
        }
    }

    /// Returns `true` if error bodies are sent.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Diagnostics::Enabled)
    }
}

/// Global configuration shared by every endpoint of one router.
///
/// # Examples
///
/// ```
/// use param_gate::{Diagnostics, RouterConfig};
///
/// let config = RouterConfig::new()
///     .prefix("/api")
///     .param_map("arguments")
///     .diagnostics(Diagnostics::Enabled);
/// assert_eq!(config.prefix.as_deref(), Some("/api"));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterConfig {
    /// Error handler for all endpoints
    #[serde(skip)]
    pub error: Option<ErrorHandler>,
    /// Validator for all parameters
    #[serde(skip)]
    pub validate: Option<Validator>,
    /// Success handler for all endpoints
    #[serde(skip)]
    pub success: Option<SuccessHandler>,
    /// Source bag priority; defaults to [`DEFAULT_PARAM_ORDER`]
    pub param_order: Option<Vec<String>>,
    /// Request slot for filled parameters; defaults to [`DEFAULT_PARAM_MAP`]
    pub param_map: Option<String>,
    /// Path prefix used for endpoint keys and introspection
    pub prefix: Option<String>,
    /// Failure body mode
    pub diagnostics: Diagnostics,
}

impl RouterConfig {
    /// Empty configuration; diagnostics disabled.
    ///
    /// `PARAM_GATE_ENV` is not read here (nor by `Default`); use
    /// [`RouterConfig::from_env`] to pick diagnostics up from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty configuration with diagnostics taken from the environment.
    pub fn from_env() -> Self {
        Self {
            diagnostics: Diagnostics::from_env(),
            ..Self::default()
        }
    }

    /// Loads the data part of the configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the global error handler.
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.error = Some(handler);
        self
    }

    /// Sets the global validator.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Sets the global success handler.
    pub fn on_success(mut self, handler: SuccessHandler) -> Self {
        self.success = Some(handler);
        self
    }

    /// Sets the source bag priority.
    pub fn param_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the request slot for filled parameters.
    pub fn param_map(mut self, slot: impl Into<String>) -> Self {
        self.param_map = Some(slot.into());
        self
    }

    /// Sets the endpoint path prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the failure body mode.
    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// An endpoint declaration as written by the route author.
///
/// # Examples
///
/// ```
/// use param_gate::{EndpointDecl, ParamObject};
///
/// let decl = EndpointDecl::new()
///     .description("Search users")
///     .param("q", "string")
///     .param("limit", "number(20)")
///     .param("age", ParamObject::new("number").min(10.0));
/// assert_eq!(decl.params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointDecl {
    /// Free text for introspection
    pub description: Option<String>,
    /// Parameters in declaration order
    #[serde(deserialize_with = "deserialize_params")]
    pub params: Vec<(String, ParamDecl)>,
    /// Source bag priority for this endpoint
    pub param_order: Option<Vec<String>>,
    /// Request slot for this endpoint
    pub param_map: Option<String>,
    /// Error handler for this endpoint
    #[serde(skip)]
    pub error: Option<ErrorHandler>,
    /// Validator for this endpoint's parameters
    #[serde(skip)]
    pub validate: Option<Validator>,
    /// Success handler for this endpoint
    #[serde(skip)]
    pub success: Option<SuccessHandler>,
}

impl EndpointDecl {
    /// Empty declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the data part of a declaration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input. Bad parameter
    /// declarations are reported later, by [`merge_endpoint_config`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares a parameter. A repeated name replaces the earlier declaration.
    pub fn param(mut self, name: impl Into<String>, decl: impl Into<ParamDecl>) -> Self {
        let name = name.into();
        let decl = decl.into();
        match self.params.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = decl,
            None => self.params.push((name, decl)),
        }
        self
    }

    /// Sets the source bag priority.
    pub fn param_order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_order = Some(order.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the request slot for filled parameters.
    pub fn param_map(mut self, slot: impl Into<String>) -> Self {
        self.param_map = Some(slot.into());
        self
    }

    /// Sets the endpoint error handler.
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.error = Some(handler);
        self
    }

    /// Sets the endpoint validator.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Sets the endpoint success handler.
    pub fn on_success(mut self, handler: SuccessHandler) -> Self {
        self.success = Some(handler);
        self
    }
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<Vec<(String, ParamDecl)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ParamsVisitor;

    impl<'de> Visitor<'de> for ParamsVisitor {
        type Value = Vec<(String, ParamDecl)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of parameter names to declarations")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut params: Vec<(String, ParamDecl)> = Vec::new();
            while let Some((name, decl)) = map.next_entry::<String, ParamDecl>()? {
                match params.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = decl,
                    None => params.push((name, decl)),
                }
            }
            Ok(params)
        }
    }

    deserializer.deserialize_map(ParamsVisitor)
}

/// The compiled, fully resolved configuration of one (path, method) pair.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Free text for introspection
    pub description: Option<String>,
    /// Compiled parameters in declaration order
    pub params: Vec<(String, ParamSpec)>,
    /// Source bag priority
    pub param_order: Vec<String>,
    /// Request slot for filled parameters
    pub param_map: String,
    /// Endpoint error handler, else the global one
    pub error: Option<ErrorHandler>,
    /// Endpoint validator, else the global one
    pub validate: Option<Validator>,
    /// Endpoint success handler, else the global one
    pub success: Option<SuccessHandler>,
}

impl EndpointConfig {
    /// Looks up a declared parameter.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, spec)| spec)
    }

    /// Returns `true` if `name` is declared.
    pub fn declares(&self, name: &str) -> bool {
        self.param(name).is_some()
    }
}

/// Compiles an endpoint declaration against the global configuration.
///
/// Every parameter is compiled, then a missing `validate` callback is
/// back-filled from the endpoint, then from the global configuration. A
/// parameter keeps only its own `error` and `success` handlers; the endpoint
/// or global ones live on the returned config and are consulted after them.
/// `param_order` and `param_map` fall back the same way.
///
/// # Errors
///
/// Returns the first [`CompileError`] raised by a parameter declaration.
///
/// # Examples
///
/// ```
/// use param_gate::{merge_endpoint_config, EndpointDecl, RouterConfig};
///
/// let global = RouterConfig::new().param_map("arguments");
/// let config = merge_endpoint_config(&global, EndpointDecl::new().param("id", "number")).unwrap();
/// assert_eq!(config.param_map, "arguments");
/// assert_eq!(config.param_order, ["body", "query", "params", "cookies"]);
/// ```
pub fn merge_endpoint_config(
    global: &RouterConfig,
    decl: EndpointDecl,
) -> Result<EndpointConfig, CompileError> {
    let error = decl.error.or_else(|| global.error.clone());
    let validate = decl.validate.or_else(|| global.validate.clone());
    let success = decl.success.or_else(|| global.success.clone());

    let params = decl
        .params
        .into_iter()
        .map(|(name, param)| {
            let mut spec = compile(param)?;
            if spec.validate.is_none() {
                spec.validate = validate.clone();
            }
            Ok((name, spec))
        })
        .collect::<Result<Vec<_>, CompileError>>()?;

    let param_order = decl
        .param_order
        .or_else(|| global.param_order.clone())
        .unwrap_or_else(|| DEFAULT_PARAM_ORDER.iter().map(|s| s.to_string()).collect());
    let param_map = decl
        .param_map
        .or_else(|| global.param_map.clone())
        .unwrap_or_else(|| DEFAULT_PARAM_MAP.to_string());

    Ok(EndpointConfig {
        description: decl.description,
        params,
        param_order,
        param_map,
        error,
        validate,
        success,
    })
}
