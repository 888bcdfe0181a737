//! Parameter declarations and the schema compiler.

use serde::{Deserialize, Deserializer};
use serde_json::Value as Json;

use crate::callback::{ErrorHandler, SuccessHandler, Validator};
use crate::error::CompileError;
use crate::grammar::parse_shorthand;
use crate::value::{coerce, parse_bool_token, ParamType, RawValue, Value};

/// A parameter as declared by the schema author.
///
/// Build one from a shorthand string, a [`ParamObject`], or raw JSON loaded
/// from configuration.
#[derive(Debug, Clone)]
pub enum ParamDecl {
    /// Shorthand grammar, e.g. `"number[](1,2)"`
    Shorthand(String),
    /// Object declaration built in code
    Object(ParamObject),
    /// Declaration loaded from JSON; a string is shorthand, an object needs `type`
    Json(Json),
}

impl From<&str> for ParamDecl {
    fn from(s: &str) -> Self {
        ParamDecl::Shorthand(s.to_string())
    }
}

impl From<String> for ParamDecl {
    fn from(s: String) -> Self {
        ParamDecl::Shorthand(s)
    }
}

impl From<ParamObject> for ParamDecl {
    fn from(object: ParamObject) -> Self {
        ParamDecl::Object(object)
    }
}

impl From<Json> for ParamDecl {
    fn from(json: Json) -> Self {
        match json {
            Json::String(s) => ParamDecl::Shorthand(s),
            other => ParamDecl::Json(other),
        }
    }
}

impl<'de> Deserialize<'de> for ParamDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Json::deserialize(deserializer).map(ParamDecl::from)
    }
}

/// Object form of a parameter declaration.
///
/// `required`, `array` and `default` are kept loosely typed so that values
/// like `"no"`, `0` or `"25"` coming from configuration files normalize the
/// same way as their typed counterparts.
///
/// # Examples
///
/// ```
/// use param_gate::{compile, ParamObject};
///
/// let spec = compile(ParamObject::new("number").min(10.0).max(99.0)).unwrap();
/// assert!(spec.required);
/// assert_eq!(spec.min, Some(10.0));
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamObject {
    /// Type token, same table as the shorthand grammar
    #[serde(rename = "type")]
    pub param_type: String,
    /// Default value, coerced like a request value
    #[serde(default)]
    pub default: Option<Json>,
    /// Truthy/falsy token; a recognized falsy token makes the parameter optional
    #[serde(default)]
    pub required: Option<Json>,
    /// Truthy token marks a list parameter
    #[serde(default)]
    pub array: Option<Json>,
    /// Lower bound (length for strings)
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound (length for strings)
    #[serde(default)]
    pub max: Option<f64>,
    /// Free text for introspection
    #[serde(default)]
    pub description: Option<String>,
    /// Replaces the built-in checks for this parameter
    #[serde(skip)]
    pub validate: Option<Validator>,
    /// Error handler for failures involving this parameter
    #[serde(skip)]
    pub error: Option<ErrorHandler>,
    /// Success handler
    #[serde(skip)]
    pub success: Option<SuccessHandler>,
}

impl ParamObject {
    /// Starts an object declaration of the given type token.
    pub fn new(param_type: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            ..Self::default()
        }
    }

    /// Sets the default value.
    pub fn default_value(mut self, value: impl Into<Json>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the `required` token.
    pub fn required(mut self, required: impl Into<Json>) -> Self {
        self.required = Some(required.into());
        self
    }

    /// Marks the parameter as a list.
    pub fn array(mut self, array: bool) -> Self {
        self.array = Some(Json::Bool(array));
        self
    }

    /// Sets the lower bound.
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the upper bound.
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets a custom validator.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Sets an error handler.
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.error = Some(handler);
        self
    }

    /// Sets a success handler.
    pub fn on_success(mut self, handler: SuccessHandler) -> Self {
        self.success = Some(handler);
        self
    }
}

/// A compiled, normalized parameter.
///
/// Invariant: `required` is `false` whenever `default` is set.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Declared primitive type
    pub param_type: ParamType,
    /// Whether values are coerced as a list
    pub array: bool,
    /// Substituted when the request supplies no usable value
    pub default: Option<Value>,
    /// Whether an absent value is an error
    pub required: bool,
    /// Lower bound, never set for booleans
    pub min: Option<f64>,
    /// Upper bound, never set for booleans
    pub max: Option<f64>,
    /// Free text for introspection
    pub description: Option<String>,
    /// Custom validator (param, else endpoint, else global)
    pub validate: Option<Validator>,
    /// Error handler declared on this parameter
    pub error: Option<ErrorHandler>,
    /// Success handler declared on this parameter
    pub success: Option<SuccessHandler>,
}

impl ParamSpec {
    /// A required scalar parameter with no bounds or callbacks.
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            array: false,
            default: None,
            required: true,
            min: None,
            max: None,
            description: None,
            validate: None,
            error: None,
            success: None,
        }
    }
}

/// Compiles a declaration into a [`ParamSpec`].
///
/// # Errors
///
/// - [`CompileError::InvalidType`] for an unknown type token
/// - [`CompileError::InvalidParamShape`] for input that is neither shorthand
///   nor an object with a `type`
/// - [`CompileError::InvalidDefault`] for a default that does not coerce
///
/// # Examples
///
/// ```
/// use param_gate::{compile, Value};
///
/// let spec = compile("number(20)").unwrap();
/// assert!(!spec.required);
/// assert_eq!(spec.default, Some(Value::Number(20.0)));
///
/// let spec = compile("string()").unwrap();
/// assert!(!spec.required);
/// assert_eq!(spec.default, None);
///
/// assert!(compile("something").is_err());
/// ```
pub fn compile(decl: impl Into<ParamDecl>) -> Result<ParamSpec, CompileError> {
    match decl.into() {
        ParamDecl::Shorthand(text) => compile_shorthand(&text),
        ParamDecl::Object(object) => compile_object(object),
        ParamDecl::Json(json) => compile_json(json),
    }
}

fn compile_shorthand(text: &str) -> Result<ParamSpec, CompileError> {
    let parsed = parse_shorthand(text)?;
    let param_type = ParamType::from_token(parsed.type_token)?;

    let default = match parsed.default {
        None | Some("") => None,
        Some(raw) => Some(coerce_default(param_type, parsed.array, RawValue::from(raw))?),
    };

    Ok(ParamSpec {
        array: parsed.array,
        default,
        required: !parsed.is_optional(),
        ..ParamSpec::new(param_type)
    })
}

fn compile_object(object: ParamObject) -> Result<ParamSpec, CompileError> {
    let param_type = ParamType::from_token(&object.param_type)?;
    let array = object.array.as_ref().is_some_and(is_truthy);

    let default = match object.default {
        None | Some(Json::Null) => None,
        Some(json) => default_from_json(param_type, array, &json)?,
    };
    let required = normalize_required(object.required.as_ref(), default.is_some());

    let (min, max) = match param_type {
        ParamType::Bool => (None, None),
        ParamType::String | ParamType::Number | ParamType::Integer => (object.min, object.max),
    };

    Ok(ParamSpec {
        param_type,
        array,
        default,
        required,
        min,
        max,
        description: object.description,
        validate: object.validate,
        error: object.error,
        success: object.success,
    })
}

fn compile_json(json: Json) -> Result<ParamSpec, CompileError> {
    match json {
        Json::String(text) => compile_shorthand(&text),
        Json::Object(map) => {
            if !map.get("type").is_some_and(Json::is_string) {
                return Err(CompileError::shape("object declaration has no 'type'"));
            }
            let object: ParamObject = serde_json::from_value(Json::Object(map))
                .map_err(|e| CompileError::shape(format!("malformed object declaration: {}", e)))?;
            compile_object(object)
        }
        other => Err(CompileError::shape(format!(
            "expected shorthand string or object, found {}",
            other
        ))),
    }
}

/// An explicit falsy token always makes the parameter optional; otherwise a
/// default does.
fn normalize_required(token: Option<&Json>, has_default: bool) -> bool {
    match token {
        Some(t) if is_falsy(t) => false,
        _ => !has_default,
    }
}

fn is_falsy(json: &Json) -> bool {
    match json {
        Json::Null => true,
        Json::Bool(b) => !b,
        Json::Number(n) => n.as_f64() == Some(0.0),
        Json::String(s) => parse_bool_token(s) == Some(false),
        Json::Array(_) | Json::Object(_) => false,
    }
}

fn is_truthy(json: &Json) -> bool {
    match json {
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Json::String(s) => parse_bool_token(s) == Some(true),
        Json::Null | Json::Array(_) | Json::Object(_) => false,
    }
}

/// Object defaults are stringified and run through the request-time coercion.
fn default_from_json(
    param_type: ParamType,
    array: bool,
    json: &Json,
) -> Result<Option<Value>, CompileError> {
    let raw = match json {
        Json::Array(items) => RawValue::Many(
            items
                .iter()
                .map(|item| scalar_text(param_type, item))
                .collect::<Result<_, _>>()?,
        ),
        scalar => RawValue::Single(scalar_text(param_type, scalar)?),
    };
    if matches!(&raw, RawValue::Single(s) if s.is_empty()) {
        return Ok(None);
    }
    coerce_default(param_type, array, raw).map(Some)
}

fn scalar_text(param_type: ParamType, json: &Json) -> Result<String, CompileError> {
    match json {
        Json::String(s) => Ok(s.clone()),
        Json::Number(n) => Ok(n.to_string()),
        Json::Bool(b) => Ok(b.to_string()),
        other => Err(CompileError::InvalidDefault {
            param_type,
            default: other.to_string(),
        }),
    }
}

fn coerce_default(param_type: ParamType, array: bool, raw: RawValue) -> Result<Value, CompileError> {
    coerce(param_type, array, &raw).ok_or_else(|| CompileError::InvalidDefault {
        param_type,
        default: match raw {
            RawValue::Single(s) => s,
            RawValue::Many(items) => items.join(","),
        },
    })
}
