//! Parameter types and the value-coercion function.
//!
//! Coercion is shared by the schema compiler (declared defaults) and the
//! request-time verifier (incoming values), so a compiled default is always a
//! value the parameter's own coercion would also produce.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::CompileError;

/// Tokens accepted as boolean `true`, compared case-insensitively.
pub const TRUTHY_TOKENS: [&str; 5] = ["true", "t", "yes", "y", "1"];

/// Tokens accepted as boolean `false`, compared case-insensitively.
pub const FALSY_TOKENS: [&str; 5] = ["false", "f", "no", "n", "0"];

/// Delimiter for list values given as a single string.
pub const LIST_DELIMITER: char = ',';

/// The primitive type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamType {
    /// Text; empty input counts as absent
    #[serde(rename = "string")]
    String,
    /// Floating point number
    #[serde(rename = "number")]
    Number,
    /// Integral number; fractional input does not parse
    #[serde(rename = "number")]
    Integer,
    /// Boolean, parsed from a fixed token set
    #[serde(rename = "boolean")]
    Bool,
}

impl ParamType {
    /// Resolves a declared type token, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::InvalidType`] if the token is not a known type
    /// or synonym.
    ///
    /// # Examples
    ///
    /// ```
    /// use param_gate::ParamType;
    ///
    /// assert_eq!(ParamType::from_token("Float").unwrap(), ParamType::Number);
    /// assert_eq!(ParamType::from_token("Integer").unwrap(), ParamType::Integer);
    /// assert_eq!(ParamType::from_token("boolean").unwrap(), ParamType::Bool);
    /// assert!(ParamType::from_token("something").is_err());
    /// ```
    pub fn from_token(token: &str) -> Result<Self, CompileError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(ParamType::String),
            "number" | "float" | "double" => Ok(ParamType::Number),
            "integer" | "short" => Ok(ParamType::Integer),
            "bool" | "boolean" => Ok(ParamType::Bool),
            _ => Err(CompileError::InvalidType {
                token: token.to_string(),
            }),
        }
    }

    /// Canonical name used in error reports and introspection output.
    ///
    /// Both numeric kinds report as `number`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number | ParamType::Integer => "number",
            ParamType::Bool => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A non-empty string
    String(String),
    /// A finite number
    Number(f64),
    /// A boolean
    Bool(bool),
    /// Element-wise coerced list
    List(Vec<Value>),
}

impl Value {
    /// Returns the string, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number, if this is a number value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean, if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements, if this is a list value.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// `true` for an empty list. Scalars are never empty.
    pub fn is_empty_list(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }
}

/// Stringifies a value so that coercing the output yields the same value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{}", LIST_DELIMITER)?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => serialize_number(*n, serializer),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::List(items) => serializer.collect_seq(items),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Serializes integral numbers as JSON integers and the rest as floats.
pub(crate) fn serialize_number<S: Serializer>(n: f64, serializer: S) -> Result<S::Ok, S::Error> {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serializer.serialize_i64(n as i64)
    } else {
        serializer.serialize_f64(n)
    }
}

/// A value as supplied by a request source bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// A single string, e.g. one query entry or a path segment
    Single(String),
    /// Repeated entries, e.g. `?a=1&a=2`
    Many(Vec<String>),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Single(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Single(s)
    }
}

impl From<Vec<String>> for RawValue {
    fn from(values: Vec<String>) -> Self {
        RawValue::Many(values)
    }
}

/// Coerces one raw string to a typed value.
///
/// Returns `None` when the string cannot be parsed as `param_type`; the
/// caller treats that the same as an absent value.
///
/// # Examples
///
/// ```
/// use param_gate::{coerce_scalar, ParamType, Value};
///
/// assert_eq!(coerce_scalar(ParamType::Number, "25"), Some(Value::Number(25.0)));
/// assert_eq!(coerce_scalar(ParamType::Bool, "Yes"), Some(Value::Bool(true)));
/// assert_eq!(coerce_scalar(ParamType::Number, "abc"), None);
/// assert_eq!(coerce_scalar(ParamType::Integer, "2.7"), None);
/// assert_eq!(coerce_scalar(ParamType::String, ""), None);
/// ```
pub fn coerce_scalar(param_type: ParamType, raw: &str) -> Option<Value> {
    match param_type {
        ParamType::String => {
            if raw.is_empty() {
                None
            } else {
                Some(Value::String(raw.to_string()))
            }
        }
        ParamType::Number => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Value::Number),
        ParamType::Integer => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|n| n.unsigned_abs() <= MAX_SAFE_INTEGER as u64)
            .map(|n| Value::Number(n as f64)),
        ParamType::Bool => parse_bool_token(raw).map(Value::Bool),
    }
}

/// Matches `raw` against the truthy/falsy token sets.
pub fn parse_bool_token(raw: &str) -> Option<bool> {
    let token = raw.trim();
    if TRUTHY_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
        Some(true)
    } else if FALSY_TOKENS.iter().any(|t| t.eq_ignore_ascii_case(token)) {
        Some(false)
    } else {
        None
    }
}

/// Coerces a raw value for a parameter of `param_type`.
///
/// A list raw value is coerced element by element. A single string is split on
/// [`LIST_DELIMITER`] first when `array` is set. Elements that fail to parse
/// are dropped and an empty result is `None`.
///
/// # Examples
///
/// ```
/// use param_gate::{coerce, ParamType, RawValue, Value};
///
/// let raw = RawValue::from("25,30");
/// assert_eq!(
///     coerce(ParamType::Number, true, &raw),
///     Some(Value::List(vec![Value::Number(25.0), Value::Number(30.0)]))
/// );
/// ```
pub fn coerce(param_type: ParamType, array: bool, raw: &RawValue) -> Option<Value> {
    match raw {
        RawValue::Many(items) => coerce_list(param_type, items.iter().map(String::as_str)),
        RawValue::Single(s) if array => coerce_list(param_type, s.split(LIST_DELIMITER)),
        RawValue::Single(s) => coerce_scalar(param_type, s),
    }
}

fn coerce_list<'a>(param_type: ParamType, items: impl Iterator<Item = &'a str>) -> Option<Value> {
    let values: Vec<Value> = items
        .filter_map(|item| coerce_scalar(param_type, item))
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(Value::List(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synonyms_resolve() {
        for token in ["number", "float", "double", "NUMBER"] {
            assert_eq!(ParamType::from_token(token).unwrap(), ParamType::Number);
        }
        for token in ["integer", "short", "Integer"] {
            assert_eq!(ParamType::from_token(token).unwrap(), ParamType::Integer);
        }
        assert_eq!(ParamType::from_token("bool").unwrap(), ParamType::Bool);
        assert_eq!(ParamType::from_token("Boolean").unwrap(), ParamType::Bool);
        assert_eq!(ParamType::from_token("String").unwrap(), ParamType::String);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let err = ParamType::from_token("something").unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidType {
                token: "something".to_string()
            }
        );
    }

    #[test]
    fn number_coercion() {
        assert_eq!(coerce_scalar(ParamType::Number, "2.5"), Some(Value::Number(2.5)));
        assert_eq!(coerce_scalar(ParamType::Number, " 7 "), Some(Value::Number(7.0)));
        assert_eq!(coerce_scalar(ParamType::Number, "-3"), Some(Value::Number(-3.0)));
        assert_eq!(coerce_scalar(ParamType::Number, ""), None);
        assert_eq!(coerce_scalar(ParamType::Number, "inf"), None);
        assert_eq!(coerce_scalar(ParamType::Number, "NaN"), None);
        assert_eq!(coerce_scalar(ParamType::Number, "12abc"), None);
    }

    #[test]
    fn integer_kinds_reject_fractions() {
        let integer = ParamType::from_token("integer").unwrap();
        let short = ParamType::from_token("short").unwrap();
        let float = ParamType::from_token("float").unwrap();

        assert_eq!(coerce_scalar(integer, "2.7"), None);
        assert_eq!(coerce_scalar(integer, " -12 "), Some(Value::Number(-12.0)));
        assert_eq!(coerce_scalar(short, "3"), Some(Value::Number(3.0)));
        assert_eq!(coerce_scalar(short, "3.0"), None);
        assert_eq!(coerce_scalar(float, "2.7"), Some(Value::Number(2.7)));
    }

    #[test]
    fn integer_lists_drop_fractional_elements() {
        assert_eq!(
            coerce(ParamType::Integer, true, &RawValue::from("1,2.5,3")),
            Some(Value::List(vec![Value::Number(1.0), Value::Number(3.0)]))
        );
    }

    #[test]
    fn numeric_kinds_share_a_name() {
        assert_eq!(ParamType::Integer.as_str(), "number");
        assert_eq!(serde_json::to_value(ParamType::Integer).unwrap(), "number");
    }

    #[test]
    fn bool_tokens() {
        for t in ["true", "T", "yes", "Y", "1"] {
            assert_eq!(coerce_scalar(ParamType::Bool, t), Some(Value::Bool(true)));
        }
        for t in ["false", "F", "No", "n", "0"] {
            assert_eq!(coerce_scalar(ParamType::Bool, t), Some(Value::Bool(false)));
        }
        assert_eq!(coerce_scalar(ParamType::Bool, "maybe"), None);
        assert_eq!(coerce_scalar(ParamType::Bool, ""), None);
    }

    #[test]
    fn strings_pass_through_unless_empty() {
        assert_eq!(coerce_scalar(ParamType::String, " a b "), Some(Value::from(" a b ")));
        assert_eq!(coerce_scalar(ParamType::String, ""), None);
    }

    #[test]
    fn list_raw_value_is_coerced_elementwise() {
        let raw = RawValue::Many(vec!["25".to_string(), "30".to_string()]);
        assert_eq!(
            coerce(ParamType::Number, false, &raw),
            Some(Value::List(vec![Value::Number(25.0), Value::Number(30.0)]))
        );
    }

    #[test]
    fn scalar_is_not_split_without_array_marker() {
        let raw = RawValue::from("a,b");
        assert_eq!(coerce(ParamType::String, false, &raw), Some(Value::from("a,b")));
        assert_eq!(
            coerce(ParamType::String, true, &raw),
            Some(Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn unparsable_elements_are_dropped() {
        let raw = RawValue::from("1,x,3");
        assert_eq!(
            coerce(ParamType::Number, true, &raw),
            Some(Value::List(vec![Value::Number(1.0), Value::Number(3.0)]))
        );
        assert_eq!(coerce(ParamType::Number, true, &RawValue::from("x,y")), None);
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        let json = serde_json::to_string(&Value::List(vec![
            Value::Number(25.0),
            Value::Number(2.5),
            Value::Bool(true),
        ]))
        .unwrap();
        assert_eq!(json, "[25,2.5,true]");
    }

    #[test]
    fn display_joins_lists() {
        let list = Value::List(vec![Value::Number(1.0), Value::Number(2.5)]);
        assert_eq!(list.to_string(), "1,2.5");
    }

    mod proptests {
        use super::*;
        use crate::test_utils::{arb_bool_token, arb_number_text, arb_param_type};
        use proptest::prelude::*;

        proptest! {
            /// Coercing a stringified coerced value gives the same value back.
            #[test]
            fn numbers_round_trip(text in arb_number_text()) {
                let first = coerce_scalar(ParamType::Number, &text);
                prop_assert!(first.is_some());
                let first = first.unwrap();
                let second = coerce_scalar(ParamType::Number, &first.to_string());
                prop_assert_eq!(Some(first), second);
            }

            #[test]
            fn bools_round_trip(token in arb_bool_token()) {
                let first = coerce_scalar(ParamType::Bool, &token).unwrap();
                let second = coerce_scalar(ParamType::Bool, &first.to_string());
                prop_assert_eq!(Some(first), second);
            }

            #[test]
            fn strings_round_trip(text in "[^,]{1,20}") {
                let first = coerce_scalar(ParamType::String, &text).unwrap();
                let second = coerce_scalar(ParamType::String, &first.to_string());
                prop_assert_eq!(Some(first), second);
            }

            /// Coercion never panics, whatever arrives on the wire.
            #[test]
            fn coercion_is_total(param_type in arb_param_type(), array in any::<bool>(), raw in ".{0,40}") {
                let _ = coerce(param_type, array, &RawValue::Single(raw));
            }
        }
    }
}
