use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::value::{serialize_number, ParamType};

/// Errors raised while compiling parameter declarations at registration time.
///
/// These indicate a mistake in the schema author's declaration and abort the
/// registration. They are never produced while serving a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The declared type token is not in the type/synonym table.
    #[error("invalid parameter type '{token}'")]
    InvalidType {
        /// The token as written in the declaration
        token: String,
    },

    /// The declaration is neither shorthand nor an object carrying a `type`.
    #[error("invalid parameter declaration: {reason}")]
    InvalidParamShape {
        /// What was wrong with the declaration
        reason: String,
    },

    /// A non-empty default does not coerce to the declared type.
    #[error("default '{default}' is not a valid {param_type} value")]
    InvalidDefault {
        /// The declared type
        param_type: ParamType,
        /// The raw default text
        default: String,
    },

    /// The registration used a method the router does not proxy.
    #[error("unsupported method '{0}'")]
    UnsupportedMethod(String),
}

impl CompileError {
    pub(crate) fn shape(reason: impl Into<String>) -> Self {
        CompileError::InvalidParamShape {
            reason: reason.into(),
        }
    }
}

/// Why a single parameter failed verification.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FailureKind {
    /// Required parameter absent, or present but unparsable
    #[error("not set")]
    NotSet,
    /// Value (or string length) above the declared `max`
    #[error("value exceeds max value")]
    AboveMax {
        /// The declared bound
        max: f64,
    },
    /// Value (or string length) below the declared `min`
    #[error("value below min value")]
    BelowMin {
        /// The declared bound
        min: f64,
    },
    /// A custom validator returned this message
    #[error("{0}")]
    Rejected(String),
}

/// A recorded failure for one parameter.
///
/// Serializes as `{ "type": ..., "error": ..., "min"?: ..., "max"?: ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamFailure {
    /// The declared type of the failing parameter
    pub param_type: ParamType,
    /// What went wrong
    pub kind: FailureKind,
}

impl ParamFailure {
    /// Creates a failure record.
    pub fn new(param_type: ParamType, kind: FailureKind) -> Self {
        Self { param_type, kind }
    }

    /// Returns the failure message, e.g. `"not set"`.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl Serialize for ParamFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", &self.param_type)?;
        map.serialize_entry("error", &self.kind.to_string())?;
        match self.kind {
            FailureKind::AboveMax { max } => map.serialize_entry("max", &Bound(max))?,
            FailureKind::BelowMin { min } => map.serialize_entry("min", &Bound(min))?,
            FailureKind::NotSet | FailureKind::Rejected(_) => {}
        }
        map.end()
    }
}

struct Bound(f64);

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_number(self.0, serializer)
    }
}

/// All failures of one request, keyed by parameter name.
///
/// Every failing parameter is reported; verification never stops at the
/// first bad parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Error)]
#[serde(transparent)]
#[error("{}", summarize(.0))]
pub struct ParamErrors(BTreeMap<String, ParamFailure>);

impl ParamErrors {
    /// Creates an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure, keeping the first one recorded for `name`.
    pub fn record(&mut self, name: impl Into<String>, failure: ParamFailure) {
        self.0.entry(name.into()).or_insert(failure);
    }

    /// Returns the failure recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&ParamFailure> {
        self.0.get(name)
    }

    /// Returns `true` if `name` failed.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Returns `true` if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates failures in parameter-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamFailure)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// `name: reason` pairs in name order, comma separated.
fn summarize(failures: &BTreeMap<String, ParamFailure>) -> String {
    failures
        .iter()
        .map(|(name, failure)| format!("{}: {}", name, failure.kind))
        .collect::<Vec<_>>()
        .join(", ")
}
