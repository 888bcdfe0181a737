//! Callback handles and the per-request verdict.
//!
//! Callbacks are stored behind `Arc` so that one declaration can be
//! back-filled into many parameters and shared across concurrent requests.

use std::fmt;
use std::sync::Arc;

use crate::error::ParamErrors;
use crate::param::ParamSpec;
use crate::value::Value;
use crate::verifier::FilledParams;
use crate::web::ParamRequest;

/// HTTP status sent for every verification failure.
pub const FAILURE_STATUS: u16 = 422;

/// A response produced by the verification layer or a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// JSON body, `None` for an empty body
    pub body: Option<serde_json::Value>,
}

impl Response {
    /// Creates a response without a body.
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Creates a response with a JSON body.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            body: Some(body),
        }
    }
}

/// What the host dispatch layer should do after verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Run the next handler in the chain.
    Continue,
    /// Stop the chain and send this response.
    Respond(Response),
}

impl Verdict {
    /// Returns `true` for [`Verdict::Continue`].
    pub fn is_continue(&self) -> bool {
        matches!(self, Verdict::Continue)
    }

    /// Returns the response, if the chain was stopped.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Verdict::Respond(response) => Some(response),
            Verdict::Continue => None,
        }
    }
}

type ValidateFn = dyn Fn(&ParamSpec, Option<&Value>) -> Option<String> + Send + Sync;
type ErrorFn = dyn Fn(&ParamErrors, &mut dyn ParamRequest) -> Verdict + Send + Sync;
type SuccessFn = dyn Fn(&FilledParams, &mut dyn ParamRequest) -> Verdict + Send + Sync;

/// Custom validator replacing the built-in required/min/max checks.
///
/// Receives the parameter's compiled spec and its extracted value; returns an
/// error message, or `None` (or an empty string) when the value is fine.
///
/// # Examples
///
/// ```
/// use param_gate::Validator;
///
/// let lowercase = Validator::new(|_spec, value| match value.and_then(|v| v.as_str()) {
///     Some(s) if s.chars().any(char::is_uppercase) => Some("must be lowercase".to_string()),
///     _ => None,
/// });
/// # let _ = lowercase;
/// ```
#[derive(Clone)]
pub struct Validator(Arc<ValidateFn>);

impl Validator {
    /// Wraps a validation closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ParamSpec, Option<&Value>) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Runs the validator, mapping an empty message to success.
    pub fn call(&self, spec: &ParamSpec, value: Option<&Value>) -> Option<String> {
        (self.0)(spec, value).filter(|message| !message.is_empty())
    }
}

/// Handler invoked with the full error map instead of the fixed 422 response.
#[derive(Clone)]
pub struct ErrorHandler(Arc<ErrorFn>);

impl ErrorHandler {
    /// Wraps an error-handling closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ParamErrors, &mut dyn ParamRequest) -> Verdict + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the handler.
    pub fn call(&self, errors: &ParamErrors, req: &mut dyn ParamRequest) -> Verdict {
        (self.0)(errors, req)
    }
}

/// Handler invoked with the filled parameters instead of continuing the chain.
#[derive(Clone)]
pub struct SuccessHandler(Arc<SuccessFn>);

impl SuccessHandler {
    /// Wraps a success-handling closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&FilledParams, &mut dyn ParamRequest) -> Verdict + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invokes the handler.
    pub fn call(&self, params: &FilledParams, req: &mut dyn ParamRequest) -> Verdict {
        (self.0)(params, req)
    }
}

macro_rules! opaque_debug {
    ($($ty:ident),*) => {
        $(
            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(concat!(stringify!($ty), "(..)"))
                }
            }
        )*
    };
}

opaque_debug!(Validator, ErrorHandler, SuccessHandler);
