//! Declarative request-parameter verification for HTTP routers.
//!
//! This crate lets an endpoint declare the parameters it expects and checks
//! every request against that declaration before the route handlers run:
//! - **Shorthand schemas**: `"number"`, `"string[](a,b)"`, `"bool(false)"`
//! - **Coercion**: raw strings become numbers, booleans or lists
//! - **Defaults**: optional parameters are filled before the handler sees them
//! - **Introspection**: a JSON map of every configured endpoint
//!
//! # Core Types
//!
//! - [`ParamSpec`]: A compiled parameter declaration
//! - [`EndpointConfig`]: An endpoint's parameters merged with router defaults
//! - [`Router`]: Registers routes on a host [`RouteTable`] and installs guards
//! - [`web::Guard`]: Verifies one request for one endpoint
//! - [`ParamErrors`]: Per-parameter failures of a rejected request
//!
//! # Examples
//!
//! ```
//! use param_gate::{compile, ParamType, Value};
//!
//! let spec = compile("integer[](1,2,3)").unwrap();
//! assert_eq!(spec.param_type, ParamType::Integer);
//! assert!(spec.array);
//! assert!(!spec.required);
//! assert_eq!(
//!     spec.default,
//!     Some(Value::List(vec![1.0.into(), 2.0.into(), 3.0.into()]))
//! );
//! ```
//!
//! Verifying a request directly:
//!
//! ```
//! use param_gate::web::RequestAdapter;
//! use param_gate::{merge_endpoint_config, verify, EndpointDecl, RouterConfig, Value};
//!
//! let endpoint = merge_endpoint_config(
//!     &RouterConfig::new(),
//!     EndpointDecl::new().param("age", "number").param("pet", "string(cat)"),
//! )
//! .unwrap();
//!
//! let mut req = RequestAdapter::new("POST", "/people");
//! req.add_body_param("age", "31");
//!
//! let params = verify(&endpoint, &req).unwrap();
//! assert_eq!(params["age"], Value::Number(31.0));
//! assert_eq!(params["pet"], Value::from("cat"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api_map;
mod callback;
mod config;
mod error;
pub mod grammar;
mod logging;
mod param;
mod router;
mod value;
mod verifier;
pub mod web;

#[cfg(test)]
mod test_utils;

pub use api_map::ApiMap;
pub use callback::{ErrorHandler, Response, SuccessHandler, Validator, Verdict, FAILURE_STATUS};
pub use config::{
    merge_endpoint_config, Diagnostics, EndpointConfig, EndpointDecl, RouterConfig,
    DEFAULT_PARAM_MAP, DEFAULT_PARAM_ORDER, DIAGNOSTICS_ENV_VAR,
};
pub use error::{CompileError, FailureKind, ParamErrors, ParamFailure};
pub use logging::VerifyLog;
pub use param::{compile, ParamDecl, ParamObject, ParamSpec};
pub use router::{Registration, RouteTable, Router, METHODS};
pub use value::{coerce, coerce_scalar, ParamType, RawValue, Value};
pub use verifier::{
    check, extract, failure_response, fill_params, verify, FilledParams, FAILURE_MESSAGE,
};
