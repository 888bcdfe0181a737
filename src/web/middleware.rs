//! The pre-handler hook installed in front of configured routes.
//!
//! # Integration Flow
//!
//! ```text
//! Router::register(method, path, WithSchema(decl, handlers))
//!   ↓  compile once
//! Guard { Arc<EndpointConfig>, Diagnostics }
//!   ↓  host dispatch layer, per request
//! guard.check(&mut request)
//!   ↓
//! Verdict::Continue  → run the route handlers
//! Verdict::Respond   → send the response, skip the handlers
//! ```

use std::sync::Arc;

use crate::callback::Verdict;
use crate::config::{Diagnostics, EndpointConfig};
use crate::verifier;

use super::ParamRequest;

/// Verifies requests for one endpoint before its handlers run.
///
/// A guard is cheap to clone and shares its compiled configuration, so the
/// host can hand one copy to every worker.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use param_gate::web::{Guard, RequestAdapter};
/// use param_gate::{merge_endpoint_config, Diagnostics, EndpointDecl, RouterConfig};
///
/// let config = merge_endpoint_config(
///     &RouterConfig::new(),
///     EndpointDecl::new().param("id", "number"),
/// )
/// .unwrap();
/// let guard = Guard::new(Arc::new(config), Diagnostics::Disabled);
///
/// let mut req = RequestAdapter::new("GET", "/items/:id");
/// req.add_path_param("id", "7");
/// assert!(guard.check(&mut req).is_continue());
///
/// let mut bad = RequestAdapter::new("GET", "/items/:id");
/// assert_eq!(guard.check(&mut bad).response().unwrap().status, 422);
/// ```
#[derive(Debug, Clone)]
pub struct Guard {
    endpoint: Arc<EndpointConfig>,
    diagnostics: Diagnostics,
}

impl Guard {
    /// Creates a guard for a compiled endpoint.
    pub fn new(endpoint: Arc<EndpointConfig>, diagnostics: Diagnostics) -> Self {
        Self {
            endpoint,
            diagnostics,
        }
    }

    /// Returns the endpoint configuration this guard enforces.
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Returns the failure body mode.
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Verifies one request.
    ///
    /// Exactly one outcome per request: the error handler ran, the fixed 422
    /// response was produced, the success handler ran, or the chain continues
    /// with the filled parameters attached.
    pub fn check<R: ParamRequest>(&self, req: &mut R) -> Verdict {
        verifier::run(&self.endpoint, req, self.diagnostics)
    }
}
