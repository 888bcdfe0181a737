//! Endpoint registration and the per-router context.
//!
//! A [`Router`] wraps the host's route table. Each registration either passes
//! straight through ([`Registration::HandlerOnly`]) or compiles the endpoint
//! declaration, records it in the endpoint map and installs a [`Guard`] in
//! front of the caller's handlers ([`Registration::WithSchema`]).
//!
//! Registration happens during single-threaded setup; afterwards the
//! endpoint map is only read.

use std::sync::Arc;

use crate::api_map::{join_path, ApiMap, EndpointMap};
use crate::callback::{Response, Verdict};
use crate::config::{merge_endpoint_config, EndpointConfig, EndpointDecl, RouterConfig};
use crate::error::CompileError;
use crate::logging::VerifyLog;
use crate::verifier;
use crate::web::{Guard, ParamRequest};

/// Methods a router accepts, lower-case.
pub const METHODS: [&str; 26] = [
    "get", "post", "put", "head", "delete", "options", "trace", "copy", "lock", "mkcol", "move",
    "purge", "propfind", "proppatch", "unlock", "report", "mkactivity", "checkout", "merge",
    "m-search", "notify", "subscribe", "unsubscribe", "patch", "search", "connect",
];

/// The host dispatch layer: whatever maps (method, path) to handlers.
///
/// Path matching, middleware chaining and handler invocation stay on the host
/// side. The router only hands over the optional [`Guard`] that must run
/// before `handlers`.
pub trait RouteTable {
    /// The host's handler type.
    type Handler;
    /// What the host returns from a route registration.
    type Output;

    /// Registers a route. `method` is upper-case.
    fn add_route(
        &mut self,
        method: &str,
        path: &str,
        guard: Option<Guard>,
        handlers: Vec<Self::Handler>,
    ) -> Self::Output;
}

/// What a caller registers for one route.
pub enum Registration<H> {
    /// Plain handlers, no verification installed
    HandlerOnly(Vec<H>),
    /// Handlers guarded by a compiled endpoint declaration
    WithSchema(EndpointDecl, Vec<H>),
}

impl<H> Registration<H> {
    /// A single unguarded handler.
    pub fn handler(handler: H) -> Self {
        Registration::HandlerOnly(vec![handler])
    }

    /// Guarded handlers.
    pub fn with_schema(decl: EndpointDecl, handlers: impl IntoIterator<Item = H>) -> Self {
        Registration::WithSchema(decl, handlers.into_iter().collect())
    }
}

/// Context for one router: the host route table, the global configuration
/// and every compiled endpoint.
///
/// # Examples
///
/// ```
/// use param_gate::web::example_handler::{handler, RouteList};
/// use param_gate::web::RequestAdapter;
/// use param_gate::{EndpointDecl, Registration, Response, Router, RouterConfig, Verdict};
///
/// let mut router = Router::new(RouterConfig::new(), RouteList::new());
/// router
///     .get(
///         "/test",
///         Registration::with_schema(
///             EndpointDecl::new().param("var1", "number"),
///             [handler(|_| Verdict::Respond(Response::empty(200)))],
///         ),
///     )
///     .unwrap();
///
/// let mut req = RequestAdapter::new("GET", "/test");
/// req.add_query_param("var1", "25");
/// assert_eq!(router.table().dispatch(&mut req).unwrap().status, 200);
/// ```
pub struct Router<T: RouteTable> {
    table: T,
    config: RouterConfig,
    endpoints: EndpointMap,
}

impl<T: RouteTable> Router<T> {
    /// Creates a router over the host's route table.
    pub fn new(config: RouterConfig, table: T) -> Self {
        Self {
            table,
            config,
            endpoints: EndpointMap::new(),
        }
    }

    /// Registers a route.
    ///
    /// For [`Registration::WithSchema`] the declaration is compiled against
    /// the global configuration and stored under `prefix + path` and the
    /// upper-cased method; a repeated registration replaces the stored
    /// configuration.
    ///
    /// # Errors
    ///
    /// - [`CompileError::UnsupportedMethod`] if `method` is not in [`METHODS`]
    /// - any error raised while compiling the endpoint's parameters
    pub fn register(
        &mut self,
        method: &str,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        let method = normalize_method(method)?;
        let key = join_path(self.config.prefix.as_deref().unwrap_or(""), path);
        let log = VerifyLog::new(&method, &key);

        match registration {
            Registration::HandlerOnly(handlers) => {
                log.trace(format_args!("registered without parameter schema"));
                Ok(self.table.add_route(&method, path, None, handlers))
            }
            Registration::WithSchema(decl, handlers) => {
                let endpoint = Arc::new(merge_endpoint_config(&self.config, decl)?);
                log.debug(format_args!(
                    "compiled endpoint with {} parameter(s)",
                    endpoint.params.len()
                ));

                self.endpoints
                    .entry(key.clone())
                    .or_default()
                    .insert(method.clone(), Arc::clone(&endpoint));

                let guard = Guard::new(endpoint, self.config.diagnostics);
                Ok(self.table.add_route(&method, path, Some(guard), handlers))
            }
        }
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn get(
        &mut self,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        self.register("get", path, registration)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn post(
        &mut self,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        self.register("post", path, registration)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn put(
        &mut self,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        self.register("put", path, registration)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn patch(
        &mut self,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        self.register("patch", path, registration)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// See [`Router::register`].
    pub fn delete(
        &mut self,
        path: &str,
        registration: Registration<T::Handler>,
    ) -> Result<T::Output, CompileError> {
        self.register("delete", path, registration)
    }

    /// Every compiled endpoint, keyed by `prefix + path` then method.
    pub fn endpoints(&self) -> &EndpointMap {
        &self.endpoints
    }

    /// Looks up a compiled endpoint by its key and method (any case).
    pub fn endpoint(&self, path: &str, method: &str) -> Option<&Arc<EndpointConfig>> {
        self.endpoints
            .get(path)?
            .get(method.to_ascii_uppercase().as_str())
    }

    /// Verifies a request against the endpoint registered for its route.
    ///
    /// For hosts that dispatch centrally instead of keeping per-route guards.
    /// Returns `None` when the route has no schema.
    pub fn verify_request<R: ParamRequest>(&self, req: &mut R) -> Option<Verdict> {
        let key = join_path(self.config.prefix.as_deref().unwrap_or(""), req.route_path());
        let endpoint = Arc::clone(self.endpoint(&key, req.method())?);
        Some(verifier::run(&endpoint, req, self.config.diagnostics))
    }

    /// Builds the introspection map.
    ///
    /// Keys use the configured prefix. Without a prefix, `mount` (the path
    /// this router is nested under in the host) is prepended instead.
    pub fn api_map(&self, mount: Option<&str>) -> ApiMap {
        let base = match self.config.prefix {
            Some(_) => "",
            None => mount.unwrap_or(""),
        };
        ApiMap::build(&self.endpoints, base)
    }

    /// The introspection map as a 200 JSON response.
    pub fn api_response(&self, mount: Option<&str>) -> Response {
        match self.api_map(mount).to_json() {
            Ok(body) => Response::json(200, body),
            Err(err) => {
                VerifyLog::new("GET", mount.unwrap_or("/"))
                    .warn(format_args!("failed to serialize api map: {}", err));
                Response::empty(500)
            }
        }
    }

    /// The global configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The host route table.
    pub fn table(&self) -> &T {
        &self.table
    }

    /// The host route table, mutably.
    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }

    /// Consumes the router, returning the host route table.
    pub fn into_table(self) -> T {
        self.table
    }
}

fn normalize_method(method: &str) -> Result<String, CompileError> {
    let lower = method.to_ascii_lowercase();
    if METHODS.contains(&lower.as_str()) {
        Ok(lower.to_ascii_uppercase())
    } else {
        Err(CompileError::UnsupportedMethod(method.to_string()))
    }
}
