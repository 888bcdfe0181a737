//! Example handlers demonstrating the verification layer end to end.
//!
//! [`RouteList`] is a minimal host dispatch layer: exact method + path
//! matching, guard first, then handlers in order. It exists for
//! documentation and testing; real deployments implement
//! [`RouteTable`](crate::RouteTable) for their framework's router.

use serde_json::json;

use crate::callback::{Response, Verdict};
use crate::config::{EndpointDecl, RouterConfig};
use crate::error::CompileError;
use crate::param::ParamObject;
use crate::router::{Registration, RouteTable, Router};
use crate::value::Value;

use super::{Guard, ParamRequest, RequestAdapter};

/// Handler type used by [`RouteList`].
///
/// Returning [`Verdict::Continue`] passes the request to the next handler.
pub type Handler = Box<dyn Fn(&RequestAdapter) -> Verdict + Send + Sync>;

/// Boxes a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&RequestAdapter) -> Verdict + Send + Sync + 'static,
{
    Box::new(f)
}

struct Route {
    method: String,
    path: String,
    guard: Option<Guard>,
    handlers: Vec<Handler>,
}

/// In-memory route table with exact-match dispatch.
#[derive(Default)]
pub struct RouteList {
    routes: Vec<Route>,
}

impl RouteList {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns `true` if the route at `index` has a guard.
    pub fn is_guarded(&self, index: usize) -> bool {
        self.routes.get(index).is_some_and(|r| r.guard.is_some())
    }

    /// Dispatches a request to the first route matching its method and path.
    ///
    /// Returns `None` if no route matches or every handler continued.
    pub fn dispatch(&self, req: &mut RequestAdapter) -> Option<Response> {
        let route = self
            .routes
            .iter()
            .find(|r| r.method.eq_ignore_ascii_case(req.method()) && r.path == req.route_path())?;

        if let Some(guard) = &route.guard {
            if let Verdict::Respond(response) = guard.check(req) {
                return Some(response);
            }
        }

        route.handlers.iter().find_map(|h| match h(req) {
            Verdict::Respond(response) => Some(response),
            Verdict::Continue => None,
        })
    }
}

impl RouteTable for RouteList {
    type Handler = Handler;
    type Output = usize;

    /// Returns the index of the new route.
    fn add_route(
        &mut self,
        method: &str,
        path: &str,
        guard: Option<Guard>,
        handlers: Vec<Handler>,
    ) -> usize {
        self.routes.push(Route {
            method: method.to_string(),
            path: path.to_string(),
            guard,
            handlers,
        });
        self.routes.len() - 1
    }
}

/// Declaration of the example search endpoint.
pub fn search_endpoint() -> EndpointDecl {
    EndpointDecl::new()
        .description("Full-text search")
        .param("q", ParamObject::new("string").min(1.0).max(200.0))
        .param("page", "integer(1)")
        .param("tags", "string[]()")
        .param("exact", "bool(false)")
}

/// Responds with the filled search parameters.
///
/// # Examples
///
/// ```
/// use param_gate::web::example_handler::demo_router;
/// use param_gate::web::RequestAdapter;
/// use param_gate::RouterConfig;
///
/// let router = demo_router(RouterConfig::new()).unwrap();
///
/// let mut req = RequestAdapter::new("GET", "/search");
/// req.add_query_param("q", "rust");
/// let response = router.table().dispatch(&mut req).unwrap();
///
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body.unwrap()["page"], 1);
/// ```
pub fn handle_search(req: &RequestAdapter) -> Verdict {
    let Some(args) = req.attached("args") else {
        return Verdict::Respond(Response::empty(500));
    };
    Verdict::Respond(Response::json(
        200,
        json!({
            "q": args.get("q"),
            "page": args.get("page"),
            "tags": args.get("tags").cloned().unwrap_or(Value::List(Vec::new())),
            "exact": args.get("exact"),
        }),
    ))
}

/// Echoes every attached parameter, declared or not.
pub fn handle_echo(req: &RequestAdapter) -> Verdict {
    match req.attached("args") {
        Some(args) => Verdict::Respond(Response::json(200, json!(args))),
        None => Verdict::Respond(Response::empty(500)),
    }
}

/// A router with the example endpoints registered:
///
/// - `GET /search`: guarded by [`search_endpoint`], answered by [`handle_search`]
/// - `POST /echo`: requires a numeric `id`, answered by [`handle_echo`]
/// - `GET /health`: unguarded
///
/// # Errors
///
/// Propagates [`CompileError`] from registration.
pub fn demo_router(config: RouterConfig) -> Result<Router<RouteList>, CompileError> {
    let mut router = Router::new(config, RouteList::new());
    router.get(
        "/search",
        Registration::with_schema(search_endpoint(), [handler(handle_search)]),
    )?;
    router.post(
        "/echo",
        Registration::with_schema(
            EndpointDecl::new().param("id", "number"),
            [handler(handle_echo)],
        ),
    )?;
    router.get(
        "/health",
        Registration::handler(handler(|_| Verdict::Respond(Response::empty(204)))),
    )?;
    Ok(router)
}
