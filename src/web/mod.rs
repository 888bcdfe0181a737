//! Web framework integration surface.
//!
//! This module is the boundary between an HTTP framework and the verifier.
//! It handles:
//! - Reading raw parameter values out of named request sources
//! - Attaching filled parameters back onto the request
//! - The per-route [`Guard`] that runs before route handlers
//!
//! # Design Principles
//!
//! 1. **No Framework Dependencies**: Nothing here names a concrete framework.
//!    Integrations implement [`SourceBag`] and [`ParamRequest`] for their own
//!    request types, or populate a [`RequestAdapter`].
//!
//! 2. **Sources by Name**: A request exposes bags such as `body`, `query`,
//!    `params` and `cookies`. Endpoint configuration decides the lookup order.
//!
//! 3. **Compile Once**: Guards hold an already compiled endpoint. No schema
//!    work happens per request.
//!
//! # Integration Model
//!
//! Framework-specific glue should:
//! 1. Implement [`RouteTable`](crate::RouteTable) so [`Router`](crate::Router)
//!    can install guarded routes
//! 2. Build a [`RequestAdapter`] (or implement [`ParamRequest`]) per request
//! 3. Call [`Guard::check`] before running the route handlers
//! 4. Read filled parameters from the configured slot (default `args`)
//!
//! # Example Flow
//!
//! ```
//! use param_gate::web::example_handler::{handler, RouteList};
//! use param_gate::web::RequestAdapter;
//! use param_gate::{EndpointDecl, Registration, Response, Router, RouterConfig, Verdict};
//!
//! let mut router = Router::new(RouterConfig::new(), RouteList::new());
//! router
//!     .get(
//!         "/users/:id",
//!         Registration::with_schema(
//!             EndpointDecl::new().param("id", "number").param("verbose", "bool(false)"),
//!             [handler(|req| {
//!                 let args = req.attached("args").unwrap();
//!                 assert_eq!(args["verbose"].as_bool(), Some(false));
//!                 Verdict::Respond(Response::empty(200))
//!             })],
//!         ),
//!     )
//!     .unwrap();
//!
//! let mut req = RequestAdapter::new("GET", "/users/:id");
//! req.add_path_param("id", "42");
//! assert_eq!(router.table().dispatch(&mut req).unwrap().status, 200);
//! ```

mod adapter;
pub mod example_handler;
mod extract;
mod middleware;

pub use adapter::{Bag, RequestAdapter};
pub use extract::{ParamRequest, RequestSources, SourceBag};
pub use middleware::Guard;
