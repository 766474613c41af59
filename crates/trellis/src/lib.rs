//! Request-routing and dispatch core for JSON HTTP services.
//!
//! trellis matches an incoming `(method, path)` pair to exactly one
//! handler, extracts path/query/body data, runs a chain of
//! context-producing transforms to build a per-request seed, invokes
//! the handler and normalizes both success and failure into a
//! response. Transports stay outside: the dispatcher consumes an
//! abstract [`Request`] and produces an abstract [`Response`].
//!
//! # Quick Start
//!
//! ```
//! use serde_json::json;
//! use trellis::prelude::*;
//!
//! #[derive(Clone)]
//! struct Seed {
//!     requests_seen: u32,
//! }
//!
//! let branch = Branch::<Seed>::init()
//!     .with(|mut seed: Seed| async move {
//!         seed.requests_seen += 1;
//!         Ok(seed)
//!     })
//!     .get("/count", |arg: HandlerArg<Seed>| async move {
//!         Ok(Response::json_value(
//!             StatusCode::OK,
//!             &json!({"seen": arg.seed.requests_seen}),
//!         ))
//!     });
//!
//! let app = App::new(&branch, |_req, _cookies| async {
//!     Ok(Seed { requests_seen: 0 })
//! });
//! let client = Client::new(app);
//!
//! let response = futures::executor::block_on(client.get("/count").send());
//! assert_eq!(response.json_value(), Some(json!({"seen": 1})));
//! ```
//!
//! # Crate Structure
//!
//! - [`trellis_core`] — request/response, error, cookie and schema types
//! - [`trellis_router`] — path trie, route builder, transform chain
//! - this crate — the dispatcher ([`App`]) and in-process [`Client`]

#![forbid(unsafe_code)]

mod client;
mod server;

pub use client::{Client, ClientResponse, CookieJar, RequestBuilder};
pub use server::{App, HookArg, RequestLog};

// Re-export the core and router surface at the crate root.
pub use trellis_core::{
    schema_fn, Body, BoxError, BoxFuture, Cookie, CookieError, Cookies, ErrorSignal, Headers,
    Method, PetalError, PetalResult, Request, Response, ResponseBody, RouteSchemas, SameSite,
    Schema, SchemaFn, StatusCode,
};
pub use trellis_router::{
    parse_template, split_path, Branch, Chain, HandlerArg, Petal, PetalHandler, RouteMatch,
    Router, Segment, Transform,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        App, Branch, Chain, Client, Cookie, Cookies, ErrorSignal, HandlerArg, Method, PetalError,
        PetalResult, Request, Response, RouteSchemas, SameSite, Schema, StatusCode,
    };
    pub use trellis_core::schema_fn;
}
