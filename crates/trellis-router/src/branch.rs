//! Immutable route builder.
//!
//! A [`Branch`] accumulates route records ([`Petal`]s) together with a
//! transform chain. Every builder call returns a *new* branch; the
//! previous value is never mutated, so any branch can be kept, reused
//! or merged into several places without surprises.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Response, StatusCode};
//! use trellis_router::{Branch, HandlerArg};
//! use serde_json::json;
//!
//! let branch = Branch::<()>::init()
//!     .get("/ping", |_arg: HandlerArg<()>| async {
//!         Ok(Response::json_value(StatusCode::OK, &json!({"message": "pong"})))
//!     });
//! let router = branch.finalize();
//! assert!(router.match_route(trellis_core::Method::Get, "/ping").is_some());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use trellis_core::{BoxFuture, Cookies, Method, PetalResult, Request, Response, RouteSchemas};

use crate::chain::{Chain, Transform};
use crate::trie::Router;

/// Everything a handler receives for one request.
pub struct HandlerArg<S> {
    /// The request (body already consumed by the dispatcher).
    pub req: Arc<Request>,
    /// The seed after the route's transform chain ran.
    pub seed: S,
    /// Path parameters: a flat string map, or whatever the params
    /// schema produced from it.
    pub params: Value,
    /// Query parameters, same convention as `params`.
    pub query: Value,
    /// Decoded JSON body. `Null` when absent and always `Null` for GET.
    pub body: Value,
    /// The request's cookie store.
    pub cookies: Arc<Cookies>,
}

/// A request handler attached to one route.
///
/// Implemented for async closures taking a [`HandlerArg`].
pub trait PetalHandler<S>: Send + Sync {
    /// Produce the response for one matched request.
    fn call(&self, arg: HandlerArg<S>) -> BoxFuture<'static, PetalResult<Response>>;
}

impl<S, F, Fut> PetalHandler<S> for F
where
    F: Fn(HandlerArg<S>) -> Fut + Send + Sync,
    Fut: Future<Output = PetalResult<Response>> + Send + 'static,
{
    fn call(&self, arg: HandlerArg<S>) -> BoxFuture<'static, PetalResult<Response>> {
        Box::pin(self(arg))
    }
}

/// A compiled route record.
///
/// Captures the method, the path template, the transform chain as it
/// was when the route was registered, optional schemas and the
/// handler. Immutable once created; merging copies it under a new
/// path but never rewrites its chain.
pub struct Petal<S> {
    method: Method,
    path: String,
    chain: Chain<S>,
    schemas: RouteSchemas,
    handler: Arc<dyn PetalHandler<S>>,
}

impl<S> Petal<S> {
    /// The HTTP method this record answers.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The path template.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The transform chain captured at registration time.
    #[must_use]
    pub fn chain(&self) -> &Chain<S> {
        &self.chain
    }

    /// The optional schemas.
    #[must_use]
    pub fn schemas(&self) -> &RouteSchemas {
        &self.schemas
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &Arc<dyn PetalHandler<S>> {
        &self.handler
    }

    /// Copy of this record re-rooted under a path prefix.
    fn reroot(&self, prefix: &str) -> Self {
        let path = format!(
            "{}/{}",
            prefix.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        Self {
            method: self.method,
            path,
            chain: self.chain.clone(),
            schemas: self.schemas.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S> fmt::Debug for Petal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Petal")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("chain", &self.chain)
            .finish()
    }
}

/// Immutable route builder: a petal set plus a transform chain.
pub struct Branch<S> {
    petals: Vec<Arc<Petal<S>>>,
    chain: Chain<S>,
}

impl<S> Branch<S> {
    /// An empty branch whose transform chain is the identity.
    #[must_use]
    pub fn init() -> Self {
        Self {
            petals: Vec::new(),
            chain: Chain::identity(),
        }
    }

    /// Return a branch whose chain additionally runs `transform` after
    /// the existing stages.
    ///
    /// Routes registered *before* this call keep the shorter chain:
    /// a petal captures the chain at its own registration time.
    #[must_use]
    pub fn with<T: Transform<S> + 'static>(&self, transform: T) -> Self {
        Self {
            petals: self.petals.clone(),
            chain: self.chain.push(transform),
        }
    }

    /// Register a GET route.
    #[must_use]
    pub fn get<H>(&self, path: impl Into<String>, handler: H) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        self.petal(Method::Get, path, handler, RouteSchemas::new())
    }

    /// Register a POST route.
    #[must_use]
    pub fn post<H>(&self, path: impl Into<String>, handler: H) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        self.petal(Method::Post, path, handler, RouteSchemas::new())
    }

    /// Register a PUT route.
    #[must_use]
    pub fn put<H>(&self, path: impl Into<String>, handler: H) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        self.petal(Method::Put, path, handler, RouteSchemas::new())
    }

    /// Register a PATCH route.
    #[must_use]
    pub fn patch<H>(&self, path: impl Into<String>, handler: H) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        self.petal(Method::Patch, path, handler, RouteSchemas::new())
    }

    /// Register a DELETE route.
    #[must_use]
    pub fn delete<H>(&self, path: impl Into<String>, handler: H) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        self.petal(Method::Delete, path, handler, RouteSchemas::new())
    }

    /// Register a route with explicit method and schemas.
    ///
    /// The petal captures the branch's *current* transform chain; a
    /// later [`Branch::with`] call does not reach back into it.
    #[must_use]
    pub fn petal<H>(
        &self,
        method: Method,
        path: impl Into<String>,
        handler: H,
        schemas: RouteSchemas,
    ) -> Self
    where
        H: PetalHandler<S> + 'static,
    {
        let petal = Petal {
            method,
            path: path.into(),
            chain: self.chain.clone(),
            schemas,
            handler: Arc::new(handler),
        };
        let mut petals = self.petals.clone();
        petals.push(Arc::new(petal));
        Self {
            petals,
            chain: self.chain.clone(),
        }
    }

    /// Graft another branch's routes under a path prefix.
    ///
    /// Every petal of `other` is copied with `prefix` prepended to its
    /// template, keeping its own transform chain and schemas — a
    /// merged route never picks up the chain of the branch it lands
    /// in. The copies are appended after this branch's petals, so on a
    /// duplicate path the usual last-registration-wins rule applies in
    /// insertion order.
    #[must_use]
    pub fn merge(&self, prefix: &str, other: &Branch<S>) -> Self {
        let mut petals = self.petals.clone();
        for petal in &other.petals {
            petals.push(Arc::new(petal.reroot(prefix)));
        }
        Self {
            petals,
            chain: self.chain.clone(),
        }
    }

    /// Compile the current petal set into an immutable [`Router`].
    ///
    /// The router is a snapshot: building further on this branch
    /// afterwards cannot affect it. Intended to be called once, with
    /// the result cached for the life of the process.
    #[must_use]
    pub fn finalize(&self) -> Router<S> {
        Router::build(&self.petals)
    }

    /// Number of registered petals.
    #[must_use]
    pub fn petal_count(&self) -> usize {
        self.petals.len()
    }

    /// Whether no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.petals.is_empty()
    }
}

impl<S> Clone for Branch<S> {
    fn clone(&self) -> Self {
        Self {
            petals: self.petals.clone(),
            chain: self.chain.clone(),
        }
    }
}

impl<S> Default for Branch<S> {
    fn default() -> Self {
        Self::init()
    }
}

impl<S> fmt::Debug for Branch<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("petals", &self.petals.len())
            .field("chain", &self.chain)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::StatusCode;

    fn plug(_arg: HandlerArg<u32>) -> BoxFuture<'static, PetalResult<Response>> {
        Box::pin(async { Ok(Response::empty(StatusCode::NO_CONTENT)) })
    }

    struct Plug;

    impl PetalHandler<u32> for Plug {
        fn call(&self, arg: HandlerArg<u32>) -> BoxFuture<'static, PetalResult<Response>> {
            plug(arg)
        }
    }

    #[test]
    fn builder_calls_leave_the_source_untouched() {
        let base = Branch::<u32>::init();
        let grown = base.get("/a", Plug).post("/b", Plug);

        assert!(base.is_empty());
        assert_eq!(grown.petal_count(), 2);
    }

    #[test]
    fn petal_captures_chain_at_registration_time() {
        let branch = Branch::<u32>::init()
            .get("/early", Plug)
            .with(|seed: u32| async move { Ok(seed + 1) })
            .get("/late", Plug);

        let router = branch.finalize();
        let early = router
            .match_route(Method::Get, "/early")
            .expect("route registered");
        assert_eq!(early.petal.chain().len(), 0);

        let late = router
            .match_route(Method::Get, "/late")
            .expect("route registered");
        assert_eq!(late.petal.chain().len(), 1);
    }

    #[test]
    fn merge_keeps_the_source_chain() {
        let sub = Branch::<u32>::init()
            .with(|seed: u32| async move { Ok(seed * 2) })
            .get("/inner", Plug);
        let root = Branch::<u32>::init()
            .with(|seed: u32| async move { Ok(seed + 100) })
            .merge("/sub", &sub);

        let router = root.finalize();
        let matched = router
            .match_route(Method::Get, "/sub/inner")
            .expect("merged route reachable");
        // One stage: the sub branch's own doubling, not the root's.
        assert_eq!(matched.petal.chain().len(), 1);
        assert_eq!(matched.petal.path(), "/sub/inner");
    }

    #[test]
    fn merge_normalizes_prefix_joins() {
        let sub = Branch::<u32>::init().get("/", Plug);
        let root = Branch::<u32>::init().merge("/next", &sub);
        let router = root.finalize();
        assert!(router.match_route(Method::Get, "/next").is_some());
        assert!(router.match_route(Method::Get, "/next/").is_some());
        assert!(router.match_route(Method::Get, "/").is_none());
    }

    #[test]
    fn schemas_ride_along_with_the_petal() {
        let branch = Branch::<u32>::init().petal(
            Method::Post,
            "/items",
            Plug,
            RouteSchemas::new().body(trellis_core::schema_fn(|v: Value| Ok(v))),
        );
        let router = branch.finalize();
        let matched = router
            .match_route(Method::Post, "/items")
            .expect("route registered");
        assert!(matched.petal.schemas().body_schema().is_some());
    }
}
