//! Path trie and matcher.
//!
//! Nodes live in an arena indexed by integer id rather than a pointer
//! graph, which keeps lookups cache-friendly and sidesteps ownership
//! cycles. Each node owns:
//!
//! - a map from literal segment to child node,
//! - at most one parameter child (all `:name` placeholders at the same
//!   position share it),
//! - a map from method to the compiled route terminating here,
//! - a map from method to the parameter name bound at this node — the
//!   same trie position may legitimately bind different names for
//!   different methods.
//!
//! Construction replays registrations in insertion order: a later
//! registration of the same (method, resolved node) overwrites both
//! the route slot and the parameter name. Last registration wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::Method;

use crate::branch::Petal;
use crate::path::{parse_template, split_path, Segment};

type NodeId = usize;

#[derive(Default)]
struct Node {
    literals: HashMap<String, NodeId>,
    parameter: Option<NodeId>,
    routes: HashMap<Method, usize>,
    param_names: HashMap<Method, String>,
}

/// A matched route with its extracted path parameters.
pub struct RouteMatch<'a, S> {
    /// The matched route record.
    pub petal: &'a Petal<S>,
    /// Extracted parameters in path order.
    pub params: Vec<(String, String)>,
}

impl<S> RouteMatch<'_, S> {
    /// Look up a parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Compiled, immutable route set.
///
/// Built once by `Branch::finalize` and shared read-only for the life
/// of the process; matching never mutates, so no locks are needed for
/// concurrent requests.
pub struct Router<S> {
    nodes: Vec<Node>,
    petals: Vec<Arc<Petal<S>>>,
}

impl<S> Router<S> {
    pub(crate) fn build(petals: &[Arc<Petal<S>>]) -> Self {
        let mut router = Self {
            nodes: vec![Node::default()],
            petals: Vec::with_capacity(petals.len()),
        };
        for petal in petals {
            let index = router.petals.len();
            router.petals.push(Arc::clone(petal));
            router.insert(petal.method(), petal.path(), index);
        }
        router
    }

    fn insert(&mut self, method: Method, template: &str, petal_index: usize) {
        let mut node = 0;
        for segment in parse_template(template) {
            node = match segment {
                Segment::Literal(literal) => match self.nodes[node].literals.get(&literal) {
                    Some(&child) => child,
                    None => {
                        let child = self.alloc();
                        self.nodes[node].literals.insert(literal, child);
                        child
                    }
                },
                Segment::Parameter(name) => {
                    let child = match self.nodes[node].parameter {
                        Some(child) => child,
                        None => {
                            let child = self.alloc();
                            self.nodes[node].parameter = Some(child);
                            child
                        }
                    };
                    self.nodes[child].param_names.insert(method, name);
                    child
                }
            };
        }
        self.nodes[node].routes.insert(method, petal_index);
    }

    fn alloc(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        self.nodes.len() - 1
    }

    /// Match a (method, path) pair against the compiled routes.
    ///
    /// Walks one segment at a time: a literal child always wins over
    /// the parameter child at the same node; a parameter child binds
    /// the segment under the name registered for the requested method
    /// at that child. Segment counts must match exactly — there is no
    /// prefix or trailing-wildcard matching. A path whose shape
    /// matches but whose method has no route here is a plain miss;
    /// distinguishing 404 from 405 is the caller's business.
    #[must_use]
    pub fn match_route(&self, method: Method, path: &str) -> Option<RouteMatch<'_, S>> {
        let mut node = 0;
        let mut params = Vec::new();
        for segment in split_path(path) {
            if let Some(&child) = self.nodes[node].literals.get(segment) {
                node = child;
                continue;
            }
            let child = self.nodes[node].parameter?;
            if let Some(name) = self.nodes[child].param_names.get(&method) {
                params.push((name.clone(), segment.to_string()));
            }
            node = child;
        }
        let &index = self.nodes[node].routes.get(&method)?;
        Some(RouteMatch {
            petal: &self.petals[index],
            params,
        })
    }

    /// Number of compiled route records.
    #[must_use]
    pub fn petal_count(&self) -> usize {
        self.petals.len()
    }

    /// Whether no routes were compiled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.petals.is_empty()
    }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("nodes", &self.nodes.len())
            .field("petals", &self.petals.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::{Branch, HandlerArg};
    use proptest::prelude::*;
    use trellis_core::{BoxFuture, PetalResult, Response, StatusCode};

    fn plug(_arg: HandlerArg<()>) -> BoxFuture<'static, PetalResult<Response>> {
        Box::pin(async { Ok(Response::empty(StatusCode::NO_CONTENT)) })
    }

    struct Plug;

    impl crate::branch::PetalHandler<()> for Plug {
        fn call(&self, arg: HandlerArg<()>) -> BoxFuture<'static, PetalResult<Response>> {
            plug(arg)
        }
    }

    fn router(build: impl Fn(Branch<()>) -> Branch<()>) -> Router<()> {
        build(Branch::init()).finalize()
    }

    #[test]
    fn literal_match_has_empty_params() {
        let router = router(|b| b.get("/", Plug).post("/abc", Plug));

        let root = router.match_route(Method::Get, "/").expect("root matches");
        assert!(root.params.is_empty());

        assert!(router.match_route(Method::Get, "/abc").is_none());
        let abc = router
            .match_route(Method::Post, "/abc")
            .expect("POST /abc matches");
        assert!(abc.params.is_empty());
    }

    #[test]
    fn parameters_bind_in_path_order() {
        let router = router(|b| b.get("/:abc", Plug).post("/a/:foo/b/:bar/c", Plug));

        assert!(router.match_route(Method::Get, "/").is_none());

        let one = router.match_route(Method::Get, "/def").expect("matches");
        assert_eq!(one.params, vec![("abc".to_string(), "def".to_string())]);

        for missing in ["/a", "/a/abc", "/a/abc/b", "/a/abc/b/def"] {
            assert!(router.match_route(Method::Post, missing).is_none());
        }

        let two = router
            .match_route(Method::Post, "/a/abc/b/def/c")
            .expect("matches");
        assert_eq!(two.param("foo"), Some("abc"));
        assert_eq!(two.param("bar"), Some("def"));

        assert!(router.match_route(Method::Get, "/a/abc/b/def/c").is_none());
        assert!(router
            .match_route(Method::Post, "/a/abc/b/def/c/ghi")
            .is_none());
    }

    #[test]
    fn literal_child_beats_parameter_child() {
        let router = router(|b| b.get("/:id", Plug).get("/static", Plug));

        let literal = router
            .match_route(Method::Get, "/static")
            .expect("literal route matches");
        assert!(literal.params.is_empty());

        let param = router
            .match_route(Method::Get, "/other")
            .expect("parameter route matches");
        assert_eq!(param.param("id"), Some("other"));
    }

    #[test]
    fn last_registration_wins_params_and_route() {
        let router = router(|b| b.get("/:one/:two", Plug).get("/:three/:four", Plug));

        let matched = router
            .match_route(Method::Get, "/foo/bar")
            .expect("matches");
        assert_eq!(
            matched.params,
            vec![
                ("three".to_string(), "foo".to_string()),
                ("four".to_string(), "bar".to_string()),
            ]
        );
    }

    #[test]
    fn parameter_names_are_tracked_per_method() {
        let router = router(|b| b.get("/:one/:two", Plug).post("/:three/:four", Plug));

        let get = router
            .match_route(Method::Get, "/abc/def")
            .expect("GET matches");
        assert_eq!(get.param("one"), Some("abc"));
        assert_eq!(get.param("two"), Some("def"));

        let post = router
            .match_route(Method::Post, "/hij/klm")
            .expect("POST matches");
        assert_eq!(post.param("three"), Some("hij"));
        assert_eq!(post.param("four"), Some("klm"));
    }

    #[test]
    fn method_mismatch_is_a_plain_miss() {
        let router = router(|b| b.get("/users", Plug));
        assert!(router.match_route(Method::Delete, "/users").is_none());
    }

    #[test]
    fn exact_segment_count_is_required() {
        let router = router(|b| b.get("/a/b", Plug));
        assert!(router.match_route(Method::Get, "/a").is_none());
        assert!(router.match_route(Method::Get, "/a/b/c").is_none());
        // Slash noise in the request path is normalized away.
        assert!(router.match_route(Method::Get, "//a//b/").is_some());
    }

    #[test]
    fn empty_router_matches_nothing() {
        let router = Branch::<()>::init().finalize();
        assert!(router.is_empty());
        assert!(router.match_route(Method::Get, "/").is_none());
    }

    proptest! {
        // For a template of k parameter segments, a concrete path with
        // k segments binds exactly those k name→value pairs.
        #[test]
        fn k_parameters_bind_exactly(
            values in proptest::collection::vec("[a-zA-Z0-9_.-]{1,12}", 1..5)
        ) {
            let template: String = (0..values.len())
                .map(|i| format!("/:p{i}"))
                .collect();
            let path: String = values.iter().map(|v| format!("/{v}")).collect();

            let compiled = Branch::<()>::init().get(template, Plug).finalize();
            let matched = compiled
                .match_route(Method::Get, &path)
                .expect("shape matches");

            prop_assert_eq!(matched.params.len(), values.len());
            for (i, value) in values.iter().enumerate() {
                prop_assert_eq!(matched.param(&format!("p{i}")), Some(value.as_str()));
            }
        }
    }
}
