//! Trie-based routing for trellis.
//!
//! This crate owns the read side and the build side of routing:
//!
//! - [`Branch`] — the immutable route builder combining a petal set
//!   with a context transform chain
//! - [`Chain`] — the per-request seed transform chain
//! - [`Router`] — the compiled path trie produced by
//!   [`Branch::finalize`], matching `(method, path)` to a [`Petal`]
//!   and its extracted parameters
//!
//! # Features
//!
//! - Literal-over-parameter matching priority
//! - Parameter extraction (`/users/:id`) with per-method names
//! - Copy-on-write builder composition and branch merging

#![forbid(unsafe_code)]

mod branch;
mod chain;
mod path;
mod trie;

pub use branch::{Branch, HandlerArg, Petal, PetalHandler};
pub use chain::{Chain, Transform};
pub use path::{parse_template, split_path, Segment};
pub use trie::{RouteMatch, Router};
