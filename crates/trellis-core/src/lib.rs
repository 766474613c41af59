//! Core types for the trellis routing and dispatch core.
//!
//! This crate provides the fundamental building blocks shared by the
//! router and the dispatcher:
//!
//! - [`Request`] and [`Response`] — the abstract transport boundary
//! - [`ErrorSignal`] and [`PetalError`] — the error model
//! - [`Cookies`] — the per-request cookie collaborator
//! - [`Schema`] — the narrow external-validator capability
//!
//! # Design Principles
//!
//! - All types are `Send + Sync` friendly so requests can be handled
//!   concurrently without locks.
//! - The core never inspects caller-defined context values and never
//!   depends on a concrete validation library.
//! - Early responses are ordinary values ([`ErrorSignal`]), not panics.

#![forbid(unsafe_code)]

pub mod cookies;
pub mod error;
pub mod request;
pub mod response;
pub mod schema;

pub use cookies::{Cookie, CookieError, Cookies, SameSite};
pub use error::{BoxError, ErrorSignal, PetalError, PetalResult};
pub use request::{Body, Headers, Method, Request};
pub use response::{Response, ResponseBody, StatusCode};
pub use schema::{schema_fn, RouteSchemas, Schema, SchemaFn};

/// A boxed future used across trait objects in the transform chain,
/// handlers and lifecycle hooks.
pub type BoxFuture<'a, T> =
    std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
