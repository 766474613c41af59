//! External validator capability.
//!
//! The core has no opinion on how validation works; it only needs a
//! `parse` that either produces the value to hand the handler or
//! fails. Any validation library can be adapted through [`schema_fn`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::BoxError;

/// A value parser applied to route data before the handler runs.
///
/// Implementations receive the raw value (a flat string map for path
/// and query parameters, the decoded JSON body otherwise) and return
/// the value the handler should see instead.
pub trait Schema: Send + Sync {
    /// Parse the raw value, producing the replacement value.
    ///
    /// # Errors
    ///
    /// Any error aborts the request and is routed through the
    /// dispatcher's error hook.
    fn parse(&self, value: Value) -> Result<Value, BoxError>;
}

/// Adapter turning a closure into a [`Schema`].
pub struct SchemaFn<F>(F);

impl<F> Schema for SchemaFn<F>
where
    F: Fn(Value) -> Result<Value, BoxError> + Send + Sync,
{
    fn parse(&self, value: Value) -> Result<Value, BoxError> {
        (self.0)(value)
    }
}

/// Wrap a closure as a [`Schema`].
///
/// # Example
///
/// ```
/// use trellis_core::schema_fn;
/// use serde_json::{json, Value};
///
/// let identity = schema_fn(|value: Value| Ok(value));
/// # use trellis_core::Schema;
/// assert_eq!(identity.parse(json!({"a": 1})).unwrap(), json!({"a": 1}));
/// ```
pub fn schema_fn<F>(f: F) -> SchemaFn<F>
where
    F: Fn(Value) -> Result<Value, BoxError> + Send + Sync,
{
    SchemaFn(f)
}

/// Optional per-route schemas for body, path params and query params.
#[derive(Clone, Default)]
pub struct RouteSchemas {
    body: Option<Arc<dyn Schema>>,
    params: Option<Arc<dyn Schema>>,
    query: Option<Arc<dyn Schema>>,
}

impl RouteSchemas {
    /// No schemas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the body schema.
    #[must_use]
    pub fn body(mut self, schema: impl Schema + 'static) -> Self {
        self.body = Some(Arc::new(schema));
        self
    }

    /// Set the path-parameters schema.
    #[must_use]
    pub fn params(mut self, schema: impl Schema + 'static) -> Self {
        self.params = Some(Arc::new(schema));
        self
    }

    /// Set the query-parameters schema.
    #[must_use]
    pub fn query(mut self, schema: impl Schema + 'static) -> Self {
        self.query = Some(Arc::new(schema));
        self
    }

    /// The body schema, if configured.
    #[must_use]
    pub fn body_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.body.as_ref()
    }

    /// The path-parameters schema, if configured.
    #[must_use]
    pub fn params_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.params.as_ref()
    }

    /// The query-parameters schema, if configured.
    #[must_use]
    pub fn query_schema(&self) -> Option<&Arc<dyn Schema>> {
        self.query.as_ref()
    }
}

impl fmt::Debug for RouteSchemas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteSchemas")
            .field("body", &self.body.is_some())
            .field("params", &self.params.is_some())
            .field("query", &self.query.is_some())
            .finish()
    }
}
