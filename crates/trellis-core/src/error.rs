//! Error model.
//!
//! Two kinds of failure can surface while a request is being served:
//!
//! - [`ErrorSignal`] — an *already decided* response raised from deep
//!   inside a transform chain or handler to abort normal flow. It is
//!   not a fault; it renders verbatim and always takes precedence over
//!   any configured error hook.
//! - A genuine error (validation failure, I/O, anything else), carried
//!   as a boxed error value and routed through the dispatcher's error
//!   hook.
//!
//! [`PetalError`] is the tagged union of the two, and the single error
//! type transforms and handlers return.

use std::fmt;

use serde_json::Value;

use crate::response::{Response, StatusCode};

/// A type-erased error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An already-decided response, raised to short-circuit a request.
///
/// # Example
///
/// ```
/// use trellis_core::{ErrorSignal, PetalError, StatusCode};
/// use serde_json::json;
///
/// let err: PetalError = ErrorSignal::new(StatusCode::UNAUTHORIZED)
///     .with_body(json!({"message": "unauthorized"}))
///     .into();
/// assert!(err.is_raised());
/// ```
#[derive(Debug, Clone)]
pub struct ErrorSignal {
    status: StatusCode,
    body: Option<Value>,
    headers: Vec<(String, String)>,
}

impl ErrorSignal {
    /// Create a signal with the given status and no body or headers.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            headers: Vec::new(),
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The status the response will carry.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The body, if any.
    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Render the signal as the response it describes.
    #[must_use]
    pub fn into_response(self) -> Response {
        let mut response = match &self.body {
            Some(body) => Response::json_value(self.status, body),
            None => Response::empty(self.status),
        };
        for (name, value) in self.headers {
            response = response.header(name, value.into_bytes());
        }
        response
    }
}

impl fmt::Display for ErrorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response raised with status {}", self.status.as_u16())
    }
}

/// Failure of a transform stage or handler.
#[derive(Debug)]
pub enum PetalError {
    /// An intentional early response. Never passed to the error hook.
    Raised(ErrorSignal),
    /// A genuine error, recovered by the dispatcher's error hook or a
    /// fixed 500 response.
    Failure(BoxError),
}

impl PetalError {
    /// Wrap any error value as a failure.
    #[must_use]
    pub fn failure(err: impl Into<BoxError>) -> Self {
        Self::Failure(err.into())
    }

    /// Whether this is an intentional raised response.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        matches!(self, Self::Raised(_))
    }
}

impl fmt::Display for PetalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raised(signal) => fmt::Display::fmt(signal, f),
            Self::Failure(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for PetalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Raised(_) => None,
            Self::Failure(err) => Some(err.as_ref()),
        }
    }
}

impl From<ErrorSignal> for PetalError {
    fn from(signal: ErrorSignal) -> Self {
        Self::Raised(signal)
    }
}

impl From<serde_json::Error> for PetalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Failure(Box::new(err))
    }
}

impl From<String> for PetalError {
    fn from(message: String) -> Self {
        Self::Failure(message.into())
    }
}

impl From<&str> for PetalError {
    fn from(message: &str) -> Self {
        Self::Failure(message.into())
    }
}

/// Result alias for transform stages and handlers.
pub type PetalResult<T> = Result<T, PetalError>;
