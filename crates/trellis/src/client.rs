//! In-process client for exercising an [`App`] without a transport.
//!
//! The client drives [`App::dispatch`] directly, keeps a cookie jar
//! across requests and offers a small fluent request builder:
//!
//! ```
//! use serde_json::json;
//! use trellis::{App, Branch, Client, HandlerArg, Response};
//! use trellis_core::StatusCode;
//!
//! let branch = Branch::<()>::init().get("/ping", |_arg: HandlerArg<()>| async {
//!     Ok(Response::json_value(StatusCode::OK, &json!("pong")))
//! });
//! let client = Client::new(App::new(&branch, |_req, _cookies| async { Ok(()) }));
//!
//! let response = futures::executor::block_on(client.get("/ping").send());
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.json_value(), Some(json!("pong")));
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use trellis_core::{Body, Method, Request, ResponseBody, StatusCode};

use crate::server::App;

/// A simple cookie jar carried across client requests.
///
/// Only name/value pairs are tracked; attributes on `Set-Cookie`
/// responses are ignored.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    /// Create an empty jar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a cookie in the jar.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Get a cookie value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Remove a cookie, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.cookies.remove(name)
    }

    /// Clear the jar.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// Number of cookies held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether the jar is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render the jar as a `cookie` header value.
    #[must_use]
    pub fn to_cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            None
        } else {
            Some(
                self.cookies
                    .iter()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        }
    }

    /// Record the name/value pair of a `Set-Cookie` header value.
    pub fn absorb_set_cookie(&mut self, header_value: &[u8]) {
        let Ok(value) = std::str::from_utf8(header_value) else {
            return;
        };
        if let Some(pair) = value.split(';').next() {
            if let Some((name, value)) = pair.split_once('=') {
                self.set(name.trim(), value.trim());
            }
        }
    }
}

/// In-process test client wrapping an [`App`].
pub struct Client<S> {
    app: App<S>,
    jar: Mutex<CookieJar>,
}

impl<S> Client<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Wrap an app.
    #[must_use]
    pub fn new(app: App<S>) -> Self {
        Self {
            app,
            jar: Mutex::new(CookieJar::new()),
        }
    }

    /// Access the cookie jar.
    pub fn cookies(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().expect("cookie jar mutex poisoned")
    }

    /// Start a GET request.
    #[must_use]
    pub fn get(&self, target: &str) -> RequestBuilder<'_, S> {
        self.request(Method::Get, target)
    }

    /// Start a POST request.
    #[must_use]
    pub fn post(&self, target: &str) -> RequestBuilder<'_, S> {
        self.request(Method::Post, target)
    }

    /// Start a PUT request.
    #[must_use]
    pub fn put(&self, target: &str) -> RequestBuilder<'_, S> {
        self.request(Method::Put, target)
    }

    /// Start a PATCH request.
    #[must_use]
    pub fn patch(&self, target: &str) -> RequestBuilder<'_, S> {
        self.request(Method::Patch, target)
    }

    /// Start a DELETE request.
    #[must_use]
    pub fn delete(&self, target: &str) -> RequestBuilder<'_, S> {
        self.request(Method::Delete, target)
    }

    /// Start a request with an explicit method.
    #[must_use]
    pub fn request(&self, method: Method, target: &str) -> RequestBuilder<'_, S> {
        RequestBuilder {
            client: self,
            request: Request::new(method, target),
        }
    }

    /// Dispatch a prepared request, applying and updating the jar.
    pub async fn send(&self, mut request: Request) -> ClientResponse {
        let cookie_header = self.cookies().to_cookie_header();
        if let Some(header) = cookie_header {
            if !request.headers().contains("cookie") {
                request.headers_mut().insert("cookie", header.into_bytes());
            }
        }

        let response = self.app.dispatch(request).await;
        let (status, headers, body) = response.into_parts();

        {
            let mut jar = self.cookies();
            for (name, value) in &headers {
                if name.eq_ignore_ascii_case("set-cookie") {
                    jar.absorb_set_cookie(value);
                }
            }
        }

        ClientResponse {
            status,
            headers,
            body: match body {
                ResponseBody::Empty => Vec::new(),
                ResponseBody::Bytes(bytes) => bytes,
            },
        }
    }
}

/// Fluent request builder returned by the client's method helpers.
pub struct RequestBuilder<'c, S> {
    client: &'c Client<S>,
    request: Request,
}

impl<S> RequestBuilder<'_, S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.request.headers_mut().insert(name, value);
        self
    }

    /// Add a cookie for this request only.
    #[must_use]
    pub fn cookie(self, name: &str, value: &str) -> Self {
        let merged = match self.request.headers().get_str("cookie") {
            Some(existing) => format!("{existing}; {name}={value}"),
            None => format!("{name}={value}"),
        };
        self.header("cookie", merged.into_bytes())
    }

    /// Attach a JSON body (with the matching content type).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.request.set_body(Body::Bytes(bytes));
        Ok(self.header("content-type", b"application/json".to_vec()))
    }

    /// Attach a raw body.
    #[must_use]
    pub fn body_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.request.set_body(Body::Bytes(bytes));
        self
    }

    /// Dispatch the request.
    pub async fn send(self) -> ClientResponse {
        self.client.send(self.request).await
    }
}

/// A buffered response as seen by the client.
#[derive(Debug)]
pub struct ClientResponse {
    status: StatusCode,
    headers: Vec<(String, Vec<u8>)>,
    body: Vec<u8>,
}

impl ClientResponse {
    /// The status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// All headers in response order.
    #[must_use]
    pub fn headers(&self) -> &[(String, Vec<u8>)] {
        &self.headers
    }

    /// The first header value with the given name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// All `Set-Cookie` header values.
    #[must_use]
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("set-cookie"))
            .filter_map(|(_, v)| std::str::from_utf8(v).ok())
            .map(str::to_string)
            .collect()
    }

    /// The raw body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON into a typed value.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Decode the body as a JSON value; `None` when the body is empty.
    #[must_use]
    pub fn json_value(&self) -> Option<Value> {
        if self.body.is_empty() {
            None
        } else {
            serde_json::from_slice(&self.body).ok()
        }
    }
}
