//! HTTP request types.
//!
//! [`Request`] is the abstract inbound half of the transport boundary:
//! a method, a target path, headers and an optional body. How the bytes
//! arrived (TCP, a test client, something else entirely) is not this
//! crate's concern.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

/// HTTP method.
///
/// Only the methods the route builder can register are represented.
/// A transport adapter that sees anything else has no route to match
/// and should answer with its own 404/405 handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method.
    Get,
    /// POST method.
    Post,
    /// PUT method.
    Put,
    /// DELETE method.
    Delete,
    /// PATCH method.
    Patch,
}

impl Method {
    /// Parse a method from its canonical uppercase name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    /// Return the canonical uppercase method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP headers collection.
///
/// Header names are normalized to lowercase at insertion time for
/// case-insensitive matching. Lookups avoid allocation when the lookup
/// key is already lowercase.
#[derive(Debug, Default)]
pub struct Headers {
    inner: HashMap<String, Vec<u8>>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.inner
            .get(lowercase_key(name).as_ref())
            .map(Vec::as_slice)
    }

    /// Get a header value as UTF-8 text, if it is valid UTF-8.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|v| std::str::from_utf8(v).ok())
    }

    /// Insert a header, replacing any previous value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Check whether a header exists (case-insensitive).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(lowercase_key(name).as_ref())
    }

    /// Remove a header, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.inner.remove(lowercase_key(name).as_ref())
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Lowercase a header name for lookup without allocating when the name
/// is already lowercase, which covers programmatic access with literals
/// like `"content-type"`.
fn lowercase_key(name: &str) -> Cow<'_, str> {
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(name.to_ascii_lowercase())
    } else {
        Cow::Borrowed(name)
    }
}

/// Request body.
#[derive(Debug)]
pub enum Body {
    /// No body.
    Empty,
    /// A fully buffered body.
    Bytes(Vec<u8>),
}

impl Body {
    /// Consume the body and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Empty => Vec::new(),
            Self::Bytes(b) => b,
        }
    }

    /// Whether the body carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Bytes(b) => b.is_empty(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Empty
    }
}

/// HTTP request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Headers,
    body: Body,
}

impl Request {
    /// Create a request from a method and a target.
    ///
    /// The target is split at the first `?` into path and raw query
    /// string, mirroring how a URL's path and search arrive together.
    #[must_use]
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let target = target.into();
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target, None),
        };
        Self {
            method,
            path,
            query,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// Add a header, builder style.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the body, builder style.
    #[must_use]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// The request path (no query string).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, if any.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Mutable access to the headers.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// The body.
    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Take the body, leaving `Body::Empty` behind.
    pub fn take_body(&mut self) -> Body {
        std::mem::take(&mut self.body)
    }

    /// Replace the body.
    pub fn set_body(&mut self, body: Body) {
        self.body = body;
    }

    /// Decode the query string into ordered (name, value) pairs.
    ///
    /// Percent-encoding is decoded and `+` is treated as a space. A
    /// component that fails to decode is kept verbatim rather than
    /// dropped. A key without `=` maps to an empty value.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = self.query.as_deref() else {
            return Vec::new();
        };
        query
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(key), decode_component(value))
            })
            .collect()
    }
}

fn decode_component(raw: &str) -> String {
    url_decode(raw).unwrap_or_else(|| raw.to_string())
}

/// Decode a percent-encoded string, treating `+` as a space.
///
/// Returns `None` on truncated or non-hex percent escapes and on
/// decoded bytes that are not valid UTF-8.
#[must_use]
pub fn url_decode(s: &str) -> Option<String> {
    let mut out = Vec::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(byte) = bytes.next() {
        match byte {
            b'%' => {
                let hi = char::from(bytes.next()?).to_digit(16)?;
                let lo = char::from(bytes.next()?).to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
            }
            b'+' => out.push(b' '),
            other => out.push(other),
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_canonical_names() {
        assert_eq!(Method::parse("GET"), Some(Method::Get));
        assert_eq!(Method::parse("PATCH"), Some(Method::Patch));
        assert_eq!(Method::parse("get"), None);
        assert_eq!(Method::parse("BREW"), None);
    }

    #[test]
    fn headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", b"application/json".to_vec());
        assert_eq!(headers.get("content-type"), Some(&b"application/json"[..]));
        assert_eq!(headers.get_str("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn header_insert_replaces_previous_value() {
        let mut headers = Headers::new();
        headers.insert("x-tag", b"a".to_vec());
        headers.insert("X-Tag", b"b".to_vec());
        assert_eq!(headers.get_str("x-tag"), Some("b"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn target_splits_path_and_query() {
        let req = Request::new(Method::Get, "/items?page=2&sort=asc");
        assert_eq!(req.path(), "/items");
        assert_eq!(req.query(), Some("page=2&sort=asc"));

        let bare = Request::new(Method::Get, "/items");
        assert_eq!(bare.path(), "/items");
        assert_eq!(bare.query(), None);
    }

    #[test]
    fn query_pairs_decode_in_order() {
        let req = Request::new(Method::Get, "/s?q=hello%20world&k=0,1,2&flag");
        assert_eq!(
            req.query_pairs(),
            vec![
                ("q".to_string(), "hello world".to_string()),
                ("k".to_string(), "0,1,2".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn url_decode_handles_escapes() {
        assert_eq!(url_decode("a%26b%3Dc"), Some("a&b=c".to_string()));
        assert_eq!(url_decode("hello+world"), Some("hello world".to_string()));
        assert_eq!(url_decode("caf%C3%A9"), Some("café".to_string()));
        assert_eq!(url_decode("bad%2"), None);
        assert_eq!(url_decode("bad%GG"), None);
    }

    #[test]
    fn take_body_leaves_empty() {
        let mut req =
            Request::new(Method::Post, "/x").with_body(Body::Bytes(b"{}".to_vec()));
        assert_eq!(req.take_body().into_bytes(), b"{}".to_vec());
        assert!(req.body().is_empty());
    }
}
