//! Cookie collaborator.
//!
//! The dispatcher only ever calls three things here: read the inbound
//! cookies, stage an outbound cookie, and render the staged cookies as
//! `Set-Cookie` header values. Serialization rules live entirely in
//! this module.
//!
//! # Example
//!
//! ```
//! use trellis_core::{Cookie, Cookies, SameSite};
//!
//! let cookies = Cookies::empty();
//! cookies
//!     .set(Cookie::new("session", "abc123").http_only(true).same_site(SameSite::Lax))
//!     .unwrap();
//! assert_eq!(
//!     cookies.set_cookie_headers(),
//!     vec!["session=abc123; HttpOnly; SameSite=Lax".to_string()]
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use crate::request::Request;

/// The `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// First-party contexts only.
    Strict,
    /// First-party plus top-level navigation.
    Lax,
    /// No restriction (requires `Secure`).
    None,
}

impl SameSite {
    /// The attribute value as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Error produced when a cookie fails attribute validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieError {
    /// The cookie name contains characters outside the RFC token set.
    InvalidName(String),
    /// The cookie value contains a forbidden character.
    InvalidValue {
        /// Name of the offending cookie.
        name: String,
        /// The character that was rejected.
        character: char,
    },
    /// The domain has an invalid leading or trailing character.
    InvalidDomain(String),
    /// The path contains a control character or `;`.
    InvalidPath(String),
    /// `Max-Age` must be non-negative.
    NegativeMaxAge(i64),
}

impl fmt::Display for CookieError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid cookie name: {name:?}"),
            Self::InvalidValue { name, character } => {
                write!(f, "cookie {name:?} cannot contain character {character:?}")
            }
            Self::InvalidDomain(domain) => {
                write!(f, "invalid first/last character in cookie domain: {domain}")
            }
            Self::InvalidPath(path) => write!(f, "cookie path {path:?} contains invalid character"),
            Self::NegativeMaxAge(value) => {
                write!(f, "cookie Max-Age must be >= 0, got {value}")
            }
        }
    }
}

impl std::error::Error for CookieError {}

/// Cookie metadata: name, value and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    partitioned: bool,
    same_site: Option<SameSite>,
    expires: Option<String>,
}

impl Cookie {
    /// Create a cookie with the given name and value.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            partitioned: false,
            same_site: None,
            expires: None,
        }
    }

    /// Set the `Max-Age` attribute in seconds.
    #[must_use]
    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Set the `Domain` attribute.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the `Path` attribute.
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the `Secure` attribute.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Set the `HttpOnly` attribute.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Set the `Partitioned` attribute.
    #[must_use]
    pub fn partitioned(mut self, partitioned: bool) -> Self {
        self.partitioned = partitioned;
        self
    }

    /// Set the `SameSite` attribute.
    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Set the `Expires` attribute as a preformatted HTTP date.
    #[must_use]
    pub fn expires(mut self, http_date: impl Into<String>) -> Self {
        self.expires = Some(http_date.into());
        self
    }

    /// The cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Serialize as a `Set-Cookie` header value.
    ///
    /// `__Secure-` prefixed names force `Secure`; `__Host-` prefixed
    /// names additionally force `Path=/` and strip any `Domain`.
    ///
    /// # Errors
    ///
    /// Returns a [`CookieError`] if the name, value, domain or path
    /// contain forbidden characters, or if `Max-Age` is negative.
    pub fn to_header_value(&self) -> Result<String, CookieError> {
        validate_name(&self.name)?;
        validate_value(&self.name, &self.value)?;

        let mut secure = self.secure;
        let mut path = self.path.clone();
        let mut domain = self.domain.clone();
        if self.name.starts_with("__Secure") {
            secure = true;
        }
        if self.name.starts_with("__Host") {
            secure = true;
            path = Some("/".to_string());
            domain = None;
        }

        let mut out = vec![format!("{}={}", self.name, self.value)];
        if secure {
            out.push("Secure".to_string());
        }
        if self.http_only {
            out.push("HttpOnly".to_string());
        }
        if self.partitioned {
            out.push("Partitioned".to_string());
        }
        if let Some(max_age) = self.max_age {
            if max_age < 0 {
                return Err(CookieError::NegativeMaxAge(max_age));
            }
            out.push(format!("Max-Age={max_age}"));
        }
        if let Some(domain) = domain {
            validate_domain(&domain)?;
            out.push(format!("Domain={domain}"));
        }
        if let Some(same_site) = self.same_site {
            out.push(format!("SameSite={}", same_site.as_str()));
        }
        if let Some(path) = path {
            validate_path(&path)?;
            out.push(format!("Path={path}"));
        }
        if let Some(expires) = &self.expires {
            out.push(format!("Expires={expires}"));
        }
        Ok(out.join("; "))
    }
}

fn validate_name(name: &str) -> Result<(), CookieError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| {
            c.is_ascii_graphic()
                && !matches!(
                    c,
                    '(' | ')' | '@' | '<' | '>' | ',' | ';' | ':' | '\\' | '"' | '[' | ']'
                        | '?' | '=' | '{' | '}'
                )
        });
    if valid {
        Ok(())
    } else {
        Err(CookieError::InvalidName(name.to_string()))
    }
}

fn validate_value(name: &str, value: &str) -> Result<(), CookieError> {
    for c in value.chars() {
        let forbidden =
            (c as u32) < 0x21 || (c as u32) >= 0x7f || matches!(c, '"' | ',' | ';' | '\\');
        if forbidden {
            return Err(CookieError::InvalidValue {
                name: name.to_string(),
                character: c,
            });
        }
    }
    Ok(())
}

fn validate_domain(domain: &str) -> Result<(), CookieError> {
    let first = domain.chars().next();
    let last = domain.chars().last();
    if first == Some('-') || last == Some('.') || last == Some('-') {
        return Err(CookieError::InvalidDomain(domain.to_string()));
    }
    Ok(())
}

fn validate_path(path: &str) -> Result<(), CookieError> {
    for c in path.chars() {
        if (c as u32) < 0x20 || (c as u32) > 0x7e || c == ';' {
            return Err(CookieError::InvalidPath(path.to_string()));
        }
    }
    Ok(())
}

/// Per-request cookie store.
///
/// Parses the inbound `cookie` header once, and accumulates outbound
/// cookies staged by transforms and handlers. The staged side sits
/// behind a mutex so one instance can be shared across the request's
/// async stages behind an `Arc`.
#[derive(Default)]
pub struct Cookies {
    inbound: BTreeMap<String, String>,
    staged: Mutex<Staged>,
}

#[derive(Default)]
struct Staged {
    cookies: Vec<Cookie>,
    rendered: Vec<String>,
}

impl Cookies {
    /// Create a store with no inbound cookies.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the inbound `cookie` header of a request.
    ///
    /// Entries without a key are skipped; values keep any `=` they
    /// contain past the first one.
    #[must_use]
    pub fn from_request(req: &Request) -> Self {
        let mut inbound = BTreeMap::new();
        if let Some(header) = req.headers().get_str("cookie") {
            for part in header.split(';') {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                let key = key.trim();
                if !key.is_empty() {
                    inbound.insert(key.to_string(), value.to_string());
                }
            }
        }
        Self {
            inbound,
            staged: Mutex::new(Staged::default()),
        }
    }

    /// Look up an inbound cookie by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inbound.get(name).map(String::as_str)
    }

    /// All inbound cookies.
    #[must_use]
    pub fn all(&self) -> &BTreeMap<String, String> {
        &self.inbound
    }

    /// Stage an outbound cookie.
    ///
    /// The cookie is serialized (and therefore validated) eagerly, so
    /// invalid cookies fail here rather than when the response leaves.
    ///
    /// # Errors
    ///
    /// Returns a [`CookieError`] if the cookie fails validation.
    pub fn set(&self, cookie: Cookie) -> Result<(), CookieError> {
        let rendered = cookie.to_header_value()?;
        let mut staged = self.lock_staged();
        staged.cookies.push(cookie);
        staged.rendered.push(rendered);
        Ok(())
    }

    /// Stage a deletion by expiring the cookie immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`CookieError`] if the name fails validation.
    pub fn delete(&self, name: impl Into<String>) -> Result<(), CookieError> {
        self.set(Cookie::new(name, "").max_age(0))
    }

    /// The cookies staged so far.
    #[must_use]
    pub fn staged(&self) -> Vec<Cookie> {
        self.lock_staged().cookies.clone()
    }

    /// The staged cookies rendered as `Set-Cookie` header values.
    #[must_use]
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.lock_staged().rendered.clone()
    }

    fn lock_staged(&self) -> std::sync::MutexGuard<'_, Staged> {
        // A poisoned lock only means another stage panicked mid-push;
        // the stored state is still a valid list.
        self.staged
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl fmt::Debug for Cookies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cookies")
            .field("inbound", &self.inbound)
            .field("staged", &self.lock_staged().rendered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    #[test]
    fn parses_inbound_cookie_header() {
        let req = Request::new(Method::Get, "/")
            .header("cookie", b"a=1; b=two; token=x=y".to_vec());
        let cookies = Cookies::from_request(&req);
        assert_eq!(cookies.get("a"), Some("1"));
        assert_eq!(cookies.get("b"), Some("two"));
        assert_eq!(cookies.get("token"), Some("x=y"));
        assert_eq!(cookies.get("missing"), None);
    }

    #[test]
    fn skips_entries_without_a_key() {
        let req = Request::new(Method::Get, "/").header("cookie", b"=1; ok=2".to_vec());
        let cookies = Cookies::from_request(&req);
        assert_eq!(cookies.all().len(), 1);
        assert_eq!(cookies.get("ok"), Some("2"));
    }

    #[test]
    fn serializes_attributes_in_order() {
        let cookie = Cookie::new("id", "7")
            .secure(true)
            .http_only(true)
            .max_age(3600)
            .domain("example.com")
            .same_site(SameSite::Strict)
            .path("/app");
        assert_eq!(
            cookie.to_header_value().unwrap(),
            "id=7; Secure; HttpOnly; Max-Age=3600; Domain=example.com; SameSite=Strict; Path=/app"
        );
    }

    #[test]
    fn host_prefix_forces_attributes() {
        let cookie = Cookie::new("__Host-sid", "1").domain("example.com");
        assert_eq!(
            cookie.to_header_value().unwrap(),
            "__Host-sid=1; Secure; Path=/"
        );

        let cookie = Cookie::new("__Secure-sid", "1");
        assert_eq!(cookie.to_header_value().unwrap(), "__Secure-sid=1; Secure");
    }

    #[test]
    fn rejects_invalid_names_and_values() {
        assert!(matches!(
            Cookie::new("bad name", "v").to_header_value(),
            Err(CookieError::InvalidName(_))
        ));
        assert!(matches!(
            Cookie::new("n", "a;b").to_header_value(),
            Err(CookieError::InvalidValue { .. })
        ));
        assert!(matches!(
            Cookie::new("n", "v").max_age(-1).to_header_value(),
            Err(CookieError::NegativeMaxAge(-1))
        ));
        assert!(matches!(
            Cookie::new("n", "v").domain("-bad.com").to_header_value(),
            Err(CookieError::InvalidDomain(_))
        ));
    }

    #[test]
    fn staging_accumulates_rendered_headers() {
        let cookies = Cookies::empty();
        cookies.set(Cookie::new("runtime", "trellis")).unwrap();
        cookies.set(Cookie::new("test", "123")).unwrap();
        assert_eq!(
            cookies.set_cookie_headers(),
            vec!["runtime=trellis".to_string(), "test=123".to_string()]
        );
        assert_eq!(cookies.staged().len(), 2);
    }

    #[test]
    fn delete_stages_an_expired_cookie() {
        let cookies = Cookies::empty();
        cookies.delete("session").unwrap();
        assert_eq!(
            cookies.set_cookie_headers(),
            vec!["session=; Max-Age=0".to_string()]
        );
    }

    #[test]
    fn invalid_cookie_is_not_staged() {
        let cookies = Cookies::empty();
        assert!(cookies.set(Cookie::new("bad;name", "v")).is_err());
        assert!(cookies.set_cookie_headers().is_empty());
    }
}
