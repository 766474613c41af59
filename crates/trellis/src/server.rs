//! Request dispatcher.
//!
//! [`App`] ties the compiled matcher, the per-route transform chain,
//! optional schema validation and error recovery into one linear
//! pipeline per request:
//!
//! ```text
//! Start → ContentTypeCheck → Match
//!       → {NoMatch → Unknown,
//!          Matched → TransformChain → ParamValidate → QueryValidate
//!                  → BodyValidate → Handler}
//!       → {Success, ErrorSignal, OtherError}
//!       → CookieMerge → Respond
//! ```
//!
//! The dispatcher is the sole recovery boundary for a request: nothing
//! escapes it. A raised [`ErrorSignal`](trellis_core::ErrorSignal)
//! renders verbatim and always wins over the configured error hook;
//! every other failure goes through the hook, and a hook failure (or
//! no hook) falls back to a fixed 500.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use trellis::{App, Branch, HandlerArg, Request, Response};
//! use trellis_core::{Method, StatusCode};
//!
//! #[derive(Clone)]
//! struct Seed;
//!
//! let branch = Branch::<Seed>::init().get("/ping", |_arg: HandlerArg<Seed>| async {
//!     Ok(Response::json_value(StatusCode::OK, &json!({"message": "pong"})))
//! });
//! let app = App::new(&branch, |_req, _cookies| async { Ok(Seed) });
//!
//! let response = futures::executor::block_on(app.dispatch(Request::new(Method::Get, "/ping")));
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Map, Value};

use trellis_core::{
    Body, BoxError, BoxFuture, Cookies, Method, PetalError, PetalResult, Request, Response,
    StatusCode,
};
use trellis_router::{Branch, HandlerArg, Petal, Router};

/// Argument handed to the `unknown` and `unsupported` hooks.
pub struct HookArg<S> {
    /// The request being dispatched.
    pub req: Arc<Request>,
    /// The initial seed (the transform chain has not run).
    pub seed: S,
    /// The request's cookie store.
    pub cookies: Arc<Cookies>,
}

/// One line of the request log, handed to the logger hook.
#[derive(Debug, Clone)]
pub struct RequestLog {
    /// Request method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Response status.
    pub status: StatusCode,
    /// Wall-clock time spent in dispatch.
    pub elapsed_ms: u128,
}

type SeedFn<S> =
    Arc<dyn Fn(Arc<Request>, Arc<Cookies>) -> BoxFuture<'static, PetalResult<S>> + Send + Sync>;
type ResponseHook<S> =
    Arc<dyn Fn(HookArg<S>) -> BoxFuture<'static, PetalResult<Response>> + Send + Sync>;
type ErrorHook<S> =
    Arc<dyn Fn(BoxError, S) -> BoxFuture<'static, PetalResult<Response>> + Send + Sync>;
type LoggerHook = Arc<dyn Fn(&RequestLog) + Send + Sync>;

/// The dispatcher: a compiled router, a seed function and lifecycle
/// hooks.
///
/// Construction finalizes the branch once; the resulting trie is
/// immutable and shared read-only across concurrent dispatches, so an
/// `App` behind an `Arc` needs no further synchronization.
pub struct App<S> {
    router: Router<S>,
    seed: SeedFn<S>,
    unknown: Option<ResponseHook<S>>,
    unsupported: Option<ResponseHook<S>>,
    error: Option<ErrorHook<S>>,
    logger: Option<LoggerHook>,
}

impl<S> App<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Build an app from a branch and an initial-seed function.
    ///
    /// The branch is compiled here; composing it further afterwards
    /// has no effect on this app.
    pub fn new<F, Fut>(branch: &Branch<S>, seed: F) -> Self
    where
        F: Fn(Arc<Request>, Arc<Cookies>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PetalResult<S>> + Send + 'static,
    {
        Self {
            router: branch.finalize(),
            seed: Arc::new(move |req, cookies| Box::pin(seed(req, cookies))),
            unknown: None,
            unsupported: None,
            error: None,
            logger: None,
        }
    }

    /// Hook invoked when no route matches. Defaults to a 404 with
    /// `{"message":"not found"}`.
    #[must_use]
    pub fn unknown<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookArg<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PetalResult<Response>> + Send + 'static,
    {
        self.unknown = Some(Arc::new(move |arg| Box::pin(hook(arg))));
        self
    }

    /// Hook invoked when the request carries a non-JSON content type.
    /// Without it the dispatcher logs a warning and continues.
    #[must_use]
    pub fn unsupported<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(HookArg<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PetalResult<Response>> + Send + 'static,
    {
        self.unsupported = Some(Arc::new(move |arg| Box::pin(hook(arg))));
        self
    }

    /// Hook invoked for genuine errors, with the error and the initial
    /// seed. A raised signal never reaches it. If the hook itself
    /// fails, the fixed 500 response is used instead.
    #[must_use]
    pub fn on_error<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(BoxError, S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PetalResult<Response>> + Send + 'static,
    {
        self.error = Some(Arc::new(move |err, seed| Box::pin(hook(err, seed))));
        self
    }

    /// Install a custom request logger.
    #[must_use]
    pub fn logger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestLog) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(hook));
        self
    }

    /// Toggle the built-in request logger, which emits one `log::info!`
    /// line per dispatch.
    #[must_use]
    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.logger = enabled.then(|| {
            Arc::new(|entry: &RequestLog| {
                log::info!(
                    "{} {} {} {}ms",
                    entry.method,
                    entry.path,
                    entry.status.as_u16(),
                    entry.elapsed_ms
                );
            }) as LoggerHook
        });
        self
    }

    /// The compiled router.
    #[must_use]
    pub fn router(&self) -> &Router<S> {
        &self.router
    }

    /// Dispatch one request to a response.
    ///
    /// This never fails: every error path ends in a response.
    pub async fn dispatch(&self, mut req: Request) -> Response {
        let started = Instant::now();
        let cookies = Arc::new(Cookies::from_request(&req));
        let body = req.take_body();
        let req = Arc::new(req);

        let outcome = self
            .run(Arc::clone(&req), Arc::clone(&cookies), body)
            .await;
        let response = match outcome {
            Ok(response) => response,
            Err((PetalError::Raised(signal), _)) => signal.into_response(),
            Err((PetalError::Failure(err), seed)) => self.recover(err, seed).await,
        };

        let mut response = response;
        for header in cookies.set_cookie_headers() {
            response = response.header("set-cookie", header.into_bytes());
        }

        if let Some(logger) = &self.logger {
            logger(&RequestLog {
                method: req.method(),
                path: req.path().to_string(),
                status: response.status(),
                elapsed_ms: started.elapsed().as_millis(),
            });
        }
        response
    }

    /// Everything that can fail, with the initial seed carried out for
    /// the error hook.
    async fn run(
        &self,
        req: Arc<Request>,
        cookies: Arc<Cookies>,
        body: Body,
    ) -> Result<Response, (PetalError, Option<S>)> {
        let init_seed = match (self.seed)(Arc::clone(&req), Arc::clone(&cookies)).await {
            Ok(seed) => seed,
            Err(err) => return Err((err, None)),
        };

        if let Some(content_type) = req.headers().get_str("content-type") {
            if !is_json_content_type(content_type) {
                if let Some(hook) = &self.unsupported {
                    let arg = HookArg {
                        req: Arc::clone(&req),
                        seed: init_seed.clone(),
                        cookies: Arc::clone(&cookies),
                    };
                    return hook(arg).await.map_err(|e| (e, Some(init_seed)));
                }
                log::warn!(
                    "{} {}: unsupported content type {:?}, continuing",
                    req.method(),
                    req.path(),
                    content_type
                );
            }
        }

        let Some(matched) = self.router.match_route(req.method(), req.path()) else {
            return match &self.unknown {
                Some(hook) => {
                    let arg = HookArg {
                        req,
                        seed: init_seed.clone(),
                        cookies,
                    };
                    hook(arg).await.map_err(|e| (e, Some(init_seed)))
                }
                None => Ok(Response::json_value(
                    StatusCode::NOT_FOUND,
                    &json!({"message": "not found"}),
                )),
            };
        };

        let seed_for_hook = init_seed.clone();
        self.execute(matched.petal, matched.params, req, cookies, body, init_seed)
            .await
            .map_err(|e| (e, Some(seed_for_hook)))
    }

    /// Steps 4–8 of the pipeline for a matched route.
    async fn execute(
        &self,
        petal: &Petal<S>,
        raw_params: Vec<(String, String)>,
        req: Arc<Request>,
        cookies: Arc<Cookies>,
        body: Body,
        seed: S,
    ) -> PetalResult<Response> {
        let seed = petal.chain().run(seed).await?;

        let mut params = Value::Object(string_map(raw_params.into_iter()));
        if let Some(schema) = petal.schemas().params_schema() {
            params = schema.parse(params).map_err(PetalError::Failure)?;
        }

        let mut query = Value::Object(string_map(req.query_pairs().into_iter()));
        if let Some(schema) = petal.schemas().query_schema() {
            query = schema.parse(query).map_err(PetalError::Failure)?;
        }

        let mut body_value = Value::Null;
        if req.method() != Method::Get {
            let bytes = body.into_bytes();
            if !bytes.is_empty() {
                body_value = serde_json::from_slice(&bytes)?;
            }
            if let Some(schema) = petal.schemas().body_schema() {
                body_value = schema.parse(body_value).map_err(PetalError::Failure)?;
            }
        }

        let arg = HandlerArg {
            req,
            seed,
            params,
            query,
            body: body_value,
            cookies,
        };
        petal.handler().call(arg).await
    }

    /// Step 11: route a genuine error through the hook, or fall back
    /// to the fixed 500. A failure inside the hook must never escape.
    async fn recover(&self, err: BoxError, seed: Option<S>) -> Response {
        if let (Some(hook), Some(seed)) = (&self.error, seed) {
            if let Ok(response) = hook(err, seed).await {
                return response;
            }
        }
        Response::json_value(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({"message": "internal server error"}),
        )
    }
}

fn string_map(pairs: impl Iterator<Item = (String, String)>) -> Map<String, Value> {
    pairs.map(|(k, v)| (k, Value::String(v))).collect()
}

fn is_json_content_type(value: &str) -> bool {
    value
        .trim()
        .to_ascii_lowercase()
        .starts_with("application/json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_content_type_detection() {
        assert!(is_json_content_type("application/json"));
        assert!(is_json_content_type("application/json; charset=utf-8"));
        assert!(is_json_content_type(" Application/JSON "));
        assert!(!is_json_content_type("text/plain"));
        assert!(!is_json_content_type("application/xml"));
    }
}
