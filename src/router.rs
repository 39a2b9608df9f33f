//! The application router.
//!
//! Registration happens up front, on an owned `Router`. The first dispatched
//! request seals it: the middleware chain is folded around the mux exactly
//! once and every later request reuses that pipeline. Any registration after
//! that point panics, since the pipeline already in use would silently
//! disagree with the new state.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler, private};
use crate::middleware::{self, Middleware};
use crate::mux::Mux;
use crate::pattern;
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Every path is reachable with and without a trailing slash; register it
/// once. Each builder method returns `self` so registrations chain naturally.
///
/// ```rust,no_run
/// # use slashmux::{Request, Response, Router};
/// # async fn list(_: Request) -> Response { Response::text("") }
/// # async fn show(_: Request) -> Response { Response::text("") }
/// # async fn files(_: Request) -> Response { Response::text("") }
/// let app = Router::new()
///     .get("/users", list)            // /users and /users/
///     .get("/users/{id}", show)       // /users/42 and /users/42/
///     .get("/static/{path...}", files);
/// ```
pub struct Router {
    mux: Arc<Mux>,
    middleware: Vec<Box<dyn Middleware>>,
    not_found: Option<BoxedHandler>,
    pipeline: OnceLock<BoxedHandler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            mux: Arc::new(Mux::new()),
            middleware: Vec::new(),
            not_found: None,
            pipeline: OnceLock::new(),
        }
    }

    /// Registers `handler` for `method` + `path`. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` for one segment and `{name...}` for the
    /// rest of the path; `req.param("name")` retrieves them. A path ending in
    /// `/{$}` is treated like the same path ending in `/`.
    ///
    /// # Panics
    ///
    /// Panics if the router is sealed, if `method` or `path` is empty, or if
    /// a derived pattern conflicts with an earlier registration.
    pub fn handle(mut self, method: &str, path: &str, handler: impl Handler) -> Self {
        self.assert_open("handle");
        let patterns = pattern::canonical_patterns(method, path);
        let handler = handler.into_boxed_handler();
        let mux = self.mux_mut();
        for derived in &patterns {
            mux.register(derived, BoxedHandler::clone(&handler));
        }
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.handle("GET", path, handler)
    }

    pub fn head(self, path: &str, handler: impl Handler) -> Self {
        self.handle("HEAD", path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.handle("POST", path, handler)
    }

    pub fn put(self, path: &str, handler: impl Handler) -> Self {
        self.handle("PUT", path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Handler) -> Self {
        self.handle("PATCH", path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Handler) -> Self {
        self.handle("DELETE", path, handler)
    }

    pub fn connect(self, path: &str, handler: impl Handler) -> Self {
        self.handle("CONNECT", path, handler)
    }

    pub fn options(self, path: &str, handler: impl Handler) -> Self {
        self.handle("OPTIONS", path, handler)
    }

    pub fn trace(self, path: &str, handler: impl Handler) -> Self {
        self.handle("TRACE", path, handler)
    }

    /// Appends a middleware. The first one appended sees requests first.
    ///
    /// # Panics
    ///
    /// Panics if the router is sealed.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        self.assert_open("layer");
        self.middleware.push(Box::new(middleware));
        self
    }

    /// Appends several middleware, in iteration order.
    pub fn layers<I>(self, middleware: I) -> Self
    where
        I: IntoIterator,
        I::Item: Middleware,
    {
        middleware.into_iter().fold(self, |router, mw| router.layer(mw))
    }

    /// Delegates everything under `prefix` to `handler`, for every method.
    ///
    /// The delegate sees the path with the prefix removed: mounting at `/api`
    /// turns `/api/users` into `/users` and `/api/` into `/`. `handler` may be
    /// another `Router`.
    ///
    /// # Panics
    ///
    /// Panics if the router is sealed or the prefix is already taken.
    pub fn mount(mut self, prefix: &str, handler: impl Handler) -> Self {
        self.assert_open("mount");
        let delegate: BoxedHandler = Arc::new(Mounted(handler.into_boxed_handler()));
        self.mux_mut().register(&pattern::mount_prefix(prefix), delegate);
        self
    }

    /// Sets the handler for requests no route matches. Last call wins.
    ///
    /// Without one, unmatched requests get `404 Not Found`, or
    /// `405 Method Not Allowed` when the path exists under another method.
    ///
    /// # Panics
    ///
    /// Panics if the router is sealed.
    pub fn not_found(mut self, handler: impl Handler) -> Self {
        self.assert_open("not_found");
        self.not_found = Some(handler.into_boxed_handler());
        self
    }

    /// Routes one request through the middleware pipeline.
    ///
    /// The first call seals the router. Concurrent first calls wait for a
    /// single pipeline build.
    pub fn dispatch(&self, req: Request) -> impl Future<Output = Response> + Send + use<> {
        self.pipeline().call(req)
    }

    /// Whether the first request has been dispatched.
    pub fn is_sealed(&self) -> bool {
        self.pipeline.get().is_some()
    }

    fn pipeline(&self) -> &BoxedHandler {
        self.pipeline.get_or_init(|| {
            debug!(middleware = self.middleware.len(), "sealing router");
            let terminal: BoxedHandler = Arc::new(Terminal {
                mux: Arc::clone(&self.mux),
                not_found: self.not_found.clone(),
            });
            middleware::chain(terminal, &self.middleware)
        })
    }

    fn assert_open(&self, call: &str) {
        assert!(
            !self.is_sealed(),
            "router is sealed: `{call}` called after the first request was dispatched",
        );
    }

    fn mux_mut(&mut self) -> &mut Mux {
        Arc::get_mut(&mut self.mux).expect("mux is uniquely owned until the router is sealed")
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

// ── Router as a handler ───────────────────────────────────────────────────────

impl private::Sealed for Router {}

impl Handler for Router {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl ErasedHandler for Router {
    fn call(&self, req: Request) -> BoxFuture {
        self.pipeline().call(req)
    }
}

// ── Pipeline pieces ───────────────────────────────────────────────────────────

/// Innermost handler of the pipeline. Runs inside every middleware, so
/// middleware observes not-found requests too.
struct Terminal {
    mux: Arc<Mux>,
    not_found: Option<BoxedHandler>,
}

impl ErasedHandler for Terminal {
    fn call(&self, mut req: Request) -> BoxFuture {
        if let Some(matched) = self.mux.lookup(req.method(), req.path()) {
            req.set_match(&matched.pattern, matched.params, matched.tail);
            return matched.handler.call(req);
        }
        match &self.not_found {
            Some(handler) => handler.call(req),
            None => Box::pin(std::future::ready(self.mux.unmatched(req.path()))),
        }
    }
}

/// Strips the mount prefix before handing the request to the delegate.
struct Mounted(BoxedHandler);

impl ErasedHandler for Mounted {
    fn call(&self, mut req: Request) -> BoxFuture {
        req.descend();
        self.0.call(req)
    }
}
