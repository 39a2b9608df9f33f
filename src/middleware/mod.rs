//! Middleware layer.
//!
//! A middleware is a transformation from one handler to another: it receives
//! the [`Next`] handler in the chain and returns a new one that usually does
//! some work and then calls into `next`. Cross-cutting concerns live here:
//! structured tracing, request-id injection, authentication-header checks.
//!
//! Middleware runs in declared order. Given `[A, B, C]` and a route handler
//! `H`, a request observes `A → B → C → H` and the response travels back
//! `H → C → B → A`. Every request passes through the full chain, including
//! requests that end at the not-found handler.
//!
//! Two ways to write one:
//!
//! ```rust
//! use slashmux::Router;
//! use slashmux::middleware::{self, Next};
//!
//! // As a closure over the whole request/response exchange:
//! let stamp = middleware::from_fn(|req, next: Next| async move {
//!     let mut res = next.run(req).await;
//!     res.insert_header("x-served-by", "slashmux");
//!     res
//! });
//!
//! // As a handler transformation:
//! let passthrough = |next: Next| next;
//!
//! let app = Router::new().layer(stamp).layer(passthrough);
//! ```
//!
//! Built-in:
//! - [`trace()`] — per-request span with method, path, status, latency

mod trace;

pub use trace::trace;

use std::future::Future;
use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// The rest of the chain, as seen by one middleware.
///
/// Cheap to clone: an `Arc` around the wrapped handler.
#[derive(Clone)]
pub struct Next(BoxedHandler);

impl Next {
    /// Wraps any handler so it can sit in a middleware chain.
    pub fn new(handler: impl Handler) -> Self {
        Self(handler.into_boxed_handler())
    }

    /// Passes `req` down the chain and resolves to its response.
    pub fn run(&self, req: Request) -> impl Future<Output = Response> + Send + use<> {
        self.0.call(req)
    }

    pub(crate) fn from_boxed(handler: BoxedHandler) -> Self {
        Self(handler)
    }

    pub(crate) fn into_boxed(self) -> BoxedHandler {
        self.0
    }
}

/// A transformation over handlers.
///
/// Implemented for every `Fn(Next) -> Next`. Use [`from_fn`] for the common
/// "do something around the call" shape.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: Next) -> Next;
}

impl<F> Middleware for F
where
    F: Fn(Next) -> Next + Send + Sync + 'static,
{
    fn wrap(&self, next: Next) -> Next {
        self(next)
    }
}

/// Builds a middleware from an async function of the request and the rest of
/// the chain.
pub fn from_fn<F, Fut, R>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    FromFn(Arc::new(f))
}

/// Middleware returned by [`from_fn`].
pub struct FromFn<F>(Arc<F>);

impl<F, Fut, R> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn wrap(&self, next: Next) -> Next {
        Next(Arc::new(Around { f: Arc::clone(&self.0), next }))
    }
}

struct Around<F> {
    f: Arc<F>,
    next: Next,
}

impl<F, Fut, R> ErasedHandler for Around<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.f)(req, self.next.clone());
        Box::pin(async move { fut.await.into_response() })
    }
}

/// Folds `middleware` around `inner`, last declared innermost, so that the
/// first declared middleware sees the request first.
pub(crate) fn chain(inner: BoxedHandler, middleware: &[Box<dyn Middleware>]) -> BoxedHandler {
    middleware.iter()
        .rev()
        .fold(Next::from_boxed(inner), |next, mw| mw.wrap(next))
        .into_boxed()
}
