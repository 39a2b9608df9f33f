//! HTTP server and graceful shutdown.
//!
//! The transport that drives a [`Router`]: it accepts connections, turns
//! each hyper request into a [`Request`], calls [`Router::dispatch`] and
//! writes the [`Response`] back. Routing decisions all live in the router.
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection finish and then returns from [`Server::serve`]. Under an
//! orchestrator that sends SIGTERM before SIGKILL, set the grace period
//! longer than the slowest request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: String,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called. The address is parsed there.
    ///
    /// ```rust,no_run
    /// use slashmux::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let addr: SocketAddr = self.addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        // One routing table shared by every connection task.
        let router = Arc::new(router);

        info!(%addr, "slashmux listening");

        // Every connection task lands here so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        // Polled on every loop iteration, so it has to stay put in memory.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Arms are polled in order: a pending shutdown wins over a
                // connection that is ready at the same time.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    // hyper speaks its own IO traits; TokioIo bridges tokio's.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on this connection.
                        let svc = service_fn(move |req| dispatch(Arc::clone(&router), req));
                        // auto::Builder negotiates HTTP/1.1 or HTTP/2 per connection.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(%peer, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connections so the set does not grow forever.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Accepting has stopped. Wait for in-flight connections to finish.
        while tasks.join_next().await.is_some() {}

        info!("slashmux stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Adapts one hyper request to the router and back.
///
/// Never fails towards hyper: an unreadable body becomes `400`.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http(true));
        }
    };

    let with_body = parts.method != Method::HEAD;
    let req = Request::from(http::Request::from_parts(parts, body));
    let res = router.dispatch(req).await;
    Ok(res.into_http(with_body))
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or Ctrl-C. Only Ctrl-C on non-Unix targets.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // No SIGTERM outside Unix: a future that never resolves keeps select! happy.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
