use std::time::Instant;

use tracing::{Instrument, info, info_span};

use super::{Middleware, Next, from_fn};
use crate::request::Request;

/// Per-request tracing: opens an `info` span carrying the method and path,
/// and logs the status and latency once the response is ready.
///
/// Declare it first to have the span cover every other middleware.
pub fn trace() -> impl Middleware {
    from_fn(|req: Request, next: Next| {
        let span = info_span!("request", method = %req.method(), path = %req.path());
        async move {
            let started = Instant::now();
            let res = next.run(req).await;
            info!(
                status = res.code().as_u16(),
                latency_us = started.elapsed().as_micros() as u64,
                "request completed"
            );
            res
        }
        .instrument(span)
    })
}
