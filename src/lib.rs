//! # slashmux
//!
//! A thin composition layer in front of an exact-match HTTP request mux.
//!
//! The mux maps `"METHOD /pattern"` strings to handlers and nothing else.
//! slashmux adds what it lacks:
//!
//! - **Trailing-slash equivalence** — register `/hello` once and both
//!   `/hello` and `/hello/` reach it. `/hello/` and `/hello/{$}` mean the
//!   same thing. The root `/` stays strict.
//! - **Remainder patterns** — `/files/{path...}` swallows the rest of the
//!   path and is never duplicated.
//! - **Declared-order middleware** — the first [`Router::layer`] sees the
//!   request first and the response last, for every request.
//! - **Not-found fallback** — [`Router::not_found`] runs *inside* the
//!   middleware pipeline, so logging and auth middleware see unmatched
//!   requests too.
//! - **Mounting** — [`Router::mount`] hands a whole prefix to another
//!   handler, usually another `Router`, with the prefix stripped.
//!
//! Registration is done on an owned router before traffic starts. The first
//! request seals it; registering afterwards panics.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use slashmux::{Request, Response, Router, Server, middleware};
//! use http::StatusCode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let admin = Router::new().get("/stats", stats);
//!
//!     let app = Router::new()
//!         .layer(middleware::trace())
//!         .get("/users/{id}", get_user)
//!         .post("/users", create_user)
//!         .mount("/admin", admin)
//!         .not_found(|_req: Request| async { StatusCode::NOT_FOUND });
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#))
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(r#"{"id":"99"}"#)
//! }
//!
//! async fn stats(_req: Request) -> &'static str {
//!     "ok"
//! }
//! ```

mod error;
mod handler;
mod mux;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod pattern;

pub use http::{Method, StatusCode};

pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
