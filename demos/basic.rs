//! Minimal slashmux example — a small JSON API with a mounted admin router.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl http://localhost:3000/users/42/            ← same handler
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/static/css/site.css
//!   curl http://localhost:3000/admin/stats
//!   curl http://localhost:3000/nope                 ← custom not-found, still traced

use http::StatusCode;
use slashmux::middleware::{self, Next};
use slashmux::{Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let admin = Router::new()
        .layer(middleware::from_fn(require_token))
        .get("/stats", stats);

    let app = Router::new()
        .layer(middleware::trace())
        .get("/", index)
        .get("/users/{id}", get_user)
        .post("/users", create_user)
        .delete("/users/{id}", delete_user)
        .get("/static/{path...}", asset)
        .mount("/admin", admin)
        .not_found(not_found);

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

async fn index(_req: Request) -> &'static str {
    "slashmux demo"
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
}

// POST /users
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }
    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}

// DELETE /users/{id} → 204 No Content
async fn delete_user(_req: Request) -> StatusCode {
    StatusCode::NO_CONTENT
}

// GET /static/{path...}
async fn asset(req: Request) -> String {
    format!("would serve {}", req.param("path").unwrap_or_default())
}

// GET /admin/stats — the admin router sees `/stats`
async fn stats(req: Request) -> String {
    format!("stats for {} (mounted at {})", req.path(), req.original_path())
}

async fn require_token(req: Request, next: Next) -> Response {
    if req.header("x-admin-token").is_none() {
        return Response::status(StatusCode::UNAUTHORIZED);
    }
    next.run(req).await
}

async fn not_found(req: Request) -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .text(format!("nothing at {}", req.path()))
}
