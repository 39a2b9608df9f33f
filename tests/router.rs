use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use http::{Method, StatusCode};
use slashmux::middleware::{self, Middleware, Next};
use slashmux::pattern::is_remainder;
use slashmux::{Handler, Request, Response, Router};

const METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

fn hit(count: &Arc<AtomicUsize>) -> impl Handler {
    let count = Arc::clone(count);
    move |_req: Request| {
        count.fetch_add(1, Ordering::SeqCst);
        async { StatusCode::CREATED }
    }
}

fn record(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> impl Middleware {
    let log = Arc::clone(log);
    middleware::from_fn(move |req, next: Next| {
        log.lock().unwrap().push(name);
        next.run(req)
    })
}

async fn send(router: &Router, method: Method, path: &str) -> Response {
    router.dispatch(Request::new(method, path)).await
}

fn take(count: &AtomicUsize) -> usize {
    count.swap(0, Ordering::SeqCst)
}

#[tokio::test]
async fn shorthands_register_their_method_only() {
    let count = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .get("/hello_get", hit(&count))
        .head("/hello_head", hit(&count))
        .post("/hello_post", hit(&count))
        .put("/hello_put", hit(&count))
        .patch("/hello_patch", hit(&count))
        .delete("/hello_delete", hit(&count))
        .connect("/hello_connect", hit(&count))
        .options("/hello_options", hit(&count))
        .trace("/hello_trace", hit(&count));

    for method in METHODS {
        let route = format!("/hello_{}", method.as_str().to_lowercase());
        send(&router, method.clone(), &route).await;
        assert_eq!(take(&count), 1, "{method} {route} should be served once");

        for wrong in METHODS {
            // GET routes answer HEAD as well.
            if wrong == method || (wrong == Method::HEAD && method == Method::GET) {
                continue;
            }
            send(&router, wrong.clone(), &route).await;
            assert_eq!(take(&count), 0, "{route} must not answer {wrong}");
        }
    }
}

#[tokio::test]
async fn get_route_answers_head() {
    let count = Arc::new(AtomicUsize::new(0));
    let router = Router::new().get("/page", hit(&count));

    let res = send(&router, Method::HEAD, "/page").await;

    assert_eq!(res.code(), StatusCode::CREATED);
    assert_eq!(take(&count), 1);
}

#[tokio::test]
async fn trailing_slash_is_optional() {
    let cases = [
        ("no_trailing_slash", "/hello"),
        ("trailing_slash", "/hello/"),
        ("strict_ending", "/hello/{$}"),
        ("wildcard", "/{hello}"),
        ("wildcard_trailing_slash", "/{hello}/"),
        ("wildcard_strict_ending", "/{hello}/{$}"),
        ("remainder", "/{hello...}"),
    ];
    for (name, path) in cases {
        let count = Arc::new(AtomicUsize::new(0));
        let router = Router::new().get(path, hit(&count));

        for request in ["/hello", "/hello/"] {
            let res = send(&router, Method::GET, request).await;
            assert_eq!(res.code(), StatusCode::CREATED, "{name}: GET {request}");
        }
        assert_eq!(take(&count), 2, "{name}");
    }
}

#[tokio::test]
async fn root_is_exact() {
    let count = Arc::new(AtomicUsize::new(0));
    let router = Router::new().get("/", hit(&count));

    assert_eq!(send(&router, Method::GET, "/").await.code(), StatusCode::CREATED);
    assert_eq!(send(&router, Method::GET, "/x").await.code(), StatusCode::NOT_FOUND);
    assert_eq!(take(&count), 1);
}

#[tokio::test]
async fn remainder_captures_the_rest() {
    let router = Router::new().get("/foo/{bar...}", |req: Request| async move {
        req.param("bar").unwrap_or("<none>").to_owned()
    });

    assert_eq!(send(&router, Method::GET, "/foo/bar").await.body(), b"bar");
    assert_eq!(send(&router, Method::GET, "/foo/bar/").await.body(), b"bar/");
    assert_eq!(send(&router, Method::GET, "/foo/a/b/c").await.body(), b"a/b/c");
}

#[test]
fn remainder_detection() {
    assert!(is_remainder("/{x...}"));
    assert!(!is_remainder("/{x}"));
    assert!(!is_remainder(""));
    assert!(!is_remainder("/"));
    assert!(!is_remainder("/a/{...}"));
    assert!(!is_remainder("/a/...}"));
}

#[tokio::test]
async fn path_params_reach_the_handler() {
    let router = Router::new().get("/users/{id}", |req: Request| async move {
        format!("{} via {}", req.param("id").unwrap_or_default(), req.matched_pattern().unwrap_or_default())
    });

    let res = send(&router, Method::GET, "/users/42/").await;

    assert_eq!(res.body(), b"42 via GET /users/{id}/{$}");
}

#[tokio::test]
async fn middleware_runs_in_declared_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler_log = Arc::clone(&log);
    let router = Router::new()
        .layers([record(&log, "one"), record(&log, "two")])
        .layer(record(&log, "three"))
        .get("/hello", move |_req: Request| {
            handler_log.lock().unwrap().push("four");
            async {}
        });

    send(&router, Method::GET, "/hello").await;

    assert_eq!(*log.lock().unwrap(), ["one", "two", "three", "four"]);
}

#[tokio::test]
async fn middleware_sees_the_response_last() {
    let router = Router::new()
        .layer(middleware::from_fn(|req, next: Next| async move {
            let mut res = next.run(req).await;
            res.insert_header("x-outer", "1");
            res
        }))
        .get("/", |_req: Request| async { "home" });

    let res = send(&router, Method::GET, "/").await;

    assert_eq!(res.header("x-outer"), Some("1"));
    assert_eq!(res.body(), b"home");
}

#[tokio::test]
async fn not_found_handler_only_for_unmatched() {
    let hello = Arc::new(AtomicUsize::new(0));
    let missing = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .get("/hello", hit(&hello))
        .not_found(hit(&missing));

    send(&router, Method::GET, "/hello").await;
    assert_eq!((take(&hello), take(&missing)), (1, 0));

    send(&router, Method::GET, "/").await;
    assert_eq!((take(&hello), take(&missing)), (0, 1));

    send(&router, Method::POST, "/another").await;
    assert_eq!((take(&hello), take(&missing)), (0, 1));

    // Wrong method on a known path is unmatched too.
    send(&router, Method::POST, "/hello").await;
    assert_eq!((take(&hello), take(&missing)), (0, 1));
}

#[tokio::test]
async fn not_found_goes_through_middleware() {
    let seen = Arc::new(AtomicUsize::new(0));
    let home = Arc::new(AtomicUsize::new(0));
    let missing = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .layer({
            let seen = Arc::clone(&seen);
            move |next: Next| {
                seen.fetch_add(1, Ordering::SeqCst);
                next
            }
        })
        .layer({
            let seen = Arc::clone(&seen);
            middleware::from_fn(move |req, next: Next| {
                seen.fetch_add(1, Ordering::SeqCst);
                next.run(req)
            })
        })
        .get("/", hit(&home))
        .not_found(hit(&missing));

    send(&router, Method::POST, "/another").await;

    // One wrap at seal time, one pass through the closure middleware.
    assert_eq!(take(&seen), 2);
    assert_eq!(take(&home), 0);
    assert_eq!(take(&missing), 1);

    send(&router, Method::GET, "/").await;
    assert_eq!(take(&seen), 1);
    assert_eq!(take(&home), 1);
    assert_eq!(take(&missing), 0);
}

#[tokio::test]
async fn last_not_found_wins() {
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .not_found(hit(&first))
        .not_found(hit(&second));

    send(&router, Method::GET, "/nowhere").await;

    assert_eq!((take(&first), take(&second)), (0, 1));
}

#[tokio::test]
async fn default_unmatched_responses() {
    let router = Router::new()
        .get("/hello", |_req: Request| async {})
        .layer(middleware::trace());

    let res = send(&router, Method::GET, "/missing").await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);

    let res = send(&router, Method::POST, "/hello/").await;
    assert_eq!(res.code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.header("allow"), Some("GET, HEAD"));
}

#[tokio::test]
async fn middleware_sees_default_unmatched_responses() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .layer(middleware::from_fn({
            let seen = Arc::clone(&seen);
            move |req, next: Next| {
                let seen = Arc::clone(&seen);
                async move {
                    let res = next.run(req).await;
                    seen.lock().unwrap().push(res.code());
                    res
                }
            }
        }))
        .get("/hello", |_req: Request| async {});

    send(&router, Method::GET, "/missing").await;
    send(&router, Method::POST, "/hello").await;
    send(&router, Method::GET, "/hello").await;

    assert_eq!(
        *seen.lock().unwrap(),
        [StatusCode::NOT_FOUND, StatusCode::METHOD_NOT_ALLOWED, StatusCode::OK],
    );
}

#[tokio::test]
async fn exact_routes_coexist_with_remainders() {
    let router = Router::new()
        .get("/", |_req: Request| async { "root" })
        .get("/{rest...}", |_req: Request| async { "rest" })
        .get("/files", |_req: Request| async { "files" })
        .get("/files/{path...}", |_req: Request| async { "file" })
        .get("/a/{id}", |_req: Request| async { "id" })
        .get("/a/{rest...}", |_req: Request| async { "a-rest" });

    let cases: [(&str, &[u8]); 8] = [
        ("/", b"root"),
        ("/x", b"rest"),
        ("/files", b"files"),
        ("/files/", b"files"),
        ("/files/a/b", b"file"),
        ("/a/1", b"id"),
        ("/a/1/", b"id"),
        ("/a/1/2", b"a-rest"),
    ];
    for (path, body) in cases {
        assert_eq!(send(&router, Method::GET, path).await.body(), body, "{path}");
    }
}

#[tokio::test]
async fn mount_beats_shallower_catch_all() {
    let api = Router::new().get("/users", |_req: Request| async { "api" });
    let router = Router::new()
        .get("/{page...}", |_req: Request| async { "spa" })
        .mount("/api", api);

    assert_eq!(send(&router, Method::GET, "/api/users").await.body(), b"api");
    assert_eq!(send(&router, Method::HEAD, "/api/users").await.code(), StatusCode::OK);
    assert_eq!(send(&router, Method::GET, "/other").await.body(), b"spa");
    assert_eq!(send(&router, Method::GET, "/api/missing").await.code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn escaped_paths_are_matched_decoded() {
    let router = Router::new()
        .get("/hello world", |_req: Request| async { "spaced" })
        .get("/users/{name}", |req: Request| async move {
            req.param("name").unwrap_or_default().to_owned()
        });

    assert_eq!(send(&router, Method::GET, "/hello%20world").await.body(), b"spaced");
    assert_eq!(send(&router, Method::GET, "/hello%20world/").await.body(), b"spaced");
    assert_eq!(send(&router, Method::GET, "/users/j%C3%BCrgen").await.body(), "jürgen".as_bytes());
    assert_eq!(send(&router, Method::GET, "/users/a%2Fb").await.body(), b"a%2Fb");
}

#[tokio::test]
async fn mount_strips_the_prefix() {
    let hello = Arc::new(AtomicUsize::new(0));
    let nested = Arc::new(AtomicUsize::new(0));
    let seen_paths = Arc::new(Mutex::new(Vec::new()));

    let sub = Router::new().get("/hello", {
        let nested = Arc::clone(&nested);
        let seen_paths = Arc::clone(&seen_paths);
        move |req: Request| {
            nested.fetch_add(1, Ordering::SeqCst);
            seen_paths.lock().unwrap().push((req.path().to_owned(), req.original_path().to_owned()));
            async {}
        }
    });
    let router = Router::new()
        .get("/hello", hit(&hello))
        .mount("/prefix", sub);

    send(&router, Method::GET, "/hello").await;
    assert_eq!((take(&hello), take(&nested)), (1, 0));

    let res = send(&router, Method::GET, "/prefix/").await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
    assert_eq!((take(&hello), take(&nested)), (0, 0));

    send(&router, Method::GET, "/prefix/hello").await;
    send(&router, Method::GET, "/prefix/hello/").await;
    assert_eq!((take(&hello), take(&nested)), (0, 2));

    assert_eq!(
        *seen_paths.lock().unwrap(),
        [
            ("/hello".to_owned(), "/prefix/hello".to_owned()),
            ("/hello/".to_owned(), "/prefix/hello/".to_owned()),
        ],
    );
}

#[tokio::test]
async fn mounted_root_is_reachable_when_registered() {
    let sub = Router::new().get("/", |_req: Request| async { "sub root" });
    let router = Router::new().mount("/prefix/", sub);

    assert_eq!(send(&router, Method::GET, "/prefix/").await.body(), b"sub root");
    assert_eq!(send(&router, Method::DELETE, "/prefix/").await.code(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn mount_keeps_prefix_params() {
    let sub = Router::new().get("/info", |req: Request| async move {
        req.param("tenant").unwrap_or_default().to_owned()
    });
    let router = Router::new().mount("/t/{tenant}", sub);

    assert_eq!(send(&router, Method::GET, "/t/acme/info").await.body(), b"acme");
}

#[tokio::test]
async fn mount_accepts_plain_handlers() {
    let router = Router::new().mount("/raw", |req: Request| async move {
        format!("{} {}", req.method(), req.path())
    });

    assert_eq!(send(&router, Method::PUT, "/raw/a/b").await.body(), b"PUT /a/b");
}

#[tokio::test]
async fn first_request_seals_the_router() {
    let router = Router::new().get("/", |_req: Request| async {});
    assert!(!router.is_sealed());

    send(&router, Method::GET, "/").await;
    send(&router, Method::GET, "/").await;

    assert!(router.is_sealed());
}

#[tokio::test]
#[should_panic(expected = "router is sealed: `handle`")]
async fn register_after_first_request_panics() {
    let router = Router::new().get("/a", |_req: Request| async {});
    send(&router, Method::GET, "/a").await;
    let _ = router.get("/b", |_req: Request| async {});
}

#[tokio::test]
#[should_panic(expected = "router is sealed: `layer`")]
async fn layer_after_first_request_panics() {
    let router = Router::new();
    send(&router, Method::GET, "/").await;
    let _ = router.layer(|next: Next| next);
}

#[tokio::test]
#[should_panic(expected = "router is sealed: `not_found`")]
async fn not_found_after_first_request_panics() {
    let router = Router::new();
    send(&router, Method::GET, "/").await;
    let _ = router.not_found(|_req: Request| async {});
}

#[tokio::test]
#[should_panic(expected = "router is sealed: `mount`")]
async fn mount_after_first_request_panics() {
    let router = Router::new();
    send(&router, Method::GET, "/").await;
    let _ = router.mount("/sub", Router::new());
}

#[test]
#[should_panic(expected = "path cannot be empty")]
fn empty_path_panics() {
    let _ = Router::new().handle("GET", "", |_req: Request| async {});
}

#[test]
#[should_panic(expected = "method cannot be empty")]
fn empty_method_panics() {
    let _ = Router::new().handle("", "/a", |_req: Request| async {});
}

#[tokio::test]
#[should_panic(expected = "boom")]
async fn handler_panics_propagate_through_middleware() {
    let router = Router::new()
        .layer(middleware::from_fn(|req, next: Next| next.run(req)))
        .get("/", explode);
    send(&router, Method::GET, "/").await;
}

async fn explode(_req: Request) -> Response {
    panic!("boom")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_requests_build_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let served = Arc::new(AtomicUsize::new(0));
    let router = Arc::new(
        Router::new()
            .layer({
                let builds = Arc::clone(&builds);
                move |next: Next| {
                    builds.fetch_add(1, Ordering::SeqCst);
                    next
                }
            })
            .get("/", hit(&served)),
    );

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..32 {
        let router = Arc::clone(&router);
        tasks.spawn(async move { router.dispatch(Request::new(Method::GET, "/")).await.code() });
    }
    while let Some(code) = tasks.join_next().await {
        assert_eq!(code.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(served.load(Ordering::SeqCst), 32);
}
