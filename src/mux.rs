//! Exact-match request multiplexer.
//!
//! The routing engine the [`Router`](crate::Router) feeds. It knows nothing
//! about trailing-slash equivalence or middleware; it maps `"METHOD /path"`
//! patterns to handlers and answers lookups. Each method (plus one slot for
//! method-less patterns) owns a table of exact routes in a radix tree and a
//! list of wide routes, the prefix and remainder patterns.
//!
//! # Pattern syntax
//!
//! | Pattern          | Matches                                           |
//! |------------------|---------------------------------------------------|
//! | `GET /a/b`       | exactly `/a/b`                                    |
//! | `GET /a/b/{$}`   | exactly `/a/b/`                                   |
//! | `GET /a/`        | `/a/` and everything below it                     |
//! | `GET /a/{id}`    | one segment, captured as `id`                     |
//! | `GET /a/{p...}`  | the rest of the path (possibly empty) as `p`      |
//! | `/a/`            | as above, for every method                        |
//!
//! A `GET` pattern also answers `HEAD`.
//!
//! # Precedence
//!
//! 1. An exact route beats any wide route, so `/{$}` and `/{rest...}` can
//!    live side by side and `/` goes to the former.
//! 2. Among wide routes the one with the deeper prefix wins:
//!    `/api/` (a mount) beats `GET /{page...}` for `GET /api/users`.
//! 3. On equal footing a method-specific route beats a method-less one, and
//!    an earlier registration beats a later one.
//!
//! # Escaping
//!
//! Paths are matched percent-decoded: `GET /hello world` answers
//! `/hello%20world`, and captured parameters come out decoded. `%2F` and
//! `%25` stay encoded so a decoded path never gains segments and a mounted
//! router never decodes twice.

use std::borrow::Cow;
use std::collections::HashMap;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::BoxedHandler;
use crate::pattern::{STRICT_END, is_remainder};
use crate::response::Response;

/// Catch-all parameter name used for prefix patterns. Never exposed.
const PREFIX_TAIL: &str = "__mux_tail";

/// How a matchit route relates to the pattern it was derived from.
#[derive(Clone, Debug)]
enum Shape {
    Exact,
    /// `/a/` itself, for a prefix pattern `/a/`.
    PrefixBase,
    /// `/a/{*__mux_tail}`, for a prefix pattern `/a/`.
    PrefixTail,
    /// `/a/` for a remainder pattern `/a/{name...}`: binds `name` to `""`.
    RemainderBase(String),
    /// `/a/{*name}` for a remainder pattern `/a/{name...}`.
    RemainderTail,
}

struct Endpoint {
    pattern: String,
    handler: BoxedHandler,
    shape: Shape,
}

/// A successful lookup.
pub(crate) struct Matched {
    pub(crate) pattern: String,
    pub(crate) handler: BoxedHandler,
    pub(crate) params: Vec<(String, String)>,
    /// The part of the path below a prefix pattern, if one matched.
    pub(crate) tail: Option<String>,
}

/// One prefix or remainder pattern. Kept in its own tree so it never
/// collides with exact routes or other wide routes.
struct Wide {
    path: String,
    depth: usize,
    routes: MatchitRouter<Endpoint>,
}

#[derive(Default)]
struct Table {
    exact: MatchitRouter<Endpoint>,
    wide: Vec<Wide>,
}

impl Table {
    fn exact(&self, path: &str) -> Option<Matched> {
        find(&self.exact, path)
    }

    /// Deepest matching wide route, earliest registration on ties.
    fn wide(&self, path: &str) -> Option<(usize, Matched)> {
        self.wide.iter()
            .rev()
            .filter_map(|w| Some((w.depth, find(&w.routes, path)?)))
            .max_by_key(|(depth, _)| *depth)
    }

    fn matches(&self, path: &str) -> bool {
        self.exact.at(path).is_ok() || self.wide.iter().any(|w| w.routes.at(path).is_ok())
    }
}

#[derive(Default)]
pub(crate) struct Mux {
    by_method: HashMap<Method, Table>,
    any: Table,
}

impl Mux {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `pattern` (`"METHOD /path"` or `"/path"`).
    ///
    /// # Panics
    ///
    /// Panics on a malformed pattern or one that conflicts with an existing
    /// registration.
    pub(crate) fn register(&mut self, pattern: &str, handler: BoxedHandler) {
        let (method, path) = match pattern.split_once(' ') {
            Some((method, path)) => {
                let method = Method::from_bytes(method.as_bytes())
                    .unwrap_or_else(|_| panic!("invalid method in pattern `{pattern}`"));
                (Some(method), path)
            }
            None => (None, pattern),
        };
        assert!(path.starts_with('/'), "pattern `{pattern}` must start with `/`");

        let table = match method {
            Some(method) => self.by_method.entry(method).or_default(),
            None => &mut self.any,
        };
        let routes = translate(path);
        let tree = match routes.first() {
            Some((prefix, Shape::PrefixBase | Shape::RemainderBase(_))) => {
                assert!(
                    table.wide.iter().all(|w| w.path != path),
                    "pattern `{pattern}` conflicts with an existing route: registered twice",
                );
                let depth = prefix.matches('/').count();
                table.wide.push(Wide { path: path.to_owned(), depth, routes: MatchitRouter::new() });
                match table.wide.last_mut() {
                    Some(wide) => &mut wide.routes,
                    None => unreachable!("wide route was just pushed"),
                }
            }
            _ => &mut table.exact,
        };
        for (route, shape) in routes {
            tracing::trace!(%pattern, %route, "registering route");
            let endpoint = Endpoint {
                pattern: pattern.to_owned(),
                handler: BoxedHandler::clone(&handler),
                shape,
            };
            tree.insert(route.as_str(), endpoint)
                .unwrap_or_else(|e| panic!("pattern `{pattern}` conflicts with an existing route: {e}"));
        }
    }

    /// Finds the handler registered for `method` + `path`.
    pub(crate) fn lookup(&self, method: &Method, path: &str) -> Option<Matched> {
        let path = unescape(path);
        let get = (*method == Method::HEAD)
            .then(|| self.by_method.get(&Method::GET))
            .flatten();
        // Highest priority first.
        let tables: Vec<&Table> = self.by_method.get(method).into_iter()
            .chain(get)
            .chain(std::iter::once(&self.any))
            .collect();

        if let Some(matched) = tables.iter().find_map(|table| table.exact(&path)) {
            return Some(matched);
        }
        tables.iter()
            .enumerate()
            .filter_map(|(rank, table)| table.wide(&path).map(|(depth, m)| (depth, rank, m)))
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, _, matched)| matched)
    }

    /// The engine's own answer when nothing matched: `405` with an `Allow`
    /// header if the path exists under other methods, `404` otherwise.
    pub(crate) fn unmatched(&self, path: &str) -> Response {
        let path = unescape(path);
        let mut allowed: Vec<&str> = self.by_method.iter()
            .filter(|(_, table)| table.matches(&path))
            .map(|(method, _)| method.as_str())
            .collect();
        if allowed.is_empty() {
            return Response::builder()
                .status(StatusCode::NOT_FOUND)
                .text("404 page not found\n");
        }
        if allowed.contains(&"GET") {
            allowed.push("HEAD");
        }
        allowed.sort_unstable();
        allowed.dedup();
        Response::builder()
            .status(StatusCode::METHOD_NOT_ALLOWED)
            .header("allow", &allowed.join(", "))
            .text("Method Not Allowed\n")
    }
}

fn find(tree: &MatchitRouter<Endpoint>, path: &str) -> Option<Matched> {
    let matched = tree.at(path).ok()?;
    let endpoint = matched.value;
    let mut params: Vec<(String, String)> = matched.params.iter()
        .filter(|(k, _)| *k != PREFIX_TAIL)
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect();
    let tail = match &endpoint.shape {
        Shape::Exact | Shape::RemainderTail => None,
        Shape::RemainderBase(name) => {
            params.push((name.clone(), String::new()));
            None
        }
        Shape::PrefixBase => Some(String::new()),
        Shape::PrefixTail => matched.params.get(PREFIX_TAIL).map(str::to_owned),
    };
    Some(Matched {
        pattern: endpoint.pattern.clone(),
        handler: BoxedHandler::clone(&endpoint.handler),
        params,
        tail,
    })
}

/// Maps a mux path onto one or two matchit routes. Wide patterns put their
/// base route first.
fn translate(path: &str) -> Vec<(String, Shape)> {
    if let Some(base) = path.strip_suffix(STRICT_END) {
        return vec![(format!("{base}/"), Shape::Exact)];
    }
    if is_remainder(path) {
        let last = path.rsplit('/').next().unwrap_or_default();
        let prefix = &path[..path.len() - last.len()];
        let name = &last[1..last.len() - "...}".len()];
        return vec![
            (prefix.to_owned(), Shape::RemainderBase(name.to_owned())),
            (format!("{prefix}{{*{name}}}"), Shape::RemainderTail),
        ];
    }
    if path.ends_with('/') {
        return vec![
            (path.to_owned(), Shape::PrefixBase),
            (format!("{path}{{*{PREFIX_TAIL}}}"), Shape::PrefixTail),
        ];
    }
    vec![(path.to_owned(), Shape::Exact)]
}

/// Percent-decodes a request path, leaving `%2F` and `%25` encoded.
///
/// Borrows when there is nothing to decode. Malformed escapes pass through.
fn unescape(path: &str) -> Cow<'_, str> {
    if !path.contains('%') {
        return Cow::Borrowed(path);
    }

    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let decoded = match bytes.get(i..i + 3) {
            Some([b'%', hi, lo]) => hex_digit(*hi).zip(hex_digit(*lo)).map(|(h, l)| h << 4 | l),
            _ => None,
        };
        match decoded {
            Some(b) if b != b'/' && b != b'%' => {
                out.push(b);
                i += 3;
            }
            _ => {
                out.push(bytes[i]);
                i += 1;
            }
        }
    }
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
