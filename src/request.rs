//! Incoming HTTP request type.

use bytes::Bytes;
use http::Method;

/// An incoming HTTP request as seen by handlers and middleware.
///
/// Built by the server from a hyper request, or by hand with [`Request::new`]
/// (handy in tests). The router fills in path parameters and the matched
/// pattern on its way to the handler.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) original_path: Option<String>,
    pub(crate) query: Option<String>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) pattern: Option<String>,
    pub(crate) tail: Option<String>,
}

impl Request {
    /// Creates a request for `target`, which may carry a `?query`.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_owned())),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_owned(),
            original_path: None,
            query,
            headers: Vec::new(),
            body: Bytes::new(),
            params: Vec::new(),
            pattern: None,
            tail: None,
        }
    }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Replaces the body. Returns `self` for chaining.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The path the request arrived with, before any mount stripped a prefix.
    pub fn original_path(&self) -> &str {
        self.original_path.as_deref().unwrap_or(&self.path)
    }

    /// The mux pattern that matched, e.g. `GET /users/{id}`.
    ///
    /// `None` until routed, and for requests served by a not-found handler.
    pub fn matched_pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns
    /// `Some("42")`. Parameters captured by an enclosing mount stay visible
    /// inside the mounted router; the innermost capture wins on name clashes.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Records a successful lookup.
    pub(crate) fn set_match(
        &mut self,
        pattern: &str,
        params: impl IntoIterator<Item = (String, String)>,
        tail: Option<String>,
    ) {
        self.pattern = Some(pattern.to_owned());
        self.params.extend(params);
        self.tail = tail;
    }

    /// Rewrites the path to what a mounted handler should see: the part the
    /// mount prefix did not consume, rooted at `/`.
    pub(crate) fn descend(&mut self) {
        let Some(tail) = self.tail.take() else { return };
        let inner = format!("/{tail}");
        let outer = std::mem::replace(&mut self.path, inner);
        self.original_path.get_or_insert(outer);
        self.pattern = None;
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        let target = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let mut out = Self::new(parts.method, target).with_body(body);
        out.headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        out
    }
}
