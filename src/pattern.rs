//! Path canonicalization.
//!
//! Turns one caller registration into the patterns handed to the [`Mux`].
//! Every registered path becomes reachable with and without a trailing
//! slash, except for two shapes that must stay as written:
//!
//! | Caller path        | Derived patterns                       |
//! |--------------------|----------------------------------------|
//! | `/hello`           | `GET /hello`, `GET /hello/{$}`         |
//! | `/hello/`          | `GET /hello`, `GET /hello/{$}`         |
//! | `/hello/{$}`       | `GET /hello`, `GET /hello/{$}`         |
//! | `/`                | `GET /{$}`                             |
//! | `/files/{rest...}` | `GET /files/{rest...}`                 |
//!
//! A remainder segment already swallows any trailing slash, and the root
//! must not turn into a catch-everything prefix.
//!
//! [`Mux`]: crate::mux::Mux

/// Strict-end marker understood by the mux.
pub(crate) const STRICT_END: &str = "/{$}";

/// Reports whether the last segment of `path` is a remainder wildcard such as
/// `{name...}`.
///
/// The segment needs at least one name character, so it is six characters or
/// longer: `{` + name + `...}`.
pub fn is_remainder(path: &str) -> bool {
    let last = path.rsplit('/').next().unwrap_or_default();
    last.len() >= 6 && last.starts_with('{') && last.ends_with("...}")
}

/// Derives the mux patterns for a `method` + `path` registration.
///
/// # Panics
///
/// Panics if `method` or `path` is empty.
pub fn canonical_patterns(method: &str, path: &str) -> Vec<String> {
    assert!(!method.is_empty(), "method cannot be empty");
    assert!(!path.is_empty(), "path cannot be empty");

    if is_remainder(path) {
        return vec![format!("{method} {path}")];
    }
    if path == "/" {
        return vec![format!("{method} {STRICT_END}")];
    }

    // Slash first, then the marker: `/x/{$}/` is never produced.
    let base = path.strip_suffix('/').unwrap_or(path);
    let base = base.strip_suffix(STRICT_END).unwrap_or(base);
    vec![format!("{method} {base}"), format!("{method} {base}{STRICT_END}")]
}

/// Normalizes a mount prefix to end in exactly one `/`.
///
/// `/api` and `/api/` both become `/api/`; an empty prefix becomes `/`.
pub fn mount_prefix(prefix: &str) -> String {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    format!("{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_detection() {
        let cases = [
            ("/{hello...}", true),
            ("/one/{two...}", true),
            ("/", false),
            ("", false),
            ("/{hello}", false),
            ("/one/{two}", false),
            ("/one/...}", false),
            ("/one/{...}", false),
        ];
        for (path, want) in cases {
            assert_eq!(is_remainder(path), want, "is_remainder({path:?})");
        }
    }

    #[test]
    fn plain_path_gets_both_variants() {
        assert_eq!(
            canonical_patterns("GET", "/hello"),
            ["GET /hello", "GET /hello/{$}"],
        );
    }

    #[test]
    fn trailing_slash_and_strict_end_collapse() {
        let plain = canonical_patterns("POST", "/hello");
        assert_eq!(canonical_patterns("POST", "/hello/"), plain);
        assert_eq!(canonical_patterns("POST", "/hello/{$}"), plain);
    }

    #[test]
    fn wildcard_segment_is_treated_like_a_plain_one() {
        assert_eq!(
            canonical_patterns("GET", "/{id}/"),
            ["GET /{id}", "GET /{id}/{$}"],
        );
    }

    #[test]
    fn root_is_strict() {
        assert_eq!(canonical_patterns("GET", "/"), ["GET /{$}"]);
    }

    #[test]
    fn remainder_is_registered_once() {
        assert_eq!(
            canonical_patterns("GET", "/files/{rest...}"),
            ["GET /files/{rest...}"],
        );
    }

    #[test]
    #[should_panic(expected = "path cannot be empty")]
    fn empty_path_panics() {
        canonical_patterns("GET", "");
    }

    #[test]
    #[should_panic(expected = "method cannot be empty")]
    fn empty_method_panics() {
        canonical_patterns("", "/hello");
    }

    #[test]
    fn mount_prefix_ends_in_one_slash() {
        assert_eq!(mount_prefix("/api"), "/api/");
        assert_eq!(mount_prefix("/api/"), "/api/");
        assert_eq!(mount_prefix(""), "/");
        assert_eq!(mount_prefix("/"), "/");
    }
}
