//! Unified error type.

use std::fmt;
use std::net::AddrParseError;

/// The error type returned by [`Server::serve`](crate::Server::serve).
///
/// Routing never fails with an `Error`: unmatched requests become `404`/`405`
/// responses, and misuse of the router (registering after the first request,
/// empty method or path, conflicting patterns) panics at setup time. This
/// type only surfaces transport failures.
#[derive(Debug)]
pub enum Error {
    /// The bind address is not a valid `host:port`.
    Addr(AddrParseError),
    /// Binding the listener failed.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addr(e) => write!(f, "invalid bind address: {e}"),
            Self::Io(e) => write!(f, "io: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Addr(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<AddrParseError> for Error {
    fn from(e: AddrParseError) -> Self {
        Self::Addr(e)
    }
}
