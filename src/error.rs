//! Error types
//!
//! `ServerError` covers fatal startup and accept-loop failures.
//! `PathError` covers request paths that cannot be mapped onto the serving root.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal server errors. Any of these ends the process with a non-zero exit.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid listen address '{addr}': {source}")]
    Address {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("serving root '{}' is not usable: {source}", path.display())]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open log file: {0}")]
    Logging(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Reasons a request path is rejected before touching the filesystem.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// Percent-decoding produced bytes that are not UTF-8
    #[error("request path is not valid UTF-8 after decoding")]
    InvalidEncoding,

    /// A segment holds NUL, a backslash, or a platform path prefix
    #[error("request path contains a forbidden character")]
    ForbiddenCharacter,

    /// `..` segments climb above the serving root
    #[error("request path escapes the serving root")]
    Traversal,
}
