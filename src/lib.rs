//! dirhost: serve one directory tree over HTTP/1.1.
//!
//! GET and HEAD only. Files are returned with an inferred `Content-Type`,
//! directories as an index file or a generated listing. Paths that would
//! leave the serving root are refused.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::Config;
pub use error::{PathError, ServerError};
pub use server::Server;
