//! Request handler module
//!
//! Resolves request paths safely against the serving root and serves files,
//! index files, and directory listings.

pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
