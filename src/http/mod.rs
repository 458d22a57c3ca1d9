//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from file serving.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_301_response, build_304_response, build_400_response, build_403_response,
    build_404_response, build_500_response, build_501_response, build_file_response,
    build_html_response, ResponseBody,
};
