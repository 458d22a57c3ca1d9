//! HTTP cache validation module
//!
//! Provides `Last-Modified` formatting and `If-Modified-Since` handling.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// Format a timestamp as an HTTP date (IMF-fixdate)
///
/// # Returns
/// e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    let time: DateTime<Utc> = time.into();
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP date header value
///
/// Accepts IMF-fixdate and other RFC 2822 forms. Returns `None` when the
/// value cannot be parsed.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Check if the client's cached copy is still current
///
/// # Arguments
/// * `if_modified_since` - Client-sent If-Modified-Since header
/// * `modified` - File modification time
///
/// # Returns
/// Returns true if the file has not changed since the client's date (should return 304)
pub fn is_not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    // HTTP dates carry whole seconds only
    let modified: DateTime<Utc> = modified.into();
    modified.timestamp() <= since.timestamp()
}
