//! Directory listing module
//!
//! Renders an HTML page enumerating the immediate entries of a directory.

use super::path::encode_url_path;
use std::io;
use std::path::Path;
use tokio::fs;

/// One directory entry as shown in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    /// Directory, or symlink pointing at one
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Read the immediate entries of `dir`, sorted case-insensitively by name
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        let is_symlink = file_type.is_symlink();
        let is_dir = if is_symlink {
            // Dangling links are listed as plain entries
            fs::metadata(entry.path())
                .await
                .is_ok_and(|m| m.is_dir())
        } else {
            file_type.is_dir()
        };

        entries.push(ListingEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_dir,
            is_symlink,
        });
    }

    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page for `url_path` (decoded, e.g. `/docs/`)
pub fn render_listing(url_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(url_path));

    let mut html = String::with_capacity(256 + entries.len() * 64);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n<hr>\n<ul>\n"));

    for entry in entries {
        let mut link = entry.name.clone();
        let mut label = entry.name.clone();
        if entry.is_dir {
            link.push('/');
            label.push('/');
        }
        if entry.is_symlink {
            label = format!("{}@", entry.name);
        }
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            encode_url_path(&link),
            escape_html(&label)
        ));
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

/// Escape text for inclusion in HTML content or attributes
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
