//! Static file serving module
//!
//! Maps a request onto the serving root and returns a file, an index file,
//! a directory listing, or an error status.

use super::listing;
use super::path::{self, encode_url_path, RequestTarget};
use super::router::RequestContext;
use crate::config::{is_within_root, AppState};
use crate::error::PathError;
use crate::http::{self, cache, mime, ResponseBody};
use crate::logger;
use hyper::Response;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};

/// Serve the request path from the serving root
pub async fn serve(ctx: &RequestContext<'_>, state: &AppState) -> Response<ResponseBody> {
    let target = match path::resolve(&state.root, ctx.path) {
        Ok(target) => target,
        Err(PathError::Traversal) => {
            logger::log_warning(&format!("Path traversal attempt blocked: {}", ctx.path));
            return http::build_403_response(ctx.is_head);
        }
        Err(e) => {
            logger::log_warning(&format!("Rejected request path '{}': {e}", ctx.path));
            return http::build_400_response(ctx.is_head);
        }
    };

    let (canonical, metadata) = match open_within_root(&state.root, &target.fs_path, ctx).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &target, &canonical).await;
    }

    // A file cannot be addressed as a directory
    if target.trailing_slash {
        return http::build_404_response(ctx.is_head);
    }

    serve_file(ctx, &target.fs_path, &canonical, &metadata).await
}

/// Canonicalize `candidate` and stat it, refusing anything outside `root`.
///
/// Symlinks are followed; the link target must still lie under the root.
async fn open_within_root(
    root: &Path,
    candidate: &Path,
    ctx: &RequestContext<'_>,
) -> Result<(PathBuf, Metadata), Response<ResponseBody>> {
    let canonical = fs::canonicalize(candidate)
        .await
        .map_err(|e| io_error_response(&e, ctx.is_head))?;

    if !is_within_root(root, &canonical) {
        logger::log_warning(&format!(
            "Path escapes serving root: {} -> {}",
            ctx.path,
            canonical.display()
        ));
        return Err(http::build_403_response(ctx.is_head));
    }

    let metadata = fs::metadata(&canonical)
        .await
        .map_err(|e| io_error_response(&e, ctx.is_head))?;

    Ok((canonical, metadata))
}

/// Serve a directory: redirect to the slash form, an index file, or a listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    target: &RequestTarget,
    dir: &Path,
) -> Response<ResponseBody> {
    if !target.trailing_slash {
        // `/.` and `/x/..` normalize to the root, whose url_path already ends in `/`
        let mut location = encode_url_path(&target.url_path);
        if !location.ends_with('/') {
            location.push('/');
        }
        if let Some(query) = ctx.query {
            location.push('?');
            location.push_str(query);
        }
        return http::build_301_response(&location, ctx.is_head);
    }

    for index_file in &state.config.http.index_files {
        let candidate = target.fs_path.join(index_file);
        let Ok((canonical, metadata)) = open_within_root(&state.root, &candidate, ctx).await
        else {
            continue;
        };
        if metadata.is_file() {
            return serve_file(ctx, &candidate, &canonical, &metadata).await;
        }
    }

    if !state.config.http.directory_listing {
        return http::build_403_response(ctx.is_head);
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            let html = listing::render_listing(&target.url_path, &entries);
            http::build_html_response(html, ctx.is_head)
        }
        Err(e) => {
            logger::log_error(&format!(
                "Failed to list directory '{}': {e}",
                dir.display()
            ));
            io_error_response(&e, ctx.is_head)
        }
    }
}

/// Serve a regular file, streaming its contents
///
/// `requested` decides the Content-Type; `canonical` is what gets read.
async fn serve_file(
    ctx: &RequestContext<'_>,
    requested: &Path,
    canonical: &Path,
    metadata: &Metadata,
) -> Response<ResponseBody> {
    let modified = metadata.modified().ok();
    let last_modified = modified.map(cache::format_http_date);

    if let (Some(modified), Some(last_modified)) = (modified, last_modified.as_deref()) {
        if cache::is_not_modified(ctx.if_modified_since.as_deref(), modified) {
            return http::build_304_response(last_modified);
        }
    }

    // HEAD never opens the file; Content-Length comes from the metadata
    let file = if ctx.is_head {
        None
    } else {
        match File::open(canonical).await {
            Ok(file) => Some(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return http::build_404_response(ctx.is_head);
            }
            Err(e) => {
                logger::log_error(&format!(
                    "Failed to open file '{}': {e}",
                    canonical.display()
                ));
                return http::build_500_response(ctx.is_head);
            }
        }
    };

    http::build_file_response(
        file,
        metadata.len(),
        mime::content_type_for(requested),
        last_modified.as_deref(),
    )
}

/// Map a filesystem error to a client-facing status
fn io_error_response(err: &io::Error, is_head: bool) -> Response<ResponseBody> {
    match err.kind() {
        io::ErrorKind::PermissionDenied => http::build_403_response(is_head),
        _ => http::build_404_response(is_head),
    }
}
