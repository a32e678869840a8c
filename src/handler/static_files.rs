//! Static file serving module
//!
//! Maps request paths onto the root directory and builds file responses.
//! Nothing outside the canonical root is ever read: `..` segments are
//! dropped during translation and symlinks are checked after
//! canonicalization.

use std::io;
use std::path::{Component, Path, PathBuf};

use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use tokio::fs;

use crate::config::AppState;
use crate::handler::listing;
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, HttpResponse};
use crate::logger;

/// Translate a raw URL path into a filesystem path under `root`.
///
/// Returns `None` when the percent-decoded path is not valid UTF-8.
/// Empty, `.` and `..` segments are dropped, as is any segment that is
/// not a single plain path component on this platform.
pub fn translate_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(url_path).decode_utf8().ok()?;
    let mut path = root.to_path_buf();
    for segment in decoded.split('/') {
        if is_plain_segment(segment) {
            path.push(segment);
        }
    }
    Some(path)
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Resolve and serve a request path
pub async fn serve_path(ctx: &RequestContext<'_>, state: &AppState) -> HttpResponse {
    let Some(fs_path) = translate_path(&state.root, ctx.path) else {
        logger::log_warning(&format!("Undecodable request path: {}", ctx.path));
        return http::build_400_response();
    };

    let resolved = match contained_path(state, ctx.path, &fs_path).await {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    let metadata = match fs::metadata(&resolved).await {
        Ok(m) => m,
        Err(e) => return io_error_response(&e, &resolved),
    };

    if metadata.is_dir() {
        return serve_directory(ctx, state, &resolved).await;
    }

    // A trailing slash names a directory; files never match it
    if ctx.path.ends_with('/') {
        return http::build_404_response();
    }

    serve_file(ctx, &resolved).await
}

/// Serve a directory: redirect to the slash form, then index file, then listing
async fn serve_directory(
    ctx: &RequestContext<'_>,
    state: &AppState,
    dir: &Path,
) -> HttpResponse {
    if !ctx.path.ends_with('/') {
        // A leading "//" would make the location protocol-relative
        let path = ctx.path.trim_start_matches('/');
        let location = match ctx.query {
            Some(q) => format!("/{path}/?{q}"),
            None => format!("/{path}/"),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in &state.config.http.index_files {
        let candidate = dir.join(index_file);
        if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
            return match contained_path(state, ctx.path, &candidate).await {
                Ok(index_path) => serve_file(ctx, &index_path).await,
                Err(resp) => resp,
            };
        }
    }

    if state.config.http.directory_listing {
        listing::serve_listing(ctx, dir).await
    } else {
        http::build_404_response()
    }
}

/// Serve a single regular file
async fn serve_file(ctx: &RequestContext<'_>, path: &Path) -> HttpResponse {
    let modified = match fs::metadata(path).await {
        Ok(m) => m.modified().ok(),
        Err(e) => return io_error_response(&e, path),
    };
    let last_modified = modified.map(cache::http_date);

    if let (Some(time), Some(date)) = (modified, last_modified.as_deref()) {
        if cache::is_not_modified(ctx.if_modified_since.as_deref(), time) {
            return http::build_304_response(date);
        }
    }

    let content = match fs::read(path).await {
        Ok(c) => c,
        Err(e) => return io_error_response(&e, path),
    };

    http::response::build_file_response(
        Bytes::from(content),
        mime::content_type_for(path),
        last_modified.as_deref(),
        ctx.is_head,
    )
}

/// Canonicalize `fs_path` and verify it is still inside the root
async fn contained_path(
    state: &AppState,
    url_path: &str,
    fs_path: &Path,
) -> Result<PathBuf, HttpResponse> {
    let canonical = fs::canonicalize(fs_path)
        .await
        .map_err(|e| io_error_response(&e, fs_path))?;

    if canonical.starts_with(&state.root) {
        Ok(canonical)
    } else {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {url_path} -> {}",
            canonical.display()
        ));
        Err(http::build_404_response())
    }
}

/// Map a filesystem error to the response the client sees
pub fn io_error_response(err: &io::Error, path: &Path) -> HttpResponse {
    match err.kind() {
        io::ErrorKind::PermissionDenied => {
            logger::log_warning(&format!("Permission denied: {}", path.display()));
            http::build_403_response()
        }
        // Not found is the common case, no need to log it
        io::ErrorKind::NotFound => http::build_404_response(),
        _ => {
            logger::log_error(&format!("Failed to access '{}': {err}", path.display()));
            http::build_404_response()
        }
    }
}
