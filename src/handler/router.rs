//! Request dispatch module
//!
//! Entry point for HTTP request processing: answers preflight requests,
//! hands everything else to static file serving, and stamps CORS headers
//! on whatever comes back.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::header::{
    HeaderName, CONTENT_LENGTH, IF_MODIFIED_SINCE, REFERER, SERVER, USER_AGENT,
};
use hyper::{Method, Request, Version};

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, HttpResponse};
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
#[derive(Debug)]
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) URL path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_modified_since: req
                .headers()
                .get(IF_MODIFIED_SINCE)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<HttpResponse, Infallible> {
    let started = Instant::now();
    // The body is never read; keep only the head across the await
    let (parts, _) = req.into_parts();
    let req = Request::from_parts(parts, ());
    let response = respond(&req, &state).await;

    if state.config.logging.access_log {
        let entry = build_access_entry(&req, &response, peer_addr, started);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Produce the response for a request, CORS headers included
pub async fn respond<B>(req: &Request<B>, state: &AppState) -> HttpResponse {
    let mut response = if req.method() == Method::OPTIONS {
        // Preflight: never touch the filesystem
        http::build_options_response()
    } else {
        let ctx = RequestContext::from_request(req);
        static_files::serve_path(&ctx, state).await
    };

    finalize(&mut response, state);
    response
}

/// Headers every response carries
fn finalize(response: &mut HttpResponse, state: &AppState) {
    state.cors.apply(response);
    response
        .headers_mut()
        .insert(SERVER, state.server_name.clone());
}

fn build_access_entry<B>(
    req: &Request<B>,
    response: &HttpResponse,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.status = response.status().as_u16();
    entry.body_bytes = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    entry.referer = header(REFERER);
    entry.user_agent = header(USER_AGENT);
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Overrides};
    use http_body_util::BodyExt;
    use hyper::body::Bytes;
    use hyper::StatusCode;
    use std::fs;
    use std::path::Path;

    fn state_for(root: &Path) -> AppState {
        let config = Config::load(None, &Overrides::default()).unwrap().config;
        AppState::new(config, root.canonicalize().unwrap()).unwrap()
    }

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    async fn body_of(resp: HttpResponse) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    fn assert_cors(resp: &HttpResponse) {
        let h = resp.headers();
        assert_eq!(h["access-control-allow-origin"], "*");
        assert_eq!(h["access-control-allow-methods"], "GET, POST, OPTIONS");
        assert_eq!(h["access-control-allow-headers"], "*");
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>Hi</h1>").unwrap();
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs").join("guide.txt"), "read me").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_get_index_html() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/index.html"), &state).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(resp.headers()["content-type"], "text/html; charset=utf-8");
        assert_eq!(resp.headers()["content-length"], "11");
        assert!(resp.headers().contains_key("last-modified"));
        assert_eq!(body_of(resp).await, Bytes::from_static(b"<h1>Hi</h1>"));
    }

    #[tokio::test]
    async fn test_root_serves_index_file() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_of(resp).await, Bytes::from_static(b"<h1>Hi</h1>"));
    }

    #[tokio::test]
    async fn test_options_never_touches_disk() {
        let dir = site();
        let state = state_for(dir.path());
        for uri in ["/anything", "/index.html", "/../../etc/passwd"] {
            let resp = respond(&request(Method::OPTIONS, uri), &state).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_cors(&resp);
            assert!(body_of(resp).await.is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_404_with_cors() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/does-not-exist.js"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_cors(&resp);
    }

    #[tokio::test]
    async fn test_post_serves_file() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::POST, "/docs/guide.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_cors(&resp);
        assert_eq!(body_of(resp).await, Bytes::from_static(b"read me"));
    }

    #[tokio::test]
    async fn test_head_has_length_but_no_body() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::HEAD, "/docs/guide.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-length"], "7");
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_directory_without_slash_redirects() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/docs?x=1"), &state).await;
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["location"], "/docs/?x=1");
        assert_cors(&resp);
    }

    #[tokio::test]
    async fn test_redirect_collapses_leading_slashes() {
        let dir = site();
        let state = state_for(dir.path());
        for (uri, expected) in [("//docs", "/docs/"), ("///docs?x=1", "/docs/?x=1")] {
            let resp = respond(&request(Method::GET, uri), &state).await;
            assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
            assert_eq!(resp.headers()["location"], expected);
        }
    }

    #[tokio::test]
    async fn test_directory_listing() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/docs/"), &state).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_of(resp).await;
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("Directory listing for /docs/"));
        assert!(html.contains("guide.txt"));
    }

    #[tokio::test]
    async fn test_directory_listing_disabled() {
        let dir = site();
        let mut state = state_for(dir.path());
        state.config.http.directory_listing = false;
        let resp = respond(&request(Method::GET, "/docs/"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_with_trailing_slash_is_404() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/index.html/"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_root() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("site");
        fs::create_dir(&root).unwrap();
        let state = state_for(&root);

        for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/docs/../../secret.txt"] {
            let resp = respond(&request(Method::GET, uri), &state).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "uri: {uri}");
            assert_cors(&resp);
            let body = body_of(resp).await;
            assert!(!String::from_utf8_lossy(&body).contains("top secret"));
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_blocked() {
        let outer = tempfile::tempdir().unwrap();
        fs::write(outer.path().join("secret.txt"), "top secret").unwrap();
        let root = outer.path().join("site");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(outer.path().join("secret.txt"), root.join("link.txt"))
            .unwrap();
        let state = state_for(&root);

        let resp = respond(&request(Method::GET, "/link.txt"), &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_if_modified_since_returns_304() {
        let dir = site();
        let state = state_for(dir.path());
        let first = respond(&request(Method::GET, "/index.html"), &state).await;
        let last_modified = first.headers()["last-modified"].clone();

        let req = Request::builder()
            .uri("/index.html")
            .header(IF_MODIFIED_SINCE, last_modified)
            .body(())
            .unwrap();
        let resp = respond(&req, &state).await;
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
        assert_cors(&resp);
        assert!(body_of(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_path_is_400() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::GET, "/bad%ff"), &state).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_cors(&resp);
    }

    #[tokio::test]
    async fn test_server_header_present() {
        let dir = site();
        let state = state_for(dir.path());
        let resp = respond(&request(Method::OPTIONS, "/"), &state).await;
        let server = resp.headers()["server"].to_str().unwrap();
        assert!(server.starts_with("cors-devserver/"));
    }
}
