//! Response header middleware.
//!
//! Static roots are served with headers that keep players and CDNs from
//! caching a manifest that changes every tick.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the crate version on every response.
pub static X_LIVEHLS_VERSION: HeaderName = HeaderName::from_static("x-livehls-version");

pub const HLS_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";
pub const TS_CONTENT_TYPE: &str = "video/mp2t";

/// Content type for a served path by extension, if it is an HLS asset.
pub fn content_type_for(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1;
    if ext.eq_ignore_ascii_case("m3u8") {
        Some(HLS_CONTENT_TYPE)
    } else if ext.eq_ignore_ascii_case("ts") {
        Some(TS_CONTENT_TYPE)
    } else {
        None
    }
}

/// `true` when any path component is a dot-file, such as a staging manifest.
pub fn is_hidden_path(path: &str) -> bool {
    path.split('/').any(|part| part.starts_with('.'))
}

/// Add CORS and no-cache headers, and fix the content type of HLS assets.
///
/// Dot-files under the static roots are answered with 404.
pub async fn live_headers(request: Request, next: Next) -> Response {
    if is_hidden_path(request.uri().path()) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let content_type = content_type_for(request.uri().path());

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    if let Some(content_type) = content_type {
        if response.status().is_success() {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
    }

    response
}

/// Stamp `X-Livehls-Version` on every response.
pub async fn version_header(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        X_LIVEHLS_VERSION.clone(),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hls_extensions_are_recognized() {
        assert_eq!(content_type_for("/manifests/live.m3u8"), Some(HLS_CONTENT_TYPE));
        assert_eq!(content_type_for("/media/1080p/segment_001.ts"), Some(TS_CONTENT_TYPE));
        assert_eq!(content_type_for("/media/1080p/SEGMENT_001.TS"), Some(TS_CONTENT_TYPE));
    }

    #[test]
    fn dot_files_are_hidden() {
        assert!(is_hidden_path("/manifests/.live.m3u8.tmp"));
        assert!(is_hidden_path("/media/.cache/segment_001.ts"));
        assert!(!is_hidden_path("/manifests/live.m3u8"));
        assert!(!is_hidden_path("/media/1080p/segment_001.ts"));
    }

    #[test]
    fn other_paths_keep_guessed_type() {
        assert_eq!(content_type_for("/media/poster.jpg"), None);
        assert_eq!(content_type_for("/media/1080p"), None);
    }
}
