use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};

pub const NO_STORE: &str = "no-store, no-cache, must-revalidate";

/// Mark a response as never cacheable.
pub fn no_store(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn no_store_sets_headers_and_keeps_status() {
        let response = no_store((StatusCode::SERVICE_UNAVAILABLE, "down"));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::CACHE_CONTROL], NO_STORE);
        assert_eq!(response.headers()[header::PRAGMA], "no-cache");
    }
}
