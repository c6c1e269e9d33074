//! Request correlation ids.
//!
//! Every request gets an id: the upstream proxy's `x-request-id` when one
//! arrives, a fresh UUID v4 otherwise. The id lands in the tracing span,
//! the Sentry scope, and the response headers, so a client-reported id can
//! be matched against logs and error events.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn incoming_id(request: &Request) -> Option<String> {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(String::from)
}

/// Attach a correlation id to the request and echo it back to the client.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;

    // Non-ASCII upstream ids are dropped rather than poisoning the response
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[test]
    fn test_incoming_id_prefers_forwarded_header() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "cf-ray-12345")
            .body(Body::empty())
            .unwrap();
        assert_eq!(incoming_id(&request).as_deref(), Some("cf-ray-12345"));
    }

    #[test]
    fn test_incoming_id_absent_without_header() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert!(incoming_id(&request).is_none());
    }
}
