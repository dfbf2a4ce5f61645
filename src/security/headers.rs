//! Boundary headers: CORS and standard security response headers.
//!
//! # Responsibilities
//! - Answer CORS preflights before any rate limiting
//! - Add CORS headers to every response
//! - Add security response headers when the backend did not set them
//!
//! # Design Decisions
//! - Wraps the core pipeline; nothing inside it depends on these headers
//! - Backend-provided values win over gateway defaults

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};

/// Security headers added to every response (name, value).
pub const SECURITY_HEADERS: [(&str, &str); 10] = [
    ("content-security-policy", "default-src 'self';base-uri 'self';frame-ancestors 'self';object-src 'none'"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-xss-protection", "0"),
];

/// Permissive CORS: any origin, common methods, request headers mirrored.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Insert any missing security header.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        let name = HeaderName::from_static(name);
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    headers.remove(header::SERVER);
    headers.remove("x-powered-by");
}

/// Middleware adding security headers to every response.
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut());
    response
}
