//! Request dispatch: route match → rewrite → forward → relay.
//!
//! # Responsibilities
//! - Resolve the route for an inbound request
//! - Build the outbound request (rewritten URI, filtered headers, streamed body)
//! - Relay the backend response or translate gateway-side failures
//!
//! # Design Decisions
//! - Backend responses of any status are relayed, never translated
//! - End-to-end headers pass through; a route's header policy guarantees the
//!   listed headers arrive verbatim even if the client named them in `Connection`
//! - `Host` is rewritten to the backend authority
//! - No retries

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::TimeoutConfig;
use crate::error::GatewayError;
use crate::http::request::RequestIdExt;
use crate::http::response::{relay, strip_hop_by_hop};
use crate::observability::metrics;
use crate::routing::{Route, RouteLookup, RouteTable};

/// Outcome of a dispatch: the relayed backend response or a gateway error.
pub type ProxyResponse = Result<Response, GatewayError>;

/// Forwards matched requests to their backends.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    client: Client<HttpConnector, Body>,
}

impl Dispatcher {
    pub fn new(routes: Arc<RouteTable>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(connector);

        Self { routes, client }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Dispatch one request. Dropping the returned future aborts the backend call.
    pub async fn dispatch(&self, request: Request<Body>) -> ProxyResponse {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let request_id = request.request_id().to_string();

        // 1. Match Route
        let route = match self.routes.match_route(&method, &path) {
            RouteLookup::Matched(route) => route,
            RouteLookup::NoMatch { candidate } => {
                tracing::warn!(request_id = %request_id, method = %method, path = %path, "No route matched");
                metrics::record_request(method.as_str(), 404, "none", start);
                return Err(GatewayError::RouteNotFound {
                    method: method.to_string(),
                    path,
                    candidate: candidate.map(|r| r.target().to_string()),
                });
            }
        };

        // 2. Rewrite + build outbound request
        let outbound = match build_outbound(route, request) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(request_id = %request_id, route = %route.name(), error = %e, "Failed to build backend request");
                metrics::record_upstream_error(e.kind());
                metrics::record_request(method.as_str(), 500, route.name(), start);
                return Err(e);
            }
        };

        tracing::debug!(
            request_id = %request_id,
            route = %route.name(),
            backend = %outbound.uri(),
            "Forwarding request"
        );

        // 3. Forward
        match self.client.request(outbound).await {
            Ok(response) => {
                let status = response.status();
                metrics::record_request(method.as_str(), status.as_u16(), route.name(), start);
                tracing::debug!(request_id = %request_id, route = %route.name(), status = %status, "Backend responded");
                Ok(relay(response))
            }
            Err(e) => {
                // The request body failed mid-stream; the client is at fault, not the backend.
                if let Some(&GatewayError::PayloadTooLarge { limit }) = GatewayError::find_in(&e) {
                    tracing::warn!(request_id = %request_id, route = %route.name(), limit, "Request body too large");
                    metrics::record_request(method.as_str(), 413, route.name(), start);
                    return Err(GatewayError::PayloadTooLarge { limit });
                }

                tracing::error!(
                    request_id = %request_id,
                    route = %route.name(),
                    backend = %route.authority(),
                    error = %e,
                    "Upstream error"
                );
                let err = GatewayError::BackendUnreachable {
                    backend: route.authority().to_string(),
                    source: e,
                };
                metrics::record_upstream_error(err.kind());
                metrics::record_request(method.as_str(), err.status_code().as_u16(), route.name(), start);
                Err(err)
            }
        }
    }
}

/// Turn the inbound request into the request sent to `route`'s backend.
fn build_outbound(route: &Route, request: Request<Body>) -> Result<Request<Body>, GatewayError> {
    let (parts, body) = request.into_parts();

    let uri = route
        .backend_uri(parts.uri.path(), parts.uri.query())
        .map_err(|e| GatewayError::Internal(e.to_string()))?;

    let client_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let mut headers = forward_headers(&parts.headers, route.header_policy());

    // changeOrigin: the backend sees its own authority as Host
    let host = HeaderValue::from_str(route.authority()).map_err(|e| GatewayError::Internal(e.to_string()))?;
    headers.insert(header::HOST, host);

    if let Some(original_host) = parts.headers.get(header::HOST) {
        headers.insert("x-forwarded-host", original_host.clone());
    }
    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
    if let Some(ip) = client_ip {
        let forwarded_for = match parts.headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
            Some(existing) => format!("{}, {}", existing, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert("x-forwarded-for", value);
        }
    }

    // Inbound method, so HEAD on a GET route stays HEAD.
    let mut builder = Request::builder().method(parts.method).uri(uri);
    if let Some(h) = builder.headers_mut() {
        *h = headers;
    }
    builder.body(body).map_err(|e| GatewayError::Internal(e.to_string()))
}

/// End-to-end headers to forward: hop-by-hop and `Host` removed, headers
/// named by the route's policy copied verbatim.
pub fn forward_headers(inbound: &HeaderMap, policy: &[HeaderName]) -> HeaderMap {
    let mut headers = inbound.clone();
    strip_hop_by_hop(&mut headers);
    headers.remove(header::HOST);

    for name in policy {
        headers.remove(name);
        for value in inbound.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};
    use axum::response::IntoResponse;

    use crate::config::RouteConfig;

    fn dispatcher(routes: Vec<RouteConfig>) -> Dispatcher {
        let table = RouteTable::from_config(&routes).unwrap();
        Dispatcher::new(Arc::new(table), &TimeoutConfig::default())
    }

    #[test]
    fn test_forward_headers_keeps_end_to_end_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        inbound.insert(header::COOKIE, HeaderValue::from_static("session=1"));
        inbound.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        inbound.insert(header::HOST, HeaderValue::from_static("gateway.local:5000"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let headers = forward_headers(&inbound, &[]);
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer abc.def");
        assert_eq!(headers.get(header::COOKIE).unwrap(), "session=1");
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(!headers.contains_key(header::HOST));
        assert!(!headers.contains_key(header::CONNECTION));
    }

    #[test]
    fn test_policy_survives_connection_listing() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("Authorization"));

        let without = forward_headers(&inbound, &[]);
        assert!(!without.contains_key(header::AUTHORIZATION));

        let with = forward_headers(&inbound, &[header::AUTHORIZATION]);
        assert_eq!(with.get(header::AUTHORIZATION).unwrap().as_bytes(), b"Bearer abc.def");
        assert_eq!(with.get_all(header::AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_policy_never_fabricates_headers() {
        let inbound = HeaderMap::new();
        let headers = forward_headers(&inbound, &[header::AUTHORIZATION]);
        assert!(!headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_build_outbound_rewrites_uri_and_host() {
        let table = RouteTable::from_config(&[RouteConfig::new(
            "/user/updateProfile/:id",
            "http://127.0.0.1:8080/user/update-profile",
        )
        .with_method("PUT")
        .with_rewrite("^/user/updateProfile", "")])
        .unwrap();

        let mut request = Request::builder()
            .method(Method::PUT)
            .uri("/user/updateProfile/42?notify=false")
            .header(header::HOST, "gateway.local:5000")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.0.2.1:5555".parse::<SocketAddr>().unwrap()));

        let outbound = build_outbound(&table.routes()[0], request).unwrap();
        assert_eq!(outbound.method(), Method::PUT);
        assert_eq!(
            outbound.uri().to_string(),
            "http://127.0.0.1:8080/user/update-profile/42?notify=false"
        );
        assert_eq!(outbound.headers().get(header::HOST).unwrap(), "127.0.0.1:8080");
        assert_eq!(outbound.headers().get("x-forwarded-host").unwrap(), "gateway.local:5000");
        assert_eq!(outbound.headers().get("x-forwarded-for").unwrap(), "192.0.2.1");
    }

    #[test]
    fn test_build_outbound_normalises_repeated_slashes() {
        let table = RouteTable::from_config(&[RouteConfig::new("/login", "http://127.0.0.1:8080/auth/login")
            .with_method("POST")
            .with_rewrite("^/login", "")])
        .unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("//login")
            .body(Body::empty())
            .unwrap();

        let outbound = build_outbound(&table.routes()[0], request).unwrap();
        assert_eq!(outbound.uri().to_string(), "http://127.0.0.1:8080/auth/login");
    }

    #[test]
    fn test_head_on_get_route_stays_head() {
        let table = RouteTable::from_config(&[RouteConfig::new(
            "/getAllPackages",
            "http://127.0.0.1:8083/api/v1/package/getAllPackages",
        )
        .with_method("GET")
        .with_rewrite("^/getAllPackages", "")])
        .unwrap();
        let request = Request::builder()
            .method(Method::HEAD)
            .uri("/getAllPackages")
            .body(Body::empty())
            .unwrap();

        assert!(matches!(table.match_route(&Method::HEAD, "/getAllPackages"), RouteLookup::Matched(_)));
        let outbound = build_outbound(&table.routes()[0], request).unwrap();
        assert_eq!(outbound.method(), Method::HEAD);
    }

    #[tokio::test]
    async fn test_unmatched_path_is_not_forwarded() {
        let dispatcher = dispatcher(vec![RouteConfig::new("/login", "http://127.0.0.1:9/auth/login").with_method("POST")]);
        let request = Request::builder().uri("/nonexistent").body(Body::empty()).unwrap();

        let Err(err) = dispatcher.dispatch(request).await else {
            panic!("unmatched request must not be forwarded");
        };
        assert!(matches!(err, GatewayError::RouteNotFound { candidate: None, .. }));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_backend_maps_to_bad_gateway() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let dispatcher = dispatcher(vec![RouteConfig::new("/sendSMS", format!("http://127.0.0.1:{}", port))]);
        let request = Request::builder().method(Method::POST).uri("/sendSMS").body(Body::empty()).unwrap();

        let Err(err) = dispatcher.dispatch(request).await else {
            panic!("nothing is listening on port {}", port);
        };
        assert!(matches!(err, GatewayError::BackendUnreachable { .. }));

        let envelope = err.to_envelope();
        assert_eq!(envelope.code, 502);
        assert_eq!(envelope.message, "Bad gateway.");
    }
}
