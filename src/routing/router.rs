//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in configuration order
//! - Look up matching route for a method and path
//! - Return matched route or explicit no-match (with a diagnostic candidate)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) ordered scan, first match wins (acceptable for typical route counts)
//! - Explicit NoMatch rather than silent default

use std::collections::HashSet;

use axum::http::{HeaderName, Method, Uri};
use url::Url;

use crate::config::RouteConfig;
use crate::routing::matcher::{normalize_path, Matcher, MethodMatcher, PathPatternMatcher};
use crate::routing::rewrite::{join_paths, RewriteRule};
use crate::routing::RouteError;

/// A compiled route definition.
#[derive(Debug, Clone)]
pub struct Route {
    path: PathPatternMatcher,
    method: MethodMatcher,
    target: String,
    authority: String,
    base_path: String,
    rewrite: Option<RewriteRule>,
    header_policy: Vec<HeaderName>,
}

impl Route {
    /// Compile a single route entry.
    pub fn from_config(config: &RouteConfig) -> Result<Self, RouteError> {
        let path = PathPatternMatcher::new(&config.route)?;
        let method = MethodMatcher::new(config.method.as_deref())?;
        let (authority, base_path) = parse_target(&config.target)?;

        let rewrite = match config.path_rewrite.len() {
            0 => None,
            1 => config
                .path_rewrite
                .iter()
                .next()
                .map(|(pattern, replacement)| RewriteRule::parse(pattern, replacement))
                .transpose()?,
            _ => return Err(RouteError::MultipleRewrites(config.route.clone())),
        };

        let header_policy = config
            .headers
            .iter()
            .map(|name| {
                HeaderName::from_bytes(name.trim().as_bytes())
                    .map_err(|_| RouteError::InvalidHeader(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(rule) = &rewrite {
            if !path.static_prefix().starts_with(rule.prefix()) {
                tracing::warn!(
                    route = %config.route,
                    rewrite = %rule.prefix(),
                    "Rewrite prefix does not match route pattern; paths will be forwarded unchanged"
                );
            }
        }

        Ok(Self {
            path,
            method,
            target: config.target.clone(),
            authority,
            base_path,
            rewrite,
            header_policy,
        })
    }

    /// The route's path template, used as its name in logs and metrics.
    pub fn name(&self) -> &str {
        self.path.template()
    }

    /// The configured backend base URL.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Backend `host:port`, used as the outbound `Host` header.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// The fixed method for this route, if any.
    pub fn method(&self) -> Option<&Method> {
        self.method.method()
    }

    /// Headers copied verbatim from the inbound request.
    pub fn header_policy(&self) -> &[HeaderName] {
        &self.header_policy
    }

    /// Apply the rewrite rule and append the remainder to the backend base path.
    ///
    /// The path is normalised first, matching what the path matcher saw.
    pub fn rewrite_path(&self, path: &str) -> String {
        let path = normalize_path(path);
        let remainder = match &self.rewrite {
            Some(rule) => rule.apply(&path),
            None => path.into_owned(),
        };
        join_paths(&self.base_path, &remainder)
    }

    /// Build the absolute outbound URI for an inbound path and query.
    pub fn backend_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, axum::http::uri::InvalidUri> {
        let path = self.rewrite_path(path);
        let uri = match query {
            Some(q) if !q.is_empty() => format!("http://{}{}?{}", self.authority, path, q),
            _ => format!("http://{}{}", self.authority, path),
        };
        uri.parse()
    }

    fn path_matches(&self, method: &Method, path: &str) -> bool {
        self.path.matches(method, path)
    }

    fn method_matches(&self, method: &Method, path: &str) -> bool {
        self.method.matches(method, path)
    }
}

/// Result of a route lookup.
#[derive(Debug)]
pub enum RouteLookup<'a> {
    Matched(&'a Route),
    /// No route matched. `candidate` is the first route whose path matched
    /// but whose method did not.
    NoMatch { candidate: Option<&'a Route> },
}

/// Immutable, ordered route table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes in configuration order, rejecting duplicate pattern + method pairs.
    ///
    /// Patterns are compared by shape, so `/a/:id` and `/a/:x` collide.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(configs.len());

        for config in configs {
            let route = Route::from_config(config)?;
            let key = (route.path.shape(), route.method().map(|m| m.to_string()));
            if !seen.insert(key) {
                return Err(RouteError::Duplicate {
                    pattern: config.route.clone(),
                    method: route.method().map_or("ANY".to_string(), |m| m.to_string()),
                });
            }
            routes.push(route);
        }

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Ok(Self { routes })
    }

    /// Look up the first route matching the method and path.
    pub fn match_route(&self, method: &Method, path: &str) -> RouteLookup<'_> {
        let mut candidate = None;
        for route in &self.routes {
            if !route.path_matches(method, path) {
                continue;
            }
            if route.method_matches(method, path) {
                return RouteLookup::Matched(route);
            }
            candidate.get_or_insert(route);
        }
        RouteLookup::NoMatch { candidate }
    }

    /// Routes in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Split a backend base URL into `host:port` and base path.
fn parse_target(target: &str) -> Result<(String, String), RouteError> {
    let invalid = |reason: &str| RouteError::InvalidTarget {
        target: target.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("only plain http backends are supported"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
    let port = url.port_or_known_default().unwrap_or(80);
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };

    Ok((format!("{}:{}", host, port), url.path().to_string()))
}
