//! Route matching logic.
//!
//! # Responsibilities
//! - Match path templates on segment boundaries (case-sensitive)
//! - Match HTTP method (exact, or any; `GET` also serves `HEAD`)
//! - Normalise request paths so matching and rewriting see the same string
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Positional segments (`:id`) accept any non-empty segment, values are not extracted
//! - Trailing request segments beyond the template are allowed (prefix semantics)
//! - No regex to guarantee O(n) matching

use std::borrow::Cow;

use axum::http::Method;

use crate::routing::RouteError;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request method and path satisfy this condition.
    fn matches(&self, method: &Method, path: &str) -> bool;
}

/// One segment of a path template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Positional(String),
}

/// Matches the request path against a template such as `/service/getName/:id`.
#[derive(Debug, Clone)]
pub struct PathPatternMatcher {
    template: String,
    segments: Vec<Segment>,
}

impl PathPatternMatcher {
    /// Compile a path template.
    pub fn new(template: &str) -> Result<Self, RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::InvalidPattern {
                pattern: template.to_string(),
                reason: "must start with '/'".to_string(),
            });
        }

        let mut segments = Vec::new();
        for raw in split_segments(template) {
            match raw.strip_prefix(':') {
                Some("") => {
                    return Err(RouteError::InvalidPattern {
                        pattern: template.to_string(),
                        reason: "positional segment without a name".to_string(),
                    });
                }
                Some(name) => segments.push(Segment::Positional(name.to_string())),
                None => segments.push(Segment::Static(raw.to_string())),
            }
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    /// The template this matcher was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The leading static portion of the template, e.g. `/service/getName`.
    pub fn static_prefix(&self) -> String {
        let mut prefix = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Static(s) => {
                    prefix.push('/');
                    prefix.push_str(s);
                }
                Segment::Positional(_) => break,
            }
        }
        if prefix.is_empty() {
            prefix.push('/');
        }
        prefix
    }

    /// Template with positional names erased, e.g. `/service/getName/:`.
    ///
    /// Two templates with the same shape match exactly the same paths.
    pub fn shape(&self) -> String {
        let mut shape = String::new();
        for segment in &self.segments {
            shape.push('/');
            match segment {
                Segment::Static(s) => shape.push_str(s),
                Segment::Positional(_) => shape.push(':'),
            }
        }
        if shape.is_empty() {
            shape.push('/');
        }
        shape
    }

    fn matches_path(&self, path: &str) -> bool {
        let mut incoming = split_segments(path);
        self.segments.iter().all(|expected| match incoming.next() {
            Some(actual) => match expected {
                Segment::Static(s) => s == actual,
                Segment::Positional(_) => true,
            },
            None => false,
        })
    }
}

impl Matcher for PathPatternMatcher {
    fn matches(&self, _method: &Method, path: &str) -> bool {
        self.matches_path(path)
    }
}

/// Matches the request method. `None` accepts every method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Option<Method>,
}

impl MethodMatcher {
    /// Parse a configured method name. Missing, empty, `*` and `ANY` mean any method.
    pub fn new(method: Option<&str>) -> Result<Self, RouteError> {
        let method = match method.map(str::trim) {
            None | Some("") | Some("*") => None,
            Some(m) if m.eq_ignore_ascii_case("any") => None,
            Some(m) => Some(
                Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                    .map_err(|_| RouteError::InvalidMethod(m.to_string()))?,
            ),
        };
        Ok(Self { method })
    }

    /// The fixed method, if this matcher constrains one.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, method: &Method, _path: &str) -> bool {
        match &self.method {
            None => true,
            Some(m) if m == Method::GET => method == Method::GET || method == Method::HEAD,
            Some(m) => m == method,
        }
    }
}

/// Collapse runs of `/` so `//login` and `/login` are the same path.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if !path.contains("//") {
        return Cow::Borrowed(path);
    }
    let mut normalized = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    Cow::Owned(normalized)
}

/// Non-empty path segments. Double and trailing slashes collapse.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_pattern_matches_on_segment_boundary() {
        let matcher = PathPatternMatcher::new("/register").unwrap();
        assert!(matcher.matches(&Method::POST, "/register"));
        assert!(matcher.matches(&Method::POST, "/register/"));
        assert!(matcher.matches(&Method::POST, "/register/extra"));
        assert!(!matcher.matches(&Method::POST, "/registerPackage"));
        assert!(!matcher.matches(&Method::POST, "/"));
    }

    #[test]
    fn test_positional_segment_requires_value() {
        let matcher = PathPatternMatcher::new("/service/getName/:id").unwrap();
        assert!(matcher.matches(&Method::GET, "/service/getName/42"));
        assert!(matcher.matches(&Method::GET, "/service/getName/42/more"));
        assert!(!matcher.matches(&Method::GET, "/service/getName"));
        assert!(!matcher.matches(&Method::GET, "/service/getName/"));
        assert!(!matcher.matches(&Method::GET, "/service/getEmail/42"));
    }

    #[test]
    fn test_path_matching_is_case_sensitive() {
        let matcher = PathPatternMatcher::new("/sendSMS").unwrap();
        assert!(!matcher.matches(&Method::POST, "/sendsms"));
    }

    #[test]
    fn test_static_prefix() {
        assert_eq!(
            PathPatternMatcher::new("/user/updateProfile/:id").unwrap().static_prefix(),
            "/user/updateProfile"
        );
        assert_eq!(PathPatternMatcher::new("/:id").unwrap().static_prefix(), "/");
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathPatternMatcher::new("register").is_err());
        assert!(PathPatternMatcher::new("/user/:").is_err());
    }

    #[test]
    fn test_method_matcher() {
        let put = MethodMatcher::new(Some("put")).unwrap();
        assert!(put.matches(&Method::PUT, "/"));
        assert!(!put.matches(&Method::GET, "/"));

        let any = MethodMatcher::new(Some("ANY")).unwrap();
        assert!(any.matches(&Method::DELETE, "/"));
        assert!(MethodMatcher::new(None).unwrap().matches(&Method::PATCH, "/"));

        assert!(MethodMatcher::new(Some("NOT A VERB")).is_err());
    }

    #[test]
    fn test_get_route_serves_head() {
        let get = MethodMatcher::new(Some("GET")).unwrap();
        assert!(get.matches(&Method::HEAD, "/getAllPackages"));
        assert!(!get.matches(&Method::POST, "/getAllPackages"));

        let post = MethodMatcher::new(Some("POST")).unwrap();
        assert!(!post.matches(&Method::HEAD, "/login"));
    }

    #[test]
    fn test_shape_ignores_positional_names() {
        let a = PathPatternMatcher::new("/a/:id").unwrap();
        let b = PathPatternMatcher::new("/a/:x/").unwrap();
        assert_eq!(a.shape(), "/a/:");
        assert_eq!(a.shape(), b.shape());
        assert_ne!(a.shape(), PathPatternMatcher::new("/a/b").unwrap().shape());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/login"), "/login");
        assert_eq!(normalize_path("//login"), "/login");
        assert_eq!(normalize_path("/user//updateProfile///42/"), "/user/updateProfile/42/");
        assert!(matches!(normalize_path("/a/b"), Cow::Borrowed(_)));
    }
}
