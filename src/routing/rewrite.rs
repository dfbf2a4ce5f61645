//! Path rewriting and backend URI construction.
//!
//! A rewrite rule is an anchored literal prefix (`^/user/updateProfile`) plus
//! a replacement. An empty replacement strips the prefix. The rewritten path is
//! appended to the backend's base path, so `/user/updateProfile/42` forwarded to
//! `http://host:8080/user/update-profile` reaches `/user/update-profile/42`.

use crate::routing::RouteError;

/// An anchored prefix rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    prefix: String,
    replacement: String,
}

impl RewriteRule {
    /// Parse a `"^/prefix" = "replacement"` entry.
    pub fn parse(pattern: &str, replacement: &str) -> Result<Self, RouteError> {
        let prefix = pattern.strip_prefix('^').ok_or_else(|| RouteError::InvalidRewrite {
            pattern: pattern.to_string(),
            reason: "must be anchored with '^'".to_string(),
        })?;

        if prefix.chars().any(|c| "$*+?()[]{}|\\".contains(c)) {
            return Err(RouteError::InvalidRewrite {
                pattern: pattern.to_string(),
                reason: "only literal prefixes are supported".to_string(),
            });
        }

        Ok(Self {
            prefix: prefix.to_string(),
            replacement: replacement.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Apply the rule once. Paths that do not start with the prefix pass through.
    pub fn apply(&self, path: &str) -> String {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => format!("{}{}", self.replacement, rest),
            None => path.to_string(),
        }
    }
}

/// Join the backend base path and the rewritten remainder with a single `/`.
///
/// An empty remainder (or a bare `/`) forwards to the base path unchanged.
pub fn join_paths(base: &str, remainder: &str) -> String {
    let base_trimmed = base.trim_end_matches('/');
    let remainder_trimmed = remainder.trim_start_matches('/');

    if remainder_trimmed.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }

    format!("{}/{}", base_trimmed, remainder_trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix_appends_remainder() {
        let rule = RewriteRule::parse("^/user/updateProfile", "").unwrap();
        let rewritten = rule.apply("/user/updateProfile/42");
        assert_eq!(rewritten, "/42");
        assert_eq!(join_paths("/user/update-profile", &rewritten), "/user/update-profile/42");
    }

    #[test]
    fn test_empty_remainder_forwards_to_bare_base() {
        let rule = RewriteRule::parse("^/login", "").unwrap();
        let rewritten = rule.apply("/login");
        assert_eq!(rewritten, "");
        assert_eq!(join_paths("/auth/login", &rewritten), "/auth/login");
    }

    #[test]
    fn test_prefix_is_stripped_exactly_once() {
        let rule = RewriteRule::parse("^/a", "").unwrap();
        assert_eq!(rule.apply("/a/a/b"), "/a/b");
    }

    #[test]
    fn test_replace_prefix() {
        let rule = RewriteRule::parse("^/v1", "/api/v2").unwrap();
        assert_eq!(rule.apply("/v1/items"), "/api/v2/items");
    }

    #[test]
    fn test_non_matching_rule_passes_through() {
        // e.g. a rule written for `/viewChats` on the `/viewChat/:id` route
        let rule = RewriteRule::parse("^/viewChats", "").unwrap();
        assert_eq!(rule.apply("/viewChat/7"), "/viewChat/7");
    }

    #[test]
    fn test_trailing_slash_base_is_not_doubled() {
        assert_eq!(join_paths("/api/billing/email/statement/", "/9"), "/api/billing/email/statement/9");
        assert_eq!(join_paths("/api/billing/email/statement/", ""), "/api/billing/email/statement/");
        assert_eq!(join_paths("", ""), "/");
        assert_eq!(join_paths("/", "/x"), "/x");
    }

    #[test]
    fn test_rejects_unanchored_and_regex_patterns() {
        assert!(RewriteRule::parse("/login", "").is_err());
        assert!(RewriteRule::parse("^/user/(.*)", "").is_err());
    }
}
