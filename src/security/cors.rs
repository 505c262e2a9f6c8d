use axum::http::HeaderValue;
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::config::AppConfig;

/// Origin allow-list: exact origins from configuration, wildcard patterns for
/// the staging and tenant-portal hosts, plus localhost variants.
#[derive(Debug, Clone)]
pub struct OriginValidator {
    allowed_origins: HashSet<String>,
    allowed_patterns: Vec<String>,
    allow_localhost: bool,
}

impl Default for OriginValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginValidator {
    pub fn new() -> Self {
        Self {
            allowed_origins: HashSet::new(),
            allowed_patterns: Vec::new(),
            allow_localhost: false,
        }
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.insert(origin.into());
        self
    }

    pub fn allow_localhost(mut self, allow: bool) -> Self {
        self.allow_localhost = allow;
        self
    }

    pub fn allow_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.allowed_patterns.push(pattern.into());
        self
    }

    pub fn from_config(origins: Vec<String>, patterns: Vec<String>, allow_localhost: bool) -> Self {
        let mut validator = Self::new();

        for origin in origins {
            if !origin.is_empty() {
                validator.allowed_origins.insert(origin);
            }
        }

        for pattern in patterns {
            if !pattern.is_empty() {
                validator.allowed_patterns.push(pattern);
            }
        }

        validator.allow_localhost = allow_localhost;
        validator
    }

    pub fn is_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.contains(origin) {
            return true;
        }

        if self.allow_localhost && is_localhost_origin(origin) {
            return true;
        }

        for pattern in &self.allowed_patterns {
            if matches_pattern(origin, pattern) {
                return true;
            }
        }

        false
    }
}

fn is_localhost_origin(origin: &str) -> bool {
    let localhost_patterns = [
        "http://localhost",
        "https://localhost",
        "http://127.0.0.1",
        "https://127.0.0.1",
        "http://[::1]",
        "https://[::1]",
    ];

    for pattern in &localhost_patterns {
        if origin.starts_with(pattern) {
            return true;
        }
    }

    false
}

fn matches_pattern(origin: &str, pattern: &str) -> bool {
    if pattern.starts_with("*.") {
        let suffix = &pattern[1..];
        if let Some(host) = extract_host(origin) {
            return host.ends_with(suffix) || host == &suffix[1..];
        }
    }

    if let Some(prefix) = pattern.strip_suffix('*') {
        return origin.starts_with(prefix);
    }

    origin == pattern
}

fn extract_host(origin: &str) -> Option<&str> {
    let without_scheme = origin
        .strip_prefix("https://")
        .or_else(|| origin.strip_prefix("http://"))?;

    Some(without_scheme.split(':').next().unwrap_or(without_scheme))
}

/// Builds the CORS layer for the public API: configured origins, any
/// `*.vercel.app` staging deploy, the tenant portal domain and its
/// subdomains, and localhost during development.
pub fn create_cors_layer(config: &AppConfig) -> CorsLayer {
    let validator = Arc::new(OriginValidator::from_config(
        config.cors_allowed_origins.clone(),
        vec![
            "*.vercel.app".to_string(),
            "*.autonomia.site".to_string(),
            "https://autonomia.site".to_string(),
        ],
        true,
    ));

    info!(
        "CORS configured with {} explicit origins",
        config.cors_allowed_origins.len()
    );

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate({
            let validator = Arc::clone(&validator);
            move |origin: &HeaderValue, _| {
                origin
                    .to_str()
                    .map(|o| validator.is_allowed(o))
                    .unwrap_or(false)
            }
        }))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_validator() {
        let validator = OriginValidator::new()
            .allow_origin("https://example.com")
            .allow_localhost(true);

        assert!(validator.is_allowed("https://example.com"));
        assert!(validator.is_allowed("http://localhost:3000"));
        assert!(!validator.is_allowed("https://evil.com"));
    }

    #[test]
    fn test_vercel_pattern() {
        let validator = OriginValidator::new().allow_pattern("*.vercel.app");

        assert!(validator.is_allowed("https://preview-abc123.vercel.app"));
        assert!(!validator.is_allowed("https://vercel.app.evil.com"));
    }

    #[test]
    fn test_portal_domain_and_subdomains() {
        let validator = OriginValidator::new()
            .allow_origin("https://autonomia.site")
            .allow_pattern("*.autonomia.site");

        assert!(validator.is_allowed("https://autonomia.site"));
        assert!(validator.is_allowed("https://acme.autonomia.site"));
        assert!(validator.is_allowed("https://portal.autonomia.site"));
        assert!(!validator.is_allowed("https://autonomia.site.evil.com"));
    }

    #[test]
    fn test_localhost_detection() {
        assert!(is_localhost_origin("http://localhost"));
        assert!(is_localhost_origin("http://localhost:3000"));
        assert!(is_localhost_origin("https://localhost:8443"));
        assert!(is_localhost_origin("http://127.0.0.1:9000"));
        assert!(!is_localhost_origin("http://example.com"));
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://example.com"), Some("example.com"));
        assert_eq!(extract_host("https://example.com:8443"), Some("example.com"));
        assert_eq!(extract_host("http://localhost:3000"), Some("localhost"));
        assert_eq!(extract_host("invalid"), None);
    }
}
