//! Typed Cache-Control response values.

use std::time::Duration;

use http::HeaderValue;
use serde::{Deserialize, Serialize};

/// Cache scope determining who can cache the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheScope {
    /// Cacheable by shared caches and browsers.
    Public,
    /// Cacheable by the browser only.
    #[default]
    Private,
    /// Not stored anywhere.
    None,
}

impl CacheScope {
    /// Get the Cache-Control directive for this scope.
    pub fn cache_control_directive(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::None => "no-store",
        }
    }

    /// Check if this scope allows any caching.
    pub fn allows_caching(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Cache-Control value attached to ETag responses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheControl {
    /// Cache scope.
    pub scope: CacheScope,
    /// Freshness lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    /// Require revalidation once stale.
    pub must_revalidate: bool,
    /// Forbid intermediaries from transforming the payload.
    pub no_transform: bool,
}

impl CacheControl {
    /// Create a public Cache-Control value.
    pub fn public() -> Self {
        Self {
            scope: CacheScope::Public,
            ..Default::default()
        }
    }

    /// Create a private Cache-Control value.
    pub fn private() -> Self {
        Self::default()
    }

    /// Create a `no-store` value.
    pub fn no_store() -> Self {
        Self {
            scope: CacheScope::None,
            ..Default::default()
        }
    }

    /// Set max-age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age.as_secs());
        self
    }

    /// Add must-revalidate.
    pub fn with_must_revalidate(mut self) -> Self {
        self.must_revalidate = true;
        self
    }

    /// Add no-transform.
    pub fn with_no_transform(mut self) -> Self {
        self.no_transform = true;
        self
    }

    /// Generate the Cache-Control header value.
    pub fn header_string(&self) -> String {
        let mut parts = vec![self.scope.cache_control_directive().to_string()];

        if !self.scope.allows_caching() {
            return parts.join(", ");
        }

        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={}", max_age));
        }

        if self.must_revalidate {
            parts.push("must-revalidate".to_string());
        }

        if self.no_transform {
            parts.push("no-transform".to_string());
        }

        parts.join(", ")
    }

    /// Render as a header value.
    pub fn to_header_value(&self) -> HeaderValue {
        // Directives are fixed ASCII tokens and digits.
        HeaderValue::from_str(&self.header_string())
            .unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    }
}
