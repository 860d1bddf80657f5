//! Declarative caching configuration.

use std::path::Path;
use std::time::Duration;

use etag_core::{RouteConfig, RouteTable};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::builder::CachePolicyBuilder;
use crate::error::ConfigError;
use crate::key::{client_cache_key, origin_cache_key, CacheKeySource};
use crate::policy::CacheControl;
use crate::registry::PolicyRegistry;

const DEFAULT_STORE_TIMEOUT_MS: u64 = 250;

fn default_store_timeout_ms() -> u64 {
    DEFAULT_STORE_TIMEOUT_MS
}

/// Runtime settings of the caching pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachingSettings {
    /// Upper bound on a single store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Add an `X-Cache-Status` header to responses of routes with a registered
    /// cache policy. Pass-through routes are left untouched.
    #[serde(default)]
    pub emit_status_header: bool,
}

impl Default for CachingSettings {
    fn default() -> Self {
        Self {
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            emit_status_header: false,
        }
    }
}

impl CachingSettings {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_status_header(mut self) -> Self {
        self.emit_status_header = true;
        self
    }
}

/// A named caching policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachePolicyConfig {
    /// Policy name referenced by routes.
    pub name: String,
    /// Skip the default policy.
    #[serde(default)]
    pub exclude_default: bool,
    /// Store TTL in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_secs: Option<u64>,
    /// Tag templates attached to stored entries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_templates: Vec<String>,
    /// Cache-Control override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
    /// Cache-hit status code override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Request the cache key is derived from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_source: Option<CacheKeySource>,
    /// Force caching on or off.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Extra properties persisted with each entry.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra_properties: Map<String, Value>,
}

impl CachePolicyConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    fn status(&self) -> Result<Option<StatusCode>, ConfigError> {
        self.status_code
            .map(|code| StatusCode::from_u16(code).map_err(|_| ConfigError::InvalidStatusCode(code)))
            .transpose()
    }

    fn configure(&self, mut builder: CachePolicyBuilder, status: Option<StatusCode>) -> CachePolicyBuilder {
        match self.key_source {
            Some(CacheKeySource::Origin) => builder = builder.cache_key(origin_cache_key),
            Some(CacheKeySource::Client) => builder = builder.client_cache_key(client_cache_key),
            None => {}
        }
        if let Some(secs) = self.expire_secs {
            builder = builder.expire(Duration::from_secs(secs));
        }
        if !self.tag_templates.is_empty() {
            builder = builder.tag_templates(self.tag_templates.iter().cloned());
        }
        if let Some(cache_control) = &self.cache_control {
            builder = builder.cache_control(cache_control.clone());
        }
        if let Some(status) = status {
            builder = builder.status_code(status);
        }
        if !self.extra_properties.is_empty() {
            let properties = self.extra_properties.clone();
            builder = builder.extra_properties(move |props| props.extend(properties));
        }
        match self.enabled {
            Some(true) => builder.enable(),
            Some(false) => builder.disable(),
            None => builder,
        }
    }
}

/// A named invalidation policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidatePolicyConfig {
    /// Policy name referenced by routes.
    pub name: String,
    /// Tag templates evicted by mutating requests.
    #[serde(default)]
    pub tag_templates: Vec<String>,
}

/// Full caching configuration: settings, named policies and routes.
///
/// ```toml
/// [settings]
/// store_timeout_ms = 250
///
/// [[cache_policies]]
/// name = "getProducts"
/// expire_secs = 120
/// tag_templates = ["product:{tenantId}", "all:{tenantId}"]
///
/// [[invalidate_policies]]
/// name = "products"
/// tag_templates = ["product:{tenantId}"]
///
/// [[routes]]
/// key = "getProducts"
/// cache_policy = "getProducts"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtagCachingConfig {
    pub settings: CachingSettings,
    pub cache_policies: Vec<CachePolicyConfig>,
    pub invalidate_policies: Vec<InvalidatePolicyConfig>,
    pub routes: Vec<RouteConfig>,
}

impl EtagCachingConfig {
    /// Parse TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse JSON configuration.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load from a file; `.json` files are JSON, anything else TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Build the immutable policy registry.
    pub fn into_registry(&self) -> Result<PolicyRegistry, ConfigError> {
        let mut builder = PolicyRegistry::builder();

        for policy in &self.cache_policies {
            let status = policy.status()?;
            builder = if policy.exclude_default {
                builder.add_cache_policy_excluding_default(&policy.name, |b| policy.configure(b, status))?
            } else {
                builder.add_cache_policy(&policy.name, |b| policy.configure(b, status))?
            };
        }

        for policy in &self.invalidate_policies {
            builder = builder.add_invalidate_policy(&policy.name, |b| {
                b.tag_templates(policy.tag_templates.iter().cloned())
            })?;
        }

        Ok(builder.build())
    }

    /// Build the registry and check every route against it.
    pub fn validate(&self) -> Result<PolicyRegistry, ConfigError> {
        let registry = self.into_registry()?;
        for route in &self.routes {
            registry.validate_route(route)?;
        }
        Ok(registry)
    }

    /// Route key lookup table.
    pub fn route_table(&self) -> RouteTable {
        self.routes.iter().cloned().collect()
    }
}
