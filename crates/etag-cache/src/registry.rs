//! Named policy registry built once at startup.

use std::collections::HashMap;

use etag_core::RouteConfig;

use crate::builder::CachePolicyBuilder;
use crate::error::{ConfigError, PolicyKind};
use crate::invalidate::{InvalidatePolicyBuilder, SharedInvalidatePolicy};
use crate::policy::SharedCachePolicy;

/// Immutable mapping from policy names to built policies.
///
/// Names are matched case-insensitively. Share it as `Arc<PolicyRegistry>`;
/// reads need no locking.
#[derive(Default)]
pub struct PolicyRegistry {
    cache_policies: HashMap<String, SharedCachePolicy>,
    invalidate_policies: HashMap<String, SharedInvalidatePolicy>,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    /// Look up a caching policy.
    pub fn cache_policy(&self, name: &str) -> Option<SharedCachePolicy> {
        self.cache_policies.get(&normalize(name)).cloned()
    }

    /// Look up an invalidation policy.
    pub fn invalidate_policy(&self, name: &str) -> Option<SharedInvalidatePolicy> {
        self.invalidate_policies.get(&normalize(name)).cloned()
    }

    pub fn cache_policy_count(&self) -> usize {
        self.cache_policies.len()
    }

    pub fn invalidate_policy_count(&self) -> usize {
        self.invalidate_policies.len()
    }

    /// Check that every policy a route names is registered.
    pub fn validate_route(&self, route: &RouteConfig) -> Result<(), ConfigError> {
        if let Some(name) = &route.cache_policy {
            if self.cache_policy(name).is_none() {
                return Err(ConfigError::UnknownPolicy {
                    route: route.key.clone(),
                    kind: PolicyKind::Cache,
                    name: name.clone(),
                });
            }
        }

        if let Some(name) = &route.invalidate_policy {
            if self.invalidate_policy(name).is_none() {
                return Err(ConfigError::UnknownPolicy {
                    route: route.key.clone(),
                    kind: PolicyKind::Invalidate,
                    name: name.clone(),
                });
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyRegistry")
            .field("cache_policies", &self.cache_policies.keys().collect::<Vec<_>>())
            .field(
                "invalidate_policies",
                &self.invalidate_policies.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Registration surface for named policies.
#[derive(Default)]
pub struct PolicyRegistryBuilder {
    registry: PolicyRegistry,
}

impl PolicyRegistryBuilder {
    /// Register a caching policy seeded with the default policy.
    pub fn add_cache_policy<F>(self, name: &str, configure: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(CachePolicyBuilder) -> CachePolicyBuilder,
    {
        self.insert_cache_policy(name, configure(CachePolicyBuilder::new()))
    }

    /// Register a caching policy without the default policy.
    pub fn add_cache_policy_excluding_default<F>(
        self,
        name: &str,
        configure: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(CachePolicyBuilder) -> CachePolicyBuilder,
    {
        self.insert_cache_policy(name, configure(CachePolicyBuilder::without_default()))
    }

    /// Register an invalidation policy.
    pub fn add_invalidate_policy<F>(mut self, name: &str, configure: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(InvalidatePolicyBuilder) -> InvalidatePolicyBuilder,
    {
        let key = checked_name(name, PolicyKind::Invalidate)?;
        if self.registry.invalidate_policies.contains_key(&key) {
            return Err(ConfigError::DuplicatePolicy {
                kind: PolicyKind::Invalidate,
                name: name.to_string(),
            });
        }

        let policy = configure(InvalidatePolicyBuilder::new()).build();
        self.registry.invalidate_policies.insert(key, policy);
        Ok(self)
    }

    fn insert_cache_policy(
        mut self,
        name: &str,
        builder: CachePolicyBuilder,
    ) -> Result<Self, ConfigError> {
        let key = checked_name(name, PolicyKind::Cache)?;
        if self.registry.cache_policies.contains_key(&key) {
            return Err(ConfigError::DuplicatePolicy {
                kind: PolicyKind::Cache,
                name: name.to_string(),
            });
        }

        self.registry.cache_policies.insert(key, builder.build());
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> PolicyRegistry {
        self.registry
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn checked_name(name: &str, kind: PolicyKind) -> Result<String, ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::EmptyPolicyName { kind });
    }
    Ok(normalize(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn registry() -> PolicyRegistry {
        PolicyRegistry::builder()
            .add_cache_policy("getProducts", |b| {
                b.expire(Duration::from_secs(120))
                    .tag_templates(["product:{tenantId}", "all:{tenantId}"])
            })
            .unwrap()
            .add_cache_policy("getProduct", |b| b)
            .unwrap()
            .add_invalidate_policy("products", |b| b.tag_templates(["product:{tenantId}"]))
            .unwrap()
            .build()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = registry();
        assert!(registry.cache_policy("getproducts").is_some());
        assert!(registry.cache_policy("GETPRODUCTS").is_some());
        assert!(registry.invalidate_policy("Products").is_some());
        assert!(registry.cache_policy("missing").is_none());
        assert_eq!(registry.cache_policy_count(), 2);
        assert_eq!(registry.invalidate_policy_count(), 1);
    }

    #[test]
    fn test_same_instance_returned() {
        let registry = registry();
        let a = registry.cache_policy("getProducts").unwrap();
        let b = registry.cache_policy("getProducts").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_duplicate_cache_policy() {
        let result = PolicyRegistry::builder()
            .add_cache_policy("getProducts", |b| b)
            .unwrap()
            .add_cache_policy("GetProducts", |b| b);
        assert!(matches!(
            result,
            Err(ConfigError::DuplicatePolicy {
                kind: PolicyKind::Cache,
                ..
            })
        ));
    }

    #[test]
    fn test_same_name_different_kinds() {
        let result = PolicyRegistry::builder()
            .add_cache_policy("products", |b| b)
            .unwrap()
            .add_invalidate_policy("products", |b| b);
        assert!(result.is_ok());
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(
            PolicyRegistry::builder().add_cache_policy("", |b| b),
            Err(ConfigError::EmptyPolicyName { .. })
        ));
        assert!(matches!(
            PolicyRegistry::builder().add_invalidate_policy("   ", |b| b),
            Err(ConfigError::EmptyPolicyName {
                kind: PolicyKind::Invalidate
            })
        ));
    }

    #[test]
    fn test_validate_route() {
        let registry = registry();
        let ok = RouteConfig::new("getProducts")
            .with_cache_policy("getProducts")
            .with_invalidate_policy("products");
        assert!(registry.validate_route(&ok).is_ok());

        let bad = RouteConfig::new("orders").with_cache_policy("orders");
        assert!(matches!(
            registry.validate_route(&bad),
            Err(ConfigError::UnknownPolicy { .. })
        ));

        let bad = RouteConfig::new("orders").with_invalidate_policy("orders");
        assert!(matches!(
            registry.validate_route(&bad),
            Err(ConfigError::UnknownPolicy {
                kind: PolicyKind::Invalidate,
                ..
            })
        ));
    }
}
