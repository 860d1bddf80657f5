//! Fluent construction of caching policies.

use std::sync::Arc;
use std::time::Duration;

use etag_core::{EntityTag, RequestView};
use http::StatusCode;
use serde_json::{Map, Value};

use crate::context::CacheContext;
use crate::policy::{
    CacheControl, CacheControlPolicy, CacheKeyPolicy, CachePolicy, CompositePolicy, DefaultPolicy,
    EmptyPolicy, EnableCachePolicy, EtagPolicy, ExpirationPolicy, ExtraPropertiesPolicy,
    SharedCachePolicy, StatusCodePolicy, TagTemplatesPolicy,
};

/// Accumulates policies in call order and builds one policy from them.
///
/// # Example
///
/// ```ignore
/// let policy = CachePolicyBuilder::new()
///     .expire(Duration::from_secs(120))
///     .tag_templates(["product:{tenantId}", "all:{tenantId}"])
///     .build();
/// ```
pub struct CachePolicyBuilder {
    policies: Vec<SharedCachePolicy>,
}

impl Default for CachePolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CachePolicyBuilder {
    /// Create a builder seeded with the default policy.
    pub fn new() -> Self {
        Self {
            policies: vec![DefaultPolicy::shared()],
        }
    }

    /// Create an empty builder.
    pub fn without_default() -> Self {
        Self {
            policies: Vec::new(),
        }
    }

    /// Number of accumulated policies.
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Append a custom policy.
    pub fn add_policy(self, policy: impl CachePolicy + 'static) -> Self {
        self.add_shared(Arc::new(policy))
    }

    /// Append an already shared policy.
    pub fn add_shared(mut self, policy: SharedCachePolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Override the store TTL.
    pub fn expire(self, expiration: Duration) -> Self {
        self.add_policy(ExpirationPolicy::new(expiration))
    }

    /// Attach tag templates, expanded per request.
    pub fn tag_templates<I, S>(self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_policy(TagTemplatesPolicy::new(templates))
    }

    /// Override the Cache-Control header.
    pub fn cache_control(self, cache_control: CacheControl) -> Self {
        self.add_policy(CacheControlPolicy::new(&cache_control))
    }

    /// Derive the cache key from the origin-facing request.
    pub fn cache_key<F>(self, generator: F) -> Self
    where
        F: Fn(&RequestView) -> String + Send + Sync + 'static,
    {
        self.add_policy(CacheKeyPolicy::origin(generator))
    }

    /// Derive the cache key from the client-facing request.
    pub fn client_cache_key<F>(self, generator: F) -> Self
    where
        F: Fn(&RequestView) -> String + Send + Sync + 'static,
    {
        self.add_policy(CacheKeyPolicy::client(generator))
    }

    /// Use the standard key format over the client-facing request.
    pub fn default_client_cache_key(self) -> Self {
        self.add_policy(CacheKeyPolicy::default_client())
    }

    /// Replace the minted entity tag of cacheable responses.
    pub fn etag<F>(self, generator: F) -> Self
    where
        F: Fn(&CacheContext<'_>) -> EntityTag + Send + Sync + 'static,
    {
        self.add_policy(EtagPolicy::new(generator))
    }

    /// Override the status of cache-hit responses.
    pub fn status_code(self, status: StatusCode) -> Self {
        self.add_policy(StatusCodePolicy::new(status))
    }

    /// Add properties to the stored entry.
    pub fn extra_properties<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let mut properties = Map::new();
        configure(&mut properties);
        self.add_policy(ExtraPropertiesPolicy::new(properties))
    }

    /// Force caching on.
    pub fn enable(self) -> Self {
        self.add_policy(EnableCachePolicy::enabled())
    }

    /// Force caching off.
    pub fn disable(self) -> Self {
        self.add_policy(EnableCachePolicy::disabled())
    }

    /// Build the accumulated policies into one.
    pub fn build(mut self) -> SharedCachePolicy {
        match self.policies.len() {
            0 => EmptyPolicy::shared(),
            1 => self.policies.remove(0),
            _ => Arc::new(CompositePolicy::new(self.policies)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GatewayRequest;
    use etag_core::MatchedRoute;
    use http::Method;
    use serde_json::json;

    fn request() -> GatewayRequest {
        GatewayRequest::new(
            MatchedRoute::new("getProducts").with_placeholder("tenantId", "7"),
            RequestView::new(Method::GET, "http", "localhost", "/api/products", ""),
        )
    }

    #[test]
    fn test_empty_builds_empty_sentinel() {
        let policy = CachePolicyBuilder::without_default().build();
        assert!(Arc::ptr_eq(&policy, &EmptyPolicy::shared()));
    }

    #[test]
    fn test_default_only_builds_default() {
        let policy = CachePolicyBuilder::new().build();
        assert!(Arc::ptr_eq(&policy, &DefaultPolicy::shared()));
    }

    #[test]
    fn test_single_policy_returned_as_is() {
        let shared: SharedCachePolicy = Arc::new(EnableCachePolicy::enabled());
        let policy = CachePolicyBuilder::without_default()
            .add_shared(shared.clone())
            .build();
        assert!(Arc::ptr_eq(&policy, &shared));
    }

    #[test]
    fn test_helpers_append_in_order() {
        let builder = CachePolicyBuilder::new()
            .expire(Duration::from_secs(1))
            .tag_templates(["a"])
            .cache_control(CacheControl::private())
            .default_client_cache_key()
            .status_code(StatusCode::OK)
            .enable();
        assert_eq!(builder.len(), 7);
    }

    #[tokio::test]
    async fn test_built_composite_runs_in_order() {
        let policy = CachePolicyBuilder::new()
            .expire(Duration::from_secs(120))
            .tag_templates(["product:{tenantId}", "all:{tenantId}"])
            .extra_properties(|props| {
                props.insert("version".to_string(), json!(2));
            })
            .build();

        let req = request();
        let mut ctx = CacheContext::new(&req);
        policy.on_before_fetch(&mut ctx).await;

        assert!(ctx.enable_cache);
        assert_eq!(ctx.expiration, Duration::from_secs(120));
        assert!(ctx.tags.contains("product:7"));
        assert!(ctx.tags.contains("all:7"));
        assert_eq!(ctx.extra_properties["version"], json!(2));
    }

    #[tokio::test]
    async fn test_disable_after_default() {
        let policy = CachePolicyBuilder::new().disable().build();
        let req = request();
        let mut ctx = CacheContext::new(&req);
        policy.on_before_fetch(&mut ctx).await;
        assert!(!ctx.enable_cache);
    }
}
