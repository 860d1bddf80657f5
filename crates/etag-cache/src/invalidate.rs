//! Invalidation policies for mutating requests.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use etag_core::{Placeholder, RequestView};

use crate::context::GatewayRequest;
use crate::tags::expand_tags;

/// Per-request record of what to evict.
#[derive(Debug)]
pub struct InvalidationContext<'r> {
    request: &'r GatewayRequest,
    /// Tags to evict.
    pub tags: BTreeSet<String>,
    /// Whether eviction should run.
    pub allow_invalidation: bool,
}

impl<'r> InvalidationContext<'r> {
    pub fn new(request: &'r GatewayRequest) -> Self {
        Self {
            request,
            tags: BTreeSet::new(),
            allow_invalidation: false,
        }
    }

    /// Request as sent to the origin.
    pub fn origin_request(&self) -> &'r RequestView {
        &self.request.origin_request
    }

    /// Request as received from the client.
    pub fn client_request(&self) -> &'r RequestView {
        &self.request.client_request
    }

    /// Placeholder bindings of the matched route.
    pub fn placeholders(&self) -> &'r [Placeholder] {
        &self.request.route.placeholders
    }
}

/// Computes the tags a request invalidates.
#[async_trait]
pub trait InvalidatePolicy: Send + Sync {
    async fn invalidate(&self, ctx: &mut InvalidationContext<'_>);
}

/// Shared, immutable invalidation policy handle.
pub type SharedInvalidatePolicy = Arc<dyn InvalidatePolicy>;

/// Invalidation policy that never evicts.
#[derive(Debug, Default)]
pub struct EmptyInvalidatePolicy;

impl EmptyInvalidatePolicy {
    /// Process-wide instance; compare with [`Arc::ptr_eq`].
    pub fn shared() -> SharedInvalidatePolicy {
        static INSTANCE: OnceLock<SharedInvalidatePolicy> = OnceLock::new();
        INSTANCE
            .get_or_init(|| Arc::new(EmptyInvalidatePolicy))
            .clone()
    }
}

#[async_trait]
impl InvalidatePolicy for EmptyInvalidatePolicy {
    async fn invalidate(&self, _ctx: &mut InvalidationContext<'_>) {}
}

/// Evicts expanded tag templates on POST, PUT, PATCH and DELETE.
#[derive(Debug, Clone)]
pub struct TagInvalidatePolicy {
    templates: Vec<String>,
}

impl TagInvalidatePolicy {
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl InvalidatePolicy for TagInvalidatePolicy {
    async fn invalidate(&self, ctx: &mut InvalidationContext<'_>) {
        if ctx.origin_request().is_mutating() {
            let tags = expand_tags(&self.templates, ctx.placeholders());
            ctx.tags.extend(tags);
            ctx.allow_invalidation = true;
        }
    }
}

/// Runs invalidation policies in order.
///
/// Tags accumulate across members and any member can allow invalidation.
#[derive(Default)]
pub struct CompositeInvalidatePolicy {
    policies: Vec<SharedInvalidatePolicy>,
}

impl CompositeInvalidatePolicy {
    pub fn new(policies: Vec<SharedInvalidatePolicy>) -> Self {
        Self { policies }
    }
}

#[async_trait]
impl InvalidatePolicy for CompositeInvalidatePolicy {
    async fn invalidate(&self, ctx: &mut InvalidationContext<'_>) {
        let mut allow = false;
        for policy in &self.policies {
            policy.invalidate(ctx).await;
            allow |= ctx.allow_invalidation;
        }
        ctx.allow_invalidation = allow;
    }
}

/// Accumulates invalidation policies; starts empty.
#[derive(Default)]
pub struct InvalidatePolicyBuilder {
    policies: Vec<SharedInvalidatePolicy>,
}

impl InvalidatePolicyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a custom policy.
    pub fn add_policy(mut self, policy: impl InvalidatePolicy + 'static) -> Self {
        self.policies.push(Arc::new(policy));
        self
    }

    /// Evict these tag templates on mutating requests.
    pub fn tag_templates<I, S>(self, templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_policy(TagInvalidatePolicy::new(templates))
    }

    pub fn build(mut self) -> SharedInvalidatePolicy {
        match self.policies.len() {
            0 => EmptyInvalidatePolicy::shared(),
            1 => self.policies.remove(0),
            _ => Arc::new(CompositeInvalidatePolicy::new(self.policies)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etag_core::MatchedRoute;
    use http::Method;

    fn request(method: Method) -> GatewayRequest {
        GatewayRequest::new(
            MatchedRoute::new("updateProduct")
                .with_placeholder("tenantId", "1")
                .with_placeholder("id", "2"),
            RequestView::new(method, "http", "localhost", "/api/products/2", ""),
        )
    }

    struct RevokeAll;

    #[async_trait]
    impl InvalidatePolicy for RevokeAll {
        async fn invalidate(&self, ctx: &mut InvalidationContext<'_>) {
            ctx.allow_invalidation = false;
            ctx.tags.insert("custom".to_string());
        }
    }

    #[tokio::test]
    async fn test_mutating_methods_invalidate() {
        let policy = TagInvalidatePolicy::new(["product:{tenantId}"]);
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let req = request(method);
            let mut ctx = InvalidationContext::new(&req);
            policy.invalidate(&mut ctx).await;
            assert!(ctx.allow_invalidation);
            assert_eq!(ctx.tags.iter().collect::<Vec<_>>(), vec!["product:1"]);
        }
    }

    #[tokio::test]
    async fn test_get_never_invalidates() {
        let policy = TagInvalidatePolicy::new(["product:{tenantId}"]);
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let req = request(method);
            let mut ctx = InvalidationContext::new(&req);
            policy.invalidate(&mut ctx).await;
            assert!(!ctx.allow_invalidation);
            assert!(ctx.tags.is_empty());
        }
    }

    #[tokio::test]
    async fn test_empty_builder_declines() {
        let policy = InvalidatePolicyBuilder::new().build();
        assert!(Arc::ptr_eq(&policy, &EmptyInvalidatePolicy::shared()));

        let req = request(Method::DELETE);
        let mut ctx = InvalidationContext::new(&req);
        policy.invalidate(&mut ctx).await;
        assert!(!ctx.allow_invalidation);
    }

    #[tokio::test]
    async fn test_composite_ors_and_unions() {
        let policy = InvalidatePolicyBuilder::new()
            .tag_templates(["product:{tenantId}"])
            .add_policy(RevokeAll)
            .tag_templates(["product:{tenantId}:{id}"])
            .build();

        let req = request(Method::PUT);
        let mut ctx = InvalidationContext::new(&req);
        policy.invalidate(&mut ctx).await;

        assert!(ctx.allow_invalidation);
        assert!(ctx.tags.contains("product:1"));
        assert!(ctx.tags.contains("product:1:2"));
        assert!(ctx.tags.contains("custom"));
    }

    #[tokio::test]
    async fn test_composite_all_decline() {
        let policy = InvalidatePolicyBuilder::new()
            .add_policy(RevokeAll)
            .tag_templates(["product:{tenantId}"])
            .build();

        let req = request(Method::GET);
        let mut ctx = InvalidationContext::new(&req);
        policy.invalidate(&mut ctx).await;
        assert!(!ctx.allow_invalidation);
        assert!(ctx.tags.contains("custom"));
    }
}
