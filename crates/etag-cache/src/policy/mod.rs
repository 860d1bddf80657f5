//! Caching policies and their composition.
//!
//! A policy is an ordered unit of caching logic with three hooks. Hooks run
//! across every policy in registration order, so a later policy overrides
//! what an earlier one wrote.

mod builtin;
mod cache_control;
mod default;

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::context::CacheContext;

pub use builtin::*;
pub use cache_control::*;
pub use default::*;

/// Pluggable caching logic.
///
/// Every hook defaults to a no-op, so a policy implements only what it needs.
#[async_trait]
pub trait CachePolicy: Send + Sync {
    /// Runs before any store lookup.
    async fn on_before_fetch(&self, _ctx: &mut CacheContext<'_>) {}

    /// Runs only after the origin was actually called.
    async fn on_after_fetch(&self, _ctx: &mut CacheContext<'_>) {}

    /// Runs only when a stored entry answers the request.
    async fn on_cache_hit(&self, _ctx: &mut CacheContext<'_>) {}
}

/// Shared, immutable policy handle.
pub type SharedCachePolicy = Arc<dyn CachePolicy>;

/// Policy that does nothing.
#[derive(Debug, Default)]
pub struct EmptyPolicy;

impl EmptyPolicy {
    /// Process-wide instance; compare with [`Arc::ptr_eq`].
    pub fn shared() -> SharedCachePolicy {
        static INSTANCE: OnceLock<SharedCachePolicy> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(EmptyPolicy)).clone()
    }
}

impl CachePolicy for EmptyPolicy {}

/// Ordered list of policies run as one.
#[derive(Default)]
pub struct CompositePolicy {
    policies: Vec<SharedCachePolicy>,
}

impl CompositePolicy {
    pub fn new(policies: Vec<SharedCachePolicy>) -> Self {
        Self { policies }
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

#[async_trait]
impl CachePolicy for CompositePolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        for policy in &self.policies {
            policy.on_before_fetch(ctx).await;
        }
    }

    async fn on_after_fetch(&self, ctx: &mut CacheContext<'_>) {
        for policy in &self.policies {
            policy.on_after_fetch(ctx).await;
        }
    }

    async fn on_cache_hit(&self, ctx: &mut CacheContext<'_>) {
        for policy in &self.policies {
            policy.on_cache_hit(ctx).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GatewayRequest;
    use etag_core::{MatchedRoute, RequestView};
    use http::{Method, StatusCode};
    use std::time::Duration;

    fn request() -> GatewayRequest {
        GatewayRequest::new(
            MatchedRoute::new("r"),
            RequestView::new(Method::GET, "http", "localhost", "/", ""),
        )
    }

    #[test]
    fn test_empty_policy_is_shared() {
        assert!(Arc::ptr_eq(&EmptyPolicy::shared(), &EmptyPolicy::shared()));
    }

    #[tokio::test]
    async fn test_empty_policy_is_noop() {
        let req = request();
        let mut ctx = CacheContext::new(&req);
        let policy = EmptyPolicy::shared();
        policy.on_before_fetch(&mut ctx).await;
        policy.on_after_fetch(&mut ctx).await;
        policy.on_cache_hit(&mut ctx).await;

        assert!(!ctx.enable_cache);
        assert!(ctx.cache_key.is_empty());
        assert!(ctx.fresh_fetch_headers.is_empty());
    }

    #[tokio::test]
    async fn test_composite_last_write_wins() {
        let composite = CompositePolicy::new(vec![
            Arc::new(ExpirationPolicy::new(Duration::from_secs(10))),
            Arc::new(ExpirationPolicy::new(Duration::from_secs(20))),
        ]);
        assert_eq!(composite.len(), 2);

        let req = request();
        let mut ctx = CacheContext::new(&req);
        composite.on_before_fetch(&mut ctx).await;
        assert_eq!(ctx.expiration, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_composite_runs_every_hook() {
        let composite = CompositePolicy::new(vec![
            Arc::new(StatusCodePolicy::new(StatusCode::OK)),
            Arc::new(EnableCachePolicy::enabled()),
        ]);

        let req = request();
        let mut ctx = CacheContext::new(&req);
        composite.on_before_fetch(&mut ctx).await;
        composite.on_cache_hit(&mut ctx).await;
        assert!(ctx.enable_cache);
        assert_eq!(ctx.status_code_on_cache_hit, StatusCode::OK);
    }
}
