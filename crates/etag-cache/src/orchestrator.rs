//! Request pipeline sequencing invalidation, lookup, fetch and store.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use http::{HeaderMap, HeaderName, HeaderValue, Response};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::CachingSettings;
use crate::context::{CacheContext, GatewayRequest, ResponseView};
use crate::entry::CacheEntry;
use crate::error::{PipelineError, StoreError, StoreResult};
use crate::invalidate::{InvalidatePolicy, InvalidationContext};
use crate::policy::{CachePolicy, SharedCachePolicy};
use crate::registry::PolicyRegistry;
use crate::store::CacheStore;

/// Response header reporting the cache outcome.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Outcome of one request through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the store without contacting the origin.
    NotModified,
    /// Fetched from the origin and written to the store.
    Stored,
    /// Fetched from the origin and not stored.
    Miss,
    /// Caching did not apply to the request, or the route has no cache policy.
    Bypass,
}

impl CacheStatus {
    /// Whether the origin was contacted.
    pub fn contacted_origin(&self) -> bool {
        !matches!(self, Self::NotModified)
    }

    fn as_header(&self) -> &'static str {
        match self {
            Self::NotModified => "HIT",
            Self::Stored => "STORED",
            Self::Miss => "MISS",
            Self::Bypass => "BYPASS",
        }
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_header())
    }
}

/// ETag caching pipeline.
///
/// One instance serves every request; per-request state lives in a
/// [`CacheContext`] owned by the call.
#[derive(Clone)]
pub struct EtagCaching {
    registry: Arc<PolicyRegistry>,
    store: Arc<dyn CacheStore>,
    settings: CachingSettings,
}

impl EtagCaching {
    /// Create a pipeline with default settings.
    pub fn new(registry: Arc<PolicyRegistry>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            registry,
            store,
            settings: CachingSettings::default(),
        }
    }

    /// Set the pipeline settings.
    pub fn with_settings(mut self, settings: CachingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &CachingSettings {
        &self.settings
    }

    /// Run a request through the pipeline.
    ///
    /// `fetch` performs the origin call and is invoked at most once.
    pub async fn handle<F, Fut, B, E>(
        &self,
        request: &GatewayRequest,
        fetch: F,
    ) -> Result<(Response<B>, CacheStatus), PipelineError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response<B>, E>>,
        B: Default,
    {
        self.handle_with_cancellation(request, fetch, &CancellationToken::new())
            .await
    }

    /// Run a request through the pipeline, aborting when `cancel` fires.
    ///
    /// An aborted request stops its in-flight origin and store calls and
    /// never writes a cache entry.
    #[instrument(
        name = "etag_caching",
        skip_all,
        fields(
            route = %request.route.key,
            method = %request.origin_request.method,
            cache_key = tracing::field::Empty,
        )
    )]
    pub async fn handle_with_cancellation<F, Fut, B, E>(
        &self,
        request: &GatewayRequest,
        fetch: F,
        cancel: &CancellationToken,
    ) -> Result<(Response<B>, CacheStatus), PipelineError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Response<B>, E>>,
        B: Default,
    {
        debug!(url = %request.client_request.url(), "etag caching start");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Aborted),
            _ = self.invalidate(request) => {}
        }

        let Some(policy) = self.resolve_cache_policy(request) else {
            let response = fetch_origin(fetch, cancel).await?;
            return Ok((response, CacheStatus::Bypass));
        };

        let mut ctx = CacheContext::new(request);
        policy.on_before_fetch(&mut ctx).await;
        tracing::Span::current().record("cache_key", ctx.cache_key.as_str());
        debug!(
            enable_cache = ctx.enable_cache,
            allow_cache_response = ctx.allow_cache_response,
            allow_serve_not_modified = ctx.allow_serve_not_modified,
            "cache decision"
        );

        if !ctx.enable_cache {
            debug!("caching disabled for request");
            let response = fetch_origin(fetch, cancel).await?;
            return Ok(self.finish(response, CacheStatus::Bypass));
        }

        if self.may_serve_not_modified(&ctx) {
            let stored = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PipelineError::Aborted),
                stored = self.lookup(&ctx.cache_key) => stored,
            };

            if let Some(entry) = stored {
                if ctx.etag.as_ref().is_some_and(|etag| etag.to_string() == entry.etag) {
                    ctx.cache_entry = Some(entry);
                    policy.on_cache_hit(&mut ctx).await;
                    info!(
                        status = %ctx.status_code_on_cache_hit,
                        "serving not modified from cache"
                    );
                    return Ok(self.finish(cache_hit_response(&ctx), CacheStatus::NotModified));
                }
                debug!("stored entity tag does not match request validator");
            }
        }

        if !ctx.allow_cache_response {
            let response = fetch_origin(fetch, cancel).await?;
            return Ok(self.finish(response, CacheStatus::Miss));
        }

        info!(url = %request.origin_request.url(), "fetching from origin");
        let mut response = fetch_origin(fetch, cancel).await?;
        ctx.set_response(ResponseView {
            status: response.status(),
            headers: response.headers().clone(),
        });
        policy.on_after_fetch(&mut ctx).await;

        if !ctx.allow_cache_response {
            debug!(status = %response.status(), "origin response not cacheable");
            return Ok(self.finish(response, CacheStatus::Miss));
        }

        let stored = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Aborted),
            stored = self.write(&ctx) => stored,
        };
        merge_headers(response.headers_mut(), &ctx.fresh_fetch_headers);

        let status = if stored {
            CacheStatus::Stored
        } else {
            CacheStatus::Miss
        };
        Ok(self.finish(response, status))
    }

    async fn invalidate(&self, request: &GatewayRequest) {
        let Some(name) = request.route.invalidate_policy.as_deref() else {
            return;
        };
        let Some(policy) = self.registry.invalidate_policy(name) else {
            warn!(policy = name, "unknown invalidate policy, skipping invalidation");
            return;
        };

        let mut ctx = InvalidationContext::new(request);
        policy.invalidate(&mut ctx).await;

        if ctx.allow_invalidation {
            self.evict(&ctx.tags).await;
        }
    }

    async fn evict(&self, tags: &BTreeSet<String>) {
        let timeout = self.settings.store_timeout();
        let results = join_all(tags.iter().map(|tag| async move {
            let result = tokio::time::timeout(timeout, self.store.evict_by_tag(tag))
                .await
                .unwrap_or(Err(StoreError::Timeout));
            (tag, result)
        }))
        .await;

        for (tag, result) in results {
            match result {
                Ok(()) => info!(tag = %tag, "evicted cache tag"),
                Err(err) => warn!(tag = %tag, error = %err, "cache eviction failed"),
            }
        }
    }

    fn resolve_cache_policy(&self, request: &GatewayRequest) -> Option<SharedCachePolicy> {
        let name = request.route.cache_policy.as_deref()?;
        let policy = self.registry.cache_policy(name);
        if policy.is_none() {
            warn!(policy = name, "unknown cache policy, passing through");
        }
        policy
    }

    fn may_serve_not_modified(&self, ctx: &CacheContext<'_>) -> bool {
        if !ctx.allow_serve_not_modified || ctx.request_validator().is_none() {
            return false;
        }
        if ctx.cache_key.is_empty() {
            warn!("cache key not set, skipping store lookup");
            return false;
        }
        true
    }

    async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let bytes = match self.store_call(self.store.get(key)).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("cache entry not found");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "cache lookup failed, treating as miss");
                return None;
            }
        };

        match CacheEntry::from_bytes(&bytes) {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "stored cache entry unreadable, treating as miss");
                None
            }
        }
    }

    async fn write(&self, ctx: &CacheContext<'_>) -> bool {
        if ctx.cache_key.is_empty() {
            warn!("cache key not set, skipping store write");
            return false;
        }
        let Some(etag) = &ctx.etag else {
            warn!("no entity tag for cacheable response, skipping store write");
            return false;
        };

        let entry =
            CacheEntry::new(etag.to_string()).with_extra_properties(ctx.extra_properties.clone());
        let bytes = match entry.to_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "failed to serialize cache entry");
                return false;
            }
        };

        let tags: Vec<String> = ctx.tags.iter().cloned().collect();
        let result = self
            .store_call(self.store.set(&ctx.cache_key, bytes, &tags, ctx.expiration))
            .await;

        match result {
            Ok(()) => {
                info!(
                    etag = %etag,
                    tags = ?tags,
                    expiration_secs = ctx.expiration.as_secs(),
                    "stored cache entry"
                );
                true
            }
            Err(err) => {
                warn!(error = %err, "cache write failed, ignoring");
                false
            }
        }
    }

    async fn store_call<T>(&self, call: impl Future<Output = StoreResult<T>>) -> StoreResult<T> {
        tokio::time::timeout(self.settings.store_timeout(), call)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    fn finish<B>(&self, mut response: Response<B>, status: CacheStatus) -> (Response<B>, CacheStatus) {
        if self.settings.emit_status_header {
            response
                .headers_mut()
                .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status.as_header()));
        }
        (response, status)
    }
}

async fn fetch_origin<F, Fut, B, E>(
    fetch: F,
    cancel: &CancellationToken,
) -> Result<Response<B>, PipelineError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Response<B>, E>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Aborted),
        result = fetch() => result.map_err(PipelineError::Origin),
    }
}

fn cache_hit_response<B: Default>(ctx: &CacheContext<'_>) -> Response<B> {
    let mut response = Response::new(B::default());
    *response.status_mut() = ctx.status_code_on_cache_hit;
    *response.headers_mut() = ctx.cache_hit_headers.clone();
    response
}

/// Staged headers replace origin headers of the same name.
fn merge_headers(target: &mut HeaderMap, staged: &HeaderMap) {
    for name in staged.keys() {
        target.remove(name);
        for value in staged.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
