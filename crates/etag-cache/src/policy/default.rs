//! The built-in default caching algorithm.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use etag_core::directives;
use etag_core::EntityTag;
use http::header::{CACHE_CONTROL, ETAG};
use http::{HeaderMap, HeaderValue, StatusCode};

use super::{CachePolicy, SharedCachePolicy};
use crate::context::{CacheContext, DEFAULT_EXPIRATION};
use crate::key::origin_cache_key;

/// Default ETag caching behavior for GET requests.
///
/// - Caching is disabled when a request Cache-Control value is exactly `no-cache`.
/// - Only GET responses with status 200 are stored, and never when the request
///   carries a Cache-Control value of exactly `no-store`.
/// - The cache key comes from the origin-facing request.
/// - A stored entry answers only a request with exactly one parseable
///   If-None-Match validator.
/// - Responses carry `Cache-Control: private` and the entity tag.
#[derive(Debug, Default)]
pub struct DefaultPolicy;

impl DefaultPolicy {
    /// Process-wide instance; compare with [`Arc::ptr_eq`].
    pub fn shared() -> SharedCachePolicy {
        static INSTANCE: OnceLock<SharedCachePolicy> = OnceLock::new();
        INSTANCE.get_or_init(|| Arc::new(DefaultPolicy)).clone()
    }

    fn stage_headers(headers: &mut HeaderMap, etag: &EntityTag) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(directives::PRIVATE));
        headers.insert(ETAG, etag.to_header_value());
    }
}

#[async_trait]
impl CachePolicy for DefaultPolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        let request = ctx.origin_request();

        ctx.enable_cache = !request.has_cache_control(directives::NO_CACHE);
        ctx.allow_cache_response = request.is_get();
        ctx.expiration = DEFAULT_EXPIRATION;
        ctx.cache_key = origin_cache_key(request);

        match ctx.request_validator() {
            Some(etag) => {
                ctx.etag = Some(etag);
                ctx.allow_serve_not_modified = true;
            }
            None => ctx.allow_serve_not_modified = false,
        }
    }

    async fn on_after_fetch(&self, ctx: &mut CacheContext<'_>) {
        let request = ctx.origin_request();
        let ok = ctx
            .response()
            .is_some_and(|response| response.status == StatusCode::OK);

        ctx.allow_cache_response =
            request.is_get() && ok && !request.has_cache_control(directives::NO_STORE);

        if ctx.allow_cache_response {
            let etag = EntityTag::generate();
            Self::stage_headers(&mut ctx.fresh_fetch_headers, &etag);
            ctx.etag = Some(etag);
        }
    }

    async fn on_cache_hit(&self, ctx: &mut CacheContext<'_>) {
        ctx.status_code_on_cache_hit = StatusCode::NOT_MODIFIED;
        if let Some(etag) = &ctx.etag {
            Self::stage_headers(&mut ctx.cache_hit_headers, etag);
        }
    }
}
