//! Single-purpose policies appended by the policy builder.

use std::time::Duration;

use async_trait::async_trait;
use etag_core::{EntityTag, RequestView};
use http::header::{CACHE_CONTROL, ETAG};
use http::{HeaderValue, StatusCode};
use serde_json::{Map, Value};

use super::{CacheControl, CachePolicy};
use crate::context::CacheContext;
use crate::key::client_cache_key;
use crate::tags::expand_tags;

/// Overrides the store TTL.
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    expiration: Duration,
}

impl ExpirationPolicy {
    pub fn new(expiration: Duration) -> Self {
        Self { expiration }
    }
}

#[async_trait]
impl CachePolicy for ExpirationPolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        ctx.expiration = self.expiration;
    }
}

/// Attaches tags, expanded against the route's placeholder bindings.
#[derive(Debug, Clone)]
pub struct TagTemplatesPolicy {
    templates: Vec<String>,
}

impl TagTemplatesPolicy {
    pub fn new<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            templates: templates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }
}

#[async_trait]
impl CachePolicy for TagTemplatesPolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        let tags = expand_tags(&self.templates, ctx.placeholders());
        ctx.tags.extend(tags);
    }
}

/// Replaces the Cache-Control header on fresh and cache-hit responses.
#[derive(Debug, Clone)]
pub struct CacheControlPolicy {
    value: HeaderValue,
}

impl CacheControlPolicy {
    pub fn new(cache_control: &CacheControl) -> Self {
        Self {
            value: cache_control.to_header_value(),
        }
    }

    /// Use a raw header value.
    pub fn from_header_value(value: HeaderValue) -> Self {
        Self { value }
    }
}

#[async_trait]
impl CachePolicy for CacheControlPolicy {
    async fn on_after_fetch(&self, ctx: &mut CacheContext<'_>) {
        ctx.fresh_fetch_headers.insert(CACHE_CONTROL, self.value.clone());
    }

    async fn on_cache_hit(&self, ctx: &mut CacheContext<'_>) {
        ctx.cache_hit_headers.insert(CACHE_CONTROL, self.value.clone());
    }
}

type KeyGenerator = Box<dyn Fn(&CacheContext<'_>) -> String + Send + Sync>;

/// Replaces the cache key with a custom derivation.
pub struct CacheKeyPolicy {
    generator: KeyGenerator,
}

impl CacheKeyPolicy {
    fn from_context<F>(generator: F) -> Self
    where
        F: Fn(&CacheContext<'_>) -> String + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
        }
    }

    /// Derive the key from the origin-facing request.
    pub fn origin<F>(generator: F) -> Self
    where
        F: Fn(&RequestView) -> String + Send + Sync + 'static,
    {
        Self::from_context(move |ctx| generator(ctx.origin_request()))
    }

    /// Derive the key from the client-facing request.
    pub fn client<F>(generator: F) -> Self
    where
        F: Fn(&RequestView) -> String + Send + Sync + 'static,
    {
        Self::from_context(move |ctx| generator(ctx.client_request()))
    }

    /// Standard key format over the client-facing request.
    pub fn default_client() -> Self {
        Self::client(client_cache_key)
    }
}

impl std::fmt::Debug for CacheKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKeyPolicy").finish_non_exhaustive()
    }
}

#[async_trait]
impl CachePolicy for CacheKeyPolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        ctx.cache_key = (self.generator)(&*ctx);
    }
}

type EtagGenerator = Box<dyn Fn(&CacheContext<'_>) -> EntityTag + Send + Sync>;

/// Replaces the minted entity tag of a cacheable fresh response.
///
/// Runs after fetch, so the generator sees the origin response.
pub struct EtagPolicy {
    generator: EtagGenerator,
}

impl EtagPolicy {
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn(&CacheContext<'_>) -> EntityTag + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
        }
    }
}

impl std::fmt::Debug for EtagPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtagPolicy").finish_non_exhaustive()
    }
}

#[async_trait]
impl CachePolicy for EtagPolicy {
    async fn on_after_fetch(&self, ctx: &mut CacheContext<'_>) {
        if !ctx.allow_cache_response {
            return;
        }

        let etag = (self.generator)(&*ctx);
        ctx.fresh_fetch_headers.insert(ETAG, etag.to_header_value());
        ctx.etag = Some(etag);
    }
}

/// Overrides the status of a synthesized cache-hit response.
#[derive(Debug, Clone)]
pub struct StatusCodePolicy {
    status: StatusCode,
}

impl StatusCodePolicy {
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }
}

#[async_trait]
impl CachePolicy for StatusCodePolicy {
    async fn on_cache_hit(&self, ctx: &mut CacheContext<'_>) {
        ctx.status_code_on_cache_hit = self.status;
    }
}

/// Merges properties into the stored entry; later keys win.
#[derive(Debug, Clone)]
pub struct ExtraPropertiesPolicy {
    properties: Map<String, Value>,
}

impl ExtraPropertiesPolicy {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

#[async_trait]
impl CachePolicy for ExtraPropertiesPolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        for (key, value) in &self.properties {
            ctx.extra_properties.insert(key.clone(), value.clone());
        }
    }
}

/// Forces the master switch on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableCachePolicy {
    Enabled,
    Disabled,
}

impl EnableCachePolicy {
    pub fn enabled() -> Self {
        Self::Enabled
    }

    pub fn disabled() -> Self {
        Self::Disabled
    }
}

#[async_trait]
impl CachePolicy for EnableCachePolicy {
    async fn on_before_fetch(&self, ctx: &mut CacheContext<'_>) {
        ctx.enable_cache = matches!(self, Self::Enabled);
    }
}
