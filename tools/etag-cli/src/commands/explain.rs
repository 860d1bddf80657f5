//! Explain command - run a route's policies against a sample request.
//!
//! Only the hooks that need no origin response are run: cache-policy
//! before-fetch and the invalidation policy. Nothing touches a store.

use anyhow::{anyhow, Context, Result};
use etag_cache::{
    CacheContext, CachePolicy, EtagCachingConfig, GatewayRequest, InvalidatePolicy,
    InvalidationContext,
};
use serde::Serialize;

use super::{placeholders, request_views, ExplainArgs};
use crate::output::{flag, Output};

#[derive(Debug, Serialize)]
struct CacheDecision {
    policy: String,
    enable_cache: bool,
    allow_serve_not_modified: bool,
    allow_cache_response: bool,
    cache_key: String,
    expiration_secs: u64,
    tags: Vec<String>,
    validator: Option<String>,
}

#[derive(Debug, Serialize)]
struct InvalidateDecision {
    policy: String,
    allow_invalidation: bool,
    tags: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Explanation {
    route: String,
    cache: Option<CacheDecision>,
    invalidate: Option<InvalidateDecision>,
}

/// Run the explain command.
pub async fn run(args: ExplainArgs, output: &Output) -> Result<()> {
    let config = EtagCachingConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let registry = config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    let table = config.route_table();
    if table.get(&args.route).is_none() {
        return Err(anyhow!("Unknown route: {}", args.route));
    }
    let route = table.resolve(&args.route, placeholders(&args.bindings));

    let (mut origin, mut client) = request_views(&args.method, &args.url)?;
    for (name, value) in &args.headers {
        origin.headers.append(name.clone(), value.clone());
        client.headers.append(name.clone(), value.clone());
    }
    let request = GatewayRequest::with_views(route, client, origin);

    let mut explanation = Explanation {
        route: request.route.key.clone(),
        cache: None,
        invalidate: None,
    };

    if let Some(name) = &request.route.invalidate_policy {
        let policy = registry
            .invalidate_policy(name)
            .with_context(|| format!("Invalidate policy not registered: {}", name))?;
        let mut ctx = InvalidationContext::new(&request);
        policy.invalidate(&mut ctx).await;
        explanation.invalidate = Some(InvalidateDecision {
            policy: name.clone(),
            allow_invalidation: ctx.allow_invalidation,
            tags: ctx.tags.into_iter().collect(),
        });
    }

    if let Some(name) = &request.route.cache_policy {
        let policy = registry
            .cache_policy(name)
            .with_context(|| format!("Cache policy not registered: {}", name))?;
        let mut ctx = CacheContext::new(&request);
        policy.on_before_fetch(&mut ctx).await;
        explanation.cache = Some(CacheDecision {
            policy: name.clone(),
            enable_cache: ctx.enable_cache,
            allow_serve_not_modified: ctx.allow_serve_not_modified,
            allow_cache_response: ctx.allow_cache_response,
            cache_key: ctx.cache_key.clone(),
            expiration_secs: ctx.expiration.as_secs(),
            tags: ctx.tags.iter().cloned().collect(),
            validator: ctx.etag.as_ref().map(|etag| etag.to_string()),
        });
    }

    if output.is_json() {
        output.json(&explanation);
        return Ok(());
    }

    output.header(&format!("Route {}", explanation.route));

    match &explanation.invalidate {
        Some(decision) => {
            output.header(&format!("Invalidate policy {}", decision.policy));
            output.kv("Evicts", &flag(decision.allow_invalidation));
            for tag in &decision.tags {
                output.list_item(tag);
            }
        }
        None => output.debug("No invalidate policy"),
    }

    match &explanation.cache {
        Some(decision) => {
            output.header(&format!("Cache policy {}", decision.policy));
            output.kv("Caching enabled", &flag(decision.enable_cache));
            output.kv("May answer 304", &flag(decision.allow_serve_not_modified));
            output.kv("May store response", &flag(decision.allow_cache_response));
            output.kv("Cache key", &decision.cache_key);
            output.kv("Expiration", &format!("{}s", decision.expiration_secs));
            output.kv(
                "Validator",
                decision.validator.as_deref().unwrap_or("-"),
            );
            for tag in &decision.tags {
                output.list_item(tag);
            }
        }
        None => output.warn("Route has no cache policy; requests pass straight through"),
    }

    Ok(())
}
