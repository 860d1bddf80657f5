//! Check command - validate a caching configuration file.

use anyhow::{Context, Result};
use etag_cache::EtagCachingConfig;
use serde::Serialize;

use super::CheckArgs;
use crate::output::Output;

#[derive(Serialize)]
struct CheckSummary<'a> {
    valid: bool,
    store_timeout_ms: u64,
    emit_status_header: bool,
    cache_policies: Vec<&'a str>,
    invalidate_policies: Vec<&'a str>,
    routes: usize,
}

/// Run the check command.
pub async fn run(args: CheckArgs, output: &Output) -> Result<()> {
    output.debug(&format!("Loading {}", args.config.display()));

    let config = EtagCachingConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let registry = config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    if output.is_json() {
        output.json(&CheckSummary {
            valid: true,
            store_timeout_ms: config.settings.store_timeout_ms,
            emit_status_header: config.settings.emit_status_header,
            cache_policies: config.cache_policies.iter().map(|p| p.name.as_str()).collect(),
            invalidate_policies: config
                .invalidate_policies
                .iter()
                .map(|p| p.name.as_str())
                .collect(),
            routes: config.routes.len(),
        });
        return Ok(());
    }

    output.success(&format!("{} is valid", args.config.display()));

    output.header("Settings");
    output.kv("Store timeout", &format!("{}ms", config.settings.store_timeout_ms));
    output.kv(
        "Status header",
        &crate::output::flag(config.settings.emit_status_header),
    );

    output.header(&format!("Cache policies ({})", registry.cache_policy_count()));
    for policy in &config.cache_policies {
        let mut line = policy.name.clone();
        if let Some(secs) = policy.expire_secs {
            line.push_str(&format!(" expire={}s", secs));
        }
        if !policy.tag_templates.is_empty() {
            line.push_str(&format!(" tags=[{}]", policy.tag_templates.join(", ")));
        }
        if policy.exclude_default {
            line.push_str(" (no default)");
        }
        output.list_item(&line);
    }

    output.header(&format!(
        "Invalidate policies ({})",
        registry.invalidate_policy_count()
    ));
    for policy in &config.invalidate_policies {
        output.list_item(&format!(
            "{} tags=[{}]",
            policy.name,
            policy.tag_templates.join(", ")
        ));
    }

    output.header(&format!("Routes ({})", config.routes.len()));
    for route in &config.routes {
        output.list_item(&format!(
            "{} cache={} invalidate={}",
            route.key,
            route.cache_policy.as_deref().unwrap_or("-"),
            route.invalidate_policy.as_deref().unwrap_or("-"),
        ));
    }

    let orphaned: Vec<_> = config
        .routes
        .iter()
        .filter(|r| r.cache_policy.is_none() && r.invalidate_policy.is_none())
        .map(|r| r.key.as_str())
        .collect();
    if !orphaned.is_empty() {
        output.warn(&format!(
            "Routes without any policy pass straight through: {}",
            orphaned.join(", ")
        ));
    }

    Ok(())
}
