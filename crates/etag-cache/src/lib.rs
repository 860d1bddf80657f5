//! Conditional-request (ETag) caching engine for API gateways.
//!
//! This crate provides:
//! - `CachePolicy` - Pluggable caching logic with before-fetch, after-fetch and cache-hit hooks
//! - `CachePolicyBuilder` - Fluent composition of policies on top of `DefaultPolicy`
//! - `InvalidatePolicy` - Tag eviction for mutating requests
//! - `PolicyRegistry` - Named policies built once at startup
//! - `CacheStore` / `MemoryStore` - Tag-aware byte store collaborator
//! - `EtagCaching` - Request pipeline sequencing invalidation, lookup, fetch and store
//! - `EtagCachingConfig` - Declarative TOML/JSON configuration
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use etag_cache::{EtagCaching, MemoryStore, PolicyRegistry};
//!
//! let registry = PolicyRegistry::builder()
//!     .add_cache_policy("getProducts", |b| {
//!         b.expire(Duration::from_secs(120))
//!             .tag_templates(["product:{tenantId}", "all:{tenantId}"])
//!     })?
//!     .add_invalidate_policy("products", |b| b.tag_templates(["product:{tenantId}"]))?
//!     .build();
//!
//! let caching = EtagCaching::new(Arc::new(registry), Arc::new(MemoryStore::new()));
//! let (response, status) = caching.handle(&request, || origin.call(req)).await?;
//! ```

mod builder;
mod config;
mod context;
mod entry;
mod error;
mod invalidate;
mod key;
mod orchestrator;
mod policy;
mod registry;
mod store;
mod tags;

pub use builder::*;
pub use config::*;
pub use context::*;
pub use entry::*;
pub use error::*;
pub use invalidate::*;
pub use key::*;
pub use orchestrator::*;
pub use policy::*;
pub use registry::*;
pub use store::*;
pub use tags::*;
