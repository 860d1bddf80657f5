//! Core value types for the ETag caching gateway.
//!
//! This crate provides the fundamental types shared by the caching engine
//! and the gateway that embeds it:
//! - `RequestView` - Read-only view of a client-facing or origin-facing request
//! - `EntityTag` - Parsed HTTP entity tag (ETag validator)
//! - `MatchedRoute` / `Placeholder` - Route match result with bound placeholders
//! - `RouteConfig` / `RouteTable` - Route key to named policy mapping

mod entity_tag;
mod request;
mod route;

pub use entity_tag::*;
pub use request::*;
pub use route::*;
