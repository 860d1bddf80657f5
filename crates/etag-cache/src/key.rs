//! Cache key derivation.

use etag_core::RequestView;
use http::Method;
use serde::{Deserialize, Serialize};

/// Which side of the gateway the cache key is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKeySource {
    /// Origin-facing request, after routing transforms.
    #[default]
    Origin,
    /// Client-facing request, before routing transforms.
    Client,
}

/// Build a cache key from request parts.
///
/// Format: `method:scheme:host:path:query`, every segment lower-cased.
/// An empty query leaves a trailing `:`.
pub fn cache_key(method: &Method, scheme: &str, host: &str, path: &str, query: &str) -> String {
    let key = format!(
        "{}:{}:{}:{}:{}",
        method.as_str(),
        scheme,
        host,
        path,
        query
    );
    key.to_lowercase()
}

/// Cache key of a request view.
pub fn request_cache_key(request: &RequestView) -> String {
    cache_key(
        &request.method,
        &request.scheme,
        &request.host,
        &request.path,
        &request.query,
    )
}

/// Cache key of the origin-facing request.
pub fn origin_cache_key(origin_request: &RequestView) -> String {
    request_cache_key(origin_request)
}

/// Cache key of the client-facing request.
pub fn client_cache_key(client_request: &RequestView) -> String {
    request_cache_key(client_request)
}
