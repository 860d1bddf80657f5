//! Per-request decision context.

use std::collections::BTreeSet;
use std::time::Duration;

use etag_core::{EntityTag, MatchedRoute, Placeholder, RequestView};
use http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};

use crate::entry::CacheEntry;

/// Expiration applied when no policy sets one.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(30);

/// Everything the gateway knows about one inbound request.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    /// Matched route with its policy names and placeholder bindings.
    pub route: MatchedRoute,
    /// Request as sent to the origin.
    pub origin_request: RequestView,
    /// Request as received from the client.
    pub client_request: RequestView,
}

impl GatewayRequest {
    /// Create a gateway request where both sides see the same request.
    pub fn new(route: MatchedRoute, request: RequestView) -> Self {
        Self {
            route,
            client_request: request.clone(),
            origin_request: request,
        }
    }

    /// Create a gateway request with distinct client and origin views.
    pub fn with_views(
        route: MatchedRoute,
        client_request: RequestView,
        origin_request: RequestView,
    ) -> Self {
        Self {
            route,
            origin_request,
            client_request,
        }
    }
}

/// Status and headers of the origin response.
#[derive(Debug, Clone)]
pub struct ResponseView {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

/// Mutable decision record threaded through one request's caching pipeline.
///
/// Policies read the request views and write plain data here; the
/// orchestrator applies that data to the transport. `cache_key` and `etag`
/// are meaningful only after `on_before_fetch` has run.
#[derive(Debug)]
pub struct CacheContext<'r> {
    request: &'r GatewayRequest,
    response: Option<ResponseView>,

    /// Master switch; when false no caching logic applies.
    pub enable_cache: bool,
    /// Whether a freshly fetched response may be stored.
    pub allow_cache_response: bool,
    /// Whether a stored entry may answer without contacting the origin.
    pub allow_serve_not_modified: bool,
    /// Store key of the cached representation.
    pub cache_key: String,
    /// Client validator before fetch, minted validator after.
    pub etag: Option<EntityTag>,
    /// Store TTL for a written entry.
    pub expiration: Duration,
    /// Tags attached to a written entry.
    pub tags: BTreeSet<String>,
    /// Opaque policy payload persisted with the entry.
    pub extra_properties: Map<String, Value>,
    /// Headers set on a response served from the origin.
    pub fresh_fetch_headers: HeaderMap,
    /// Headers set on a synthesized cache-hit response.
    pub cache_hit_headers: HeaderMap,
    /// Status of a synthesized cache-hit response.
    pub status_code_on_cache_hit: StatusCode,
    /// Stored entry, populated before `on_cache_hit` runs.
    pub cache_entry: Option<CacheEntry>,
}

impl<'r> CacheContext<'r> {
    /// Create a context with every switch off.
    pub fn new(request: &'r GatewayRequest) -> Self {
        Self {
            request,
            response: None,
            enable_cache: false,
            allow_cache_response: false,
            allow_serve_not_modified: false,
            cache_key: String::new(),
            etag: None,
            expiration: DEFAULT_EXPIRATION,
            tags: BTreeSet::new(),
            extra_properties: Map::new(),
            fresh_fetch_headers: HeaderMap::new(),
            cache_hit_headers: HeaderMap::new(),
            status_code_on_cache_hit: StatusCode::NOT_MODIFIED,
            cache_entry: None,
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

    /// Key of the matched route.
    pub fn route_key(&self) -> &'r str {
        &self.request.route.key
    }

    /// Origin response, once fetched.
    pub fn response(&self) -> Option<&ResponseView> {
        self.response.as_ref()
    }

    pub(crate) fn set_response(&mut self, response: ResponseView) {
        self.response = Some(response);
    }

    /// The client's conditional validator.
    ///
    /// Present only when the origin-facing request carries exactly one
    /// If-None-Match value and it parses as an entity tag. Anything else,
    /// including `*` or a list, counts as no conditional request.
    pub fn request_validator(&self) -> Option<EntityTag> {
        match self.origin_request().if_none_match_values().as_slice() {
            [single] => EntityTag::parse(single).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::IF_NONE_MATCH;
    use http::{HeaderValue, Method};

    fn request(if_none_match: &[&'static str]) -> GatewayRequest {
        let mut view = RequestView::new(Method::GET, "http", "localhost", "/api/products", "");
        for value in if_none_match {
            view = view.with_header(IF_NONE_MATCH, HeaderValue::from_static(value));
        }
        GatewayRequest::new(MatchedRoute::new("getProducts").with_placeholder("tenantId", "1"), view)
    }

    #[test]
    fn test_defaults() {
        let req = request(&[]);
        let ctx = CacheContext::new(&req);
        assert!(!ctx.enable_cache);
        assert!(!ctx.allow_cache_response);
        assert!(!ctx.allow_serve_not_modified);
        assert!(ctx.cache_key.is_empty());
        assert_eq!(ctx.expiration, DEFAULT_EXPIRATION);
        assert_eq!(ctx.status_code_on_cache_hit, StatusCode::NOT_MODIFIED);
        assert!(ctx.response().is_none());
        assert_eq!(ctx.route_key(), "getProducts");
        assert_eq!(ctx.placeholders()[0].name, "{tenantId}");
    }

    #[test]
    fn test_single_validator() {
        let req = request(&["\"abc\""]);
        let ctx = CacheContext::new(&req);
        assert_eq!(ctx.request_validator(), Some(EntityTag::strong("abc").unwrap()));
    }

    #[test]
    fn test_ambiguous_validator() {
        let req = request(&["\"a\", \"b\""]);
        assert!(CacheContext::new(&req).request_validator().is_none());

        let req = request(&["\"a\"", "\"b\""]);
        assert!(CacheContext::new(&req).request_validator().is_none());
    }

    #[test]
    fn test_unparseable_validator() {
        let req = request(&["*"]);
        assert!(CacheContext::new(&req).request_validator().is_none());

        let req = request(&["abc"]);
        assert!(CacheContext::new(&req).request_validator().is_none());
    }
}
