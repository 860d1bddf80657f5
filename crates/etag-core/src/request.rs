//! Read-only request views handed to the caching engine by the gateway.

use http::header::{CACHE_CONTROL, IF_NONE_MATCH};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

/// Well-known Cache-Control request directives.
pub mod directives {
    /// Client asks for revalidation with the origin.
    pub const NO_CACHE: &str = "no-cache";
    /// Client forbids storing the response.
    pub const NO_STORE: &str = "no-store";
    /// Response is for a single user.
    pub const PRIVATE: &str = "private";
}

/// Errors building a request view from a URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestViewError {
    #[error("request URI has no host: {0}")]
    MissingHost(String),
}

/// Snapshot of a request as seen on one side of the gateway.
///
/// The gateway produces two of these per request: the client-facing view
/// (before routing transforms) and the origin-facing view (after).
#[derive(Debug, Clone)]
pub struct RequestView {
    /// HTTP method.
    pub method: Method,
    /// URI scheme, e.g. `http`.
    pub scheme: String,
    /// Host, with a port only when the view carries one.
    pub host: String,
    /// Path component.
    pub path: String,
    /// Query string including the leading `?`, or empty.
    pub query: String,
    /// Request headers.
    pub headers: HeaderMap,
}

impl RequestView {
    /// Create a request view from its parts.
    pub fn new(
        method: Method,
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        let query = query.into();
        let query = if query.is_empty() || query.starts_with('?') {
            query
        } else {
            format!("?{}", query)
        };

        Self {
            method,
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query,
            headers: HeaderMap::new(),
        }
    }

    /// Origin-facing view: host without port.
    pub fn origin_from_uri(method: Method, uri: &Uri) -> Result<Self, RequestViewError> {
        let host = uri
            .host()
            .ok_or_else(|| RequestViewError::MissingHost(uri.to_string()))?;
        Ok(Self::from_uri_parts(method, uri, host.to_string()))
    }

    /// Client-facing view: full authority (`host:port` when present).
    pub fn client_from_uri(method: Method, uri: &Uri) -> Result<Self, RequestViewError> {
        let authority = uri
            .authority()
            .ok_or_else(|| RequestViewError::MissingHost(uri.to_string()))?;
        let host = match authority.port_u16() {
            Some(port) => format!("{}:{}", authority.host(), port),
            None => authority.host().to_string(),
        };
        Ok(Self::from_uri_parts(method, uri, host))
    }

    fn from_uri_parts(method: Method, uri: &Uri, host: String) -> Self {
        let scheme = uri.scheme_str().unwrap_or("http");
        let path = if uri.path().is_empty() { "/" } else { uri.path() };
        let query = uri.query().map(|q| format!("?{}", q)).unwrap_or_default();
        Self::new(method, scheme, host, path, query)
    }

    /// Append a header value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replace all request headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Check if the method is GET.
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    /// Check if the method mutates server state (POST, PUT, PATCH, DELETE).
    pub fn is_mutating(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Check for a Cache-Control header whose whole value is `value`.
    ///
    /// Each header line is compared on its own after trimming, so
    /// `no-cache, max-age=0` does not match `no-cache`.
    pub fn has_cache_control(&self, value: &str) -> bool {
        self.headers
            .get_all(CACHE_CONTROL)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.trim() == value)
    }

    /// All If-None-Match values across every header line.
    ///
    /// Commas inside quoted entity tags do not split values.
    pub fn if_none_match_values(&self) -> Vec<String> {
        self.headers
            .get_all(IF_NONE_MATCH)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(split_list)
            .collect()
    }

    /// Reconstructed absolute URL.
    pub fn url(&self) -> String {
        format!("{}://{}{}{}", self.scheme, self.host, self.path, self.query)
    }
}

fn split_list(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ',' if !quoted => {
                push_trimmed(&mut items, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_trimmed(&mut items, &current);

    items
}

fn push_trimmed(items: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        items.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> RequestView {
        RequestView::origin_from_uri(Method::GET, &uri.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_origin_view_drops_port() {
        let view = get("http://localhost:5000/api/products?page=1");
        assert_eq!(view.scheme, "http");
        assert_eq!(view.host, "localhost");
        assert_eq!(view.path, "/api/products");
        assert_eq!(view.query, "?page=1");
    }

    #[test]
    fn test_client_view_keeps_port() {
        let uri: Uri = "https://shop.example.com:8443/products".parse().unwrap();
        let view = RequestView::client_from_uri(Method::GET, &uri).unwrap();
        assert_eq!(view.host, "shop.example.com:8443");
        assert_eq!(view.query, "");
    }

    #[test]
    fn test_missing_host() {
        let uri: Uri = "/relative/path".parse().unwrap();
        assert!(matches!(
            RequestView::origin_from_uri(Method::GET, &uri),
            Err(RequestViewError::MissingHost(_))
        ));
    }

    #[test]
    fn test_new_normalizes_query() {
        let view = RequestView::new(Method::GET, "http", "h", "/p", "a=1");
        assert_eq!(view.query, "?a=1");
        assert_eq!(view.url(), "http://h/p?a=1");
    }

    #[test]
    fn test_method_classes() {
        assert!(get("http://h/").is_get());
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let view = RequestView::new(method, "http", "h", "/", "");
            assert!(view.is_mutating());
        }
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            let view = RequestView::new(method, "http", "h", "/", "");
            assert!(!view.is_mutating());
        }
    }

    #[test]
    fn test_cache_control_exact_match() {
        let view = get("http://h/").with_header(CACHE_CONTROL, HeaderValue::from_static(" no-cache "));
        assert!(view.has_cache_control(directives::NO_CACHE));
        assert!(!view.has_cache_control(directives::NO_STORE));

        let view = get("http://h/")
            .with_header(CACHE_CONTROL, HeaderValue::from_static("max-age=0"))
            .with_header(CACHE_CONTROL, HeaderValue::from_static("no-store"));
        assert!(view.has_cache_control(directives::NO_STORE));

        for value in ["no-cache, max-age=0", "no-cache=\"x\"", "No-Cache", "no-cache-please"] {
            let view = get("http://h/").with_header(CACHE_CONTROL, HeaderValue::from_static(value));
            assert!(!view.has_cache_control(directives::NO_CACHE), "{}", value);
        }

        assert!(!get("http://h/").has_cache_control(directives::NO_CACHE));
    }

    #[test]
    fn test_if_none_match_values() {
        let view = get("http://h/")
            .with_header(IF_NONE_MATCH, HeaderValue::from_static("\"a,b\", W/\"c\""))
            .with_header(IF_NONE_MATCH, HeaderValue::from_static("\"d\""));
        assert_eq!(
            view.if_none_match_values(),
            vec!["\"a,b\"", "W/\"c\"", "\"d\""]
        );

        assert!(get("http://h/").if_none_match_values().is_empty());
    }
}
