//! Matched routes, placeholder bindings and route-to-policy configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A route template placeholder bound to a value from the current request.
///
/// Names are stored in braces form (`{tenantId}`) so they can be substituted
/// into tag templates verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placeholder {
    /// Placeholder name, including braces.
    pub name: String,
    /// Bound value.
    pub value: String,
}

impl Placeholder {
    /// Create a binding; `tenantId` and `{tenantId}` are equivalent names.
    pub fn new(name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let name = name.as_ref().trim();
        let name = if name.starts_with('{') && name.ends_with('}') {
            name.to_string()
        } else {
            format!("{{{}}}", name.trim_matches(|c| c == '{' || c == '}'))
        };

        Self {
            name,
            value: value.into(),
        }
    }

    /// Placeholder name without braces.
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches('{').trim_end_matches('}')
    }
}

/// Result of matching an inbound request to a configured route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedRoute {
    /// Route key.
    pub key: String,
    /// Named caching policy, if any.
    pub cache_policy: Option<String>,
    /// Named invalidation policy, if any.
    pub invalidate_policy: Option<String>,
    /// Placeholder bindings from the route template.
    pub placeholders: Vec<Placeholder>,
}

impl MatchedRoute {
    /// Create a match with no policies.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the caching policy name.
    pub fn with_cache_policy(mut self, name: impl Into<String>) -> Self {
        self.cache_policy = Some(name.into());
        self
    }

    /// Set the invalidation policy name.
    pub fn with_invalidate_policy(mut self, name: impl Into<String>) -> Self {
        self.invalidate_policy = Some(name.into());
        self
    }

    /// Bind a placeholder.
    pub fn with_placeholder(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.placeholders.push(Placeholder::new(name, value));
        self
    }
}

/// Configuration for a single route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route key (e.g., "getProducts").
    pub key: String,
    /// Caching policy name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_policy: Option<String>,
    /// Invalidation policy name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidate_policy: Option<String>,
}

impl RouteConfig {
    /// Create a new route configuration.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            cache_policy: None,
            invalidate_policy: None,
        }
    }

    /// Set the caching policy name.
    pub fn with_cache_policy(mut self, name: impl Into<String>) -> Self {
        self.cache_policy = Some(name.into());
        self
    }

    /// Set the invalidation policy name.
    pub fn with_invalidate_policy(mut self, name: impl Into<String>) -> Self {
        self.invalidate_policy = Some(name.into());
        self
    }

    /// Build a match for this route with the given bindings.
    pub fn matched(&self, placeholders: Vec<Placeholder>) -> MatchedRoute {
        MatchedRoute {
            key: self.key.clone(),
            cache_policy: self.cache_policy.clone(),
            invalidate_policy: self.invalidate_policy.clone(),
            placeholders,
        }
    }
}

/// Route key to route configuration lookup.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteConfig>,
}

impl RouteTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a route.
    pub fn insert(&mut self, route: RouteConfig) {
        self.routes.insert(route.key.clone(), route);
    }

    /// Look up a route by key.
    pub fn get(&self, key: &str) -> Option<&RouteConfig> {
        self.routes.get(key)
    }

    /// Resolve a route key; unknown keys match with no policies.
    pub fn resolve(&self, key: &str, placeholders: Vec<Placeholder>) -> MatchedRoute {
        match self.routes.get(key) {
            Some(route) => route.matched(placeholders),
            None => MatchedRoute {
                key: key.to_string(),
                placeholders,
                ..Default::default()
            },
        }
    }

    /// Iterate over configured routes.
    pub fn iter(&self) -> impl Iterator<Item = &RouteConfig> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl FromIterator<RouteConfig> for RouteTable {
    fn from_iter<I: IntoIterator<Item = RouteConfig>>(iter: I) -> Self {
        let mut table = Self::new();
        for route in iter {
            table.insert(route);
        }
        table
    }
}
