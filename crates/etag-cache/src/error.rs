//! Error types for the caching engine.

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Configuration and registration errors.
///
/// These surface at startup; nothing on the request path returns them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Policy name is empty or whitespace.
    #[error("{kind} policy name must not be empty")]
    EmptyPolicyName { kind: PolicyKind },

    /// Policy name registered twice for the same kind.
    #[error("{kind} policy '{name}' is already registered")]
    DuplicatePolicy { kind: PolicyKind, name: String },

    /// Route references a policy that was never registered.
    #[error("route '{route}' references unknown {kind} policy '{name}'")]
    UnknownPolicy {
        route: String,
        kind: PolicyKind,
        name: String,
    },

    /// Status code outside 100..=999.
    #[error("invalid cache-hit status code: {0}")]
    InvalidStatusCode(u16),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which registry a policy name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Cache,
    Invalidate,
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Invalidate => write!(f, "invalidate"),
        }
    }
}

/// Store collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend storage error.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Operation timed out.
    #[error("store operation timed out")]
    Timeout,

    /// Internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Errors surfaced by the request pipeline.
///
/// Caching faults never appear here; only the origin's own failure or an
/// aborted request do.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError<E> {
    /// The origin call failed.
    #[error("origin request failed: {0}")]
    Origin(E),

    /// The request was cancelled before completing.
    #[error("request aborted")]
    Aborted,
}

/// Cache entry codec errors.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("cache entry serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
