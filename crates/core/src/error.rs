/// Result alias that carries the custom [`ScopeError`] type.
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Common error type for the core crate.
///
/// Nothing on the per-sample or per-frame path returns an error. Only
/// construction (bad capacities, inverted zoom ranges) and config loading can
/// fail.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// The configuration cannot produce a working scope.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Config file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScopeError {
    /// Creates a configuration error from the provided message.
    pub fn invalid<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<String> for ScopeError {
    fn from(value: String) -> Self {
        Self::InvalidConfig(value)
    }
}
