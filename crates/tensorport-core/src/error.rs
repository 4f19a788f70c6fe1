//! Error type shared across the serving core.
//!
//! Terminal request statuses cross the scheduler completion boundary,
//! so every variant carries only a message and the type stays `Clone`.

/// Result type alias for serving-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// Unknown input/output name or a byte-size/shape mismatch against
    /// the model descriptor.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unresolved input/output name lookup.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A resource that may exist only once already does.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Buffer allocation failure, double finalize, or another broken
    /// internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),

    /// The servable cannot accept work right now.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
