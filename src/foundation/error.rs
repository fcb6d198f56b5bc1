/// Convenience result type used across Markerlay.
pub type MarkerlayResult<T> = Result<T, MarkerlayError>;

/// Top-level error taxonomy.
///
/// Only [`MarkerlayError::MissingResource`] is fatal to a session. Per-event failures (a video that
/// cannot be opened, an unknown marker) are logged and swallowed by the scene worker instead of
/// being returned across component boundaries.
#[derive(thiserror::Error, Debug)]
pub enum MarkerlayError {
    /// Invalid user-provided or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A resource the session cannot run without (e.g. the reference image catalog).
    #[error("missing required resource: {0}")]
    MissingResource(String),

    /// An optional media asset could not be located or opened.
    #[error("asset error: {0}")]
    Asset(String),

    /// Media bytes could not be decoded into frames.
    #[error("decode error: {0}")]
    Decode(String),

    /// A worker thread or channel went away.
    #[error("channel error: {0}")]
    Channel(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarkerlayError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn missing_resource(msg: impl Into<String>) -> Self {
        Self::MissingResource(msg.into())
    }

    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Whether this error must stop the session rather than be skipped per event.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingResource(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
