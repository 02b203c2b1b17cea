/// Result alias used across the crate.
pub type AtrousResult<T> = Result<T, AtrousError>;

/// Errors surfaced by the equalizer core.
///
/// Degenerate geometry is not an error: the planner returns zero scales and the engine passes the
/// input through unchanged.
#[derive(thiserror::Error, Debug)]
pub enum AtrousError {
    /// Caller-supplied buffers, geometry or configuration are inconsistent.
    #[error("validation error: {0}")]
    Validation(String),

    /// A host buffer could not be reserved, or its byte size overflowed.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// The offloaded path failed (adapter, shader, submission or readback).
    #[error("device error: {0}")]
    Device(String),

    /// Configuration or curve documents could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Anything else, with its source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AtrousError {
    /// Build an [`AtrousError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`AtrousError::Allocation`].
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build an [`AtrousError::Device`].
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Build an [`AtrousError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for AtrousError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
