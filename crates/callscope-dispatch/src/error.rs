use thiserror::Error;

/// Errors that abort an entire dispatch pass.
///
/// Per-connection failures never surface here — they are classified and
/// absorbed inside the pass.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The connection set could not be read.
    #[error("registry error: {0}")]
    Registry(#[from] callscope_registry::RegistryError),

    /// The event could not be serialized for delivery.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
