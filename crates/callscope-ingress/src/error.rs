use thiserror::Error;

/// Errors that can occur while accepting an inbound event.
///
/// Side-effect trigger failures are deliberately absent — they are logged by
/// the adapter and never propagated, so a failed trigger cannot suppress
/// delivery to viewers.
#[derive(Debug, Error)]
pub enum IngressError {
    /// The ingress → dispatch event bus is closed; the event cannot reach
    /// any viewer.
    #[error("event bus closed")]
    BusClosed,
}

pub type Result<T> = std::result::Result<T, IngressError>;
