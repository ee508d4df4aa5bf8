pub mod adapter;
pub mod error;
pub mod trigger;

pub use adapter::IngressAdapter;
pub use error::IngressError;
pub use trigger::{AnalyticsTrigger, HttpAnalyticsTrigger, PipelineHandle, StreamSource, TriggerError};
