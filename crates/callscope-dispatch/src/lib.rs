pub mod dispatcher;
pub mod error;
pub mod transport;

pub use dispatcher::{DispatchSummary, FanoutDispatcher};
pub use error::DispatchError;
pub use transport::{DeliveryOutcome, PushError, PushTransport};
