pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::RegistryError;
pub use store::{ConnectionRegistry, SqliteRegistry};
pub use types::ConnectionId;
