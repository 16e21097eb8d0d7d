pub mod manager;
pub mod messages;

pub use manager::{ConnectionConfig, ConnectionHandle, ConnectionManager, ConnectionState};
pub use messages::{ClientMessage, ServerMessage};
