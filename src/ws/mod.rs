//! WebSocket transport: wire protocol, connection handling and tracking

pub mod connections;
pub mod handler;
pub mod protocol;

pub use connections::ConnectionRegistry;
