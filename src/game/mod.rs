//! Game simulation modules

pub mod actor;
pub mod combat;
pub mod events;
pub mod grid;
pub mod r#match;
pub mod physics;
pub mod scheduler;
pub mod snapshot;

pub use events::EventProcessor;
pub use grid::Grid;
pub use r#match::{MatchRegistry, MatchSettings};
pub use scheduler::TickScheduler;

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// Player input received from WebSocket
#[derive(Debug, Clone)]
pub struct PlayerInput {
    pub connection_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}

/// Errors applying an event to the simulation
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Match not found: {0}")]
    MatchNotFound(Uuid),

    #[error("Player not found in match: {0}")]
    PlayerNotFound(Uuid),
}
