//! Inbound event processing - applies client requests to matches

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::util::time::unix_millis;
use crate::ws::protocol::ClientMsg;

use super::r#match::{MatchRegistry, TurnOutcome};
use super::{GameError, PlayerInput};

/// Inputs queued between connection readers and the processor
const INPUT_CHANNEL_CAPACITY: usize = 256;

/// Drains player inputs from every connection and applies them in arrival order
pub struct EventProcessor {
    registry: Arc<MatchRegistry>,
    input_rx: mpsc::Receiver<PlayerInput>,
}

impl EventProcessor {
    /// Create the processor and the sender connections feed it through
    pub fn new(registry: Arc<MatchRegistry>) -> (Self, mpsc::Sender<PlayerInput>) {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        (Self { registry, input_rx }, input_tx)
    }

    /// Run until every sender is dropped
    pub async fn run(mut self) {
        info!("Event processor started");

        while let Some(input) = self.input_rx.recv().await {
            let queued_ms = unix_millis().saturating_sub(input.received_at);
            match Self::process(&self.registry, &input.msg) {
                Ok(outcome) => {
                    debug!(
                        connection_id = %input.connection_id,
                        ?outcome,
                        queued_ms,
                        "Processed direction event"
                    );
                }
                Err(e) => {
                    warn!(
                        connection_id = %input.connection_id,
                        error = %e,
                        "Failed to process event"
                    );
                }
            }
        }

        info!("Event processor stopped");
    }

    /// Apply a single client message. Blocked turns are not errors.
    pub fn process(registry: &MatchRegistry, msg: &ClientMsg) -> Result<TurnOutcome, GameError> {
        match msg {
            ClientMsg::ChangeDirection {
                match_id,
                player_id,
                new_direction,
            } => {
                // Registry guard is dropped here, before the match lock is taken
                let game_match = registry
                    .get(match_id)
                    .ok_or(GameError::MatchNotFound(*match_id))?;
                game_match.try_turn(*player_id, *new_direction)
            }
        }
    }
}
