//! Fixed-rate tick loop driving every match

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, trace};

use super::r#match::MatchRegistry;

/// Steps every registered match once per interval and broadcasts the result
pub struct TickScheduler {
    registry: Arc<MatchRegistry>,
    tick_interval: Duration,
}

impl TickScheduler {
    pub fn new(registry: Arc<MatchRegistry>, tick_interval: Duration) -> Self {
        Self {
            registry,
            tick_interval,
        }
    }

    /// Run the authoritative tick loop for the lifetime of the process
    pub async fn run(self) {
        info!(interval_ms = self.tick_interval.as_millis() as u64, "Tick scheduler started");

        let mut tick_interval = interval(self.tick_interval);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.tick_once();
        }
    }

    /// Step and broadcast each match. Broadcasting only queues the frame, so a
    /// slow client never holds up the next step. Returns the number of matches stepped.
    pub fn tick_once(&self) -> usize {
        let matches = self.registry.matches();

        for game_match in &matches {
            let frame = game_match.step();
            let match_id = frame.match_id();
            let receivers = game_match.broadcast(frame);
            trace!(
                match_id = %match_id,
                receivers,
                alive = game_match.alive_count(),
                "Broadcast frame"
            );
        }

        matches.len()
    }
}
