//! Snapshot building for network transmission

use std::collections::HashMap;

use uuid::Uuid;

use crate::util::time::unix_nanos;
use crate::ws::protocol::{ActorSnapshot, ServerMsg};

use super::actor::ActorState;

impl From<&ActorState> for ActorSnapshot {
    fn from(actor: &ActorState) -> Self {
        Self {
            id: actor.id,
            ign: actor.ign.clone(),
            eating: actor.eating,
            x: actor.position.x,
            y: actor.position.y,
            direction: actor.direction,
            skin_id: actor.skin_id.clone(),
            dead: !actor.alive(),
        }
    }
}

/// Builds frame payloads for one match
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Stamp of the last frame built
    last_tick: i64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock nanoseconds, bumped when the clock has not moved past the previous stamp
    pub fn next_tick(&mut self) -> i64 {
        self.last_tick = unix_nanos().max(self.last_tick.saturating_add(1));
        self.last_tick
    }

    /// Build a frame message carrying every actor, dead or alive
    pub fn build(&mut self, match_id: Uuid, actors: &HashMap<Uuid, ActorState>) -> ServerMsg {
        let data = actors
            .iter()
            .map(|(id, actor)| (*id, ActorSnapshot::from(actor)))
            .collect();

        ServerMsg::Frame {
            tick: self.next_tick(),
            match_id,
            data,
        }
    }
}

/// Build the registration message for a newly joined actor
pub fn registered(match_id: Uuid, actor: &ActorState) -> ServerMsg {
    ServerMsg::Registered {
        match_id,
        data: ActorSnapshot::from(actor),
    }
}
