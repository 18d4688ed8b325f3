//! Combat system - actor overlap, bounce and damage

use std::collections::HashMap;

use uuid::Uuid;

use super::actor::{ActorState, Position};

/// What happened when two actors overlapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionOutcome {
    /// Equal power: both reversed, nobody hurt
    Bounce,
    /// Unequal power: each took the other's power as damage
    Damage { first_killed: bool, second_killed: bool },
}

/// Collision result for one pair
#[derive(Debug, Clone)]
pub struct CollisionEvent {
    pub first_id: Uuid,
    pub second_id: Uuid,
    pub outcome: CollisionOutcome,
}

/// Combat system for resolving actor-on-actor contact
pub struct CombatSystem;

impl CombatSystem {
    /// Strict AABB overlap of two square footprints; touching edges do not count
    pub fn overlaps(a: Position, b: Position, footprint: f32) -> bool {
        a.x < b.x + footprint
            && b.x < a.x + footprint
            && a.y < b.y + footprint
            && b.y < a.y + footprint
    }

    /// Resolve contact between two live actors
    pub fn resolve_pair(first: &mut ActorState, second: &mut ActorState) -> CollisionOutcome {
        if first.eating == second.eating {
            first.direction = first.direction.reversed();
            second.direction = second.direction.reversed();
            return CollisionOutcome::Bounce;
        }

        let first_power = first.eating;
        let second_power = second.eating;
        let first_killed = first.take_damage(second_power);
        let second_killed = second.take_damage(first_power);

        CollisionOutcome::Damage {
            first_killed,
            second_killed,
        }
    }

    /// Check every pair of live actors once and resolve the overlapping ones.
    /// A pair is skipped if either actor died earlier in the same pass.
    pub fn resolve_collisions(
        actors: &mut HashMap<Uuid, ActorState>,
        footprint: f32,
    ) -> Vec<CollisionEvent> {
        let mut events = Vec::new();

        let mut ordered: Vec<&mut ActorState> = actors.values_mut().collect();
        ordered.sort_by_key(|actor| actor.id);

        for i in 0..ordered.len() {
            let (head, tail) = ordered.split_at_mut(i + 1);
            let first = &mut *head[i];

            for second in tail.iter_mut() {
                if !first.alive() || !second.alive() {
                    continue;
                }
                if !Self::overlaps(first.position, second.position, footprint) {
                    continue;
                }

                let outcome = Self::resolve_pair(first, second);
                events.push(CollisionEvent {
                    first_id: first.id,
                    second_id: second.id,
                    outcome,
                });
            }
        }

        events
    }
}
