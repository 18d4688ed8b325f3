//! Match state, spawn allocation and the per-tick simulation step

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::actor::{ActorState, Direction, Position};
use super::combat::{CollisionOutcome, CombatSystem};
use super::grid::Grid;
use super::physics::PhysicsSystem;
use super::snapshot::SnapshotBuilder;
use super::GameError;

/// Frames buffered per match before slow receivers start skipping
const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Settings every new match is created with
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub grid: Arc<Grid>,
    /// Distance travelled per tick
    pub actor_speed: f32,
    pub starting_power: u32,
    /// Spawn tiles as (col, row), handed out in order
    pub spawn_positions: Vec<(u32, u32)>,
}

/// Result of a direction change request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Committed,
    /// The requested heading is blocked right now; nothing changed
    Rejected,
}

/// Mutable match state, only touched under the match lock
pub struct MatchState {
    pub actors: HashMap<Uuid, ActorState>,
    spawn_queue: VecDeque<(u32, u32)>,
    snapshot_builder: SnapshotBuilder,
}

impl MatchState {
    fn new(spawn_positions: &[(u32, u32)]) -> Self {
        Self {
            actors: HashMap::new(),
            spawn_queue: spawn_positions.iter().copied().collect(),
            snapshot_builder: SnapshotBuilder::new(),
        }
    }

    /// Pop the next spawn tile. Falls back to the origin once the queue is empty,
    /// which may stack several actors on the same spot.
    fn next_spawn_position(&mut self, tile_size: f32) -> Position {
        match self.spawn_queue.pop_front() {
            Some((col, row)) => Position::new(col as f32 * tile_size, row as f32 * tile_size),
            None => {
                warn!("No available start positions, spawning at origin");
                Position::default()
            }
        }
    }

    /// Count alive actors
    pub fn alive_count(&self) -> usize {
        self.actors.values().filter(|a| a.alive()).count()
    }
}

/// The authoritative game match
pub struct GameMatch {
    id: Uuid,
    grid: Arc<Grid>,
    actor_speed: f32,
    starting_power: u32,
    state: Mutex<MatchState>,
    snapshot_tx: broadcast::Sender<ServerMsg>,
}

impl GameMatch {
    /// Create a new match
    pub fn new(id: Uuid, settings: &MatchSettings) -> Self {
        let (snapshot_tx, _) = broadcast::channel(SNAPSHOT_CHANNEL_CAPACITY);
        Self {
            id,
            grid: settings.grid.clone(),
            actor_speed: settings.actor_speed,
            starting_power: settings.starting_power,
            state: Mutex::new(MatchState::new(&settings.spawn_positions)),
            snapshot_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Receive every frame broadcast from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.snapshot_tx.subscribe()
    }

    /// Add an actor for `ign`, or return the existing one with that name
    pub fn register_player(&self, ign: &str, skin_id: Option<String>) -> ActorState {
        let mut state = self.state.lock();

        if let Some(existing) = state.actors.values().find(|a| a.ign == ign) {
            info!(
                match_id = %self.id,
                actor_id = %existing.id,
                ign,
                "Name already registered, reusing actor"
            );
            return existing.clone();
        }

        let position = state.next_spawn_position(self.grid.tile_size());
        let actor = ActorState::new(ign.to_string(), skin_id, position, self.starting_power);
        state.actors.insert(actor.id, actor.clone());

        info!(
            match_id = %self.id,
            actor_id = %actor.id,
            ign,
            x = position.x,
            y = position.y,
            actor_count = state.actors.len(),
            "Player joined match"
        );

        actor
    }

    /// Commit a new heading only if the actor could actually move that way now
    pub fn try_turn(&self, player_id: Uuid, direction: Direction) -> Result<TurnOutcome, GameError> {
        let mut state = self.state.lock();
        let actor = state
            .actors
            .get_mut(&player_id)
            .ok_or(GameError::PlayerNotFound(player_id))?;

        if !actor.alive() {
            return Ok(TurnOutcome::Rejected);
        }

        let travel =
            PhysicsSystem::max_travel(actor.position, direction, &self.grid, self.actor_speed);
        if travel.is_zero() {
            return Ok(TurnOutcome::Rejected);
        }

        actor.direction = direction;
        Ok(TurnOutcome::Committed)
    }

    /// Run one simulation step and return the resulting frame.
    ///
    /// Movement, collisions and the snapshot all happen under a single lock
    /// acquisition, so no reader ever sees a half-stepped world.
    pub fn step(&self) -> ServerMsg {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        for actor in state.actors.values_mut().filter(|a| a.alive()) {
            let travel = PhysicsSystem::max_travel(
                actor.position,
                actor.direction,
                &self.grid,
                self.actor_speed,
            );
            if !actor.direction.is_idle() && travel.is_zero() {
                debug!(match_id = %self.id, actor_id = %actor.id, "Actor hit a wall");
                actor.direction = Direction::Idle;
            }
            actor.translate(travel);
        }

        let footprint = ActorState::footprint(self.grid.tile_size());
        for event in CombatSystem::resolve_collisions(&mut state.actors, footprint) {
            match event.outcome {
                CollisionOutcome::Bounce => {
                    debug!(
                        match_id = %self.id,
                        first = %event.first_id,
                        second = %event.second_id,
                        "Actors bounced"
                    );
                }
                CollisionOutcome::Damage {
                    first_killed,
                    second_killed,
                } => {
                    if first_killed {
                        info!(match_id = %self.id, victim_id = %event.first_id, "Actor eaten");
                    }
                    if second_killed {
                        info!(match_id = %self.id, victim_id = %event.second_id, "Actor eaten");
                    }
                }
            }
        }

        state.snapshot_builder.build(self.id, &state.actors)
    }

    /// Fan a message out to every subscribed connection. Never blocks.
    /// Returns the number of receivers it was queued for.
    pub fn broadcast(&self, msg: ServerMsg) -> usize {
        self.snapshot_tx.send(msg).unwrap_or(0)
    }

    #[cfg(test)]
    pub fn actor(&self, id: &Uuid) -> Option<ActorState> {
        self.state.lock().actors.get(id).cloned()
    }

    pub fn actor_count(&self) -> usize {
        self.state.lock().actors.len()
    }

    pub fn alive_count(&self) -> usize {
        self.state.lock().alive_count()
    }

    #[cfg(test)]
    pub(crate) fn insert_actor(&self, actor: ActorState) {
        self.state.lock().actors.insert(actor.id, actor);
    }
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, Arc<GameMatch>>,
    /// Match new players are assigned to
    current_match: RwLock<Option<Uuid>>,
    settings: MatchSettings,
}

impl MatchRegistry {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            matches: DashMap::new(),
            current_match: RwLock::new(None),
            settings,
        }
    }

    /// Create a match and make it the one new players join
    pub fn create_match(&self) -> Arc<GameMatch> {
        let game_match = self.insert_new_match();
        *self.current_match.write() = Some(game_match.id());
        game_match
    }

    /// The match new players join, created on first use
    pub fn current_or_create(&self) -> Arc<GameMatch> {
        let mut current = self.current_match.write();
        let existing = *current;
        if let Some(game_match) = existing.and_then(|id| self.get(&id)) {
            return game_match;
        }

        let game_match = self.insert_new_match();
        *current = Some(game_match.id());
        game_match
    }

    fn insert_new_match(&self) -> Arc<GameMatch> {
        let game_match = Arc::new(GameMatch::new(Uuid::new_v4(), &self.settings));
        self.matches.insert(game_match.id(), game_match.clone());
        info!(match_id = %game_match.id(), "Created new match");
        game_match
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<GameMatch>> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    /// Handles to every match. Map guards are released before returning,
    /// so callers may lock individual matches freely.
    pub fn matches(&self) -> Vec<Arc<GameMatch>> {
        self.matches.iter().map(|m| m.value().clone()).collect()
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_actors(&self) -> usize {
        self.matches().iter().map(|m| m.actor_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Tile;

    const TILE: f32 = 10.0;
    const SPEED: f32 = 4.0;

    fn settings(grid: Grid, spawns: Vec<(u32, u32)>) -> MatchSettings {
        MatchSettings {
            grid: Arc::new(grid),
            actor_speed: SPEED,
            starting_power: 5,
            spawn_positions: spawns,
        }
    }

    fn open_match(spawns: Vec<(u32, u32)>) -> GameMatch {
        GameMatch::new(Uuid::new_v4(), &settings(Grid::open(10, 10, TILE), spawns))
    }

    fn placed(name: &str, eating: u32, x: f32, y: f32, direction: Direction) -> ActorState {
        let mut actor = ActorState::new(name.to_string(), None, Position::new(x, y), eating);
        actor.direction = direction;
        actor
    }

    #[test]
    fn test_spawn_queue_is_fifo_then_falls_back_to_origin() {
        let game_match = open_match(vec![(1, 2), (3, 4)]);

        let a = game_match.register_player("a", None);
        let b = game_match.register_player("b", None);
        let c = game_match.register_player("c", None);
        let d = game_match.register_player("d", None);

        assert_eq!(a.position, Position::new(10.0, 20.0));
        assert_eq!(b.position, Position::new(30.0, 40.0));
        assert_eq!(c.position, Position::default());
        assert_eq!(d.position, Position::default());
        assert_eq!(game_match.actor_count(), 4);
    }

    #[test]
    fn test_registration_dedupes_by_name() {
        let game_match = open_match(vec![(1, 1), (5, 5)]);

        let first = game_match.register_player("clyde", Some("orange".into()));
        let again = game_match.register_player("clyde", None);

        assert_eq!(first.id, again.id);
        assert_eq!(again.skin_id.as_deref(), Some("orange"));
        assert_eq!(game_match.actor_count(), 1);

        // The duplicate did not consume a spawn slot
        let other = game_match.register_player("blinky", None);
        assert_eq!(other.position, Position::new(50.0, 50.0));
    }

    #[test]
    fn test_new_actor_starts_idle_and_alive() {
        let game_match = open_match(vec![]);
        let actor = game_match.register_player("a", None);
        assert_eq!(actor.direction, Direction::Idle);
        assert_eq!(actor.eating, 5);
        assert!(actor.alive());
    }

    #[test]
    fn test_one_tick_on_open_grid_moves_full_speed() {
        let game_match = open_match(vec![(0, 0)]);
        let actor = game_match.register_player("a", None);
        assert_eq!(
            game_match.try_turn(actor.id, Direction::Right).unwrap(),
            TurnOutcome::Committed
        );

        game_match.step();

        let moved = game_match.actor(&actor.id).unwrap();
        assert_eq!(moved.position, Position::new(SPEED, 0.0));
        assert_eq!(moved.direction, Direction::Right);
    }

    #[test]
    fn test_actor_stops_at_wall_and_goes_idle() {
        let mut grid = Grid::open(10, 10, TILE);
        for row in 0..10 {
            grid.set_tile(7, row, Tile::Wall);
        }
        let game_match = GameMatch::new(Uuid::new_v4(), &settings(grid, vec![]));
        let actor = placed("a", 5, 48.0, 40.0, Direction::Right);
        let id = actor.id;
        game_match.insert_actor(actor);

        game_match.step();
        let after_first = game_match.actor(&id).unwrap();
        assert_eq!(after_first.position.x, 50.0);
        assert_eq!(after_first.direction, Direction::Right);

        game_match.step();
        let after_second = game_match.actor(&id).unwrap();
        assert_eq!(after_second.position.x, 50.0);
        assert_eq!(after_second.direction, Direction::Idle);
    }

    #[test]
    fn test_blocked_turn_is_rejected_and_direction_kept() {
        let game_match = open_match(vec![]);
        // Flush against the top edge of the map
        let actor = placed("a", 5, 40.0, 0.0, Direction::Right);
        let id = actor.id;
        game_match.insert_actor(actor);

        assert_eq!(game_match.try_turn(id, Direction::Up).unwrap(), TurnOutcome::Rejected);
        assert_eq!(game_match.actor(&id).unwrap().direction, Direction::Right);

        assert_eq!(game_match.try_turn(id, Direction::Idle).unwrap(), TurnOutcome::Rejected);
        assert_eq!(game_match.actor(&id).unwrap().direction, Direction::Right);

        assert_eq!(game_match.try_turn(id, Direction::Down).unwrap(), TurnOutcome::Committed);
        assert_eq!(game_match.actor(&id).unwrap().direction, Direction::Down);
    }

    #[test]
    fn test_turn_for_unknown_player_fails() {
        let game_match = open_match(vec![]);
        let ghost = Uuid::new_v4();
        assert!(matches!(
            game_match.try_turn(ghost, Direction::Left),
            Err(GameError::PlayerNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn test_equal_power_collision_bounces_both() {
        let game_match = open_match(vec![]);
        let a = placed("a", 5, 20.0, 40.0, Direction::Right);
        let b = placed("b", 5, 30.0, 40.0, Direction::Left);
        let (a_id, b_id) = (a.id, b.id);
        game_match.insert_actor(a);
        game_match.insert_actor(b);

        game_match.step();

        let a = game_match.actor(&a_id).unwrap();
        let b = game_match.actor(&b_id).unwrap();
        assert_eq!((a.eating, b.eating), (5, 5));
        assert!(a.alive() && b.alive());
        assert_eq!(a.direction, Direction::Left);
        assert_eq!(b.direction, Direction::Right);
    }

    #[test]
    fn test_unequal_power_collision_eats_the_weaker() {
        let game_match = open_match(vec![]);
        let weak = placed("weak", 3, 20.0, 40.0, Direction::Right);
        let strong = placed("strong", 7, 30.0, 40.0, Direction::Idle);
        let (weak_id, strong_id) = (weak.id, strong.id);
        game_match.insert_actor(weak);
        game_match.insert_actor(strong);

        game_match.step();

        let weak = game_match.actor(&weak_id).unwrap();
        let strong = game_match.actor(&strong_id).unwrap();
        assert_eq!(weak.eating, 0);
        assert!(!weak.alive());
        assert_eq!(strong.eating, 4);
        assert!(strong.alive());
        assert_eq!(game_match.alive_count(), 1);
    }

    #[test]
    fn test_dead_actors_do_not_move_but_stay_in_frame() {
        let game_match = open_match(vec![]);
        let mut corpse = placed("corpse", 1, 40.0, 40.0, Direction::Left);
        corpse.take_damage(1);
        let id = corpse.id;
        game_match.insert_actor(corpse);

        match game_match.step() {
            ServerMsg::Frame { data, match_id, .. } => {
                assert_eq!(match_id, game_match.id());
                assert!(data[&id].dead);
                assert_eq!(data[&id].x, 40.0);
            }
            other => panic!("expected frame, got {other:?}"),
        }
        assert!(game_match.try_turn(id, Direction::Right).is_ok_and(|o| o == TurnOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let game_match = open_match(vec![(0, 0)]);
        game_match.register_player("a", None);
        let mut rx = game_match.subscribe();

        let frame = game_match.step();
        assert_eq!(game_match.broadcast(frame), 1);

        let received = rx.recv().await.unwrap();
        assert!(matches!(received, ServerMsg::Frame { ref data, .. } if data.len() == 1));
    }

    #[test]
    fn test_broadcast_without_subscribers_is_harmless() {
        let game_match = open_match(vec![]);
        let frame = game_match.step();
        assert_eq!(game_match.broadcast(frame), 0);
    }

    #[test]
    fn test_registry_current_match_is_stable() {
        let registry = MatchRegistry::new(settings(Grid::open(4, 4, TILE), vec![]));
        assert_eq!(registry.active_matches(), 0);

        let first = registry.current_or_create();
        let second = registry.current_or_create();
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.active_matches(), 1);

        let created = registry.create_match();
        assert_ne!(created.id(), first.id());
        assert_eq!(registry.current_or_create().id(), created.id());
        assert_eq!(registry.active_matches(), 2);

        assert!(registry.get(&first.id()).is_some());
        assert!(registry.get(&Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_registry_counts_actors_across_matches() {
        let registry = MatchRegistry::new(settings(Grid::open(4, 4, TILE), vec![]));
        let first = registry.create_match();
        let second = registry.create_match();
        first.register_player("a", None);
        first.register_player("b", None);
        second.register_player("a", None);

        assert_eq!(registry.total_actors(), 3);
        assert_eq!(registry.matches().len(), 2);
    }
}
