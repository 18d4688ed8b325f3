//! Application state shared across routes

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::game::{EventProcessor, Grid, MatchRegistry, MatchSettings, PlayerInput};
use crate::ws::ConnectionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub match_registry: Arc<MatchRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    /// Feeds parsed client events to the event processor
    pub input_tx: mpsc::Sender<PlayerInput>,
}

impl AppState {
    /// Build the shared state around a loaded map. The returned processor
    /// must be spawned for client events to take effect.
    pub fn new(config: Config, grid: Grid) -> (Self, EventProcessor) {
        let config = Arc::new(config);

        // Every match shares the same immutable map
        let settings = MatchSettings {
            grid: Arc::new(grid),
            actor_speed: config.actor_speed,
            starting_power: config.starting_power,
            spawn_positions: config.spawn_positions.clone(),
        };

        // Initialize match registry
        let match_registry = Arc::new(MatchRegistry::new(settings));

        let (processor, input_tx) = EventProcessor::new(match_registry.clone());

        let state = Self {
            config,
            match_registry,
            connections: Arc::new(ConnectionRegistry::new()),
            input_tx,
        };

        (state, processor)
    }
}
