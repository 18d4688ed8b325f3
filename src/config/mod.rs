//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Spawn tiles used when `SPAWN_POSITIONS` is not set, as (col, row)
pub const DEFAULT_SPAWN_POSITIONS: &str = "8:10,16:10,8:17,17:17";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Path to the map file loaded at startup
    pub map_path: PathBuf,
    /// Width of one grid cell in world units
    pub tile_size: f32,
    /// Distance an actor travels per tick
    pub actor_speed: f32,
    /// Interval between simulation ticks
    pub tick_interval: Duration,
    /// Power counter a freshly registered actor starts with
    pub starting_power: u32,
    /// Spawn tiles handed out in order, as (col, row)
    pub spawn_positions: Vec<(u32, u32)>,

    /// Allowed client origins for CORS (permissive when empty)
    pub client_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let tick_interval_ms: u64 = parse_var("TICK_INTERVAL_MS", 1000)?;
        if tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("TICK_INTERVAL_MS"));
        }

        let starting_power: u32 = parse_var("STARTING_POWER", 10)?;
        if starting_power == 0 {
            return Err(ConfigError::Invalid("STARTING_POWER"));
        }

        let tile_size: f32 = parse_var("TILE_SIZE", 26.2)?;
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(ConfigError::Invalid("TILE_SIZE"));
        }

        let actor_speed: f32 = parse_var("ACTOR_SPEED", 10.0)?;
        if !(actor_speed.is_finite() && actor_speed >= 0.0) {
            return Err(ConfigError::Invalid("ACTOR_SPEED"));
        }

        let spawn_positions = parse_spawn_positions(
            &env::var("SPAWN_POSITIONS").unwrap_or_else(|_| DEFAULT_SPAWN_POSITIONS.to_string()),
        )?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            map_path: env::var("MAP_PATH")
                .unwrap_or_else(|_| "./maps/map1.pacm".to_string())
                .into(),
            tile_size,
            actor_speed,
            tick_interval: Duration::from_millis(tick_interval_ms),
            starting_power,
            spawn_positions,

            client_origin: env::var("CLIENT_ORIGIN").ok().filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Read an optional variable, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Parse `"col:row,col:row"` into spawn tiles
pub fn parse_spawn_positions(raw: &str) -> Result<Vec<(u32, u32)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (col, row) = entry
                .split_once(':')
                .ok_or(ConfigError::Invalid("SPAWN_POSITIONS"))?;
            let col = col
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SPAWN_POSITIONS"))?;
            let row = row
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid("SPAWN_POSITIONS"))?;
            Ok((col, row))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
