//! Actor state and the axis-aligned direction type

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actors occupy a square footprint of this many tiles per side
pub const ACTOR_FOOTPRINT_TILES: f32 = 2.0;

/// Axis-aligned heading. Diagonals are not representable.
///
/// On the wire this is `[dx, dy]` with y growing downward, so `Up` is `[0, -1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "[i8; 2]", try_from = "[i8; 2]")]
pub enum Direction {
    #[default]
    Idle,
    Left,
    Right,
    Up,
    Down,
}

/// Movement axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Direction {
    pub fn vector(self) -> (i8, i8) {
        match self {
            Direction::Idle => (0, 0),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
        }
    }

    pub fn axis(self) -> Option<Axis> {
        match self {
            Direction::Idle => None,
            Direction::Left | Direction::Right => Some(Axis::X),
            Direction::Up | Direction::Down => Some(Axis::Y),
        }
    }

    /// +1 or -1 along the active axis, 0 when idle
    pub fn sign(self) -> f32 {
        match self {
            Direction::Idle => 0.0,
            Direction::Left | Direction::Up => -1.0,
            Direction::Right | Direction::Down => 1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Idle => Direction::Idle,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }

    pub fn is_idle(self) -> bool {
        self == Direction::Idle
    }
}

impl From<Direction> for [i8; 2] {
    fn from(direction: Direction) -> Self {
        let (dx, dy) = direction.vector();
        [dx, dy]
    }
}

impl TryFrom<[i8; 2]> for Direction {
    type Error = InvalidDirection;

    fn try_from(value: [i8; 2]) -> Result<Self, Self::Error> {
        match value {
            [0, 0] => Ok(Direction::Idle),
            [-1, 0] => Ok(Direction::Left),
            [1, 0] => Ok(Direction::Right),
            [0, -1] => Ok(Direction::Up),
            [0, 1] => Ok(Direction::Down),
            [dx, dy] => Err(InvalidDirection(dx, dy)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("direction [{0}, {1}] is not an axis-aligned unit vector")]
pub struct InvalidDirection(pub i8, pub i8);

/// World-space position (top-left corner of the footprint)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Per-tick movement, zero on the axis not travelled
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Displacement {
    pub dx: f32,
    pub dy: f32,
}

impl Displacement {
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    pub fn along(direction: Direction, distance: f32) -> Self {
        let signed = direction.sign() * distance;
        match direction.axis() {
            Some(Axis::X) => Self { dx: signed, dy: 0.0 },
            Some(Axis::Y) => Self { dx: 0.0, dy: signed },
            None => Self::ZERO,
        }
    }

    pub fn is_zero(self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

/// Actor state in a match (authoritative)
#[derive(Debug, Clone)]
pub struct ActorState {
    pub id: Uuid,
    /// Display name, unique within a match
    pub ign: String,
    pub skin_id: Option<String>,

    // Position and movement
    pub position: Position,
    pub direction: Direction,

    // Combat
    /// Remaining power; also the damage dealt on collision
    pub eating: u32,
    alive: bool,
}

impl ActorState {
    pub fn new(ign: String, skin_id: Option<String>, position: Position, eating: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            ign,
            skin_id,
            position,
            direction: Direction::Idle,
            eating,
            alive: eating > 0,
        }
    }

    pub fn alive(&self) -> bool {
        self.alive
    }

    /// Size of the square footprint in world units
    pub fn footprint(tile_size: f32) -> f32 {
        tile_size * ACTOR_FOOTPRINT_TILES
    }

    pub fn translate(&mut self, displacement: Displacement) {
        self.position.x += displacement.dx;
        self.position.y += displacement.dy;
    }

    /// Reduce power by `damage`, flooring at zero. Returns true if this killed the actor.
    pub fn take_damage(&mut self, damage: u32) -> bool {
        let was_alive = self.alive;
        self.eating = self.eating.saturating_sub(damage);
        if self.eating == 0 {
            self.alive = false;
        }
        was_alive && !self.alive
    }
}
