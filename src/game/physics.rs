//! Grid movement: how far an actor may travel this tick

use super::actor::{ActorState, Axis, Direction, Displacement, Position};
use super::grid::Grid;

/// Tolerance, in cells, when deciding which cell a coordinate falls into.
/// Multiples of a fractional tile size are not exact in f32.
const CELL_EPSILON: f32 = 1e-4;

/// Physics system for grid-bound actor movement
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Largest displacement along `direction` (at most `speed`) that keeps the
    /// actor's footprint out of wall tiles. Cells outside the map count as walls.
    ///
    /// Depends only on its arguments, so it can be asked speculatively when
    /// validating a turn and again when stepping the match.
    pub fn max_travel(
        position: Position,
        direction: Direction,
        grid: &Grid,
        speed: f32,
    ) -> Displacement {
        let Some(axis) = direction.axis() else {
            return Displacement::ZERO;
        };

        let tile = grid.tile_size();
        let footprint = ActorState::footprint(tile);
        let (along, across) = match axis {
            Axis::X => (position.x, position.y),
            Axis::Y => (position.y, position.x),
        };

        // Rows (horizontal travel) or columns (vertical travel) the box spans
        let first_lane = cell_floor(across, tile);
        let last_lane = cell_ceil(across + footprint, tile) - 1;

        let cell_blocked = |cell: i64| {
            (first_lane..=last_lane).any(|lane| match axis {
                Axis::X => grid.is_blocked(cell, lane),
                Axis::Y => grid.is_blocked(lane, cell),
            })
        };

        let distance = if direction.sign() > 0.0 {
            let edge = along + footprint;
            let mut cell = cell_floor(edge, tile);
            loop {
                let boundary = cell as f32 * tile;
                if boundary >= edge + speed {
                    break speed;
                }
                if cell_blocked(cell) {
                    break (boundary - edge).clamp(0.0, speed);
                }
                cell += 1;
            }
        } else {
            let edge = along;
            let mut cell = cell_ceil(edge, tile) - 1;
            loop {
                let boundary = (cell + 1) as f32 * tile;
                if boundary <= edge - speed {
                    break speed;
                }
                if cell_blocked(cell) {
                    break (edge - boundary).clamp(0.0, speed);
                }
                cell -= 1;
            }
        };

        Displacement::along(direction, distance)
    }
}

fn cell_floor(coord: f32, tile: f32) -> i64 {
    (coord / tile + CELL_EPSILON).floor() as i64
}

fn cell_ceil(coord: f32, tile: f32) -> i64 {
    (coord / tile - CELL_EPSILON).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::grid::Tile;

    const TILE: f32 = 10.0;
    const SPEED: f32 = 4.0;

    fn open_grid() -> Grid {
        Grid::open(10, 10, TILE)
    }

    fn wall_column(col: usize) -> Grid {
        let mut grid = open_grid();
        for row in 0..10 {
            grid.set_tile(col, row, Tile::Wall);
        }
        grid
    }

    #[test]
    fn test_unobstructed_travel_is_full_speed() {
        let grid = open_grid();
        let pos = Position::new(40.0, 40.0);

        assert_eq!(
            PhysicsSystem::max_travel(pos, Direction::Right, &grid, SPEED),
            Displacement { dx: SPEED, dy: 0.0 }
        );
        assert_eq!(
            PhysicsSystem::max_travel(pos, Direction::Left, &grid, SPEED),
            Displacement { dx: -SPEED, dy: 0.0 }
        );
        assert_eq!(
            PhysicsSystem::max_travel(pos, Direction::Up, &grid, SPEED),
            Displacement { dx: 0.0, dy: -SPEED }
        );
        assert_eq!(
            PhysicsSystem::max_travel(pos, Direction::Down, &grid, SPEED),
            Displacement { dx: 0.0, dy: SPEED }
        );
    }

    #[test]
    fn test_idle_does_not_move() {
        let grid = open_grid();
        let travel = PhysicsSystem::max_travel(Position::new(40.0, 40.0), Direction::Idle, &grid, SPEED);
        assert!(travel.is_zero());
    }

    #[test]
    fn test_clamps_to_gap_before_wall() {
        // Wall column 7 starts at x = 70; the leading edge sits at 48 + 20 = 68
        let grid = wall_column(7);
        let travel = PhysicsSystem::max_travel(Position::new(48.0, 40.0), Direction::Right, &grid, SPEED);
        assert_eq!(travel, Displacement { dx: SPEED / 2.0, dy: 0.0 });
    }

    #[test]
    fn test_clamps_to_gap_moving_left() {
        // Wall column 2 ends at x = 30
        let grid = wall_column(2);
        let travel = PhysicsSystem::max_travel(Position::new(31.0, 40.0), Direction::Left, &grid, SPEED);
        assert_eq!(travel, Displacement { dx: -1.0, dy: 0.0 });
    }

    #[test]
    fn test_flush_against_wall_is_zero() {
        let grid = wall_column(7);
        let travel = PhysicsSystem::max_travel(Position::new(50.0, 40.0), Direction::Right, &grid, SPEED);
        assert!(travel.is_zero());
    }

    #[test]
    fn test_map_edges_block_like_walls() {
        let grid = open_grid();

        let left = PhysicsSystem::max_travel(Position::new(1.0, 40.0), Direction::Left, &grid, SPEED);
        assert_eq!(left, Displacement { dx: -1.0, dy: 0.0 });

        let right = PhysicsSystem::max_travel(Position::new(78.0, 40.0), Direction::Right, &grid, SPEED);
        assert_eq!(right, Displacement { dx: 2.0, dy: 0.0 });

        let up = PhysicsSystem::max_travel(Position::new(40.0, 0.0), Direction::Up, &grid, SPEED);
        assert!(up.is_zero());

        let down = PhysicsSystem::max_travel(Position::new(40.0, 80.0), Direction::Down, &grid, SPEED);
        assert!(down.is_zero());
    }

    #[test]
    fn test_wall_in_any_spanned_lane_blocks() {
        let mut grid = open_grid();
        grid.set_tile(7, 5, Tile::Wall);

        // Rows 3 and 4 only: the wall in row 5 is out of the way
        let aligned = PhysicsSystem::max_travel(Position::new(50.0, 30.0), Direction::Right, &grid, SPEED);
        assert_eq!(aligned.dx, SPEED);

        // Half a tile lower the box spans rows 3..=5
        let straddling = PhysicsSystem::max_travel(Position::new(50.0, 35.0), Direction::Right, &grid, SPEED);
        assert!(straddling.is_zero());
    }

    #[test]
    fn test_vertical_travel_against_wall_row() {
        let mut grid = open_grid();
        for col in 0..10 {
            grid.set_tile(col, 8, Tile::Wall);
        }

        let down = PhysicsSystem::max_travel(Position::new(20.0, 57.0), Direction::Down, &grid, SPEED);
        assert_eq!(down, Displacement { dx: 0.0, dy: 3.0 });

        let up = PhysicsSystem::max_travel(Position::new(20.0, 57.0), Direction::Up, &grid, SPEED);
        assert_eq!(up, Displacement { dx: 0.0, dy: -SPEED });
    }

    #[test]
    fn test_wrap_tiles_do_not_block() {
        let mut grid = open_grid();
        for row in 0..10 {
            grid.set_tile(7, row, Tile::Wrap);
        }
        let travel = PhysicsSystem::max_travel(Position::new(50.0, 40.0), Direction::Right, &grid, SPEED);
        assert_eq!(travel.dx, SPEED);
    }

    #[test]
    fn test_speed_longer_than_a_tile_sweeps_every_cell() {
        let open = open_grid();
        let travel = PhysicsSystem::max_travel(Position::new(0.0, 0.0), Direction::Right, &open, 25.0);
        assert_eq!(travel.dx, 25.0);

        let grid = wall_column(4);
        let travel = PhysicsSystem::max_travel(Position::new(0.0, 0.0), Direction::Right, &grid, 25.0);
        assert_eq!(travel.dx, 20.0);
    }

    #[test]
    fn test_fractional_tile_size_keeps_two_lanes() {
        let tile = 26.2;
        let mut grid = Grid::open(30, 30, tile);
        // Just below the footprint of an actor parked on tile (8, 10)
        grid.set_tile(10, 12, Tile::Wall);

        let pos = Position::new(8.0 * tile, 10.0 * tile);
        let travel = PhysicsSystem::max_travel(pos, Direction::Right, &grid, 10.0);
        assert_eq!(travel.dx, 10.0);
    }

    #[test]
    fn test_max_travel_is_idempotent() {
        let grid = wall_column(7);
        let pos = Position::new(47.5, 41.0);
        let first = PhysicsSystem::max_travel(pos, Direction::Right, &grid, SPEED);
        let second = PhysicsSystem::max_travel(pos, Direction::Right, &grid, SPEED);
        assert_eq!(first, second);
    }
}
