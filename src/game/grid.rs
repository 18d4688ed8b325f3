//! Tile grid loaded once per process and shared by every match

use std::path::Path;

use tracing::info;

/// A single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tile {
    Floor,
    Wall,
    /// Passable; reserved for screen-edge wrapping
    Wrap,
}

impl Tile {
    fn from_map_char(c: u8) -> Self {
        match c {
            b'1' => Tile::Wall,
            b'2' => Tile::Wrap,
            _ => Tile::Floor,
        }
    }

    /// Whether an actor may enter this tile
    pub fn is_passable(self) -> bool {
        !matches!(self, Tile::Wall)
    }
}

/// Immutable tile map, stored row-major
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// An all-floor grid
    #[cfg(test)]
    pub fn open(rows: usize, cols: usize, tile_size: f32) -> Self {
        Self {
            rows,
            cols,
            tile_size,
            tiles: vec![Tile::Floor; rows * cols],
        }
    }

    /// Parse the `"<rows>:<cols>\n"` header followed by `rows * cols` tile characters.
    /// Line breaks between tiles are skipped; anything after the last tile is ignored.
    pub fn parse(source: &str, tile_size: f32) -> Result<Self, MapLoadError> {
        let (header, body) = source
            .split_once('\n')
            .ok_or(MapLoadError::MissingHeader)?;

        let (rows, cols) = header
            .trim()
            .split_once(':')
            .ok_or_else(|| MapLoadError::InvalidHeader(header.trim().to_string()))?;
        let rows: usize = rows
            .trim()
            .parse()
            .map_err(|_| MapLoadError::InvalidHeader(header.trim().to_string()))?;
        let cols: usize = cols
            .trim()
            .parse()
            .map_err(|_| MapLoadError::InvalidHeader(header.trim().to_string()))?;

        if rows == 0 || cols == 0 {
            return Err(MapLoadError::InvalidHeader(header.trim().to_string()));
        }

        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| MapLoadError::InvalidHeader(header.trim().to_string()))?;
        let tiles: Vec<Tile> = body
            .bytes()
            .filter(|b| *b != b'\n' && *b != b'\r')
            .take(expected)
            .map(Tile::from_map_char)
            .collect();

        if tiles.len() < expected {
            return Err(MapLoadError::Truncated {
                expected,
                found: tiles.len(),
            });
        }

        Ok(Self {
            rows,
            cols,
            tile_size,
            tiles,
        })
    }

    /// Read and parse a map file
    pub fn load(path: impl AsRef<Path>, tile_size: f32) -> Result<Self, MapLoadError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| MapLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let grid = Self::parse(&source, tile_size)?;
        info!(
            path = %path.display(),
            rows = grid.rows(),
            cols = grid.cols(),
            "Successfully loaded map"
        );
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Width and height of one cell in world units
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Tile at (col, row), `None` outside the map
    pub fn tile(&self, col: i64, row: i64) -> Option<Tile> {
        if col < 0 || row < 0 {
            return None;
        }
        let (col, row) = (col as usize, row as usize);
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.tiles[row * self.cols + col])
    }

    /// Walls and everything outside the map block movement
    pub fn is_blocked(&self, col: i64, row: i64) -> bool {
        self.tile(col, row).map_or(true, |tile| !tile.is_passable())
    }

    #[cfg(test)]
    pub fn set_tile(&mut self, col: usize, row: usize, tile: Tile) {
        self.tiles[row * self.cols + col] = tile;
    }
}

/// Map loading errors (fatal at startup)
#[derive(Debug, thiserror::Error)]
pub enum MapLoadError {
    #[error("Failed to read map file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Map file has no size header line")]
    MissingHeader,

    #[error("Invalid map size header: {0:?}")]
    InvalidHeader(String),

    #[error("Map ended early: expected {expected} tiles, found {found}")]
    Truncated { expected: usize, found: usize },
}
