//! Coordinate types for chunks, tiles and the chunk grid layout.
//!
//! Tiles sit on a pointy-top hexagonal grid addressed by global offset
//! coordinates `(col, row)`. Odd rows are shifted right by half a hexagon
//! width so neighboring rows interlock. Chunks group `chunk_size × chunk_size`
//! offset cells.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoordError;
use crate::hex::{hex_round, Hex, HexLayout, SQRT_3};

/// Default hexagon radius in pixels.
pub const DEFAULT_HEX_SIZE: f64 = 30.0;

/// Default number of hexagons per chunk dimension.
pub const DEFAULT_CHUNK_SIZE: u32 = 32;

/// Largest absolute global column or row on the grid.
///
/// Kept well below `i32::MAX` so offset/axial conversions and neighbor
/// steps of any addressable cell stay in range.
pub const MAX_TILE_COORD: i32 = 1 << 29;

/// Chunk coordinate (identifies a chunk in the world grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkCoord {
    /// X coordinate in chunk space
    pub x: i32,
    /// Y coordinate in chunk space
    pub y: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another chunk, in chunk units.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }

    /// Chebyshev (king-move) distance to another chunk.
    #[must_use]
    pub fn chebyshev(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Tile key inside a chunk: local column and row.
///
/// Rendered and parsed as `"col,row"`, the key format of chunk files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalCoord {
    /// Column within the chunk
    pub col: i32,
    /// Row within the chunk
    pub row: i32,
}

impl LocalCoord {
    /// Creates a new local coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }
}

impl fmt::Display for LocalCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.col, self.row)
    }
}

impl FromStr for LocalCoord {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoordError::InvalidLocalKey(s.to_string());
        let (col, row) = s.split_once(',').ok_or_else(invalid)?;
        let col = col.trim().parse().map_err(|_| invalid())?;
        let row = row.trim().parse().map_err(|_| invalid())?;
        Ok(Self { col, row })
    }
}

/// Global offset coordinate of a tile on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Global column
    pub col: i32,
    /// Global row
    pub row: i32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Axial hexagon for this grid cell.
    #[must_use]
    pub const fn to_hex(self) -> Hex {
        Hex::from_offset(self.col, self.row)
    }

    /// Grid cell for an axial hexagon.
    #[must_use]
    pub const fn from_hex(hex: Hex) -> Self {
        let (col, row) = hex.to_offset();
        Self { col, row }
    }

    /// Whether this cell lies on an even row.
    #[must_use]
    pub const fn is_even_row(self) -> bool {
        self.row.rem_euclid(2) == 0
    }
}

/// Geometry of the chunked hexagon grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Hexagon radius in pixels
    pub hex_size: f64,
    /// Hexagons per chunk dimension
    pub chunk_size: u32,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new(DEFAULT_HEX_SIZE, DEFAULT_CHUNK_SIZE)
    }
}

impl GridLayout {
    /// Creates a layout.
    #[must_use]
    pub const fn new(hex_size: f64, chunk_size: u32) -> Self {
        Self {
            hex_size,
            chunk_size,
        }
    }

    /// Width of a hexagon (flat side to flat side).
    #[must_use]
    pub fn hex_width(&self) -> f64 {
        SQRT_3 * self.hex_size
    }

    /// Height of a hexagon (corner to corner).
    #[must_use]
    pub fn hex_height(&self) -> f64 {
        2.0 * self.hex_size
    }

    /// Distance between two consecutive rows.
    #[must_use]
    pub fn vertical_spacing(&self) -> f64 {
        self.hex_height() * 0.75
    }

    /// Width of a chunk in pixels.
    #[must_use]
    pub fn chunk_width(&self) -> f64 {
        f64::from(self.chunk_size) * self.hex_width()
    }

    /// Height of a chunk in pixels.
    #[must_use]
    pub fn chunk_height(&self) -> f64 {
        f64::from(self.chunk_size) * self.vertical_spacing()
    }

    /// Chunk whose pixel rectangle contains `(x, y)`.
    #[must_use]
    pub fn chunk_coords_for(&self, x: f64, y: f64) -> ChunkCoord {
        ChunkCoord::new(
            (x / self.chunk_width()).floor() as i32,
            (y / self.chunk_height()).floor() as i32,
        )
    }

    /// Pixel position of a chunk's top-left corner.
    #[must_use]
    pub fn chunk_origin(&self, chunk: ChunkCoord) -> (f64, f64) {
        (
            f64::from(chunk.x) * self.chunk_width(),
            f64::from(chunk.y) * self.chunk_height(),
        )
    }

    /// Horizontal offset of the first center on a row: half a width on even
    /// rows, a full width on odd rows.
    #[must_use]
    pub fn row_offset(&self, row: i32) -> f64 {
        if row.rem_euclid(2) == 0 {
            self.hex_width() / 2.0
        } else {
            self.hex_width()
        }
    }

    /// Pixel center of a grid cell.
    #[must_use]
    pub fn tile_center(&self, coord: TileCoord) -> (f64, f64) {
        (
            f64::from(coord.col) * self.hex_width() + self.row_offset(coord.row),
            f64::from(coord.row) * self.vertical_spacing() + self.hex_size,
        )
    }

    /// Pointy-top hex layout whose origin hexagon is grid cell `(0, 0)`.
    #[must_use]
    pub fn hex_layout(&self) -> HexLayout {
        HexLayout::pointy(self.hex_size).with_origin(self.hex_width() / 2.0, self.hex_size)
    }

    /// Grid cell whose hexagon contains `(x, y)`.
    ///
    /// Positions beyond the addressable grid are clamped onto its edge and
    /// NaN maps to the origin cell; use
    /// [`checked_tile_coord_at`](Self::checked_tile_coord_at) to reject them.
    #[must_use]
    pub fn tile_coord_at(&self, x: f64, y: f64) -> TileCoord {
        let frac = self.hex_layout().pixel_to_hex(x, y);
        let limit = f64::from(MAX_TILE_COORD);
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(-limit, limit) };
        TileCoord::from_hex(hex_round(clamp(frac.q), clamp(frac.r)))
    }

    /// Grid cell whose hexagon contains `(x, y)`, or `None` when the
    /// position is not finite or its chunk lies outside the grid.
    #[must_use]
    pub fn checked_tile_coord_at(&self, x: f64, y: f64) -> Option<TileCoord> {
        let frac = self.hex_layout().pixel_to_hex(x, y);
        let limit = f64::from(MAX_TILE_COORD);
        if !(frac.q.abs() < limit && frac.r.abs() < limit) {
            return None;
        }
        let coord = TileCoord::from_hex(frac.round());
        self.contains_chunk(self.split(coord).0).then_some(coord)
    }

    /// Chunk side length as a signed step, never zero.
    fn size(&self) -> i32 {
        i32::try_from(self.chunk_size).unwrap_or(i32::MAX).max(1)
    }

    /// Whether every cell of `chunk` lies within [`MAX_TILE_COORD`].
    #[must_use]
    pub fn contains_chunk(&self, chunk: ChunkCoord) -> bool {
        let limit = MAX_TILE_COORD / self.size();
        (-limit..limit).contains(&chunk.x) && (-limit..limit).contains(&chunk.y)
    }

    /// Splits a global cell into its chunk and the key inside that chunk.
    #[must_use]
    pub fn split(&self, coord: TileCoord) -> (ChunkCoord, LocalCoord) {
        let size = self.size();
        (
            ChunkCoord::new(coord.col.div_euclid(size), coord.row.div_euclid(size)),
            LocalCoord::new(coord.col.rem_euclid(size), coord.row.rem_euclid(size)),
        )
    }

    /// Inverse of [`GridLayout::split`]. Saturates outside the `i32` range.
    #[must_use]
    pub fn join(&self, chunk: ChunkCoord, local: LocalCoord) -> TileCoord {
        let size = self.size();
        TileCoord::new(
            chunk.x.saturating_mul(size).saturating_add(local.col),
            chunk.y.saturating_mul(size).saturating_add(local.row),
        )
    }
}
