//! A single hexagonal world cell.

use tessel_common::{corner_points, ChunkCoord, LocalCoord, TileId};

use crate::block::BlockType;

/// Health a freshly placed or generated tile starts with.
pub const DEFAULT_TILE_HEALTH: f64 = 100.0;

/// Fraction of the radius used for point picking (inscribed circle).
const INNER_RADIUS_FACTOR: f64 = 0.866;

/// A hexagonal tile.
///
/// Owned by exactly one [`Chunk`](crate::chunk::Chunk). The chunk and local
/// coordinates are stamped by the chunk when the tile is inserted and are
/// plain values, never references.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    /// Pixel-space center X
    pub x: f64,
    /// Pixel-space center Y
    pub y: f64,
    /// Hexagon radius
    pub size: f64,
    /// Block held by this tile
    pub block: BlockType,
    /// Remaining health
    pub health: f64,
    /// Health when undamaged
    pub max_health: f64,
    chunk: ChunkCoord,
    local: LocalCoord,
}

impl Tile {
    /// Creates an undamaged tile. Chunk coordinates are assigned on insertion.
    #[must_use]
    pub fn new(x: f64, y: f64, size: f64, block: BlockType) -> Self {
        Self {
            x,
            y,
            size,
            block,
            health: DEFAULT_TILE_HEALTH,
            max_health: DEFAULT_TILE_HEALTH,
            chunk: ChunkCoord::new(0, 0),
            local: LocalCoord::new(0, 0),
        }
    }

    /// Owning chunk coordinate.
    #[must_use]
    pub const fn chunk_coord(&self) -> ChunkCoord {
        self.chunk
    }

    /// Key inside the owning chunk.
    #[must_use]
    pub const fn local_coord(&self) -> LocalCoord {
        self.local
    }

    /// Identity used by the spatial index.
    #[must_use]
    pub const fn id(&self) -> TileId {
        TileId::new(self.chunk, self.local)
    }

    pub(crate) fn stamp(&mut self, chunk: ChunkCoord, local: LocalCoord) {
        self.chunk = chunk;
        self.local = local;
    }

    /// The six corner points of this hexagon.
    #[must_use]
    pub fn corners(&self) -> [(f64, f64); 6] {
        corner_points(self.x, self.y, self.size)
    }

    /// Whether a pixel position falls inside this tile's inscribed circle.
    #[must_use]
    pub fn contains_point(&self, px: f64, py: f64) -> bool {
        let dx = px - self.x;
        let dy = py - self.y;
        let inner = self.size * INNER_RADIUS_FACTOR;
        dx * dx + dy * dy < inner * inner
    }

    /// Squared distance from the tile center to a point.
    #[must_use]
    pub fn distance_sq(&self, px: f64, py: f64) -> f64 {
        let dx = self.x - px;
        let dy = self.y - py;
        dx * dx + dy * dy
    }

    /// Applies `amount` damage scaled by the block's hardness.
    ///
    /// Returns `true` when the tile is destroyed. Unbreakable blocks ignore
    /// damage.
    pub fn take_damage(&mut self, amount: f64) -> bool {
        let hardness = self.block.properties().hardness;
        if hardness <= 0.0 {
            return false;
        }
        self.health -= amount / hardness;
        self.health <= 0.0
    }

    /// Remaining health as a fraction of maximum health.
    #[must_use]
    pub fn health_fraction(&self) -> f64 {
        if self.max_health <= 0.0 {
            return 0.0;
        }
        (self.health / self.max_health).clamp(0.0, 1.0)
    }
}
