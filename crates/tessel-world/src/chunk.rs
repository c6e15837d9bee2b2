//! Chunk data structure and serialization.

use std::collections::BTreeMap;
use std::time::Instant;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessel_common::{ChunkCoord, CoordError, GridLayout, LocalCoord};
use thiserror::Error;

use crate::block::BlockType;
use crate::tile::{Tile, DEFAULT_TILE_HEALTH};

/// Chunk errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Encoding to the chunk document failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[source] serde_json::Error),
    /// The chunk document could not be decoded
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(#[source] serde_json::Error),
    /// A tile key is malformed
    #[error("Invalid tile key: {0}")]
    InvalidKey(#[from] CoordError),
    /// The document describes a different chunk than requested
    #[error("Chunk coordinate mismatch: expected {expected}, found {found}")]
    CoordinateMismatch {
        /// Requested coordinate
        expected: ChunkCoord,
        /// Coordinate stored in the document
        found: ChunkCoord,
    },
}

/// Result type for chunk operations.
pub type ChunkResult<T> = Result<T, ChunkError>;

/// On-disk form of a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkData {
    /// Chunk X coordinate
    pub chunk_x: i32,
    /// Chunk Y coordinate
    pub chunk_y: i32,
    /// Tiles keyed by `"col,row"`
    pub hexagons: BTreeMap<String, SerializedTile>,
}

/// On-disk form of a tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedTile {
    /// Center X
    pub x: f64,
    /// Center Y
    pub y: f64,
    /// Hexagon radius
    pub size: f64,
    /// Block id
    pub block_type: BlockType,
    /// Remaining health
    pub health: f64,
}

/// A fixed-size region of the world holding its tiles.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Chunk coordinate
    coord: ChunkCoord,
    /// Grid geometry used for local addressing
    layout: GridLayout,
    /// Tiles keyed by local coordinate
    tiles: AHashMap<LocalCoord, Tile>,
    /// Whether chunk has been modified since last save
    dirty: bool,
    last_accessed: Instant,
    last_saved: Option<DateTime<Utc>>,
}

impl Chunk {
    /// Creates a new empty chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord, layout: GridLayout) -> Self {
        let capacity = (layout.chunk_size * layout.chunk_size) as usize;
        Self {
            coord,
            layout,
            tiles: AHashMap::with_capacity(capacity),
            dirty: false,
            last_accessed: Instant::now(),
            last_saved: None,
        }
    }

    /// Returns the chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Returns the grid layout.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Pixel position of the chunk's top-left corner.
    #[must_use]
    pub fn origin(&self) -> (f64, f64) {
        self.layout.chunk_origin(self.coord)
    }

    /// Returns whether the chunk is dirty.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as dirty.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Marks the chunk as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Records a successful save.
    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.dirty = false;
        self.last_saved = Some(at);
    }

    /// Refreshes the access timestamp.
    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Last time the chunk was requested.
    #[must_use]
    pub const fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Last successful save or load, if any.
    #[must_use]
    pub const fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the chunk holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterates over all tiles.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Local key for a pixel position.
    ///
    /// The row is the vertical band the position falls in. The column
    /// removes the row's interlock offset (half a hexagon width on even rows,
    /// a full width on odd rows) and snaps to the nearest column, which is
    /// the exact inverse of the generator's placement of tile centers.
    #[must_use]
    pub fn local_coord_for(&self, x: f64, y: f64) -> LocalCoord {
        let (origin_x, origin_y) = self.origin();
        let row = ((y - origin_y) / self.layout.vertical_spacing()).floor() as i32;
        let size = i32::try_from(self.layout.chunk_size).unwrap_or(i32::MAX);
        let global_row = self.coord.y.saturating_mul(size).saturating_add(row);
        let col = ((x - origin_x - self.layout.row_offset(global_row)) / self.layout.hex_width())
            .round() as i32;
        LocalCoord::new(col, row)
    }

    /// Gets the tile at a pixel position.
    #[must_use]
    pub fn get(&self, x: f64, y: f64) -> Option<&Tile> {
        self.tiles.get(&self.local_coord_for(x, y))
    }

    /// Gets the tile at a pixel position mutably.
    ///
    /// Does not mark the chunk dirty; callers that change persisted fields
    /// must call [`Chunk::mark_dirty`].
    pub fn get_mut(&mut self, x: f64, y: f64) -> Option<&mut Tile> {
        let key = self.local_coord_for(x, y);
        self.tiles.get_mut(&key)
    }

    /// Gets the tile stored under a local key.
    #[must_use]
    pub fn get_local(&self, local: LocalCoord) -> Option<&Tile> {
        self.tiles.get(&local)
    }

    /// Stores `tile` under the key for `(x, y)`, stamping its chunk and local
    /// coordinates. Returns the tile previously stored there.
    pub fn add(&mut self, x: f64, y: f64, mut tile: Tile) -> Option<Tile> {
        let key = self.local_coord_for(x, y);
        tile.stamp(self.coord, key);
        self.dirty = true;
        self.tiles.insert(key, tile)
    }

    /// Removes the tile at a pixel position.
    ///
    /// Marks the chunk dirty only when something was removed.
    pub fn remove(&mut self, x: f64, y: f64) -> bool {
        self.take(x, y).is_some()
    }

    /// Removes and returns the tile at a pixel position.
    pub fn take(&mut self, x: f64, y: f64) -> Option<Tile> {
        let key = self.local_coord_for(x, y);
        let removed = self.tiles.remove(&key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Converts to the on-disk form.
    #[must_use]
    pub fn to_data(&self) -> ChunkData {
        let hexagons = self
            .tiles
            .iter()
            .map(|(key, tile)| {
                (
                    key.to_string(),
                    SerializedTile {
                        x: tile.x,
                        y: tile.y,
                        size: tile.size,
                        block_type: tile.block,
                        health: tile.health,
                    },
                )
            })
            .collect();

        ChunkData {
            chunk_x: self.coord.x,
            chunk_y: self.coord.y,
            hexagons,
        }
    }

    /// Rebuilds a chunk from its on-disk form.
    ///
    /// Every tile is stamped with the chunk's coordinates; the result is
    /// clean with `last_saved` set to now.
    pub fn from_data(data: ChunkData, layout: GridLayout) -> ChunkResult<Self> {
        let mut chunk = Self::new(ChunkCoord::new(data.chunk_x, data.chunk_y), layout);

        for (key, stored) in data.hexagons {
            let local: LocalCoord = key.parse()?;
            let mut tile = Tile::new(stored.x, stored.y, stored.size, stored.block_type);
            tile.health = stored.health;
            tile.max_health = DEFAULT_TILE_HEALTH.max(stored.health);
            tile.stamp(chunk.coord, local);
            chunk.tiles.insert(local, tile);
        }

        chunk.mark_saved(Utc::now());
        Ok(chunk)
    }

    /// Serializes the chunk to a JSON document.
    pub fn serialize(&self) -> ChunkResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.to_data()).map_err(ChunkError::SerializationFailed)
    }

    /// Deserializes a chunk from a JSON document.
    pub fn deserialize(bytes: &[u8], layout: GridLayout) -> ChunkResult<Self> {
        let data: ChunkData =
            serde_json::from_slice(bytes).map_err(ChunkError::DeserializationFailed)?;
        Self::from_data(data, layout)
    }
}
