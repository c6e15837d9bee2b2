//! Uniform-grid spatial hash over resident tiles.
//!
//! The index stores `(TileId, x, y)` entries bucketed by
//! `(floor(x / cell_size), floor(y / cell_size))`. It never owns tiles; ids
//! resolve back to tiles through the chunk arena.

use ahash::AHashMap;
use tessel_common::TileId;

use crate::chunk::Chunk;
use crate::tile::Tile;

/// Default cell edge length in pixels.
pub const DEFAULT_CELL_SIZE: f64 = 100.0;

/// Integer key of a grid cell.
pub type CellKey = (i64, i64);

/// A tile reference held by a bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    /// Identity of the tile
    pub id: TileId,
    /// Center X at insertion
    pub x: f64,
    /// Center Y at insertion
    pub y: f64,
}

/// Spatial hash for radius queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    cell_size: f64,
    cells: AHashMap<CellKey, Vec<SpatialEntry>>,
    len: usize,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

impl SpatialIndex {
    /// Creates an empty index. Non-positive cell sizes fall back to the default.
    #[must_use]
    pub fn new(cell_size: f64) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            cells: AHashMap::new(),
            len: 0,
        }
    }

    /// Cell edge length.
    #[must_use]
    pub const fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of indexed entries.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cell containing a point.
    #[must_use]
    pub fn cell_key(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    /// Adds a tile to the bucket of its center.
    pub fn insert(&mut self, tile: &Tile) {
        self.insert_entry(SpatialEntry {
            id: tile.id(),
            x: tile.x,
            y: tile.y,
        });
    }

    /// Adds a raw entry.
    pub fn insert_entry(&mut self, entry: SpatialEntry) {
        let key = self.cell_key(entry.x, entry.y);
        self.cells.entry(key).or_default().push(entry);
        self.len += 1;
    }

    /// Removes a tile by identity from the bucket of its center.
    ///
    /// Returns `false` if the tile was not indexed. Empty buckets are dropped.
    pub fn remove(&mut self, tile: &Tile) -> bool {
        self.remove_id(tile.id(), tile.x, tile.y)
    }

    /// Removes the entry with `id` from the bucket containing `(x, y)`.
    pub fn remove_id(&mut self, id: TileId, x: f64, y: f64) -> bool {
        let key = self.cell_key(x, y);
        let Some(bucket) = self.cells.get_mut(&key) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|entry| entry.id == id) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.cells.remove(&key);
        }
        self.len -= 1;
        true
    }

    /// Whether a tile is indexed.
    #[must_use]
    pub fn contains(&self, tile: &Tile) -> bool {
        self.cells
            .get(&self.cell_key(tile.x, tile.y))
            .is_some_and(|bucket| bucket.iter().any(|entry| entry.id == tile.id()))
    }

    /// Entries whose centers lie within `radius` of `(x, y)` (inclusive).
    ///
    /// A negative or non-finite radius, or a non-finite center, matches
    /// nothing. When the query square spans more cells than are occupied,
    /// the occupied buckets are scanned instead of the square.
    #[must_use]
    pub fn query_radius(&self, x: f64, y: f64, radius: f64) -> Vec<SpatialEntry> {
        if !(radius >= 0.0 && radius.is_finite() && x.is_finite() && y.is_finite()) {
            return Vec::new();
        }
        let (min_cx, min_cy) = self.cell_key(x - radius, y - radius);
        let (max_cx, max_cy) = self.cell_key(x + radius, y + radius);
        let radius_sq = radius * radius;
        let within = |entry: &SpatialEntry| {
            let dx = entry.x - x;
            let dy = entry.y - y;
            dx * dx + dy * dy <= radius_sq
        };

        let span = max_cx
            .abs_diff(min_cx)
            .saturating_add(1)
            .saturating_mul(max_cy.abs_diff(min_cy).saturating_add(1));
        let occupied = u64::try_from(self.cells.len()).unwrap_or(u64::MAX);

        let mut results = Vec::new();
        if span > occupied {
            for (&(cx, cy), bucket) in &self.cells {
                if (min_cx..=max_cx).contains(&cx) && (min_cy..=max_cy).contains(&cy) {
                    results.extend(bucket.iter().copied().filter(within));
                }
            }
            return results;
        }

        for cx in min_cx..=max_cx {
            for cy in min_cy..=max_cy {
                if let Some(bucket) = self.cells.get(&(cx, cy)) {
                    results.extend(bucket.iter().copied().filter(within));
                }
            }
        }
        results
    }

    /// Ids of the tiles within `radius` of `(x, y)`.
    #[must_use]
    pub fn query_ids(&self, x: f64, y: f64, radius: f64) -> Vec<TileId> {
        self.query_radius(x, y, radius)
            .into_iter()
            .map(|entry| entry.id)
            .collect()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    /// Clears the index and reinserts every tile of every given chunk.
    pub fn rebuild<'a>(&mut self, chunks: impl IntoIterator<Item = &'a Chunk>) {
        self.clear();
        for chunk in chunks {
            self.insert_chunk(chunk);
        }
    }

    /// Inserts every tile of a chunk.
    pub fn insert_chunk(&mut self, chunk: &Chunk) {
        for tile in chunk.tiles() {
            self.insert(tile);
        }
    }

    /// Removes every tile of a chunk. Returns the number removed.
    pub fn remove_chunk(&mut self, chunk: &Chunk) -> usize {
        chunk.tiles().filter(|tile| self.remove(tile)).count()
    }
}
