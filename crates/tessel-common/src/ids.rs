//! Identifiers shared between the chunk arena and the spatial index.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coords::{ChunkCoord, GridLayout, LocalCoord, TileCoord};

/// Identity of a resident tile: its owning chunk and its key inside it.
///
/// Two tiles are the same tile exactly when their ids are equal, regardless
/// of block type or health. Lookups resolve through the chunk map, so an id
/// never keeps a chunk alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    /// Owning chunk
    pub chunk: ChunkCoord,
    /// Key within the owning chunk
    pub local: LocalCoord,
}

impl TileId {
    /// Creates a tile id.
    #[must_use]
    pub const fn new(chunk: ChunkCoord, local: LocalCoord) -> Self {
        Self { chunk, local }
    }

    /// Global grid cell of this tile under `layout`.
    #[must_use]
    pub fn tile_coord(self, layout: &GridLayout) -> TileCoord {
        layout.join(self.chunk, self.local)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.chunk, self.local)
    }
}
