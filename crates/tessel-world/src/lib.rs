//! # Tessel World
//!
//! Persistent hexagonal tile world for the Tessel engine.
//!
//! This crate handles:
//! - Block and biome catalogs
//! - Seeded terrain generation (biomes, depth bands, ores, trees)
//! - Chunks of tiles and their JSON form
//! - Radius queries through a uniform-grid spatial index
//! - Chunk files and world metadata on disk
//! - The [`World`] orchestrator and a thread-safe [`SharedWorld`] handle

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod block;
pub mod chunk;
pub mod config;
pub mod generation;
pub mod seeding;
pub mod shared;
pub mod spatial;
pub mod storage;
pub mod tile;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome::*;
    pub use crate::block::*;
    pub use crate::chunk::*;
    pub use crate::config::*;
    pub use crate::generation::*;
    pub use crate::seeding::*;
    pub use crate::shared::*;
    pub use crate::spatial::*;
    pub use crate::storage::*;
    pub use crate::tile::*;
    pub use crate::world::*;
}

pub use prelude::*;
