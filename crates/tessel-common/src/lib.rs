//! # Tessel Common
//!
//! Geometry and shared identifiers for the Tessel hexagonal world engine.
//!
//! This crate provides the pure, I/O-free foundations used by the world crate:
//! - Hexagon math (cube/axial coordinates, rounding, pixel conversion)
//! - Chunk grid layout and coordinate types (chunk, local, tile)
//! - Tile identity used by the spatial index
//! - Version information for on-disk formats
//! - Coordinate errors

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;
pub mod hex;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
    pub use crate::hex::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;
