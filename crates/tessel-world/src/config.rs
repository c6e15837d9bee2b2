//! World configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tessel_common::{GridLayout, DEFAULT_CHUNK_SIZE, DEFAULT_HEX_SIZE};

use crate::biome::BiomeThresholds;
use crate::generation::TerrainConfig;
use crate::spatial::DEFAULT_CELL_SIZE;

/// Chunks kept loaded around a viewpoint, in chunk units.
pub const DEFAULT_RENDER_DISTANCE: u32 = 4;

/// Chunks farther than this from the viewpoint are evicted, in chunk units.
pub const DEFAULT_UNLOAD_DISTANCE: f64 = 10.0;

/// World parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Directory holding one sub-directory per world
    pub save_root: PathBuf,
    /// Hexagon radius in pixels
    pub hex_size: f64,
    /// Hexagons per chunk dimension
    pub chunk_size: u32,
    /// Spatial index cell size in pixels
    pub cell_size: f64,
    /// Load radius around the viewpoint, in chunks
    pub render_distance: u32,
    /// Eviction distance from the viewpoint, in chunks
    pub unload_distance: f64,
    /// Terrain generation parameters
    pub terrain: TerrainConfig,
    /// Biome classification thresholds
    pub biomes: BiomeThresholds,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            save_root: PathBuf::from("worlds"),
            hex_size: DEFAULT_HEX_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            cell_size: DEFAULT_CELL_SIZE,
            render_distance: DEFAULT_RENDER_DISTANCE,
            unload_distance: DEFAULT_UNLOAD_DISTANCE,
            terrain: TerrainConfig::default(),
            biomes: BiomeThresholds::default(),
        }
    }
}

impl WorldConfig {
    /// Default configuration rooted at `save_root`.
    #[must_use]
    pub fn with_save_root(save_root: impl Into<PathBuf>) -> Self {
        Self {
            save_root: save_root.into(),
            ..Self::default()
        }
    }

    /// Grid geometry.
    #[must_use]
    pub const fn layout(&self) -> GridLayout {
        GridLayout::new(self.hex_size, self.chunk_size)
    }

    /// Clamps values to sane ranges.
    pub fn validate(&mut self) {
        self.hex_size = finite_or(self.hex_size, DEFAULT_HEX_SIZE).clamp(4.0, 256.0);
        self.chunk_size = self.chunk_size.clamp(4, 128);
        self.cell_size = finite_or(self.cell_size, DEFAULT_CELL_SIZE).clamp(10.0, 10_000.0);
        self.render_distance = self.render_distance.min(16);
        self.unload_distance = finite_or(self.unload_distance, DEFAULT_UNLOAD_DISTANCE)
            .max(f64::from(self.render_distance) + 1.0);
        self.terrain.validate();
        self.biomes.validate();
    }

    /// Pixel radius used for visible-tile queries.
    #[must_use]
    pub fn view_radius(&self) -> f64 {
        f64::from(self.render_distance) * self.layout().chunk_width()
    }
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorldConfig::default();
        assert_eq!(config.hex_size, 30.0);
        assert_eq!(config.chunk_size, 32);
        assert_eq!(config.render_distance, 4);
        assert_eq!(config.layout(), GridLayout::default());
    }

    #[test]
    fn test_validate_clamps() {
        let mut config = WorldConfig {
            hex_size: f64::NAN,
            chunk_size: 0,
            cell_size: -5.0,
            render_distance: 99,
            unload_distance: 2.0,
            ..WorldConfig::default()
        };
        config.validate();
        assert_eq!(config.hex_size, DEFAULT_HEX_SIZE);
        assert_eq!(config.chunk_size, 4);
        assert_eq!(config.cell_size, 10.0);
        assert_eq!(config.render_distance, 16);
        assert!(config.unload_distance > f64::from(config.render_distance));
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{"chunk_size": 16, "terrain": {"bedrock_below": 500.0}}"#)
                .expect("parse");
        assert_eq!(config.chunk_size, 16);
        assert_eq!(config.hex_size, DEFAULT_HEX_SIZE);
        assert_eq!(config.terrain.bedrock_below, 500.0);
        assert_eq!(config.terrain.ores.len(), 4);
    }
}
