//! Procedural terrain generation.
//!
//! Terrain is a pure function of the world seed and a tile position:
//! biome from [`BiomeField`], surface height from layered noise, block from
//! depth bands below that surface, ores and trees from [`position_hash`].

use serde::{Deserialize, Serialize};
use tessel_common::{ChunkCoord, GridLayout, Hex, LocalCoord, TileCoord};

use crate::biome::{Biome, BiomeField, BiomeThresholds};
use crate::block::BlockType;
use crate::chunk::Chunk;
use crate::seeding::{position_hash, LayeredNoise};
use crate::tile::Tile;

const HEIGHT_SALT: u64 = 16;
const ORE_SALT: u64 = 17;
const TREE_SALT: u64 = 18;

/// Two grid rows straight down, as an axial offset.
const DOWN: Hex = Hex::axial(-1, 2);

/// Canopy offsets beside the trunk top (upper-left, upper-right).
const CANOPY_SIDES: [Hex; 2] = [Hex::axial(0, -1), Hex::axial(1, -1)];

/// One octave of the surface height noise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightOctave {
    /// Frequency per pixel
    pub frequency: f64,
    /// Amplitude in pixels
    pub amplitude: f64,
}

/// Depth window and probability for one ore.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OreRule {
    /// Ore block placed
    pub block: BlockType,
    /// Exclusive lower depth bound
    pub min_depth: f64,
    /// Exclusive upper depth bound
    pub max_depth: f64,
    /// Base probability, scaled by the biome's ore frequency
    pub probability: f64,
}

impl OreRule {
    const fn new(block: BlockType, min_depth: f64, max_depth: f64, probability: f64) -> Self {
        Self {
            block,
            min_depth,
            max_depth,
            probability,
        }
    }

    fn matches(&self, depth: f64, roll: f64, ore_frequency: f64) -> bool {
        depth > self.min_depth && depth < self.max_depth && roll < self.probability * ore_frequency
    }
}

/// Tree placement parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Whether trees are placed at all
    pub enabled: bool,
    /// Multiplier on the biome's tree density
    pub chance: f64,
    /// Number of log tiles in a trunk
    pub trunk_height: u32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 0.25,
            trunk_height: 3,
        }
    }
}

/// Depth bands, ore rules and tree parameters.
///
/// Depth is `y - surface_y` in pixels, positive below the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Surface height noise octaves
    pub height_octaves: Vec<HeightOctave>,
    /// Above this depth is air (or ocean water)
    pub surface_top: f64,
    /// Bottom of the surface-block band
    pub surface_bottom: f64,
    /// Bottom of the under-block band
    pub subsurface_bottom: f64,
    /// Bottom of the band where ores may appear
    pub ore_zone_bottom: f64,
    /// Below this depth is bedrock
    pub bedrock_below: f64,
    /// Ocean water fills air down from this far above the surface
    pub water_depth: f64,
    /// Ore rules in priority order
    pub ores: Vec<OreRule>,
    /// Tree parameters
    pub trees: TreeConfig,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            height_octaves: vec![
                HeightOctave {
                    frequency: 0.005,
                    amplitude: 225.0,
                },
                HeightOctave {
                    frequency: 0.02,
                    amplitude: 25.0,
                },
                HeightOctave {
                    frequency: 0.05,
                    amplitude: 10.0,
                },
            ],
            surface_top: -10.0,
            surface_bottom: 5.0,
            subsurface_bottom: 15.0,
            ore_zone_bottom: 200.0,
            bedrock_below: 300.0,
            water_depth: 60.0,
            ores: vec![
                OreRule::new(BlockType::CoalOre, 20.0, 50.0, 0.02),
                OreRule::new(BlockType::IronOre, 30.0, 70.0, 0.015),
                OreRule::new(BlockType::GoldOre, 40.0, 60.0, 0.008),
                OreRule::new(BlockType::DiamondOre, 50.0, 80.0, 0.004),
            ],
            trees: TreeConfig::default(),
        }
    }
}

impl TerrainConfig {
    /// Orders the depth bands and clamps probabilities.
    pub fn validate(&mut self) {
        self.surface_bottom = self.surface_bottom.max(self.surface_top);
        self.subsurface_bottom = self.subsurface_bottom.max(self.surface_bottom);
        self.ore_zone_bottom = self.ore_zone_bottom.max(self.subsurface_bottom);
        self.bedrock_below = self.bedrock_below.max(self.ore_zone_bottom);
        self.water_depth = self.water_depth.max(0.0);
        for ore in &mut self.ores {
            ore.probability = ore.probability.clamp(0.0, 1.0);
        }
        self.trees.chance = self.trees.chance.clamp(0.0, 1.0);
        self.trees.trunk_height = self.trees.trunk_height.clamp(1, 16);
    }
}

/// Deterministic terrain generator.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: i64,
    layout: GridLayout,
    field: BiomeField,
    height: LayeredNoise,
    config: TerrainConfig,
}

impl TerrainGenerator {
    /// Creates a generator.
    #[must_use]
    pub fn new(
        seed: i64,
        layout: GridLayout,
        config: TerrainConfig,
        thresholds: BiomeThresholds,
    ) -> Self {
        let octaves: Vec<_> = config
            .height_octaves
            .iter()
            .map(|o| (o.frequency, o.amplitude))
            .collect();
        Self {
            seed,
            layout,
            field: BiomeField::new(seed, thresholds),
            height: LayeredNoise::new(seed, HEIGHT_SALT, &octaves),
            config,
        }
    }

    /// Creates a generator with default layout and parameters.
    #[must_use]
    pub fn with_seed(seed: i64) -> Self {
        Self::new(
            seed,
            GridLayout::default(),
            TerrainConfig::default(),
            BiomeThresholds::default(),
        )
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> i64 {
        self.seed
    }

    /// Grid layout.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Generation parameters.
    #[must_use]
    pub const fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Biome field.
    #[must_use]
    pub const fn biomes(&self) -> &BiomeField {
        &self.field
    }

    /// Surface height (pixel y) at a position for a known biome.
    fn surface_for(&self, biome: Biome, x: f64, y: f64) -> f64 {
        biome.properties().base_height + self.height.sample(x, y)
    }

    /// Surface height (pixel y) at a position.
    #[must_use]
    pub fn surface_height(&self, x: f64, y: f64) -> f64 {
        self.surface_for(self.field.biome_at(x, y), x, y)
    }

    /// Terrain block at a pixel position, ignoring trees.
    #[must_use]
    pub fn terrain_block_at(&self, x: f64, y: f64) -> BlockType {
        let biome = self.field.biome_at(x, y);
        let depth = y - self.surface_for(biome, x, y);
        let hex = self.layout.tile_coord_at(x, y).to_hex();
        self.block_at_depth(biome, depth, hex)
    }

    fn block_at_depth(&self, biome: Biome, depth: f64, hex: Hex) -> BlockType {
        let cfg = &self.config;
        let props = biome.properties();

        if depth < cfg.surface_top {
            if biome == Biome::Ocean && depth > -cfg.water_depth {
                BlockType::Water
            } else {
                BlockType::Air
            }
        } else if depth < cfg.surface_bottom {
            props.surface_block
        } else if depth < cfg.subsurface_bottom {
            props.under_block
        } else if depth < cfg.ore_zone_bottom {
            let roll = position_hash(self.seed, hex, ORE_SALT);
            cfg.ores
                .iter()
                .find(|ore| ore.matches(depth, roll, props.ore_frequency))
                .map_or(BlockType::Stone, |ore| ore.block)
        } else if depth > cfg.bedrock_below {
            BlockType::Bedrock
        } else {
            BlockType::Stone
        }
    }

    fn terrain_block_for_hex(&self, hex: Hex) -> BlockType {
        let (x, y) = self.layout.tile_center(TileCoord::from_hex(hex));
        self.terrain_block_at(x, y)
    }

    /// Whether a tree grows from the tile at `hex`.
    #[must_use]
    pub fn is_tree_root(&self, hex: Hex) -> bool {
        let trees = &self.config.trees;
        if !trees.enabled {
            return false;
        }
        let (x, y) = self.layout.tile_center(TileCoord::from_hex(hex));
        let density = self.field.biome_at(x, y).properties().tree_density;
        if density <= 0.0 || self.terrain_block_at(x, y) != BlockType::Grass {
            return false;
        }
        position_hash(self.seed, hex, TREE_SALT) < density * trees.chance
    }

    /// Tree block occupying `hex`, if any.
    ///
    /// Looks for a root below the tile, so the answer never depends on
    /// which chunk is being generated.
    fn tree_block_at(&self, hex: Hex) -> Option<BlockType> {
        let height = self.config.trees.trunk_height as i32;
        if (1..=height).any(|k| self.is_tree_root(hex + DOWN * k)) {
            return Some(BlockType::Log);
        }
        let above_trunk = self.is_tree_root(hex + DOWN * (height + 1));
        let beside_top = CANOPY_SIDES
            .iter()
            .any(|&side| self.is_tree_root(hex - side + DOWN * height));
        (above_trunk || beside_top).then_some(BlockType::Leaves)
    }

    /// Final block for a grid cell: terrain, with trees filling air.
    #[must_use]
    pub fn block_for_tile(&self, coord: TileCoord) -> BlockType {
        let hex = coord.to_hex();
        match self.terrain_block_for_hex(hex) {
            BlockType::Air if self.config.trees.enabled => {
                self.tree_block_at(hex).unwrap_or(BlockType::Air)
            }
            block => block,
        }
    }

    /// Generates a chunk. The result is clean and has never been saved.
    #[must_use]
    pub fn generate_chunk(&self, coord: ChunkCoord) -> Chunk {
        let mut chunk = Chunk::new(coord, self.layout);
        let size = self.layout.chunk_size as i32;

        for row in 0..size {
            for col in 0..size {
                let tile_coord = self.layout.join(coord, LocalCoord::new(col, row));
                let block = self.block_for_tile(tile_coord);
                if block == BlockType::Air {
                    continue;
                }
                let (x, y) = self.layout.tile_center(tile_coord);
                chunk.add(x, y, Tile::new(x, y, self.layout.hex_size, block));
            }
        }

        chunk.mark_clean(); // Generated chunks start clean
        chunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn blocks(chunk: &Chunk) -> Vec<(LocalCoord, BlockType)> {
        let mut out: Vec<_> = chunk.tiles().map(|t| (t.local_coord(), t.block)).collect();
        out.sort_by_key(|(local, _)| *local);
        out
    }

    #[test]
    fn test_generation_deterministic() {
        let gen1 = TerrainGenerator::with_seed(42);
        let gen2 = TerrainGenerator::with_seed(42);

        let chunk1 = gen1.generate_chunk(ChunkCoord::new(0, 0));
        let chunk2 = gen2.generate_chunk(ChunkCoord::new(0, 0));

        assert_eq!(blocks(&chunk1), blocks(&chunk2));
        assert!(!chunk1.is_dirty());
        assert!(chunk1.last_saved().is_none());
    }

    #[test]
    fn test_generation_order_independent() {
        let generator = TerrainGenerator::with_seed(7);
        let a0 = generator.generate_chunk(ChunkCoord::new(0, 0));
        let a1 = generator.generate_chunk(ChunkCoord::new(1, 0));
        let b1 = generator.generate_chunk(ChunkCoord::new(1, 0));
        let b0 = generator.generate_chunk(ChunkCoord::new(0, 0));
        assert_eq!(blocks(&a0), blocks(&b0));
        assert_eq!(blocks(&a1), blocks(&b1));
    }

    #[test]
    fn test_different_seeds_differ() {
        let a = TerrainGenerator::with_seed(1).generate_chunk(ChunkCoord::new(0, 0));
        let b = TerrainGenerator::with_seed(2).generate_chunk(ChunkCoord::new(0, 0));
        assert_ne!(blocks(&a), blocks(&b));
    }

    #[test]
    fn test_deep_chunk_is_bedrock() {
        let generator = TerrainGenerator::with_seed(42);
        let chunk = generator.generate_chunk(ChunkCoord::new(0, 1));
        assert_eq!(chunk.len(), 32 * 32);
        assert!(chunk.tiles().all(|t| t.block == BlockType::Bedrock));
    }

    #[test]
    fn test_surface_chunk_has_layers() {
        let generator = TerrainGenerator::with_seed(42);
        let chunk = generator.generate_chunk(ChunkCoord::new(0, 0));
        assert!(!chunk.is_empty());
        assert!(chunk.len() < 32 * 32, "the sky should be air");
        assert!(chunk.tiles().any(|t| t.block == BlockType::Stone));
        assert!(chunk.tiles().any(|t| t.block == BlockType::Bedrock));
    }

    #[test]
    fn test_depth_bands() {
        let generator = TerrainGenerator::with_seed(3);
        let hex = Hex::ORIGIN;
        let plains = Biome::Plains;
        assert_eq!(generator.block_at_depth(plains, -100.0, hex), BlockType::Air);
        assert_eq!(generator.block_at_depth(plains, 0.0, hex), BlockType::Grass);
        assert_eq!(generator.block_at_depth(plains, 10.0, hex), BlockType::Dirt);
        assert_eq!(generator.block_at_depth(plains, 250.0, hex), BlockType::Stone);
        assert_eq!(generator.block_at_depth(plains, 301.0, hex), BlockType::Bedrock);
        assert_eq!(generator.block_at_depth(Biome::Ocean, -30.0, hex), BlockType::Water);
        assert_eq!(generator.block_at_depth(Biome::Ocean, -80.0, hex), BlockType::Air);
        assert_eq!(generator.block_at_depth(Biome::Ocean, 0.0, hex), BlockType::Sand);
        assert_eq!(generator.block_at_depth(Biome::Mountains, 0.0, hex), BlockType::Stone);
    }

    #[test]
    fn test_ores_appear_in_their_windows() {
        let generator = TerrainGenerator::with_seed(11);
        let mut ores = 0;
        for q in 0..200 {
            for r in 0..200 {
                let hex = Hex::axial(q, r);
                let block = generator.block_at_depth(Biome::Mountains, 45.0, hex);
                if block.is_ore() {
                    ores += 1;
                }
                assert!(matches!(
                    generator.block_at_depth(Biome::Mountains, 150.0, hex),
                    BlockType::Stone
                ));
            }
        }
        assert!(ores > 0);
    }

    #[test]
    fn test_trees_stand_on_roots() {
        let generator = TerrainGenerator::with_seed(42);
        let height = generator.config().trees.trunk_height as i32;
        let mut roots = 0;
        for col in -2_000..2_000 {
            for row in 0..16 {
                let hex = TileCoord::new(col, row).to_hex();
                if !generator.is_tree_root(hex) {
                    continue;
                }
                roots += 1;
                let trunk_base = hex - DOWN;
                if generator.terrain_block_for_hex(trunk_base) == BlockType::Air {
                    assert_eq!(
                        generator.block_for_tile(TileCoord::from_hex(trunk_base)),
                        BlockType::Log
                    );
                }
                let crown = hex - DOWN * (height + 1);
                if generator.terrain_block_for_hex(crown) == BlockType::Air {
                    assert!(matches!(
                        generator.block_for_tile(TileCoord::from_hex(crown)),
                        BlockType::Leaves | BlockType::Log
                    ));
                }
            }
        }
        assert!(roots > 0, "expected at least one tree");
    }

    #[test]
    fn test_trees_can_be_disabled() {
        let config = TerrainConfig {
            trees: TreeConfig {
                enabled: false,
                ..TreeConfig::default()
            },
            ..TerrainConfig::default()
        };
        let generator =
            TerrainGenerator::new(42, GridLayout::default(), config, BiomeThresholds::default());
        let chunk = generator.generate_chunk(ChunkCoord::new(0, 0));
        assert!(chunk
            .tiles()
            .all(|t| !matches!(t.block, BlockType::Log | BlockType::Leaves)));
    }

    #[test]
    fn test_validate_orders_bands() {
        let mut config = TerrainConfig {
            subsurface_bottom: -50.0,
            bedrock_below: 0.0,
            ..TerrainConfig::default()
        };
        config.ores[0].probability = 3.0;
        config.trees.trunk_height = 0;
        config.validate();
        assert!(config.subsurface_bottom >= config.surface_bottom);
        assert!(config.bedrock_below >= config.ore_zone_bottom);
        assert_eq!(config.ores[0].probability, 1.0);
        assert_eq!(config.trees.trunk_height, 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_block_is_pure(seed in -1_000i64..1_000, col in -5_000i32..5_000, row in -50i32..100) {
            let first = TerrainGenerator::with_seed(seed);
            let second = TerrainGenerator::with_seed(seed);
            let coord = TileCoord::new(col, row);
            let warmup = TileCoord::new(col.wrapping_mul(7), row + 3);
            let _ = second.block_for_tile(warmup);
            prop_assert_eq!(first.block_for_tile(coord), second.block_for_tile(coord));
            prop_assert_eq!(first.block_for_tile(coord), first.block_for_tile(coord));
        }
    }
}
