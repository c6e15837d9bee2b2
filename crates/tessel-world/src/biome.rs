//! Biome classification from seeded climate noise.

use serde::{Deserialize, Serialize};

use crate::block::BlockType;
use crate::seeding::LayeredNoise;

/// World region classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    /// Grassland
    Plains,
    /// Wooded grassland
    Forest,
    /// Hot and dry sand
    Desert,
    /// High stone ground
    Mountains,
    /// Low ground under water
    Ocean,
    /// Warm wetland
    Swamp,
}

impl Biome {
    /// All biomes.
    pub const ALL: [Self; 6] = [
        Self::Plains,
        Self::Forest,
        Self::Desert,
        Self::Mountains,
        Self::Ocean,
        Self::Swamp,
    ];

    /// Static properties of this biome.
    #[must_use]
    pub fn properties(self) -> &'static BiomeProperties {
        &BIOME_PROPERTIES[self as usize]
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.properties().name
    }
}

/// Generation parameters carried by a biome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeProperties {
    /// Display name
    pub name: &'static str,
    /// Block of the thin surface band
    pub surface_block: BlockType,
    /// Block of the subsurface band
    pub under_block: BlockType,
    /// Tree density in `[0, 1]`
    pub tree_density: f64,
    /// Multiplier on ore probabilities
    pub ore_frequency: f64,
    /// Typical temperature
    pub temperature: f64,
    /// Typical humidity
    pub humidity: f64,
    /// Terrain surface height before noise (pixels, y grows downward)
    pub base_height: f64,
}

static BIOME_PROPERTIES: [BiomeProperties; 6] = [
    BiomeProperties {
        name: "Plains",
        surface_block: BlockType::Grass,
        under_block: BlockType::Dirt,
        tree_density: 0.1,
        ore_frequency: 1.0,
        temperature: 0.5,
        humidity: 0.5,
        base_height: 400.0,
    },
    BiomeProperties {
        name: "Forest",
        surface_block: BlockType::Grass,
        under_block: BlockType::Dirt,
        tree_density: 0.4,
        ore_frequency: 1.0,
        temperature: 0.4,
        humidity: 0.7,
        base_height: 400.0,
    },
    BiomeProperties {
        name: "Desert",
        surface_block: BlockType::Sand,
        under_block: BlockType::Sand,
        tree_density: 0.0,
        ore_frequency: 0.5,
        temperature: 0.9,
        humidity: 0.1,
        base_height: 400.0,
    },
    BiomeProperties {
        name: "Mountains",
        surface_block: BlockType::Stone,
        under_block: BlockType::Stone,
        tree_density: 0.05,
        ore_frequency: 2.0,
        temperature: 0.3,
        humidity: 0.3,
        base_height: 350.0,
    },
    BiomeProperties {
        name: "Ocean",
        surface_block: BlockType::Sand,
        under_block: BlockType::Sand,
        tree_density: 0.0,
        ore_frequency: 0.3,
        temperature: 0.6,
        humidity: 1.0,
        base_height: 550.0,
    },
    BiomeProperties {
        name: "Swamp",
        surface_block: BlockType::Grass,
        under_block: BlockType::Dirt,
        tree_density: 0.2,
        ore_frequency: 0.8,
        temperature: 0.6,
        humidity: 0.9,
        base_height: 420.0,
    },
];

/// Climate values at a position, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Temperature
    pub temperature: f64,
    /// Humidity
    pub humidity: f64,
    /// Elevation
    pub elevation: f64,
}

/// Threshold rules for biome classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    /// Elevation below which the biome is ocean
    pub ocean_below: f64,
    /// Elevation above which the biome is mountains
    pub mountains_above: f64,
    /// Desert needs temperature above this
    pub desert_min_temperature: f64,
    /// Desert needs humidity below this
    pub desert_max_humidity: f64,
    /// Swamp temperature lower bound (exclusive)
    pub swamp_min_temperature: f64,
    /// Swamp temperature upper bound (exclusive)
    pub swamp_max_temperature: f64,
    /// Swamp needs humidity above this
    pub swamp_min_humidity: f64,
    /// Forest needs humidity above this
    pub forest_min_humidity: f64,
    /// Forest needs temperature above this
    pub forest_min_temperature: f64,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        // Layered Perlin rarely leaves [0.2, 0.8] after normalization, so the
        // cut points sit closer to the middle than a uniform spread would need.
        Self {
            ocean_below: 0.35,
            mountains_above: 0.65,
            desert_min_temperature: 0.6,
            desert_max_humidity: 0.4,
            swamp_min_temperature: 0.4,
            swamp_max_temperature: 0.6,
            swamp_min_humidity: 0.6,
            forest_min_humidity: 0.5,
            forest_min_temperature: 0.4,
        }
    }
}

impl BiomeThresholds {
    /// Classifies a climate sample.
    ///
    /// Elevation decides ocean and mountains first; otherwise desert, swamp,
    /// forest and plains are tried in that order.
    #[must_use]
    pub fn classify(&self, sample: ClimateSample) -> Biome {
        let ClimateSample {
            temperature: t,
            humidity: h,
            elevation: e,
        } = sample;

        if e < self.ocean_below {
            Biome::Ocean
        } else if e > self.mountains_above {
            Biome::Mountains
        } else if t > self.desert_min_temperature && h < self.desert_max_humidity {
            Biome::Desert
        } else if t > self.swamp_min_temperature
            && t < self.swamp_max_temperature
            && h > self.swamp_min_humidity
        {
            Biome::Swamp
        } else if h > self.forest_min_humidity && t > self.forest_min_temperature {
            Biome::Forest
        } else {
            Biome::Plains
        }
    }

    /// Clamps every threshold into `[0, 1]` and orders the paired bounds.
    pub fn validate(&mut self) {
        for value in [
            &mut self.ocean_below,
            &mut self.mountains_above,
            &mut self.desert_min_temperature,
            &mut self.desert_max_humidity,
            &mut self.swamp_min_temperature,
            &mut self.swamp_max_temperature,
            &mut self.swamp_min_humidity,
            &mut self.forest_min_humidity,
            &mut self.forest_min_temperature,
        ] {
            *value = if value.is_nan() { 0.5 } else { value.clamp(0.0, 1.0) };
        }
        if self.mountains_above < self.ocean_below {
            std::mem::swap(&mut self.mountains_above, &mut self.ocean_below);
        }
        if self.swamp_max_temperature < self.swamp_min_temperature {
            std::mem::swap(
                &mut self.swamp_max_temperature,
                &mut self.swamp_min_temperature,
            );
        }
    }
}

/// Climate noise frequency for temperature and humidity (per pixel).
pub const CLIMATE_FREQUENCY: f64 = 0.000_5;

/// Elevation noise frequency (per pixel).
pub const ELEVATION_FREQUENCY: f64 = 0.000_25;

const TEMPERATURE_SALT: u64 = 1;
const HUMIDITY_SALT: u64 = 2;
const ELEVATION_SALT: u64 = 3;

/// Deterministic map from pixel position to biome.
#[derive(Debug, Clone)]
pub struct BiomeField {
    seed: i64,
    temperature: LayeredNoise,
    humidity: LayeredNoise,
    elevation: LayeredNoise,
    thresholds: BiomeThresholds,
}

impl BiomeField {
    /// Creates the field for a world seed.
    #[must_use]
    pub fn new(seed: i64, thresholds: BiomeThresholds) -> Self {
        Self {
            seed,
            temperature: LayeredNoise::biome(seed, TEMPERATURE_SALT, CLIMATE_FREQUENCY),
            humidity: LayeredNoise::biome(seed, HUMIDITY_SALT, CLIMATE_FREQUENCY),
            elevation: LayeredNoise::biome(seed, ELEVATION_SALT, ELEVATION_FREQUENCY),
            thresholds,
        }
    }

    /// Creates the field with default thresholds.
    #[must_use]
    pub fn with_seed(seed: i64) -> Self {
        Self::new(seed, BiomeThresholds::default())
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> i64 {
        self.seed
    }

    /// Classification thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &BiomeThresholds {
        &self.thresholds
    }

    /// Climate at a pixel position.
    #[must_use]
    pub fn sample(&self, x: f64, y: f64) -> ClimateSample {
        ClimateSample {
            temperature: self.temperature.sample_unit(x, y),
            humidity: self.humidity.sample_unit(x, y),
            elevation: self.elevation.sample_unit(x, y),
        }
    }

    /// Biome at a pixel position.
    #[must_use]
    pub fn biome_at(&self, x: f64, y: f64) -> Biome {
        self.thresholds.classify(self.sample(x, y))
    }
}
