//! Block types and their static properties.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a stored block id does not name a known block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown block type id {0}")]
pub struct UnknownBlockType(pub u8);

/// Every block a tile can hold.
///
/// The discriminant is the `block_type` integer stored in chunk files and
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum BlockType {
    /// Empty space
    Air = 0,
    /// Dirt
    Dirt = 1,
    /// Grass-topped dirt
    Grass = 2,
    /// Stone
    Stone = 3,
    /// Sand
    Sand = 4,
    /// Water
    Water = 5,
    /// Tree trunk
    Log = 6,
    /// Tree canopy
    Leaves = 7,
    /// Coal ore
    CoalOre = 8,
    /// Iron ore
    IronOre = 9,
    /// Gold ore
    GoldOre = 10,
    /// Diamond ore
    DiamondOre = 11,
    /// Unbreakable floor
    Bedrock = 12,
    /// Glass
    Glass = 13,
    /// Brick
    Brick = 14,
    /// Wooden plank
    Plank = 15,
    /// Cactus
    Cactus = 16,
}

impl BlockType {
    /// All block types in discriminant order.
    pub const ALL: [Self; 17] = [
        Self::Air,
        Self::Dirt,
        Self::Grass,
        Self::Stone,
        Self::Sand,
        Self::Water,
        Self::Log,
        Self::Leaves,
        Self::CoalOre,
        Self::IronOre,
        Self::GoldOre,
        Self::DiamondOre,
        Self::Bedrock,
        Self::Glass,
        Self::Brick,
        Self::Plank,
        Self::Cactus,
    ];

    /// Static properties of this block.
    #[must_use]
    pub fn properties(self) -> &'static BlockProperties {
        &BLOCK_PROPERTIES[self as usize]
    }

    /// Stable id used in chunk files.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.properties().name
    }

    /// Whether this block is one of the ores.
    #[must_use]
    pub const fn is_ore(self) -> bool {
        matches!(
            self,
            Self::CoalOre | Self::IronOre | Self::GoldOre | Self::DiamondOre
        )
    }
}

impl TryFrom<u8> for BlockType {
    type Error = UnknownBlockType;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or(UnknownBlockType(value))
    }
}

impl From<BlockType> for u8 {
    fn from(block: BlockType) -> Self {
        block.id()
    }
}

/// Static description of a block type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockProperties {
    /// Human-readable name
    pub name: &'static str,
    /// Base RGBA color
    pub color: [u8; 4],
    /// Damage divisor; zero or negative means the block cannot be broken
    pub hardness: f64,
    /// Blocks movement
    pub solid: bool,
    /// Lets light and sight through
    pub transparent: bool,
    /// Drops an item when mined
    pub collectible: bool,
    /// Can burn
    pub flammable: bool,
}

impl BlockProperties {
    const fn new(
        name: &'static str,
        color: [u8; 4],
        hardness: f64,
        solid: bool,
        transparent: bool,
        collectible: bool,
        flammable: bool,
    ) -> Self {
        Self {
            name,
            color,
            hardness,
            solid,
            transparent,
            collectible,
            flammable,
        }
    }

    /// Whether the block can be destroyed by damage.
    #[must_use]
    pub fn breakable(&self) -> bool {
        self.hardness > 0.0
    }
}

/// Properties indexed by [`BlockType`] discriminant.
static BLOCK_PROPERTIES: [BlockProperties; 17] = [
    BlockProperties::new("Air", [0, 0, 0, 0], 0.0, false, true, false, false),
    BlockProperties::new("Dirt", [139, 90, 43, 255], 1.0, true, false, true, false),
    BlockProperties::new("Grass Block", [100, 200, 100, 255], 1.0, true, false, true, false),
    BlockProperties::new("Stone", [169, 169, 169, 255], 2.0, true, false, true, false),
    BlockProperties::new("Sand", [238, 214, 175, 255], 0.8, true, false, true, false),
    BlockProperties::new("Water", [64, 164, 223, 140], 0.0, false, true, false, false),
    BlockProperties::new("Log", [139, 69, 19, 255], 2.0, true, false, true, true),
    BlockProperties::new("Leaves", [34, 139, 34, 200], 0.5, true, true, true, true),
    BlockProperties::new("Coal Ore", [45, 45, 45, 255], 3.0, true, false, true, false),
    BlockProperties::new("Iron Ore", [169, 166, 150, 255], 3.0, true, false, true, false),
    BlockProperties::new("Gold Ore", [255, 215, 0, 255], 3.0, true, false, true, false),
    BlockProperties::new("Diamond Ore", [0, 255, 255, 255], 3.0, true, false, true, false),
    BlockProperties::new("Bedrock", [30, 30, 30, 255], -1.0, true, false, false, false),
    BlockProperties::new("Glass", [200, 220, 255, 100], 0.5, true, true, true, false),
    BlockProperties::new("Brick", [178, 34, 34, 255], 2.5, true, false, true, false),
    BlockProperties::new("Plank", [222, 184, 135, 255], 1.5, true, false, true, true),
    BlockProperties::new("Cactus", [46, 139, 87, 255], 0.6, true, false, true, false),
];
