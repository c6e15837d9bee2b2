//! World orchestrator: resident chunk arena, spatial index and persistence.
//!
//! Every pixel position handed to the world is snapped to the grid cell whose
//! hexagon contains it, and routed to the chunk owning that cell. The chunk
//! map and the index are only mutated together, so a tile is indexed exactly
//! while its chunk is resident.

use std::collections::hash_map::Entry;
use std::path::Path;

use ahash::AHashMap;
use chrono::Utc;
use tessel_common::{ChunkCoord, GridLayout, Hex, LocalCoord, TileCoord, TileId};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::block::BlockType;
use crate::chunk::Chunk;
use crate::config::WorldConfig;
use crate::generation::TerrainGenerator;
use crate::spatial::SpatialIndex;
use crate::storage::{self, ChunkStore, StorageError, StorageResult, WorldMeta};
use crate::tile::Tile;

/// World errors.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A chunk could be neither loaded nor generated.
    #[error("Chunk {coord} unavailable: {source}")]
    ChunkUnavailable {
        /// Chunk coordinate
        coord: ChunkCoord,
        /// Storage failure
        #[source]
        source: StorageError,
    },

    /// Storage failure outside chunk materialization.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No saved world with this name.
    #[error("World '{0}' not found")]
    NotFound(String),

    /// A saved world with this name already exists.
    #[error("World '{0}' already exists")]
    AlreadyExists(String),

    /// A pixel position outside the addressable grid.
    #[error("Position ({x}, {y}) is outside the world")]
    OutOfBounds {
        /// Pixel X
        x: f64,
        /// Pixel Y
        y: f64,
    },

    /// A chunk coordinate outside the addressable grid.
    #[error("Chunk {0} is outside the world")]
    ChunkOutOfBounds(ChunkCoord),
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Largest chunk radius [`World::ensure_loaded_radius`] walks.
pub const MAX_LOAD_RADIUS: u32 = 32;

/// Outcome of loading the chunks around a point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Chunks that became resident
    pub loaded: Vec<ChunkCoord>,
    /// Chunks that could not be materialized
    pub failed: Vec<ChunkCoord>,
}

/// Outcome of evicting far chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Chunks dropped from memory
    pub evicted: Vec<ChunkCoord>,
    /// Dirty chunks saved before eviction
    pub saved: usize,
    /// Dirty chunks whose save failed; their edits are lost
    pub failed: Vec<ChunkCoord>,
}

/// Outcome of saving every dirty chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// Chunks written
    pub saved: usize,
    /// Chunks whose save failed; they stay dirty
    pub failed: Vec<ChunkCoord>,
    /// Metadata record written
    pub meta: WorldMeta,
}

/// Result of damaging a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// No tile at the position
    Missing,
    /// Tile survived with the given health
    Damaged(f64),
    /// Tile was destroyed and removed
    Destroyed(BlockType),
}

/// A persistent, chunked hexagon world.
pub struct World {
    name: String,
    seed: i64,
    config: WorldConfig,
    layout: GridLayout,
    chunks: AHashMap<ChunkCoord, Chunk>,
    index: SpatialIndex,
    store: ChunkStore,
    generator: TerrainGenerator,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("seed", &self.seed)
            .field("loaded_chunks", &self.chunks.len())
            .field("indexed_tiles", &self.index.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Builds an in-memory world handle without touching disk.
    pub fn new(name: &str, seed: i64, mut config: WorldConfig) -> WorldResult<Self> {
        config.validate();
        let layout = config.layout();
        let store = ChunkStore::new(&config.save_root, name)?;
        let generator =
            TerrainGenerator::new(seed, layout, config.terrain.clone(), config.biomes);

        Ok(Self {
            name: name.to_string(),
            seed,
            index: SpatialIndex::new(config.cell_size),
            chunks: AHashMap::new(),
            config,
            layout,
            store,
            generator,
        })
    }

    /// Creates a new world and writes its metadata.
    pub fn create(name: &str, seed: i64, config: WorldConfig) -> WorldResult<Self> {
        let world = Self::new(name, seed, config)?;
        if world.store.read_existing_meta()?.is_some() {
            return Err(WorldError::AlreadyExists(name.to_string()));
        }
        world.store.save_world_meta(0, seed, world.layout)?;
        info!("Created world '{name}' with seed {seed}");
        Ok(world)
    }

    /// Opens a saved world, taking the seed and grid layout from its
    /// metadata.
    ///
    /// Worlds saved without a seed use the nanoseconds of their creation
    /// time, which is how such worlds were seeded. Worlds saved without a
    /// layout use the configured one.
    pub fn open(name: &str, mut config: WorldConfig) -> WorldResult<Self> {
        let probe = ChunkStore::new(&config.save_root, name)?;
        let meta = probe
            .read_existing_meta()?
            .ok_or_else(|| WorldError::NotFound(name.to_string()))?;
        let seed = meta.seed.unwrap_or_else(|| {
            meta.created_at
                .timestamp_nanos_opt()
                .unwrap_or_else(|| meta.created_at.timestamp())
        });

        if let Some(saved) = meta.layout {
            if saved != config.layout() {
                warn!(
                    "World '{name}' was saved with hex size {} and chunk size {}; \
                     ignoring configured {} and {}",
                    saved.hex_size, saved.chunk_size, config.hex_size, config.chunk_size
                );
                config.hex_size = saved.hex_size;
                config.chunk_size = saved.chunk_size;
            }
        }

        let world = Self::new(name, seed, config)?;
        info!(
            "Opened world '{name}' (seed {seed}, {} chunks at last save)",
            meta.chunk_count
        );
        Ok(world)
    }

    /// Opens the world if it exists, otherwise creates it with `seed`.
    pub fn open_or_create(name: &str, seed: i64, config: WorldConfig) -> WorldResult<Self> {
        match Self::open(name, config.clone()) {
            Err(WorldError::NotFound(_)) => Self::create(name, seed, config),
            other => other,
        }
    }

    /// World name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> i64 {
        self.seed
    }

    /// Active configuration (validated).
    #[must_use]
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Grid geometry.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Persistence handle.
    #[must_use]
    pub const fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Terrain generator.
    #[must_use]
    pub const fn generator(&self) -> &TerrainGenerator {
        &self.generator
    }

    /// Spatial index over resident tiles.
    #[must_use]
    pub const fn index(&self) -> &SpatialIndex {
        &self.index
    }

    /// Number of indexed tiles.
    #[must_use]
    pub const fn index_len(&self) -> usize {
        self.index.len()
    }

    /// Chunk whose pixel rectangle contains `(x, y)`.
    #[must_use]
    pub fn chunk_coords_for(&self, x: f64, y: f64) -> ChunkCoord {
        self.layout.chunk_coords_for(x, y)
    }

    /// Whether a chunk is resident.
    #[must_use]
    pub fn is_loaded(&self, coord: ChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    /// Resident chunk, without loading.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        self.chunks.get(&coord)
    }

    /// Coordinates of all resident chunks, sorted.
    #[must_use]
    pub fn loaded_chunks(&self) -> Vec<ChunkCoord> {
        let mut coords: Vec<_> = self.chunks.keys().copied().collect();
        coords.sort();
        coords
    }

    /// Returns a chunk, loading or generating it if it is not resident.
    pub fn get_chunk(&mut self, coord: ChunkCoord) -> WorldResult<&Chunk> {
        let chunk = materialize(
            &mut self.chunks,
            &mut self.index,
            &self.store,
            &self.generator,
            coord,
        )?;
        Ok(&*chunk)
    }

    /// Grid cell containing a pixel, with its chunk and local key.
    fn locate(&self, x: f64, y: f64) -> WorldResult<(TileCoord, ChunkCoord, LocalCoord)> {
        let coord = self
            .layout
            .checked_tile_coord_at(x, y)
            .ok_or(WorldError::OutOfBounds { x, y })?;
        let (chunk, local) = self.layout.split(coord);
        Ok((coord, chunk, local))
    }

    /// Tile whose hexagon contains `(x, y)`.
    pub fn get_tile_at(&mut self, x: f64, y: f64) -> WorldResult<Option<&Tile>> {
        let (coord, chunk_coord, _) = self.locate(x, y)?;
        let (cx, cy) = self.layout.tile_center(coord);
        let chunk = materialize(
            &mut self.chunks,
            &mut self.index,
            &self.store,
            &self.generator,
            chunk_coord,
        )?;
        Ok(chunk.get(cx, cy))
    }

    /// Places a block in the cell containing `(x, y)`, replacing any tile
    /// already there.
    pub fn add_tile_at(&mut self, x: f64, y: f64, block: BlockType) -> WorldResult<TileId> {
        let (coord, chunk_coord, local) = self.locate(x, y)?;
        let (cx, cy) = self.layout.tile_center(coord);
        let chunk = materialize(
            &mut self.chunks,
            &mut self.index,
            &self.store,
            &self.generator,
            chunk_coord,
        )?;

        if let Some(old) = chunk.get(cx, cy) {
            self.index.remove(old);
        }
        chunk.add(cx, cy, Tile::new(cx, cy, self.layout.hex_size, block));
        if let Some(tile) = chunk.get_local(local) {
            self.index.insert(tile);
        }
        Ok(TileId::new(chunk_coord, local))
    }

    /// Removes the tile in the cell containing `(x, y)`.
    ///
    /// Returns `false` when the cell was empty.
    pub fn remove_tile_at(&mut self, x: f64, y: f64) -> WorldResult<bool> {
        let (coord, chunk_coord, _) = self.locate(x, y)?;
        let (cx, cy) = self.layout.tile_center(coord);
        let chunk = materialize(
            &mut self.chunks,
            &mut self.index,
            &self.store,
            &self.generator,
            chunk_coord,
        )?;

        // The index entry is found through the tile, so it goes first.
        if let Some(tile) = chunk.get(cx, cy) {
            self.index.remove(tile);
        }
        Ok(chunk.remove(cx, cy))
    }

    /// Resident tile with the given identity.
    #[must_use]
    pub fn tile_by_id(&self, id: TileId) -> Option<&Tile> {
        self.chunks.get(&id.chunk)?.get_local(id.local)
    }

    /// Resident tiles whose centers lie within `radius` of `(x, y)`.
    #[must_use]
    pub fn nearby_tiles(&self, x: f64, y: f64, radius: f64) -> Vec<&Tile> {
        self.index
            .query_ids(x, y, radius)
            .into_iter()
            .filter_map(|id| self.tile_by_id(id))
            .collect()
    }

    /// Resident tiles within the render distance of a camera position.
    #[must_use]
    pub fn visible_tiles(&self, camera_x: f64, camera_y: f64) -> Vec<&Tile> {
        self.nearby_tiles(camera_x, camera_y, self.config.view_radius())
    }

    /// Loads the chunks within the configured render distance of `(x, y)`.
    pub fn ensure_loaded(&mut self, x: f64, y: f64) -> LoadReport {
        self.ensure_loaded_radius(x, y, self.config.render_distance)
    }

    /// Loads every chunk within `radius` chunks (Chebyshev, at most
    /// [`MAX_LOAD_RADIUS`]) of the chunk containing `(x, y)`.
    ///
    /// A chunk that fails to load is logged and skipped; the rest proceed.
    /// Chunks outside the addressable grid are not part of the world and
    /// are skipped silently.
    pub fn ensure_loaded_radius(&mut self, x: f64, y: f64, radius: u32) -> LoadReport {
        let center = self.chunk_coords_for(x, y);
        let radius = i32::try_from(radius.min(MAX_LOAD_RADIUS)).unwrap_or(0);
        let mut report = LoadReport::default();

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let (Some(cx), Some(cy)) = (center.x.checked_add(dx), center.y.checked_add(dy))
                else {
                    continue;
                };
                let coord = ChunkCoord::new(cx, cy);
                if !self.layout.contains_chunk(coord) || self.chunks.contains_key(&coord) {
                    continue;
                }
                match self.get_chunk(coord) {
                    Ok(_) => report.loaded.push(coord),
                    Err(e) => {
                        warn!("Skipping chunk {coord}: {e}");
                        report.failed.push(coord);
                    }
                }
            }
        }

        if !report.loaded.is_empty() {
            debug!(
                "Loaded {} chunks around {center} ({} resident)",
                report.loaded.len(),
                self.chunks.len()
            );
        }
        report
    }

    /// Evicts chunks beyond the configured unload distance from `(x, y)`.
    pub fn evict_far(&mut self, x: f64, y: f64) -> EvictionReport {
        self.evict_far_from(x, y, self.config.unload_distance)
    }

    /// Evicts every resident chunk farther than `max_distance` chunks
    /// (Euclidean) from the chunk containing `(x, y)`.
    ///
    /// Dirty chunks are saved first. A failed save is logged and the chunk is
    /// evicted anyway, losing its unsaved edits.
    pub fn evict_far_from(&mut self, x: f64, y: f64, max_distance: f64) -> EvictionReport {
        let focus = self.chunk_coords_for(x, y);
        let mut far: Vec<_> = self
            .chunks
            .keys()
            .copied()
            .filter(|coord| coord.distance(focus) > max_distance)
            .collect();
        far.sort();

        let mut report = EvictionReport::default();
        for coord in far {
            let Some(mut chunk) = self.chunks.remove(&coord) else {
                continue;
            };
            if chunk.is_dirty() {
                match self.store.save(&mut chunk) {
                    Ok(_) => report.saved += 1,
                    Err(e) => {
                        warn!("Evicting chunk {coord} without saving: {e}");
                        report.failed.push(coord);
                    }
                }
            }
            self.index.remove_chunk(&chunk);
            report.evicted.push(coord);
        }

        if !report.evicted.is_empty() {
            info!(
                "Evicted {} chunks far from {focus} ({} saved, {} failed)",
                report.evicted.len(),
                report.saved,
                report.failed.len()
            );
        }
        report
    }

    /// Saves every dirty chunk and refreshes the metadata record.
    ///
    /// Chunk failures are logged and reported; a metadata failure is
    /// returned as an error.
    pub fn save_all(&mut self) -> WorldResult<SaveReport> {
        let mut saved = 0;
        let mut failed = Vec::new();

        for (coord, chunk) in self.chunks.iter_mut() {
            match self.store.save(chunk) {
                Ok(true) => saved += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!("Failed to save chunk {coord}: {e}");
                    failed.push(*coord);
                }
            }
        }
        failed.sort();

        let meta = self
            .store
            .save_world_meta(self.chunks.len(), self.seed, self.layout)?;
        info!(
            "Saved world '{}': {saved} chunks written, {} failed",
            self.name,
            failed.len()
        );
        Ok(SaveReport {
            saved,
            failed,
            meta,
        })
    }

    /// Axial hex of a tile, for neighbor and distance math.
    #[must_use]
    pub fn tile_hex(&self, tile: &Tile) -> Hex {
        tile.id().tile_coord(&self.layout).to_hex()
    }

    /// Pixel center of the cell at an axial hex.
    #[must_use]
    pub fn hex_center(&self, hex: Hex) -> (f64, f64) {
        self.layout.tile_center(TileCoord::from_hex(hex))
    }

    /// Tile at an axial hex.
    pub fn tile_at_hex(&mut self, hex: Hex) -> WorldResult<Option<&Tile>> {
        let (x, y) = self.hex_center(hex);
        self.get_tile_at(x, y)
    }

    /// Sets the block at an axial hex; air removes the tile.
    pub fn set_block(&mut self, hex: Hex, block: BlockType) -> WorldResult<()> {
        let (x, y) = self.hex_center(hex);
        if block == BlockType::Air {
            self.remove_tile_at(x, y)?;
        } else {
            self.add_tile_at(x, y, block)?;
        }
        Ok(())
    }

    /// Damages the tile at an axial hex, removing it when destroyed.
    pub fn damage_block(&mut self, hex: Hex, amount: f64) -> WorldResult<DamageOutcome> {
        let (x, y) = self.hex_center(hex);
        let (_, chunk_coord, _) = self.locate(x, y)?;
        let chunk = materialize(
            &mut self.chunks,
            &mut self.index,
            &self.store,
            &self.generator,
            chunk_coord,
        )?;

        let Some(tile) = chunk.get_mut(x, y) else {
            return Ok(DamageOutcome::Missing);
        };
        let destroyed = tile.take_damage(amount);
        let block = tile.block;
        let health = tile.health;

        if destroyed {
            if let Some(tile) = chunk.get(x, y) {
                self.index.remove(tile);
            }
            chunk.remove(x, y);
            debug!("Destroyed {} at {hex:?}", block.name());
            Ok(DamageOutcome::Destroyed(block))
        } else {
            chunk.mark_dirty();
            Ok(DamageOutcome::Damaged(health))
        }
    }

    /// Clears the index and reinserts every resident tile.
    pub fn rebuild_index(&mut self) {
        self.index.rebuild(self.chunks.values());
        debug!("Rebuilt spatial index ({} tiles)", self.index.len());
    }

    /// Names of the worlds saved under `root`.
    pub fn list_worlds(root: impl AsRef<Path>) -> StorageResult<Vec<String>> {
        storage::list_worlds(root)
    }

    /// Deletes a saved world. Returns `false` if it did not exist.
    pub fn delete_world(root: impl AsRef<Path>, name: &str) -> StorageResult<bool> {
        storage::delete_world(root, name)
    }

    /// Metadata as last written, or a fresh record if never saved.
    pub fn metadata(&self) -> StorageResult<WorldMeta> {
        self.store.read_world_meta()
    }

    /// Time of the most recent chunk save among resident chunks.
    #[must_use]
    pub fn last_chunk_save(&self) -> Option<chrono::DateTime<Utc>> {
        self.chunks.values().filter_map(Chunk::last_saved).max()
    }
}

/// Makes a chunk resident: loaded from the store if saved, generated
/// otherwise. Newly resident tiles are registered in the index.
fn materialize<'a>(
    chunks: &'a mut AHashMap<ChunkCoord, Chunk>,
    index: &mut SpatialIndex,
    store: &ChunkStore,
    generator: &TerrainGenerator,
    coord: ChunkCoord,
) -> WorldResult<&'a mut Chunk> {
    if !generator.layout().contains_chunk(coord) {
        return Err(WorldError::ChunkOutOfBounds(coord));
    }
    match chunks.entry(coord) {
        Entry::Occupied(entry) => {
            let chunk = entry.into_mut();
            chunk.touch();
            Ok(chunk)
        }
        Entry::Vacant(entry) => {
            let chunk = match store.load(coord, *generator.layout()) {
                Ok(Some(chunk)) => {
                    debug!("Loaded chunk {coord} from disk");
                    chunk
                }
                Ok(None) => {
                    debug!("Generated chunk {coord}");
                    generator.generate_chunk(coord)
                }
                Err(source) => return Err(WorldError::ChunkUnavailable { coord, source }),
            };
            index.insert_chunk(&chunk);
            Ok(entry.insert(chunk))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> WorldConfig {
        WorldConfig::with_save_root(dir.path())
    }

    fn world(dir: &TempDir, seed: i64) -> World {
        World::create("test", seed, config(dir)).expect("create world")
    }

    fn center(world: &World, col: i32, row: i32) -> (f64, f64) {
        world.layout().tile_center(TileCoord::new(col, row))
    }

    fn assert_index_consistent(world: &World) {
        let resident: usize = world.chunks.values().map(Chunk::len).sum();
        assert_eq!(world.index_len(), resident);
        for chunk in world.chunks.values() {
            for tile in chunk.tiles() {
                assert!(world.index().contains(tile), "{} not indexed", tile.id());
            }
        }
    }

    #[test]
    fn test_create_then_open_keeps_seed() {
        let dir = TempDir::new().expect("temp dir");
        let mut created = world(&dir, 42);
        created.save_all().expect("save");

        let opened = World::open("test", config(&dir)).expect("open");
        assert_eq!(opened.seed(), 42);
        assert_eq!(World::list_worlds(dir.path()).expect("list"), vec!["test"]);
    }

    #[test]
    fn test_open_missing_and_create_existing() {
        let dir = TempDir::new().expect("temp dir");
        assert!(matches!(
            World::open("nope", config(&dir)),
            Err(WorldError::NotFound(_))
        ));
        world(&dir, 1);
        assert!(matches!(
            World::create("test", 1, config(&dir)),
            Err(WorldError::AlreadyExists(_))
        ));
        let reopened = World::open_or_create("test", 99, config(&dir)).expect("open");
        assert_eq!(reopened.seed(), 1);
    }

    #[test]
    fn test_open_without_seed_uses_creation_time() {
        let dir = TempDir::new().expect("temp dir");
        let store = ChunkStore::new(dir.path(), "legacy").expect("name");
        store.ensure_dir().expect("dir");
        let json = r#"{"created_at":"2024-01-02T03:04:05.000000123Z","last_saved":"2024-01-02T03:04:05Z","chunk_count":0,"version":"1.0"}"#;
        fs::write(store.metadata_path(), json).expect("write");

        let world = World::open("legacy", config(&dir)).expect("open");
        assert_eq!(world.seed(), 1_704_164_645_000_000_123);
    }

    #[test]
    fn test_open_keeps_saved_layout() {
        let dir = TempDir::new().expect("temp dir");
        let mut created = world(&dir, 42);
        let brick = created.layout().tile_center(TileCoord::new(52, 5));
        created.add_tile_at(brick.0, brick.1, BlockType::Brick).expect("add");
        created.save_all().expect("save");
        drop(created);

        let mut smaller = config(&dir);
        smaller.chunk_size = 16;
        let mut reopened = World::open("test", smaller).expect("open");
        assert_eq!(*reopened.layout(), GridLayout::default());
        assert_eq!(reopened.config().chunk_size, 32);
        let tile = reopened.get_tile_at(brick.0, brick.1).expect("get").expect("tile");
        assert_eq!(tile.block, BlockType::Brick);

        let meta = reopened.metadata().expect("meta");
        assert_eq!(meta.layout, Some(GridLayout::default()));
    }

    #[test]
    fn test_legacy_world_uses_configured_layout() {
        let dir = TempDir::new().expect("temp dir");
        let store = ChunkStore::new(dir.path(), "legacy").expect("name");
        store.ensure_dir().expect("dir");
        let json = r#"{"created_at":"2024-01-02T03:04:05Z","last_saved":"2024-01-02T03:04:05Z","chunk_count":0,"version":"1.0","seed":5}"#;
        fs::write(store.metadata_path(), json).expect("write");

        let mut custom = config(&dir);
        custom.chunk_size = 16;
        let mut world = World::open("legacy", custom).expect("open");
        assert_eq!(world.layout().chunk_size, 16);
        world.save_all().expect("save");
        assert_eq!(
            world.metadata().expect("meta").layout,
            Some(GridLayout::new(30.0, 16))
        );
    }

    #[test]
    fn test_far_positions_are_rejected() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);

        for (x, y) in [(1.0e13, 0.0), (2.0e11, 500.0), (-1.0e13, 1.0e13), (f64::NAN, 0.0)] {
            assert!(
                matches!(world.get_tile_at(x, y), Err(WorldError::OutOfBounds { .. })),
                "({x}, {y})"
            );
            assert!(matches!(
                world.add_tile_at(x, y, BlockType::Brick),
                Err(WorldError::OutOfBounds { .. })
            ));
            assert!(world.remove_tile_at(x, y).is_err());
        }

        let report = world.ensure_loaded_radius(1.0e13, 0.0, u32::MAX);
        assert!(report.loaded.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(world.loaded_count(), 0);
        assert!(world.evict_far_from(1.0e13, -1.0e13, 1.0).evicted.is_empty());
    }

    #[test]
    fn test_grid_edge_chunks() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let limit = tessel_common::MAX_TILE_COORD / 32;

        assert!(world.get_chunk(ChunkCoord::new(limit - 1, 0)).is_ok());
        assert!(matches!(
            world.get_chunk(ChunkCoord::new(limit, 0)),
            Err(WorldError::ChunkOutOfBounds(coord)) if coord == ChunkCoord::new(limit, 0)
        ));

        let (x, y) = world.layout().chunk_origin(ChunkCoord::new(limit - 1, 0));
        let report = world.ensure_loaded_radius(x + 1.0, y + 1.0, 1);
        assert!(report.failed.is_empty());
        assert_eq!(report.loaded.len(), 5);
        assert!(world.loaded_chunks().iter().all(|c| c.x < limit));
        assert_index_consistent(&world);
    }

    #[test]
    fn test_generated_chunk_is_clean_and_indexed() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let chunk = world.get_chunk(ChunkCoord::new(0, 0)).expect("chunk");
        assert!(!chunk.is_dirty());
        assert!(!chunk.is_empty());
        assert!(world.is_loaded(ChunkCoord::new(0, 0)));
        assert_index_consistent(&world);
    }

    #[test]
    fn test_add_get_remove() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let (x, y) = center(&world, 5, 0);
        world.remove_tile_at(x, y).expect("clear");

        let id = world.add_tile_at(x, y, BlockType::Brick).expect("add");
        assert_eq!(id.chunk, ChunkCoord::new(0, 0));
        let tile = world.get_tile_at(x + 3.0, y - 2.0).expect("get").expect("tile");
        assert_eq!(tile.block, BlockType::Brick);
        assert!(world.chunk(ChunkCoord::new(0, 0)).expect("resident").is_dirty());
        assert_index_consistent(&world);

        assert!(world.remove_tile_at(x, y).expect("remove"));
        assert!(!world.remove_tile_at(x, y).expect("remove again"));
        assert!(world.get_tile_at(x, y).expect("get").is_none());
        assert_index_consistent(&world);
    }

    #[test]
    fn test_replacing_tile_keeps_index_in_sync() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let (x, y) = center(&world, 2, 2);
        world.add_tile_at(x, y, BlockType::Dirt).expect("add");
        let before = world.index_len();
        world.add_tile_at(x, y, BlockType::Glass).expect("replace");
        assert_eq!(world.index_len(), before);
        let hits = world.nearby_tiles(x, y, 1.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].block, BlockType::Glass);
        assert_index_consistent(&world);
    }

    #[test]
    fn test_tile_on_chunk_edge_routes_to_owner() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        // Last column of an odd row: its center sits exactly on the chunk's
        // right edge.
        let (x, y) = center(&world, 31, 1);
        assert_eq!(world.chunk_coords_for(x, y), ChunkCoord::new(1, 0));

        let id = world.add_tile_at(x, y, BlockType::Plank).expect("add");
        assert_eq!(id, TileId::new(ChunkCoord::new(0, 0), LocalCoord::new(31, 1)));
        let tile = world.get_tile_at(x, y).expect("get").expect("tile");
        assert_eq!(tile.block, BlockType::Plank);
        assert!(world
            .chunk(ChunkCoord::new(0, 0))
            .and_then(|c| c.get_local(LocalCoord::new(31, 1)))
            .is_some());
    }

    #[test]
    fn test_nearby_tiles_match_brute_force() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 7);
        let report = world.ensure_loaded_radius(0.0, 0.0, 1);
        assert_eq!(report.loaded.len(), 9);
        assert!(report.failed.is_empty());

        let queries = [
            (0.0, 0.0, 300.0),
            (800.0, 600.0, 120.0),
            (-400.0, 900.0, 1_000.0),
            (1_662.0, 1_440.0, 45.0),
        ];
        for (x, y, r) in queries {
            let found: BTreeSet<_> = world.nearby_tiles(x, y, r).iter().map(|t| t.id()).collect();
            let expected: BTreeSet<_> = world
                .chunks
                .values()
                .flat_map(Chunk::tiles)
                .filter(|t| t.distance_sq(x, y) <= r * r)
                .map(Tile::id)
                .collect();
            assert_eq!(found, expected, "query ({x}, {y}, {r})");
        }
    }

    #[test]
    fn test_visible_tiles_use_render_distance() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 7);
        world.ensure_loaded_radius(0.0, 0.0, 1);
        let radius = world.config().view_radius();
        let visible = world.visible_tiles(100.0, 100.0);
        assert!(!visible.is_empty());
        assert!(visible.iter().all(|t| t.distance_sq(100.0, 100.0) <= radius * radius));
    }

    #[test]
    fn test_eviction_then_reload_keeps_edits() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let coord = ChunkCoord::new(0, 0);
        let layout = *world.layout();

        let chunk = world.get_chunk(coord).expect("chunk");
        let mut present: Vec<_> = chunk.tiles().map(Tile::local_coord).collect();
        present.sort();
        let removed: Vec<_> = present.iter().take(3).copied().collect();
        let empty: Vec<_> = (0..32)
            .flat_map(|row| (0..32).map(move |col| LocalCoord::new(col, row)))
            .filter(|local| chunk.get_local(*local).is_none())
            .take(3)
            .collect();
        assert_eq!(empty.len(), 3);

        for local in &removed {
            let (x, y) = layout.tile_center(layout.join(coord, *local));
            assert!(world.remove_tile_at(x, y).expect("remove"));
        }
        for local in &empty {
            let (x, y) = layout.tile_center(layout.join(coord, *local));
            world.add_tile_at(x, y, BlockType::Brick).expect("add");
        }

        let report = world.evict_far_from(1.0e7, 1.0e7, 1.0);
        assert!(report.evicted.contains(&coord));
        assert_eq!(report.saved, 1);
        assert!(report.failed.is_empty());
        assert!(!world.is_loaded(coord));
        assert_eq!(world.index_len(), 0);

        let chunk = world.get_chunk(coord).expect("reload");
        for local in &removed {
            assert!(chunk.get_local(*local).is_none());
        }
        for local in &empty {
            assert_eq!(chunk.get_local(*local).map(|t| t.block), Some(BlockType::Brick));
        }
        assert_index_consistent(&world);
    }

    #[test]
    fn test_removed_tile_stays_removed_with_neighbors_intact() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let coord = ChunkCoord::new(0, 0);

        let (ox, oy) = world.get_chunk(coord).expect("chunk").origin();
        let target = world
            .chunk(coord)
            .and_then(|chunk| {
                chunk
                    .tiles()
                    .min_by(|a, b| a.distance_sq(ox, oy).total_cmp(&b.distance_sq(ox, oy)))
            })
            .cloned()
            .expect("chunk has tiles");
        let hex = world.tile_hex(&target);

        let mut neighbors = Vec::new();
        for neighbor in hex.neighbors() {
            let (x, y) = world.hex_center(neighbor);
            let state = world
                .get_tile_at(x, y)
                .expect("neighbor chunk")
                .map(|t| (t.block, t.health.to_bits()));
            neighbors.push(((x, y), state));
        }

        assert!(world.remove_tile_at(target.x, target.y).expect("remove"));
        world.save_all().expect("save");
        world.evict_far_from(1.0e7, 1.0e7, 1.0);
        assert_eq!(world.loaded_count(), 0);

        assert!(world.get_tile_at(target.x, target.y).expect("reload").is_none());
        for ((x, y), state) in neighbors {
            let now = world
                .get_tile_at(x, y)
                .expect("reload neighbor")
                .map(|t| (t.block, t.health.to_bits()));
            assert_eq!(now, state);
        }
    }

    #[test]
    fn test_eviction_survives_save_failure() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let coord = ChunkCoord::new(0, 0);
        let (x, y) = center(&world, 3, 3);
        world.add_tile_at(x, y, BlockType::Brick).expect("add");

        let world_dir = world.store().dir().to_path_buf();
        fs::remove_dir_all(&world_dir).expect("remove dir");
        fs::write(&world_dir, b"not a directory").expect("block dir");

        let report = world.evict_far_from(1.0e7, 1.0e7, 1.0);
        assert_eq!(report.failed, vec![coord]);
        assert_eq!(report.evicted, vec![coord]);
        assert!(!world.is_loaded(coord));
        assert_eq!(world.index_len(), 0);
    }

    #[test]
    fn test_corrupt_chunk_aborts_only_that_chunk() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let bad = ChunkCoord::new(1, 0);
        fs::write(world.store().chunk_path(bad), b"garbage").expect("write");

        assert!(matches!(
            world.get_chunk(bad),
            Err(WorldError::ChunkUnavailable { coord, .. }) if coord == bad
        ));

        let (x, y) = world.layout().chunk_origin(ChunkCoord::new(0, 0));
        let report = world.ensure_loaded_radius(x + 1.0, y + 1.0, 1);
        assert_eq!(report.failed, vec![bad]);
        assert_eq!(report.loaded.len(), 8);
        assert!(!world.is_loaded(bad));
        assert_index_consistent(&world);
    }

    #[test]
    fn test_save_all_writes_only_dirty_chunks() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        world.ensure_loaded_radius(0.0, 0.0, 1);
        let (x, y) = center(&world, 4, 4);
        world.add_tile_at(x, y, BlockType::Glass).expect("add");

        let report = world.save_all().expect("save");
        assert_eq!(report.saved, 1);
        assert!(report.failed.is_empty());
        assert_eq!(report.meta.chunk_count, 9);
        assert_eq!(world.store().saved_chunks().expect("list"), vec![ChunkCoord::new(0, 0)]);
        assert!(world.last_chunk_save().is_some());

        let again = world.save_all().expect("save again");
        assert_eq!(again.saved, 0);
    }

    #[test]
    fn test_set_and_damage_block() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let hex = TileCoord::new(6, 1).to_hex();

        world.set_block(hex, BlockType::Stone).expect("set");
        assert_eq!(
            world.tile_at_hex(hex).expect("get").map(|t| t.block),
            Some(BlockType::Stone)
        );

        assert_eq!(
            world.damage_block(hex, 100.0).expect("damage"),
            DamageOutcome::Damaged(50.0)
        );
        assert_eq!(
            world.damage_block(hex, 100.0).expect("damage"),
            DamageOutcome::Destroyed(BlockType::Stone)
        );
        assert!(world.tile_at_hex(hex).expect("get").is_none());
        assert_eq!(
            world.damage_block(hex, 1.0).expect("damage"),
            DamageOutcome::Missing
        );

        world.set_block(hex, BlockType::Bedrock).expect("set");
        assert_eq!(
            world.damage_block(hex, 1.0e6).expect("damage"),
            DamageOutcome::Damaged(100.0)
        );
        world.set_block(hex, BlockType::Air).expect("clear");
        assert!(world.tile_at_hex(hex).expect("get").is_none());
        assert_index_consistent(&world);
    }

    #[test]
    fn test_damage_persists_health() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        let hex = TileCoord::new(9, 2).to_hex();
        world.set_block(hex, BlockType::Brick).expect("set");
        world.save_all().expect("save");
        world.damage_block(hex, 50.0).expect("damage");
        assert!(world.chunk(ChunkCoord::new(0, 0)).expect("resident").is_dirty());

        world.evict_far_from(1.0e7, 1.0e7, 1.0);
        let tile = world.tile_at_hex(hex).expect("get").expect("tile");
        assert!((tile.health - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_rebuild_index_recovers() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        world.ensure_loaded_radius(0.0, 0.0, 1);
        let expected = world.index_len();
        world.index.clear();
        assert_eq!(world.index_len(), 0);
        world.rebuild_index();
        assert_eq!(world.index_len(), expected);
        assert_index_consistent(&world);
    }

    #[test]
    fn test_neighbors_are_adjacent_tiles() {
        let dir = TempDir::new().expect("temp dir");
        let world = world(&dir, 42);
        let hex = TileCoord::new(10, 7).to_hex();
        let (cx, cy) = world.hex_center(hex);
        let spacing = world.layout().hex_width();
        for neighbor in hex.neighbors() {
            let (nx, ny) = world.hex_center(neighbor);
            let d = ((nx - cx).powi(2) + (ny - cy).powi(2)).sqrt();
            assert!((d - spacing).abs() < 1e-6, "neighbor at distance {d}");
        }
    }

    #[test]
    fn test_delete_world() {
        let dir = TempDir::new().expect("temp dir");
        let mut world = world(&dir, 42);
        world.save_all().expect("save");
        assert!(World::delete_world(dir.path(), "test").expect("delete"));
        assert!(World::list_worlds(dir.path()).expect("list").is_empty());
    }
}
