//! Command implementations.
//!
//! `run` drives a headless session: a viewpoint walks along the surface,
//! keeping its surroundings loaded, mining and building as it goes, while far
//! chunks are evicted and the world is auto-saved.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tessel_common::{ChunkCoord, TileCoord};
use tessel_world::{BlockType, DamageOutcome, SharedWorld, World, WorldResult};
use tracing::{debug, info, warn};

use crate::autosave::{AutoSaveTimer, AutoSaveWorker};
use crate::config::EngineConfig;

/// Damage dealt when mining; enough to break any breakable block.
const MINE_DAMAGE: f64 = 1_000.0;

/// Rows searched downward for the surface.
const SURFACE_SCAN_ROWS: i32 = 128;

/// Block placed above the viewpoint.
const BUILD_BLOCK: BlockType = BlockType::Plank;

/// Parameters of a headless session.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// World name
    pub world: String,
    /// Seed for a new world
    pub seed: Option<i64>,
    /// Number of viewpoint steps
    pub steps: u32,
    /// Horizontal distance per step in pixels
    pub step_distance: f64,
}

/// What a session did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    /// Steps taken
    pub steps: u32,
    /// Tiles destroyed
    pub mined: u32,
    /// Blocks placed
    pub placed: u32,
    /// Chunks evicted
    pub evicted: usize,
    /// Auto-saves performed
    pub autosaves: u64,
    /// Chunks written by the final save
    pub final_saved: usize,
    /// Chunks the final save could not write
    pub final_failed: Vec<ChunkCoord>,
}

/// Seed derived from the clock, for worlds created without one.
fn clock_seed() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp())
}

/// Runs a headless session.
///
/// The final save always runs, even when a step fails; chunk save failures
/// are logged and reported in the summary.
pub fn run(config: &EngineConfig, options: &RunOptions) -> Result<SessionSummary> {
    let seed = options
        .seed
        .or(config.default_seed)
        .unwrap_or_else(clock_seed);
    let world = World::open_or_create(&options.world, seed, config.world.clone())
        .with_context(|| format!("Failed to open world '{}'", options.world))?;
    info!("Session on world '{}' (seed {})", world.name(), world.seed());

    let shared = SharedWorld::new(world);
    let worker = if config.background_autosave && config.autosave_enabled() {
        Some(
            AutoSaveWorker::spawn(
                shared.clone(),
                Duration::from_secs(config.autosave_interval_secs),
            )
            .context("Failed to start auto-save worker")?,
        )
    } else {
        None
    };
    let mut timer = AutoSaveTimer::new(if worker.is_some() {
        0
    } else {
        config.autosave_interval_secs
    });
    if timer.is_enabled() {
        info!("Auto-saving every {}s", config.autosave_interval_secs);
    } else if worker.is_none() {
        info!("Auto-save disabled");
    }

    let mut summary = SessionSummary::default();
    let walked = walk(&shared, options, &mut timer, &mut summary);

    if let Some(worker) = worker {
        let stats = worker.stop();
        if stats.failures > 0 {
            warn!("{} background auto-saves failed", stats.failures);
        }
        if let Some(at) = stats.last_save {
            debug!("Last background auto-save at {at}");
        }
        summary.autosaves += stats.saves;
    }

    let report = shared.save_all().context("Final save failed")?;
    if !report.failed.is_empty() {
        warn!(
            "Final save left {} chunks unsaved: {:?}",
            report.failed.len(),
            report.failed
        );
    }
    summary.final_saved = report.saved;
    summary.final_failed = report.failed;

    walked?;
    info!(
        "Session finished: {} steps, {} mined, {} placed, {} evicted, {} auto-saves",
        summary.steps, summary.mined, summary.placed, summary.evicted, summary.autosaves
    );
    Ok(summary)
}

fn walk(
    shared: &SharedWorld,
    options: &RunOptions,
    timer: &mut AutoSaveTimer,
    summary: &mut SessionSummary,
) -> Result<()> {
    for step in 0..options.steps {
        let x = f64::from(step) * options.step_distance;
        shared
            .with(|world| step_at(world, x, summary))
            .with_context(|| format!("Step {step} at x={x} failed"))?;
        summary.steps += 1;

        if timer.check() {
            match shared.save_all() {
                Ok(report) => {
                    summary.autosaves += 1;
                    debug!("Auto-saved {} chunks", report.saved);
                },
                Err(e) => warn!("Auto-save failed: {e}"),
            }
        }
    }
    Ok(())
}

/// First non-air, non-water cell of a column according to the generator.
fn surface_cell(world: &World, col: i32) -> Option<TileCoord> {
    let generator = world.generator();
    (0..SURFACE_SCAN_ROWS)
        .map(|row| TileCoord::new(col, row))
        .find(|&coord| {
            !matches!(
                generator.block_for_tile(coord),
                BlockType::Air | BlockType::Water
            )
        })
}

fn step_at(world: &mut World, x: f64, summary: &mut SessionSummary) -> WorldResult<()> {
    let col = world.layout().tile_coord_at(x, 0.0).col;
    let Some(surface) = surface_cell(world, col) else {
        debug!("No surface in column {col}");
        return Ok(());
    };
    let (vx, vy) = world.layout().tile_center(surface);

    let loaded = world.ensure_loaded(vx, vy);
    if !loaded.failed.is_empty() {
        warn!("Could not load chunks {:?}", loaded.failed);
    }

    if let DamageOutcome::Destroyed(block) = world.damage_block(surface.to_hex(), MINE_DAMAGE)? {
        summary.mined += 1;
        debug!("Mined {} at {:?}", block.name(), surface);
    }

    let above = TileCoord::new(surface.col, surface.row - 2).to_hex();
    let open = world
        .tile_at_hex(above)?
        .map_or(true, |tile| tile.block == BlockType::Water);
    if open {
        world.set_block(above, BUILD_BLOCK)?;
        summary.placed += 1;
    }

    summary.evicted += world.evict_far(vx, vy).evicted.len();
    Ok(())
}

/// Describes the tile at a pixel position of a saved world.
pub fn inspect(config: &EngineConfig, name: &str, x: f64, y: f64) -> Result<String> {
    let mut world = World::open(name, config.world.clone())
        .with_context(|| format!("Failed to open world '{name}'"))?;

    let coord = world.layout().tile_coord_at(x, y);
    let (chunk, local) = world.layout().split(coord);
    let biome = world.generator().biomes().biome_at(x, y);
    let surface = world.generator().surface_height(x, y);

    let mut out = String::new();
    writeln!(out, "world '{}' (seed {})", world.name(), world.seed())?;
    writeln!(
        out,
        "position ({x}, {y}): cell {},{} in chunk {chunk} at [{local}]",
        coord.col, coord.row
    )?;
    writeln!(out, "biome: {}, surface at y={surface:.1}", biome.name())?;

    match world.get_tile_at(x, y)? {
        Some(tile) => writeln!(
            out,
            "block: {}, health {:.0}/{:.0}",
            tile.block.name(),
            tile.health,
            tile.max_health
        )?,
        None => writeln!(out, "block: empty")?,
    }
    Ok(out)
}

/// Writes `config` to `path`, keeping an existing file unless `force` is
/// set. Returns whether the file was written.
pub fn init_config(config: &EngineConfig, path: &Path, force: bool) -> Result<bool> {
    if path.exists() && !force {
        warn!("{} already exists; pass --force to overwrite", path.display());
        return Ok(false);
    }
    config
        .save_to(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Names of saved worlds.
pub fn list(config: &EngineConfig) -> Result<Vec<String>> {
    World::list_worlds(&config.world.save_root).with_context(|| {
        format!(
            "Failed to list worlds in {}",
            config.world.save_root.display()
        )
    })
}

/// Deletes a saved world. Returns `false` if it did not exist.
pub fn delete(config: &EngineConfig, name: &str) -> Result<bool> {
    let deleted = World::delete_world(&config.world.save_root, name)
        .with_context(|| format!("Failed to delete world '{name}'"))?;
    if deleted {
        info!("Deleted world '{name}'");
    } else {
        warn!("World '{name}' does not exist");
    }
    Ok(deleted)
}
