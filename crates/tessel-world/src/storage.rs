//! Chunk and world metadata persistence.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/<world name>/metadata.json
//! <root>/<world name>/chunk_<x>_<y>.json
//! ```
//!
//! Writes go through a temporary sibling file followed by a rename, so a
//! failed save leaves the previous copy intact.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessel_common::{ChunkCoord, GridLayout, SchemaVersion};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkError};

/// Name of the per-world metadata file.
pub const METADATA_FILE: &str = "metadata.json";

const CHUNK_PREFIX: &str = "chunk_";
const CHUNK_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File system failure.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// A chunk file exists but cannot be decoded.
    #[error("Corrupt chunk file {}: {source}", path.display())]
    CorruptChunk {
        /// Chunk file
        path: PathBuf,
        /// Decode failure
        #[source]
        source: ChunkError,
    },

    /// The metadata file exists but cannot be decoded.
    #[error("Corrupt metadata file {}: {source}", path.display())]
    CorruptMetadata {
        /// Metadata file
        path: PathBuf,
        /// Decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Encoding a document failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The world was written by an incompatible format version.
    #[error("Incompatible world format {found}, supported {supported}")]
    IncompatibleVersion {
        /// Version found on disk
        found: String,
        /// Version this build writes
        supported: SchemaVersion,
    },

    /// World names must be non-empty and made of letters, digits, `-` or `_`.
    #[error("Invalid world name: {0:?}")]
    InvalidWorldName(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Per-world sidecar record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMeta {
    /// When the world was first saved
    pub created_at: DateTime<Utc>,
    /// Last metadata refresh
    pub last_saved: DateTime<Utc>,
    /// Number of chunks resident at the last save
    pub chunk_count: usize,
    /// Format version, `major.minor`
    pub version: String,
    /// World seed; absent in files written before seeds were recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Grid geometry the chunk files were written with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<GridLayout>,
}

impl WorldMeta {
    /// Fresh metadata for a world that has never been saved.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_saved: now,
            chunk_count: 0,
            version: SchemaVersion::WORLD_FORMAT.to_string(),
            seed: None,
            layout: None,
        }
    }

    /// Parsed format version.
    pub fn schema_version(&self) -> StorageResult<SchemaVersion> {
        self.version
            .parse()
            .map_err(|_| self.incompatible())
    }

    fn incompatible(&self) -> StorageError {
        StorageError::IncompatibleVersion {
            found: self.version.clone(),
            supported: SchemaVersion::WORLD_FORMAT,
        }
    }

    fn check_version(&self) -> StorageResult<()> {
        if SchemaVersion::WORLD_FORMAT.can_read(&self.schema_version()?) {
            Ok(())
        } else {
            Err(self.incompatible())
        }
    }
}

/// Persistence handle for one world directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    name: String,
    dir: PathBuf,
}

impl ChunkStore {
    /// Creates a handle for `<root>/<name>`. Nothing is touched on disk.
    pub fn new(root: impl AsRef<Path>, name: &str) -> StorageResult<Self> {
        validate_world_name(name)?;
        Ok(Self {
            name: name.to_string(),
            dir: root.as_ref().join(name),
        })
    }

    /// World name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the world directory if needed.
    pub fn ensure_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))
    }

    /// Path of a chunk file.
    #[must_use]
    pub fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.dir
            .join(format!("{CHUNK_PREFIX}{}_{}{CHUNK_SUFFIX}", coord.x, coord.y))
    }

    /// Path of the metadata file.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// Whether a chunk has been saved.
    #[must_use]
    pub fn contains(&self, coord: ChunkCoord) -> bool {
        self.chunk_path(coord).is_file()
    }

    /// Saves a dirty chunk.
    ///
    /// Returns `Ok(false)` without touching disk when the chunk is clean. The
    /// dirty flag is cleared and `last_saved` updated only after the write
    /// succeeds.
    pub fn save(&self, chunk: &mut Chunk) -> StorageResult<bool> {
        if !chunk.is_dirty() {
            return Ok(false);
        }
        self.ensure_dir()?;

        let bytes = chunk
            .serialize()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let path = self.chunk_path(chunk.coord());
        atomic_write(&path, &bytes)?;

        chunk.mark_saved(Utc::now());
        debug!("Saved chunk {} ({} tiles)", chunk.coord(), chunk.len());
        Ok(true)
    }

    /// Loads a chunk.
    ///
    /// A missing file is `Ok(None)`. A file that exists but fails to decode,
    /// or describes another chunk, is [`StorageError::CorruptChunk`].
    pub fn load(&self, coord: ChunkCoord, layout: GridLayout) -> StorageResult<Option<Chunk>> {
        let path = self.chunk_path(coord);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };

        let chunk = Chunk::deserialize(&bytes, layout).map_err(|source| {
            StorageError::CorruptChunk {
                path: path.clone(),
                source,
            }
        })?;
        if chunk.coord() != coord {
            return Err(StorageError::CorruptChunk {
                path,
                source: ChunkError::CoordinateMismatch {
                    expected: coord,
                    found: chunk.coord(),
                },
            });
        }

        debug!("Loaded chunk {coord} ({} tiles)", chunk.len());
        Ok(Some(chunk))
    }

    /// Coordinates of every saved chunk file.
    pub fn saved_chunks(&self) -> StorageResult<Vec<ChunkCoord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir)(e)),
        };

        let mut coords: Vec<_> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| parse_chunk_file_name(&entry.file_name().to_string_lossy()))
            .collect();
        coords.sort();
        Ok(coords)
    }

    /// Reads the metadata record, defaulting when the file is absent.
    pub fn read_world_meta(&self) -> StorageResult<WorldMeta> {
        self.read_existing_meta()
            .map(|meta| meta.unwrap_or_else(|| WorldMeta::new(Utc::now())))
    }

    /// Reads the metadata record if one has been written.
    pub fn read_existing_meta(&self) -> StorageResult<Option<WorldMeta>> {
        let path = self.metadata_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };

        let meta: WorldMeta = serde_json::from_slice(&bytes)
            .map_err(|source| StorageError::CorruptMetadata { path, source })?;
        meta.check_version()?;
        Ok(Some(meta))
    }

    /// Writes the metadata record.
    ///
    /// `created_at` is kept from the existing record; `last_saved`,
    /// `chunk_count`, `seed` and `layout` are refreshed.
    pub fn save_world_meta(
        &self,
        chunk_count: usize,
        seed: i64,
        layout: GridLayout,
    ) -> StorageResult<WorldMeta> {
        self.ensure_dir()?;

        let now = Utc::now();
        let created_at = match self.read_existing_meta() {
            Ok(Some(existing)) => existing.created_at,
            Ok(None) => now,
            Err(e) => {
                warn!("Replacing unreadable metadata for world '{}': {e}", self.name);
                now
            }
        };

        let meta = WorldMeta {
            created_at,
            last_saved: now,
            chunk_count,
            version: SchemaVersion::WORLD_FORMAT.to_string(),
            seed: Some(seed),
            layout: Some(layout),
        };
        let bytes = serde_json::to_vec_pretty(&meta)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        atomic_write(&self.metadata_path(), &bytes)?;

        debug!("Saved metadata for world '{}' ({chunk_count} chunks)", self.name);
        Ok(meta)
    }
}

fn validate_world_name(name: &str) -> StorageResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidWorldName(name.to_string()))
    }
}

fn parse_chunk_file_name(name: &str) -> Option<ChunkCoord> {
    let stem = name.strip_prefix(CHUNK_PREFIX)?.strip_suffix(CHUNK_SUFFIX)?;
    let (x, y) = stem.split_once('_')?;
    Some(ChunkCoord::new(x.parse().ok()?, y.parse().ok()?))
}

/// Writes `bytes` to a temporary sibling of `path` and renames it into place.
fn atomic_write(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    fs::write(&temp, bytes).map_err(io_error(&temp))?;
    fs::rename(&temp, path).map_err(|e| {
        let _ = fs::remove_file(&temp);
        io_error(path)(e)
    })
}

/// Names of all worlds under `root`, sorted. A missing root has no worlds.
pub fn list_worlds(root: impl AsRef<Path>) -> StorageResult<Vec<String>> {
    let root = root.as_ref();
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(root)(e)),
    };

    let mut worlds = Vec::new();
    for entry in entries {
        let entry = entry.map_err(io_error(root))?;
        let is_dir = entry.file_type().map_err(io_error(root))?.is_dir();
        if let (true, Some(name)) = (is_dir, entry.file_name().to_str()) {
            worlds.push(name.to_string());
        }
    }
    worlds.sort();
    Ok(worlds)
}

/// Removes a world directory. Returns `false` if it did not exist.
pub fn delete_world(root: impl AsRef<Path>, name: &str) -> StorageResult<bool> {
    validate_world_name(name)?;
    let dir = root.as_ref().join(name);
    match fs::remove_dir_all(&dir) {
        Ok(()) => {
            info!("Deleted world '{name}'");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(&dir)(e)),
    }
}
