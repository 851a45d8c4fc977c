//! Persistent backing for the evaluation cache.
//!
//! Node ids are content hashes and stable across runs, so a cache entry
//! saved by one process is meaningful to the next. The evaluator reads
//! through to the backend on a cache miss and writes through on every
//! recorded entry whose subtree performed no effect.
//!
//! After each completed pass the engine prunes the backend to the nodes
//! still held by the store, so entries of code that was edited away do not
//! accumulate across runs.
//!
//! Generations must stay unique across runs: a restored entry carries the
//! generation it was saved with, so the cache's counter is advanced past the
//! backend's [`Persistence::high_water`] before the first pass.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use garden_ir::NodeId;
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheEntry, Generation};

/// Snapshot format version. Files with another version are ignored.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Storage for cache entries keyed by node identity.
pub trait Persistence: Send + Sync {
    fn load(&self, id: NodeId) -> Result<Option<CacheEntry>, PersistError>;

    fn save(&self, id: NodeId, entry: &CacheEntry) -> Result<(), PersistError>;

    fn remove(&self, id: NodeId) -> Result<(), PersistError>;

    /// Drop every entry whose node is not in `live`. Returns how many were
    /// dropped.
    fn retain(&self, live: &FxHashSet<NodeId>) -> Result<usize, PersistError>;

    /// Highest generation of any stored entry.
    fn high_water(&self) -> Generation;

    /// Make saved entries durable.
    fn flush(&self) -> Result<(), PersistError> {
        Ok(())
    }
}

/// In-memory backend. Survives engine instances that share it, not processes.
#[derive(Default)]
pub struct MemoryPersistence {
    entries: RwLock<FxHashMap<NodeId, CacheEntry>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self, id: NodeId) -> Result<Option<CacheEntry>, PersistError> {
        Ok(self.entries.read().get(&id).cloned())
    }

    fn save(&self, id: NodeId, entry: &CacheEntry) -> Result<(), PersistError> {
        self.entries.write().insert(id, entry.clone());
        Ok(())
    }

    fn remove(&self, id: NodeId) -> Result<(), PersistError> {
        self.entries.write().remove(&id);
        Ok(())
    }

    fn retain(&self, live: &FxHashSet<NodeId>) -> Result<usize, PersistError> {
        Ok(retain_live(&mut self.entries.write(), live))
    }

    fn high_water(&self) -> Generation {
        high_water(self.entries.read().values())
    }
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<(NodeId, CacheEntry)>,
}

/// File-backed store: entries are held in memory and written as one bincode
/// snapshot on [`Persistence::flush`].
pub struct FilePersistence {
    path: PathBuf,
    entries: RwLock<FxHashMap<NodeId, CacheEntry>>,
}

impl FilePersistence {
    /// Open the snapshot at `path`, starting empty if it does not exist,
    /// cannot be decoded, or was written by another snapshot version.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let entries = match File::open(&path) {
            Ok(file) => match bincode::deserialize_from::<_, Snapshot>(BufReader::new(file)) {
                Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                    snapshot.entries.into_iter().collect()
                }
                Ok(snapshot) => {
                    tracing::debug!(
                        path = %path.display(),
                        version = snapshot.version,
                        "ignoring cache snapshot from another version"
                    );
                    FxHashMap::default()
                }
                Err(error) => {
                    tracing::debug!(
                        path = %path.display(),
                        %error,
                        "ignoring unreadable cache snapshot"
                    );
                    FxHashMap::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => FxHashMap::default(),
            Err(source) => return Err(PersistError::Io { path, source }),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "opened cache snapshot");
        Ok(FilePersistence {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Persistence for FilePersistence {
    fn load(&self, id: NodeId) -> Result<Option<CacheEntry>, PersistError> {
        Ok(self.entries.read().get(&id).cloned())
    }

    fn save(&self, id: NodeId, entry: &CacheEntry) -> Result<(), PersistError> {
        self.entries.write().insert(id, entry.clone());
        Ok(())
    }

    fn remove(&self, id: NodeId) -> Result<(), PersistError> {
        self.entries.write().remove(&id);
        Ok(())
    }

    fn retain(&self, live: &FxHashSet<NodeId>) -> Result<usize, PersistError> {
        Ok(retain_live(&mut self.entries.write(), live))
    }

    fn high_water(&self) -> Generation {
        high_water(self.entries.read().values())
    }

    /// Write the snapshot to a sibling temp file, then rename over the target.
    fn flush(&self) -> Result<(), PersistError> {
        let mut entries: Vec<(NodeId, CacheEntry)> = self
            .entries
            .read()
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        };

        let tmp = self.path.with_extension("tmp");
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| PersistError::Io { path, source }
        };
        let file = File::create(&tmp).map_err(io_err(&tmp))?;
        let mut writer = BufWriter::new(file);
        bincode::serialize_into(&mut writer, &snapshot)?;
        writer.flush().map_err(io_err(&tmp))?;
        std::fs::rename(&tmp, &self.path).map_err(io_err(&self.path))?;
        tracing::debug!(
            path = %self.path.display(),
            entries = snapshot.entries.len(),
            "flushed cache snapshot"
        );
        Ok(())
    }
}

fn retain_live(entries: &mut FxHashMap<NodeId, CacheEntry>, live: &FxHashSet<NodeId>) -> usize {
    let before = entries.len();
    entries.retain(|id, _| live.contains(id));
    before - entries.len()
}

fn high_water<'a>(entries: impl Iterator<Item = &'a CacheEntry>) -> Generation {
    entries
        .map(|e| e.generation)
        .max()
        .unwrap_or(Generation::NONE)
}
