//! Checkpoint persistence and document delivery seams.

use crate::error::{DriverError, DriverResult};
use crawlfeed_core::DocumentEvent;
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Persists the serialized checkpoint of one traversal kind.
///
/// The stored value is opaque to the store.
pub trait CheckpointStore: Send + Sync {
    /// Loads the stored checkpoint, or `None` for a fresh crawl.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value cannot be read.
    fn load(&self) -> DriverResult<Option<String>>;

    /// Replaces the stored checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be written durably.
    fn save(&self, checkpoint: &str) -> DriverResult<()>;
}

/// Receives the events of a traversal.
pub trait DocumentSink: Send + Sync {
    /// Delivers one event.
    ///
    /// A returned error is counted as a per-document failure; the driver
    /// moves on to the next event.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be indexed.
    fn deliver(&self, event: &DocumentEvent) -> DriverResult<()>;
}

/// An in-memory checkpoint store for testing.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    value: RwLock<Option<String>>,
    saves: RwLock<usize>,
}

impl MemoryCheckpointStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a checkpoint.
    #[must_use]
    pub fn with_checkpoint(checkpoint: impl Into<String>) -> Self {
        Self {
            value: RwLock::new(Some(checkpoint.into())),
            saves: RwLock::new(0),
        }
    }

    /// The stored checkpoint.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.value.read().clone()
    }

    /// Number of saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.saves.read()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> DriverResult<Option<String>> {
        Ok(self.get())
    }

    fn save(&self, checkpoint: &str) -> DriverResult<()> {
        *self.value.write() = Some(checkpoint.to_string());
        *self.saves.write() += 1;
        Ok(())
    }
}

/// A checkpoint store backed by one file.
///
/// Saves write a temporary file next to the target, sync it, and rename it
/// over the target, so a crash leaves either the old or the new checkpoint.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store for the given file. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Syncs the directory holding the checkpoint so the rename is durable.
    #[cfg(unix)]
    fn sync_directory(&self) -> DriverResult<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    /// NTFS journals metadata, so there is no directory to sync.
    #[cfg(not(unix))]
    fn sync_directory(&self) -> DriverResult<()> {
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "checkpoint".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> DriverResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, checkpoint: &str) -> DriverResult<()> {
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(checkpoint.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;
        self.sync_directory()?;
        Ok(())
    }
}

/// A sink that keeps every delivered event, for testing.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DocumentEvent>>,
    reject: Mutex<Vec<String>>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery fail for the event with the given document id.
    #[must_use]
    pub fn rejecting(self, doc_id: impl Into<String>) -> Self {
        self.reject.lock().push(doc_id.into());
        self
    }

    /// Events delivered so far.
    #[must_use]
    pub fn events(&self) -> Vec<DocumentEvent> {
        self.events.lock().clone()
    }

    /// Number of events delivered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was delivered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl DocumentSink for CollectingSink {
    fn deliver(&self, event: &DocumentEvent) -> DriverResult<()> {
        let id = event.doc_id().as_str();
        if self.reject.lock().iter().any(|r| r == id) {
            return Err(DriverError::store(format!("sink rejected {id}")));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}
