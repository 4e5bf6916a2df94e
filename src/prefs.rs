//! Persistent key-value preferences and the best-time record kept in them.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::PersistError;

pub const BEST_TIME_KEY: &str = "BestTime";

/// A small float-valued preference store that survives between sessions.
pub trait PrefsStore: Send + Sync {
    fn get_f32(&self, key: &str) -> Option<f32>;
    fn set_f32(&mut self, key: &str, value: f32);
    /// Flushes pending writes to the backing medium.
    fn save(&mut self) -> Result<(), PersistError>;
}

/// Store that lives only as long as the process.
#[derive(Default)]
pub struct MemoryPrefs {
    values: BTreeMap<String, f32>,
}

impl PrefsStore for MemoryPrefs {
    fn get_f32(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }

    fn set_f32(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), PersistError> {
        Ok(())
    }
}

#[derive(Default, Serialize, Deserialize)]
struct PrefsFile {
    values: BTreeMap<String, f32>,
}

/// Store backed by a JSON file on disk.
pub struct JsonFilePrefs {
    path: PathBuf,
    file: PrefsFile,
}

impl JsonFilePrefs {
    /// Opens the store at `path`. A file that does not exist yet is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PrefsFile::default(),
            Err(e) => return Err(e.into()),
        };
        debug!("opened prefs at {} ({} keys)", path.display(), file.values.len());
        Ok(Self { path, file })
    }

    /// A store at `path` that starts with no keys, whatever the file holds.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: PrefsFile::default(),
        }
    }
}

impl PrefsStore for JsonFilePrefs {
    fn get_f32(&self, key: &str) -> Option<f32> {
        self.file.values.get(key).copied()
    }

    fn set_f32(&mut self, key: &str, value: f32) {
        self.file.values.insert(key.to_string(), value);
    }

    fn save(&mut self) -> Result<(), PersistError> {
        let json = serde_json::to_string_pretty(&self.file)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// The injected store. Falls back to memory when the file can't be opened.
#[derive(Resource, Deref, DerefMut)]
pub struct Prefs(pub Box<dyn PrefsStore>);

impl Prefs {
    /// A malformed file is replaced by an empty store at the same path, so the
    /// next save rewrites it. Unreadable files fall back to memory.
    pub fn open_or_memory(path: &str) -> Self {
        match JsonFilePrefs::open(path) {
            Ok(store) => Prefs(Box::new(store)),
            Err(e @ PersistError::Json(_)) => {
                warn!("discarding prefs in {}: {}", path, e);
                Prefs(Box::new(JsonFilePrefs::empty(path)))
            }
            Err(e) => {
                warn!("best times will not persist, can't open {}: {}", path, e);
                Prefs(Box::new(MemoryPrefs::default()))
            }
        }
    }
}

/// Outcome of comparing a finished run against the stored best time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FinishRecord {
    pub elapsed: f32,
    pub best: f32,
    pub new_record: bool,
}

/// Stored best time, treating zero or a missing key as "never finished".
pub fn best_time(store: &dyn PrefsStore) -> Option<f32> {
    store.get_f32(BEST_TIME_KEY).filter(|t| *t > 0.0)
}

/// Records a finished run. The stored value only changes when `elapsed` is
/// strictly smaller than the previous best.
pub fn record_finish(store: &mut dyn PrefsStore, elapsed: f32) -> FinishRecord {
    let previous = best_time(store);
    let new_record = previous.map_or(true, |best| elapsed < best);
    if !new_record {
        return FinishRecord {
            elapsed,
            best: previous.unwrap_or(elapsed),
            new_record,
        };
    }

    store.set_f32(BEST_TIME_KEY, elapsed);
    if let Err(e) = store.save() {
        warn!("failed to save best time: {}", e);
    }
    info!("new best time {:.2}s", elapsed);
    FinishRecord {
        elapsed,
        best: elapsed,
        new_record,
    }
}
