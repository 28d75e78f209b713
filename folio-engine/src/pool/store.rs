//! Identifier pool persistence
//!
//! The pool file is a pretty-printed JSON array with one object per
//! identifier, in insertion order, so a pool change shows up as a small,
//! readable diff.

use super::IdentifierRecord;
use crate::error::EngineResult;
use folio_common::config::write_atomic;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Backing store for the identifier pool
pub trait PoolStore: Send + Sync {
    /// Load all records in insertion order
    fn load(&self) -> EngineResult<Vec<IdentifierRecord>>;

    /// Replace the stored records with `records`
    fn save(&self, records: &[IdentifierRecord]) -> EngineResult<()>;
}

/// JSON flat-file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PoolStore for JsonFileStore {
    fn load(&self) -> EngineResult<Vec<IdentifierRecord>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Pool file not found, starting empty");
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, records: &[IdentifierRecord]) -> EngineResult<()> {
        let mut json = serde_json::to_string_pretty(records)?;
        json.push('\n');
        write_atomic(&self.path, json.as_bytes())?;
        debug!(path = %self.path.display(), records = records.len(), "Pool saved");
        Ok(())
    }
}

/// In-memory store, for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<IdentifierRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<IdentifierRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }

    /// Records as last saved
    pub fn snapshot(&self) -> Vec<IdentifierRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PoolStore for MemoryStore {
    fn load(&self) -> EngineResult<Vec<IdentifierRecord>> {
        Ok(self.snapshot())
    }

    fn save(&self, records: &[IdentifierRecord]) -> EngineResult<()> {
        *self.records.lock().unwrap_or_else(PoisonError::into_inner) = records.to_vec();
        Ok(())
    }
}
