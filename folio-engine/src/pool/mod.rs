//! Identifier pool
//!
//! Owns the 13-digit identifiers a publisher has purchased and tracks which
//! book each one belongs to.
//!
//! # Lifecycle
//! ```text
//! import ──► AVAILABLE ──get_or_assign / assign_specific──► ASSIGNED ──mark_published──► PUBLISHED
//!                ▲                                              │
//!                └─────────────────── release ──────────────────┘
//! ```
//! Records are never deleted. A `book_id` owns at most one ASSIGNED or
//! PUBLISHED identifier, so asking again for the same book returns the same
//! identifier on every rebuild.
//!
//! # Concurrency
//! State sits behind one `RwLock`. Every mutation takes the write lock and
//! persists through the [`PoolStore`] before releasing it; if the save fails
//! the in-memory change is undone and the error returned. `lookup`,
//! `statistics` and `entries` take the read lock.

pub mod store;

pub use store::{JsonFileStore, MemoryStore, PoolStore};

use crate::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use folio_common::isbn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

// ========================================
// Records
// ========================================

/// Pool entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierStatus {
    Available,
    Assigned,
    Published,
}

impl fmt::Display for IdentifierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierStatus::Available => write!(f, "AVAILABLE"),
            IdentifierStatus::Assigned => write!(f, "ASSIGNED"),
            IdentifierStatus::Published => write!(f, "PUBLISHED"),
        }
    }
}

/// One pool entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierRecord {
    pub identifier: String,
    /// Empty while AVAILABLE
    #[serde(default)]
    pub owner_book_id: String,
    pub status: IdentifierStatus,
    #[serde(default)]
    pub assigned_title: String,
    #[serde(default)]
    pub assigned_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

impl IdentifierRecord {
    /// Freshly imported entry
    pub fn available(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            owner_book_id: String::new(),
            status: IdentifierStatus::Available,
            assigned_title: String::new(),
            assigned_date: None,
            notes: String::new(),
        }
    }

    /// ASSIGNED or PUBLISHED to some book
    pub fn is_owned(&self) -> bool {
        self.status != IdentifierStatus::Available && !self.owner_book_id.is_empty()
    }
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub imported: usize,
    pub duplicates_skipped: usize,
    pub invalid_skipped: usize,
}

/// Counts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatistics {
    pub total: usize,
    pub available: usize,
    pub assigned: usize,
    pub published: usize,
}

// ========================================
// State
// ========================================

#[derive(Debug, Default)]
struct PoolState {
    /// Insertion order
    records: Vec<IdentifierRecord>,
    by_identifier: HashMap<String, usize>,
    by_owner: HashMap<String, usize>,
}

impl PoolState {
    fn from_records(records: Vec<IdentifierRecord>) -> EngineResult<Self> {
        let mut state = PoolState::default();
        for record in records {
            if !isbn::is_valid_isbn13(&record.identifier) {
                return Err(EngineError::MalformedIdentifier(record.identifier));
            }
            if state.by_identifier.contains_key(&record.identifier) {
                return Err(EngineError::InvalidInput(format!(
                    "Duplicate identifier in pool: {}",
                    record.identifier
                )));
            }
            if record.is_owned() {
                if let Some(&other) = state.by_owner.get(&record.owner_book_id) {
                    return Err(EngineError::BookAlreadyAssigned {
                        book_id: record.owner_book_id.clone(),
                        identifier: state.records[other].identifier.clone(),
                    });
                }
            }
            state.push(record);
        }
        Ok(state)
    }

    fn push(&mut self, record: IdentifierRecord) {
        let idx = self.records.len();
        self.by_identifier.insert(record.identifier.clone(), idx);
        if record.is_owned() {
            self.by_owner.insert(record.owner_book_id.clone(), idx);
        }
        self.records.push(record);
    }

    /// Swap in a new version of the record at `idx`, keeping the owner index in step
    fn replace(&mut self, idx: usize, record: IdentifierRecord) -> IdentifierRecord {
        let previous = std::mem::replace(&mut self.records[idx], record);
        if previous.is_owned() {
            self.by_owner.remove(&previous.owner_book_id);
        }
        let current = &self.records[idx];
        if current.is_owned() {
            self.by_owner.insert(current.owner_book_id.clone(), idx);
        }
        previous
    }

    fn truncate(&mut self, len: usize) {
        for record in self.records.drain(len..) {
            self.by_identifier.remove(&record.identifier);
            if record.is_owned() {
                self.by_owner.remove(&record.owner_book_id);
            }
        }
    }

    fn index_of(&self, identifier: &str) -> EngineResult<usize> {
        self.by_identifier
            .get(identifier)
            .copied()
            .ok_or_else(|| EngineError::IdentifierNotFound(identifier.to_string()))
    }
}

// ========================================
// Pool
// ========================================

/// Shared, persisted identifier pool
pub struct IdentifierPool {
    state: RwLock<PoolState>,
    store: Box<dyn PoolStore>,
}

impl fmt::Debug for IdentifierPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentifierPool")
            .field("statistics", &self.statistics())
            .finish()
    }
}

impl IdentifierPool {
    /// Open a pool over `store`, loading and checking its records
    pub fn open(store: impl PoolStore + 'static) -> EngineResult<Self> {
        let state = PoolState::from_records(store.load()?)?;
        info!(identifiers = state.records.len(), "Identifier pool opened");
        Ok(Self {
            state: RwLock::new(state),
            store: Box::new(store),
        })
    }

    /// Empty in-memory pool
    pub fn in_memory() -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            store: Box::new(MemoryStore::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PoolState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PoolState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `record` at `idx`; on save failure put the old version back
    fn commit(&self, state: &mut PoolState, idx: usize, record: IdentifierRecord) -> EngineResult<()> {
        let previous = state.replace(idx, record);
        if let Err(e) = self.store.save(&state.records) {
            warn!(identifier = %previous.identifier, error = %e, "Pool save failed, change rolled back");
            state.replace(idx, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Bulk-load identifiers as AVAILABLE
    ///
    /// Hyphens and spaces are stripped. Entries already in the pool (or
    /// repeated in the batch) and entries that are not valid ISBN-13s are
    /// counted and skipped. Existing records are never touched.
    pub fn import_batch<I, S>(&self, identifiers: I) -> EngineResult<ImportStats>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stats = ImportStats::default();
        let mut state = self.write();
        let original_len = state.records.len();

        for raw in identifiers {
            let identifier = isbn::normalize(raw.as_ref());
            if identifier.is_empty() {
                continue;
            }
            if !isbn::is_valid_isbn13(&identifier) {
                debug!(identifier = %raw.as_ref(), "Skipping malformed identifier");
                stats.invalid_skipped += 1;
                continue;
            }
            if state.by_identifier.contains_key(&identifier) {
                stats.duplicates_skipped += 1;
                continue;
            }
            state.push(IdentifierRecord::available(identifier));
            stats.imported += 1;
        }

        if stats.imported > 0 {
            if let Err(e) = self.store.save(&state.records) {
                state.truncate(original_len);
                return Err(e);
            }
        }

        info!(
            imported = stats.imported,
            duplicates = stats.duplicates_skipped,
            invalid = stats.invalid_skipped,
            "Identifier import complete"
        );
        Ok(stats)
    }

    /// Identifier owned by `book_id`, assigning the first AVAILABLE one if none
    ///
    /// Idempotent per book: a rebuild gets back the identifier it had. With
    /// nothing AVAILABLE the call fails with `PoolExhausted` and changes nothing.
    pub fn get_or_assign(&self, book_id: &str, title: &str, date: NaiveDate) -> EngineResult<String> {
        if book_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "book_id is required for identifier assignment".to_string(),
            ));
        }

        let mut state = self.write();
        if let Some(&idx) = state.by_owner.get(book_id) {
            let identifier = state.records[idx].identifier.clone();
            debug!(book_id, identifier = %identifier, "Reusing assigned identifier");
            return Ok(identifier);
        }

        let idx = state
            .records
            .iter()
            .position(|r| r.status == IdentifierStatus::Available)
            .ok_or_else(|| EngineError::PoolExhausted {
                book_id: book_id.to_string(),
            })?;

        let mut record = state.records[idx].clone();
        record.status = IdentifierStatus::Assigned;
        record.owner_book_id = book_id.to_string();
        record.assigned_title = title.to_string();
        record.assigned_date = Some(date);
        let identifier = record.identifier.clone();

        self.commit(&mut state, idx, record)?;
        info!(book_id, identifier = %identifier, "Identifier assigned");
        Ok(identifier)
    }

    /// Identifier owned by `book_id`, without assigning
    pub fn lookup(&self, book_id: &str) -> Option<String> {
        let state = self.read();
        state
            .by_owner
            .get(book_id)
            .map(|&idx| state.records[idx].identifier.clone())
    }

    /// Whether `identifier` is in the pool
    pub fn contains(&self, identifier: &str) -> bool {
        self.read()
            .by_identifier
            .contains_key(&isbn::normalize(identifier))
    }

    /// Assign a named identifier to `book_id`
    ///
    /// Returns `false` when the book already owns exactly this identifier.
    /// Fails if the identifier is unknown, owned by another book, not
    /// AVAILABLE, or if the book already holds a different identifier.
    pub fn assign_specific(
        &self,
        identifier: &str,
        book_id: &str,
        title: &str,
        date: NaiveDate,
    ) -> EngineResult<bool> {
        if book_id.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "book_id is required for identifier assignment".to_string(),
            ));
        }
        let identifier = isbn::normalize(identifier);
        let mut state = self.write();
        let idx = state.index_of(&identifier)?;
        let current = &state.records[idx];

        if current.is_owned() {
            if current.owner_book_id == book_id {
                return Ok(false);
            }
            return Err(EngineError::AlreadyOwned {
                identifier,
                owner: current.owner_book_id.clone(),
            });
        }
        if current.status != IdentifierStatus::Available {
            return Err(EngineError::InvalidTransition {
                identifier,
                from: current.status,
                to: IdentifierStatus::Assigned,
            });
        }
        if let Some(&other) = state.by_owner.get(book_id) {
            return Err(EngineError::BookAlreadyAssigned {
                book_id: book_id.to_string(),
                identifier: state.records[other].identifier.clone(),
            });
        }

        let mut record = current.clone();
        record.status = IdentifierStatus::Assigned;
        record.owner_book_id = book_id.to_string();
        record.assigned_title = title.to_string();
        record.assigned_date = Some(date);

        self.commit(&mut state, idx, record)?;
        info!(book_id, identifier = %identifier, "Identifier assigned by request");
        Ok(true)
    }

    /// ASSIGNED → PUBLISHED; already PUBLISHED is a no-op
    pub fn mark_published(&self, identifier: &str) -> EngineResult<()> {
        let identifier = isbn::normalize(identifier);
        let mut state = self.write();
        let idx = state.index_of(&identifier)?;
        let current = &state.records[idx];

        match current.status {
            IdentifierStatus::Published => Ok(()),
            IdentifierStatus::Available => Err(EngineError::InvalidTransition {
                identifier,
                from: IdentifierStatus::Available,
                to: IdentifierStatus::Published,
            }),
            IdentifierStatus::Assigned => {
                let mut record = current.clone();
                record.status = IdentifierStatus::Published;
                self.commit(&mut state, idx, record)?;
                info!(identifier = %identifier, "Identifier published");
                Ok(())
            }
        }
    }

    /// ASSIGNED → AVAILABLE, clearing ownership; PUBLISHED identifiers stay put
    pub fn release(&self, identifier: &str) -> EngineResult<()> {
        let identifier = isbn::normalize(identifier);
        let mut state = self.write();
        let idx = state.index_of(&identifier)?;
        let current = &state.records[idx];

        match current.status {
            IdentifierStatus::Available => Ok(()),
            IdentifierStatus::Published => Err(EngineError::InvalidTransition {
                identifier,
                from: IdentifierStatus::Published,
                to: IdentifierStatus::Available,
            }),
            IdentifierStatus::Assigned => {
                let previous_owner = current.owner_book_id.clone();
                let mut record = current.clone();
                record.status = IdentifierStatus::Available;
                record.owner_book_id.clear();
                record.assigned_title.clear();
                record.assigned_date = None;
                self.commit(&mut state, idx, record)?;
                info!(identifier = %identifier, book_id = %previous_owner, "Identifier released");
                Ok(())
            }
        }
    }

    pub fn statistics(&self) -> PoolStatistics {
        let state = self.read();
        let mut stats = PoolStatistics {
            total: state.records.len(),
            ..Default::default()
        };
        for record in &state.records {
            match record.status {
                IdentifierStatus::Available => stats.available += 1,
                IdentifierStatus::Assigned => stats.assigned += 1,
                IdentifierStatus::Published => stats.published += 1,
            }
        }
        stats
    }

    /// Copy of every record, in insertion order
    pub fn entries(&self) -> Vec<IdentifierRecord> {
        self.read().records.clone()
    }
}

/// Identifiers from a plain-text or CSV file: first column, one per line
///
/// Blank lines, `#` comments and a header row (a first cell without digits)
/// are skipped.
pub fn parse_identifier_file(content: &str) -> EngineResult<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(content.as_bytes());

    let mut identifiers = Vec::new();
    for row in reader.records() {
        let row = row?;
        let Some(first) = row.get(0) else { continue };
        if first.is_empty() || !first.chars().any(|c| c.is_ascii_digit()) {
            continue;
        }
        // repeats are kept so import statistics count them
        identifiers.push(first.to_string());
    }
    Ok(identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [&str; 3] = ["9780306406157", "9780134685991", "9781861972712"];

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn pool_with_ids() -> IdentifierPool {
        let pool = IdentifierPool::in_memory();
        pool.import_batch(IDS).unwrap();
        pool
    }

    struct FailingStore;

    impl PoolStore for FailingStore {
        fn load(&self) -> EngineResult<Vec<IdentifierRecord>> {
            Ok(IDS.iter().map(|id| IdentifierRecord::available(*id)).collect())
        }

        fn save(&self, _records: &[IdentifierRecord]) -> EngineResult<()> {
            Err(EngineError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn test_import_counts_duplicates_and_invalid() {
        let pool = IdentifierPool::in_memory();
        let stats = pool
            .import_batch(["978-0-306-40615-7", "9780306406157", "9780306406158", "12345", "9780134685991"])
            .unwrap();
        assert_eq!(
            stats,
            ImportStats {
                imported: 2,
                duplicates_skipped: 1,
                invalid_skipped: 2
            }
        );
        assert_eq!(pool.statistics().available, 2);
    }

    #[test]
    fn test_assignment_is_insertion_ordered_and_idempotent() {
        let pool = pool_with_ids();
        let first = pool.get_or_assign("bk-1", "One", date()).unwrap();
        let again = pool.get_or_assign("bk-1", "One (rev)", date()).unwrap();
        let second = pool.get_or_assign("bk-2", "Two", date()).unwrap();

        assert_eq!(first, IDS[0]);
        assert_eq!(again, first);
        assert_eq!(second, IDS[1]);
        assert_eq!(pool.statistics().assigned, 2);
        assert_eq!(pool.lookup("bk-1").as_deref(), Some(IDS[0]));
        assert_eq!(pool.lookup("bk-9"), None);
    }

    #[test]
    fn test_exhaustion_leaves_state_unchanged() {
        let pool = IdentifierPool::in_memory();
        pool.import_batch([IDS[0]]).unwrap();
        pool.get_or_assign("bk-1", "One", date()).unwrap();

        let before = pool.entries();
        let err = pool.get_or_assign("bk-2", "Two", date()).unwrap_err();
        assert!(matches!(err, EngineError::PoolExhausted { .. }));
        assert_eq!(pool.entries(), before);
    }

    #[test]
    fn test_assign_specific_rules() {
        let pool = pool_with_ids();
        assert!(pool.assign_specific(IDS[2], "bk-1", "One", date()).unwrap());
        assert!(!pool.assign_specific(IDS[2], "bk-1", "One", date()).unwrap());
        assert!(matches!(
            pool.assign_specific(IDS[2], "bk-2", "Two", date()),
            Err(EngineError::AlreadyOwned { .. })
        ));
        assert!(matches!(
            pool.assign_specific(IDS[0], "bk-1", "One", date()),
            Err(EngineError::BookAlreadyAssigned { .. })
        ));
        assert!(matches!(
            pool.assign_specific("9780000000002", "bk-3", "Three", date()),
            Err(EngineError::IdentifierNotFound(_))
        ));
        // get_or_assign honors the specific assignment
        assert_eq!(pool.get_or_assign("bk-1", "One", date()).unwrap(), IDS[2]);
    }

    #[test]
    fn test_publish_and_release_lifecycle() {
        let pool = pool_with_ids();
        let id = pool.get_or_assign("bk-1", "One", date()).unwrap();

        pool.release(&id).unwrap();
        assert_eq!(pool.lookup("bk-1"), None);
        assert_eq!(pool.statistics().available, 3);

        let id = pool.get_or_assign("bk-1", "One", date()).unwrap();
        pool.mark_published(&id).unwrap();
        pool.mark_published(&id).unwrap();
        assert!(matches!(
            pool.release(&id),
            Err(EngineError::InvalidTransition {
                from: IdentifierStatus::Published,
                ..
            })
        ));
        assert!(matches!(
            pool.mark_published(IDS[1]),
            Err(EngineError::InvalidTransition { .. })
        ));
        assert_eq!(pool.statistics().published, 1);
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let pool = IdentifierPool::open(FailingStore).unwrap();
        assert!(pool.get_or_assign("bk-1", "One", date()).is_err());
        assert_eq!(pool.lookup("bk-1"), None);
        assert_eq!(pool.statistics().available, 3);

        assert!(pool.import_batch(["9780000000002"]).is_err());
        assert_eq!(pool.statistics().total, 3);
    }

    #[test]
    fn test_open_rejects_bad_checksum() {
        let store = MemoryStore::with_records(vec![IdentifierRecord::available("9780306406158")]);
        assert!(matches!(
            IdentifierPool::open(store),
            Err(EngineError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_parse_identifier_file() {
        let content = "isbn,note\n# reserved block\n978-0-306-40615-7, first\n\n9780134685991\n";
        let ids = parse_identifier_file(content).unwrap();
        assert_eq!(ids, vec!["978-0-306-40615-7", "9780134685991"]);
    }
}
