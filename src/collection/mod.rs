//! Record collections backed by a persisted JSON list
//!
//! ## Overview
//!
//! ```text
//! Collection (trait: read, remove, reverse, write; insert/append unsupported)
//!     ├── RecordList            base list, no validated inserts
//!     ├── EntityCollection      antigens / sera: {id, long}
//!     └── ExperimentCollection  {id, name, description, results[..]}
//! ```
//!
//! Records are JSON objects with a mandatory six-character `id`. Every
//! collection keeps its records and an id index side by side; both change
//! together or not at all.
//!
//! Collections are append/insert-only from the outside: index assignment is
//! refused so that the validated `insert`/`append`/`create` calls stay the
//! only ways in.
//!
//! ## Usage
//!
//! ```rust
//! use titer_db::collection::{Collection, EntityCollection, LoadOptions};
//!
//! let bytes = br#"[{"id": "AAAAAA", "long": "A/Perth/16/2009"}]"#;
//! let mut antigens = EntityCollection::from_slice(bytes, LoadOptions::new().name("antigens"))?;
//!
//! let id = antigens.create("A/Victoria/361/2011", None)?;
//! assert_eq!(antigens.len(), 2);
//! assert!(antigens.contains_id(&id));
//! # Ok::<(), titer_db::Error>(())
//! ```

mod entity;
mod experiment;
mod id;

pub use entity::EntityCollection;
pub use experiment::ExperimentCollection;
pub use id::DEFAULT_MAX_ID_ATTEMPTS;

use crate::schema::record_id;
use crate::{format, Error, Record, Result};
use rand::RngCore;
use rustc_hash::FxHashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Options applied when a collection is loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    name: String,
    max_id_attempts: usize,
    enforce_insert_checks: bool,
}

impl LoadOptions {
    /// Defaults: unnamed, 10000 id attempts, insert checks on.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            enforce_insert_checks: true,
        }
    }

    /// Label used in diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Retry ceiling for [`Collection::generate_id`].
    #[must_use]
    pub const fn max_id_attempts(mut self, attempts: usize) -> Self {
        self.max_id_attempts = attempts;
        self
    }

    /// Initial value of the per-insert validation toggle.
    ///
    /// See [`Collection::set_enforce_insert_checks`].
    #[must_use]
    pub const fn enforce_insert_checks(mut self, enforce: bool) -> Self {
        self.enforce_insert_checks = enforce;
        self
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Base collection: an ordered list of records plus their id index.
///
/// `RecordList` offers every read and structural operation but no validated
/// inserts; [`Collection::insert`] and [`Collection::append`] return
/// [`Error::NotSupported`] on it.
#[derive(Debug, Clone)]
pub struct RecordList {
    name: String,
    records: Vec<Record>,
    ids: Vec<String>,
    enforce_insert_checks: bool,
    max_id_attempts: usize,
}

impl RecordList {
    /// Build a collection from already-decoded records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if `records` is empty or a record has no
    /// string `id`, and [`Error::Integrity`] if an id repeats.
    pub fn from_records(records: Vec<Record>, options: LoadOptions) -> Result<Self> {
        if records.is_empty() {
            return Err(Error::Format("list contains no elements".to_string()));
        }

        let ids = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record_id(record).map(str::to_string).ok_or_else(|| {
                    Error::Format(format!("element {index} has no string id field"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let list = Self {
            name: options.name,
            records,
            ids,
            enforce_insert_checks: options.enforce_insert_checks,
            max_id_attempts: options.max_id_attempts,
        };
        list.validate_invariants()?;

        debug!(collection = %list.name, records = list.len(), "loaded collection");
        Ok(list)
    }

    /// Decode and build a collection from persisted bytes.
    ///
    /// # Errors
    ///
    /// Same as [`format::parse`] and [`RecordList::from_records`].
    pub fn from_slice(bytes: &[u8], options: LoadOptions) -> Result<Self> {
        Self::from_records(format::parse(bytes)?, options)
    }

    /// Read, decode and build a collection from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`RecordList::from_slice`].
    pub fn load<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes, options)
    }

    /// Check that every id in the index is distinct.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Integrity`] naming the first repeated id.
    pub fn validate_invariants(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        match self.ids.iter().find(|id| !seen.insert(id.as_str())) {
            Some(id) => Err(Error::Integrity(format!(
                "id {id} appears multiple times in collection {}",
                self.name
            ))),
            None => Ok(()),
        }
    }

    /// Fail with [`Error::DuplicateId`] if `id` is already indexed.
    pub(crate) fn ensure_new_id(&self, id: &str) -> Result<()> {
        match self.position_of(id) {
            Some(index) => Err(Error::DuplicateId {
                id: id.to_string(),
                index,
            }),
            None => Ok(()),
        }
    }

    /// Insert without content checks, keeping records and ids in lock-step.
    pub(crate) fn insert_record(&mut self, index: usize, record: Record) -> Result<()> {
        if index > self.records.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: self.records.len(),
            });
        }
        let id = record_id(&record)
            .ok_or_else(|| Error::Schema("record to insert has no string id field".to_string()))?
            .to_string();

        debug!(collection = %self.name, %id, index, "inserting record");
        self.ids.insert(index, id);
        self.records.insert(index, record);
        Ok(())
    }

    /// Encode and write the records to `path`.
    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let bytes = format::serialize(&self.records)?;
        std::fs::write(path, bytes)?;
        debug!(collection = %self.name, path = %path.display(), records = self.len(), "wrote collection");
        Ok(())
    }

    /// Consume the collection, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl fmt::Display for RecordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{}", serde_json::Value::Object(record.clone()))?;
        }
        Ok(())
    }
}

/// Shared behaviour of all record collections.
///
/// Implementors expose their underlying [`RecordList`]; everything else has
/// a default. Concrete collection types override [`Collection::insert`]
/// with their own validation, and the experiment collection overrides
/// [`Collection::write`] to gate persistence on a cross-check.
pub trait Collection {
    /// Underlying record list.
    fn list(&self) -> &RecordList;

    /// Underlying record list, mutably.
    fn list_mut(&mut self) -> &mut RecordList;

    /// Insert a record at `index`, shifting later records.
    ///
    /// # Errors
    ///
    /// The base collection has no insert rules and always returns
    /// [`Error::NotSupported`].
    fn insert(&mut self, index: usize, record: Record) -> Result<()> {
        let _ = (index, record);
        Err(Error::NotSupported(format!(
            "insert is only defined for entity and experiment collections, not {}",
            self.kind()
        )))
    }

    /// Insert a record at the end.
    ///
    /// # Errors
    ///
    /// As [`Collection::insert`].
    fn append(&mut self, record: Record) -> Result<()> {
        let len = self.len();
        self.insert(len, record)
    }

    /// Index assignment is never allowed.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::NotSupported`].
    fn set(&mut self, index: usize, record: Record) -> Result<()> {
        let _ = (index, record);
        Err(Error::NotSupported(format!(
            "setting values not allowed for {}",
            self.kind()
        )))
    }

    /// Type name used in diagnostics.
    fn kind(&self) -> &'static str {
        "RecordList"
    }

    /// Collection label.
    fn name(&self) -> &str {
        &self.list().name
    }

    /// Number of records.
    fn len(&self) -> usize {
        self.list().records.len()
    }

    /// True if the collection holds no records.
    fn is_empty(&self) -> bool {
        self.list().records.is_empty()
    }

    /// Record at `index`.
    fn get(&self, index: usize) -> Option<&Record> {
        self.list().records.get(index)
    }

    /// Last record.
    fn last(&self) -> Option<&Record> {
        self.list().records.last()
    }

    /// Records in stored order.
    fn records(&self) -> &[Record] {
        &self.list().records
    }

    /// Iterate over records in stored order.
    fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.list().records.iter()
    }

    /// Id index, parallel to [`Collection::records`].
    fn ids(&self) -> &[String] {
        &self.list().ids
    }

    /// True if `id` is indexed.
    fn contains_id(&self, id: &str) -> bool {
        self.list().ids.iter().any(|known| known == id)
    }

    /// Position of the first record with `id`.
    fn position_of(&self, id: &str) -> Option<usize> {
        self.list().ids.iter().position(|known| known == id)
    }

    /// Remove and return the record at `index` together with its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] and leaves the collection
    /// untouched if `index >= len()`.
    fn remove(&mut self, index: usize) -> Result<Record> {
        let list = self.list_mut();
        if index >= list.records.len() {
            return Err(Error::IndexOutOfBounds {
                index,
                len: list.records.len(),
            });
        }
        let id = list.ids.remove(index);
        debug!(collection = %list.name, %id, index, "removing record");
        Ok(list.records.remove(index))
    }

    /// Reverse records and ids in place.
    fn reverse(&mut self) {
        let list = self.list_mut();
        list.records.reverse();
        list.ids.reverse();
    }

    /// Generate an id not yet present in the index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdSpaceExhausted`] when the retry ceiling is hit.
    fn generate_id(&self) -> Result<String> {
        self.list().generate_id_with(&mut rand::thread_rng())
    }

    /// Generate an id not yet present in the index, drawing from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdSpaceExhausted`] when the retry ceiling is hit.
    fn generate_id_with<R: RngCore + ?Sized>(&self, rng: &mut R) -> Result<String>
    where
        Self: Sized,
    {
        self.list().generate_id_with(rng)
    }

    /// Whether `insert`/`append`/`create` validate their input.
    fn enforce_insert_checks(&self) -> bool {
        self.list().enforce_insert_checks
    }

    /// Turn per-insert validation on or off.
    ///
    /// **WARNING**: disabling checks lets malformed or duplicate records in.
    /// It exists so callers can deliberately build invalid datasets (for
    /// example to exercise the cross-check); leave it on otherwise.
    fn set_enforce_insert_checks(&mut self, enforce: bool) {
        self.list_mut().enforce_insert_checks = enforce;
    }

    /// Persist the collection in the JSON list layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] or [`Error::Json`] if writing fails.
    fn write(&self, path: &Path) -> Result<()> {
        self.list().save(path)
    }
}

impl Collection for RecordList {
    fn list(&self) -> &RecordList {
        self
    }

    fn list_mut(&mut self) -> &mut RecordList {
        self
    }
}

impl<'a> IntoIterator for &'a RecordList {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordList {
        RecordList::from_slice(
            br#"[{"id": "AAAAAA", "long": "a"}, {"id": "BBBBBB", "long": "b"}]"#,
            LoadOptions::new().name("sample"),
        )
        .unwrap()
    }

    #[test]
    fn test_load_reads_ids() {
        let list = sample();
        assert_eq!(list.len(), 2);
        assert_eq!(list.ids(), ["AAAAAA", "BBBBBB"]);
        assert_eq!(list.name(), "sample");
    }

    #[test]
    fn test_load_duplicate_ids_is_integrity_error() {
        let err = RecordList::from_slice(
            br#"[{"id": "AAAAAA"}, {"id": "AAAAAA"}]"#,
            LoadOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_load_missing_id_is_format_error() {
        let err = RecordList::from_slice(br#"[{"long": "x"}]"#, LoadOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_base_insert_and_append_not_supported() {
        let mut list = sample();
        let record = list.get(0).cloned().unwrap();

        assert!(matches!(list.insert(0, record.clone()), Err(Error::NotSupported(_))));
        assert!(matches!(list.append(record), Err(Error::NotSupported(_))));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_set_not_supported() {
        let mut list = sample();
        let record = list.get(1).cloned().unwrap();
        let err = list.set(0, record).unwrap_err();
        assert!(err.to_string().contains("setting values not allowed"));
    }

    #[test]
    fn test_remove_keeps_ids_in_step() {
        let mut list = sample();
        let removed = list.remove(0).unwrap();
        assert_eq!(removed["id"], "AAAAAA");
        assert_eq!(list.ids(), ["BBBBBB"]);
    }

    #[test]
    fn test_remove_out_of_bounds() {
        let mut list = sample();
        let err = list.remove(2).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfBounds { index: 2, len: 2 }));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_reverse_keeps_ids_in_step() {
        let mut list = sample();
        list.reverse();
        assert_eq!(list.ids(), ["BBBBBB", "AAAAAA"]);
        assert_eq!(list.get(0).unwrap()["id"], "BBBBBB");
    }

    #[test]
    fn test_iter_is_restartable() {
        let list = sample();
        let first: Vec<_> = list.iter().collect();
        let second: Vec<_> = (&list).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_display_one_record_per_line() {
        let text = sample().to_string();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with(r#"{"id":"AAAAAA""#));
    }
}
