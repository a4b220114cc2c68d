//! Antigen and serum collections
//!
//! Entity records are `{id, long}` where `long` is the full descriptive
//! name (for example an isolate name). Only the id is checked on insert.

use super::{Collection, LoadOptions, RecordList};
use crate::schema::{check_id, is_valid_id};
use crate::{Error, Record, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Collection of antigens or sera.
#[derive(Debug, Clone)]
pub struct EntityCollection {
    list: RecordList,
}

impl EntityCollection {
    /// Build from already-decoded records.
    ///
    /// # Errors
    ///
    /// See [`RecordList::from_records`].
    pub fn from_records(records: Vec<Record>, options: LoadOptions) -> Result<Self> {
        RecordList::from_records(records, options).map(|list| Self { list })
    }

    /// Decode and build from persisted bytes.
    ///
    /// # Errors
    ///
    /// See [`RecordList::from_slice`].
    pub fn from_slice(bytes: &[u8], options: LoadOptions) -> Result<Self> {
        RecordList::from_slice(bytes, options).map(|list| Self { list })
    }

    /// Read, decode and build from a file.
    ///
    /// # Errors
    ///
    /// See [`RecordList::load`].
    pub fn load<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        RecordList::load(path, options).map(|list| Self { list })
    }

    /// Check a record before insertion.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Schema`] if the id is malformed and
    /// [`Error::DuplicateId`] if it is already present.
    pub fn check_entry(&self, record: &Record) -> Result<()> {
        let id = check_id(record)?;
        self.list.ensure_new_id(id)
    }

    /// Build `{id, long}` and append it, generating the id if none is given.
    ///
    /// Returns the id of the new record.
    ///
    /// # Errors
    ///
    /// With insert checks enabled: [`Error::Schema`] for an empty `long` or a
    /// malformed id, [`Error::DuplicateId`] for a taken id. Id generation may
    /// fail with [`Error::IdSpaceExhausted`].
    pub fn create(&mut self, long: &str, id: Option<&str>) -> Result<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.generate_id()?,
        };

        if self.enforce_insert_checks() {
            if long.is_empty() {
                return Err(Error::Schema(
                    "entry long should be a non-empty string".to_string(),
                ));
            }
            if !is_valid_id(&id) {
                return Err(Error::Schema(
                    "entry id should be alpha numerical of length 6".to_string(),
                ));
            }
            self.list.ensure_new_id(&id)?;
        }

        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert("long".to_string(), Value::String(long.to_string()));
        self.append(record)?;
        Ok(id)
    }

    /// Consume the collection, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.list.into_records()
    }
}

impl Collection for EntityCollection {
    fn list(&self) -> &RecordList {
        &self.list
    }

    fn list_mut(&mut self) -> &mut RecordList {
        &mut self.list
    }

    fn kind(&self) -> &'static str {
        "EntityCollection"
    }

    fn insert(&mut self, index: usize, record: Record) -> Result<()> {
        if self.enforce_insert_checks() {
            self.check_entry(&record)?;
        }
        self.list.insert_record(index, record)
    }
}

impl fmt::Display for EntityCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.list, f)
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn antigens() -> EntityCollection {
        EntityCollection::from_slice(
            br#"[
                {"id": "AAAAAA", "long": "A/Perth/16/2009"},
                {"id": "CCCCCC", "long": "A/Victoria/361/2011"}
            ]"#,
            LoadOptions::new().name("antigens"),
        )
        .unwrap()
    }

    #[test]
    fn test_append_duplicate_rejected() {
        let mut antigens = antigens();
        let entry = antigens.get(0).cloned().unwrap();

        let err = antigens.append(entry).unwrap_err();

        assert!(matches!(err, Error::DuplicateId { ref id, index: 0 } if id == "AAAAAA"));
        assert_eq!(antigens.len(), 2);
    }

    #[test]
    fn test_append_with_fresh_id() {
        let mut antigens = antigens();
        let mut entry = antigens.get(0).cloned().unwrap();
        let fresh = antigens
            .generate_id_with(&mut StdRng::seed_from_u64(1))
            .unwrap();
        entry.insert("id".to_string(), Value::String(fresh.clone()));

        antigens.append(entry).unwrap();

        assert_eq!(antigens.len(), 3);
        assert_eq!(antigens.ids().last().unwrap(), &fresh);
    }

    #[test]
    fn test_insert_shifts_later_records() {
        let mut antigens = antigens();
        antigens.create("placeholder", Some("DDDDDD")).unwrap();
        let record = antigens.remove(2).unwrap();

        antigens.insert(1, record).unwrap();

        assert_eq!(antigens.ids(), ["AAAAAA", "DDDDDD", "CCCCCC"]);
    }

    #[test]
    fn test_insert_past_end_rejected() {
        let mut antigens =
            EntityCollection::from_slice(br#"[{"id": "AAAAAA", "long": "a"}]"#, LoadOptions::new())
                .unwrap();
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String("DDDDDD".to_string()));
        record.insert("long".to_string(), Value::String("d".to_string()));

        let err = antigens.insert(5, record).unwrap_err();

        assert!(matches!(err, Error::IndexOutOfBounds { index: 5, len: 1 }));
        assert_eq!(antigens.len(), 1);
        assert_eq!(antigens.ids(), ["AAAAAA"]);
        assert!(!antigens.contains_id("DDDDDD"));
    }

    #[test]
    fn test_load_options_disable_insert_checks() {
        let mut antigens = EntityCollection::from_slice(
            br#"[{"id": "AAAAAA", "long": "a"}]"#,
            LoadOptions::new().enforce_insert_checks(false),
        )
        .unwrap();
        assert!(!antigens.enforce_insert_checks());

        antigens.create("again", Some("AAAAAA")).unwrap();

        assert_eq!(antigens.ids(), ["AAAAAA", "AAAAAA"]);
    }

    #[test]
    fn test_insert_malformed_id() {
        let mut antigens = antigens();
        let mut record = Record::new();
        record.insert("id".to_string(), Value::String("short".to_string()));

        assert!(matches!(antigens.append(record), Err(Error::Schema(_))));
    }

    #[test]
    fn test_create_generates_id() {
        let mut antigens = antigens();
        let id = antigens.create("Some antigen", None).unwrap();

        let last = antigens.last().unwrap();
        assert_eq!(last["id"], Value::String(id));
        assert_eq!(last["long"], "Some antigen");
    }

    #[test]
    fn test_create_rejects_empty_long() {
        let mut antigens = antigens();
        assert!(matches!(antigens.create("", None), Err(Error::Schema(_))));
    }

    #[test]
    fn test_create_rejects_taken_id() {
        let mut antigens = antigens();
        let err = antigens.create("Maybe new antigen?", Some("AAAAAA")).unwrap_err();
        assert!(matches!(err, Error::DuplicateId { index: 0, .. }));
    }

    #[test]
    fn test_disabled_checks_allow_duplicates() {
        let mut antigens = antigens();
        antigens.set_enforce_insert_checks(false);

        antigens.create("Maybe new antigen?", Some("AAAAAA")).unwrap();

        assert_eq!(antigens.len(), 3);
        assert!(antigens.list().validate_invariants().is_err());
    }

    #[test]
    fn test_entity_load_does_not_check_long() {
        let antigens =
            EntityCollection::from_slice(br#"[{"id": "AAAAAA"}]"#, LoadOptions::new()).unwrap();
        assert_eq!(antigens.len(), 1);
    }
}
