//! Experiment collections
//!
//! Experiment records nest a list of assay results (see [`crate::schema`]).
//! Compared to entity collections:
//!
//! - every record is structurally re-validated on load
//! - inserts run the full result checks
//! - writing is gated on a passed cross-check against antigen and serum
//!   collections

use super::{Collection, LoadOptions, RecordList};
use crate::cross_check::{self, CrossCheckReport, CrossCheckStatus};
use crate::schema::{check_experiment, check_id, is_valid_id};
use crate::{Error, Record, Result};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Collection of experiments with nested results.
#[derive(Debug, Clone)]
pub struct ExperimentCollection {
    list: RecordList,
    status: CrossCheckStatus,
    cross_check_required: bool,
    last_report: Option<CrossCheckReport>,
}

impl ExperimentCollection {
    /// Build from already-decoded records.
    ///
    /// # Errors
    ///
    /// As [`RecordList::from_records`], plus
    /// [`Error::CorruptPersistedState`] if any record fails the structural
    /// checks.
    pub fn from_records(records: Vec<Record>, options: LoadOptions) -> Result<Self> {
        let list = RecordList::from_records(records, options)?;

        for (index, (record, id)) in list.iter().zip(list.ids()).enumerate() {
            check_experiment(record).map_err(|e| Error::CorruptPersistedState {
                index,
                id: id.clone(),
                source: Box::new(e),
            })?;
        }

        Ok(Self {
            list,
            status: CrossCheckStatus::NotRun,
            cross_check_required: true,
            last_report: None,
        })
    }

    /// Decode and build from persisted bytes.
    ///
    /// # Errors
    ///
    /// As [`crate::format::parse`] and [`ExperimentCollection::from_records`].
    pub fn from_slice(bytes: &[u8], options: LoadOptions) -> Result<Self> {
        Self::from_records(crate::format::parse(bytes)?, options)
    }

    /// Read, decode and build from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`ExperimentCollection::from_slice`].
    pub fn load<P: AsRef<Path>>(path: P, options: LoadOptions) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_slice(&bytes, options)
    }

    /// Check a record before insertion: id format, id uniqueness, then
    /// content.
    ///
    /// # Errors
    ///
    /// [`Error::Schema`] or [`Error::DuplicateId`].
    pub fn check_entry(&self, record: &Record) -> Result<()> {
        let id = check_id(record)?;
        self.list.ensure_new_id(id)?;
        check_experiment(record)
    }

    /// Build `{id, name, description, results}` and append it, generating
    /// the id if none is given.
    ///
    /// Returns the id of the new record.
    ///
    /// # Errors
    ///
    /// With insert checks enabled: [`Error::Schema`] for a malformed id or
    /// content, [`Error::DuplicateId`] for a taken id. Id generation may fail
    /// with [`Error::IdSpaceExhausted`].
    pub fn create(
        &mut self,
        name: &str,
        description: &str,
        results: Vec<Value>,
        id: Option<&str>,
    ) -> Result<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self.generate_id()?,
        };

        if self.enforce_insert_checks() && !is_valid_id(&id) {
            return Err(Error::Schema(
                "entry id should be alpha numerical of length 6".to_string(),
            ));
        }

        let mut record = Record::new();
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert("name".to_string(), Value::String(name.to_string()));
        record.insert(
            "description".to_string(),
            Value::String(description.to_string()),
        );
        record.insert("results".to_string(), Value::Array(results));
        self.append(record)?;
        Ok(id)
    }

    /// Cross-check against antigen and serum collections.
    ///
    /// Shorthand for [`cross_check::cross_check`].
    pub fn cross_check<A, S>(&mut self, antigens: &A, sera: &S) -> CrossCheckStatus
    where
        A: Collection + ?Sized,
        S: Collection + ?Sized,
    {
        cross_check::cross_check(self, antigens, sera)
    }

    /// Store a cross-check outcome and return the resulting status.
    pub(crate) fn record_cross_check(&mut self, report: CrossCheckReport) -> CrossCheckStatus {
        self.status = report.status();
        if self.status == CrossCheckStatus::Passed {
            info!(collection = %self.list.name, "cross check of experiment collection successful");
        } else {
            debug!(
                collection = %self.list.name,
                violations = report.violations().len(),
                "cross check of experiment collection failed"
            );
        }
        self.last_report = Some(report);
        self.status
    }

    /// Outcome of the most recent cross-check.
    #[must_use]
    pub const fn cross_check_status(&self) -> CrossCheckStatus {
        self.status
    }

    /// Report of the most recent cross-check, if one ran.
    #[must_use]
    pub const fn last_report(&self) -> Option<&CrossCheckReport> {
        self.last_report.as_ref()
    }

    /// Whether [`Collection::write`] requires a passed cross-check.
    #[must_use]
    pub const fn cross_check_required(&self) -> bool {
        self.cross_check_required
    }

    /// Require (default) or waive a passed cross-check before writing.
    ///
    /// **WARNING**: waiving the gate allows dangling antigen/serum
    /// references to be persisted.
    pub fn set_cross_check_required(&mut self, required: bool) {
        self.cross_check_required = required;
    }

    /// Consume the collection, returning its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.list.into_records()
    }
}

impl Collection for ExperimentCollection {
    fn list(&self) -> &RecordList {
        &self.list
    }

    fn list_mut(&mut self) -> &mut RecordList {
        &mut self.list
    }

    fn kind(&self) -> &'static str {
        "ExperimentCollection"
    }

    /// Insert a record at `index` after the full entry checks.
    ///
    /// A successful insert brings in new references, so the cross-check
    /// status drops back to [`CrossCheckStatus::NotRun`].
    fn insert(&mut self, index: usize, record: Record) -> Result<()> {
        if self.enforce_insert_checks() {
            self.check_entry(&record)?;
        }
        self.list.insert_record(index, record)?;
        self.status = CrossCheckStatus::NotRun;
        Ok(())
    }

    /// Write the collection if the cross-check gate allows it.
    ///
    /// # Errors
    ///
    /// [`Error::CrossCheckIncomplete`] if no cross-check ran since the last
    /// insert, [`Error::CrossCheckFailed`] if it found violations, both only
    /// while [`ExperimentCollection::cross_check_required`] holds. Otherwise
    /// as [`RecordList`]'s write.
    fn write(&self, path: &Path) -> Result<()> {
        if self.cross_check_required {
            match self.status {
                CrossCheckStatus::Passed => {}
                CrossCheckStatus::NotRun => {
                    return Err(Error::CrossCheckIncomplete(self.list.name.clone()))
                }
                CrossCheckStatus::Failed => {
                    return Err(Error::CrossCheckFailed(self.list.name.clone()))
                }
            }
        }
        self.list.save(path)
    }
}

impl fmt::Display for ExperimentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.list, f)
    }
}

impl<'a> IntoIterator for &'a ExperimentCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
