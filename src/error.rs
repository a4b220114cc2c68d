//! Error types for Titer-DB
//!
//! Every failure names the record, result or field that caused it so the
//! dataset can be fixed by hand.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Titer-DB error types
#[derive(Error, Debug)]
pub enum Error {
    /// Persisted source is not a non-empty JSON array of objects
    #[error("Format error: {0}")]
    Format(String),

    /// Persisted records are not uniquely identified
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Record or result has the wrong shape
    #[error("Schema error: {0}")]
    Schema(String),

    /// Insert-time id collision
    #[error("An entry with id {id} already exists in the collection (entry {index})")]
    DuplicateId {
        /// Conflicting id
        id: String,
        /// Position of the record already holding `id`
        index: usize,
    },

    /// Operation is not available on this collection type
    #[error("Operation not supported: {0}")]
    NotSupported(String),

    /// Id generator could not find a free id
    #[error("Unique id could not be produced after {attempts} attempts, check your inputs")]
    IdSpaceExhausted {
        /// Number of samples drawn before giving up
        attempts: usize,
    },

    /// Experiment collection written before a cross-check ran
    #[error("Cross check for experiment collection {0} not complete")]
    CrossCheckIncomplete(String),

    /// Experiment collection written after a failed cross-check
    #[error("Cross check for experiment collection {0} has failed")]
    CrossCheckFailed(String),

    /// Records already on disk fail structural validation
    #[error("Testing the existing data has failed at entry {index} (id {id}): {source}")]
    CorruptPersistedState {
        /// Position of the failing record
        index: usize,
        /// Id of the failing record
        id: String,
        /// Underlying schema violation
        #[source]
        source: Box<Error>,
    },

    /// Index past the end of the collection
    #[error("Index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Collection length
        len: usize,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode error while writing
    #[error("Format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for format failures, whether raised while reading or writing.
    #[must_use]
    pub const fn is_format(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Json(_))
    }
}
