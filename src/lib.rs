//! # Titer-DB: JSON-backed serology record collections
//!
//! Titer-DB keeps three related collections of a serological dataset:
//! antigens, sera and experiments (assay results as antigen × serum titer
//! grids). Each collection is a persisted JSON list of records with unique
//! six-character ids.
//!
//! ## Design Principles
//!
//! - **Validated entry points**: records only enter through checked
//!   `insert`/`append`/`create`; index assignment is refused
//! - **Fail fast**: every check runs before any mutation, so a failed call
//!   leaves the collection untouched
//! - **Gated persistence**: an experiment collection is written only after a
//!   passed cross-check against its antigen and serum collections
//!
//! ## Example Usage
//!
//! ```rust
//! use titer_db::collection::{Collection, EntityCollection, ExperimentCollection, LoadOptions};
//! use titer_db::cross_check::CrossCheckStatus;
//!
//! let antigens = EntityCollection::from_slice(
//!     br#"[{"id": "AAAAAA", "long": "A/Perth/16/2009"}]"#,
//!     LoadOptions::new().name("antigens"),
//! )?;
//! let sera = EntityCollection::from_slice(
//!     br#"[{"id": "BBBBBB", "long": "F1/09 ferret"}]"#,
//!     LoadOptions::new().name("sera"),
//! )?;
//! let mut experiments = ExperimentCollection::from_slice(
//!     br#"[{
//!         "id": "EXP001", "name": "HI panel", "description": "HI assay",
//!         "results": [{
//!             "titers": [["640"]], "antigen_ids": ["AAAAAA"], "serum_ids": ["BBBBBB"],
//!             "assay": "HI", "file": "panel.csv", "conducted_by": "lab"
//!         }]
//!     }]"#,
//!     LoadOptions::new().name("experiments"),
//! )?;
//!
//! assert_eq!(experiments.cross_check(&antigens, &sera), CrossCheckStatus::Passed);
//! # Ok::<(), titer_db::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod collection;
pub mod cross_check;
pub mod error;
pub mod format;
pub mod schema;

pub use collection::{Collection, EntityCollection, ExperimentCollection, LoadOptions, RecordList};
pub use cross_check::{CrossCheckReport, CrossCheckStatus};
pub use error::{Error, Result};

/// One persisted record: a JSON object with a string `id`.
pub type Record = serde_json::Map<String, serde_json::Value>;
