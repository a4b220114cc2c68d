//! Referential integrity between experiments and entity collections
//!
//! Every antigen and serum id referenced by an experiment result must occur
//! exactly once in the matching entity collection:
//!
//! - `Missing`: the id does not occur at all
//! - `Duplicate`: the id occurs more than once (the reference is ambiguous)
//!
//! All violations are collected and logged; none of them is an error on its
//! own. The outcome only matters when an experiment collection is written,
//! see [`ExperimentCollection::write`](crate::collection::ExperimentCollection).

use crate::collection::{Collection, ExperimentCollection};
use crate::Record;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Outcome of the most recent cross-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossCheckStatus {
    /// No cross-check since load or since the last insert.
    #[default]
    NotRun,
    /// Last cross-check found no violations.
    Passed,
    /// Last cross-check found at least one violation.
    Failed,
}

/// Which entity collection a reference points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `antigen_ids` against the antigen collection
    Antigen,
    /// `serum_ids` against the serum collection
    Serum,
}

impl Side {
    const fn key(self) -> &'static str {
        match self {
            Self::Antigen => "antigen_ids",
            Self::Serum => "serum_ids",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Antigen => "antigen",
            Self::Serum => "serum",
        })
    }
}

/// How a reference failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// Referenced id absent from the entity collection
    Missing,
    /// Referenced id present more than once in the entity collection
    Duplicate,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::Duplicate => "duplicate",
        })
    }
}

/// One failed reference group: all offending ids of one kind on one side of
/// one result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the experiment owning the result
    pub experiment: String,
    /// Position of the result within the experiment
    pub result: usize,
    /// Entity collection the ids refer to
    pub side: Side,
    /// Kind of failure
    pub kind: ViolationKind,
    /// Offending ids, in result order
    pub ids: Vec<String>,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let problem = match self.kind {
            ViolationKind::Missing => "do not exist in",
            ViolationKind::Duplicate => "appear multiple times in",
        };
        write!(
            f,
            "{} ids {:?} of result {} of experiment {} {problem} the {} collection",
            self.side, self.ids, self.result, self.experiment, self.side
        )
    }
}

/// All violations found by one cross-check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCheckReport {
    violations: Vec<Violation>,
}

impl CrossCheckReport {
    /// True if no violation was found.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations in discovery order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Status this report maps to.
    #[must_use]
    pub fn status(&self) -> CrossCheckStatus {
        if self.passed() {
            CrossCheckStatus::Passed
        } else {
            CrossCheckStatus::Failed
        }
    }
}

fn occurrences(ids: &[String]) -> FxHashMap<&str, usize> {
    let mut counts = FxHashMap::default();
    for id in ids {
        *counts.entry(id.as_str()).or_insert(0) += 1;
    }
    counts
}

fn referenced_ids<'a>(result: &'a Record, side: Side) -> impl Iterator<Item = &'a str> {
    result
        .get(side.key())
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Check every result of `experiments` against the given id indexes.
///
/// Results whose reference lists are malformed contribute no references;
/// their shape is the job of the schema checks.
#[must_use]
pub fn check_references(
    experiments: &[Record],
    antigen_ids: &[String],
    serum_ids: &[String],
) -> CrossCheckReport {
    let antigens = occurrences(antigen_ids);
    let sera = occurrences(serum_ids);
    let mut violations = Vec::new();

    for experiment in experiments {
        let name = experiment.get("name").and_then(Value::as_str).unwrap_or_default();
        let results = experiment.get("results").and_then(Value::as_array);

        for (index, result) in results.into_iter().flatten().enumerate() {
            let Some(result) = result.as_object() else {
                continue;
            };

            for (side, counts) in [(Side::Serum, &sera), (Side::Antigen, &antigens)] {
                let mut missing = Vec::new();
                let mut duplicate = Vec::new();
                for id in referenced_ids(result, side) {
                    match counts.get(id).copied().unwrap_or(0) {
                        0 => missing.push(id.to_string()),
                        1 => {}
                        _ => duplicate.push(id.to_string()),
                    }
                }

                for (kind, ids) in [
                    (ViolationKind::Missing, missing),
                    (ViolationKind::Duplicate, duplicate),
                ] {
                    if ids.is_empty() {
                        continue;
                    }
                    let violation = Violation {
                        experiment: name.to_string(),
                        result: index,
                        side,
                        kind,
                        ids,
                    };
                    warn!(
                        experiment = %violation.experiment,
                        result = violation.result,
                        %side,
                        %kind,
                        ids = ?violation.ids,
                        "{violation}"
                    );
                    violations.push(violation);
                }
            }
        }
    }

    CrossCheckReport { violations }
}

/// Cross-check `experiments` against antigen and serum collections and
/// record the outcome on the experiment collection.
///
/// Re-runnable; the latest run replaces any earlier outcome.
pub fn cross_check<A, S>(
    experiments: &mut ExperimentCollection,
    antigens: &A,
    sera: &S,
) -> CrossCheckStatus
where
    A: Collection + ?Sized,
    S: Collection + ?Sized,
{
    let report = check_references(experiments.records(), antigens.ids(), sera.ids());
    experiments.record_cross_check(report)
}
