//! Structural checks for entity and experiment records
//!
//! ```text
//! Experiment {id, name, description, results}
//!                                    │
//!                                    └──< Result {titers, antigen_ids, serum_ids,
//!                                                 assay, file, conducted_by, ..extras}
//! ```
//!
//! `titers` is an antigen × serum grid of strings: one row per antigen id,
//! one cell per serum id.

use crate::format::kind_of;
use crate::{Error, Record, Result};
use serde_json::Value;

/// Length of every record id
pub const ID_LEN: usize = 6;

/// Non-numeric titer tokens accepted in a titer cell
pub const KNOWN_TITER_SYMBOLS: [char; 6] = ['<', '>', '/', '*', ' ', '?'];

/// Keys every experiment result must carry
pub const REQUIRED_RESULT_KEYS: [&str; 6] =
    ["titers", "antigen_ids", "serum_ids", "assay", "file", "conducted_by"];

/// True if `id` is exactly [`ID_LEN`] alphanumeric characters.
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    id.chars().count() == ID_LEN && id.chars().all(char::is_alphanumeric)
}

/// True if every character of a titer cell is a digit or a known symbol.
///
/// `"1260"`, `"<10"` and `"*"` pass; `"put later"` does not.
#[must_use]
pub fn is_valid_titer(titer: &str) -> bool {
    titer
        .chars()
        .all(|c| c.is_numeric() || KNOWN_TITER_SYMBOLS.contains(&c))
}

/// Read the id of a record, requiring it to be a string.
pub(crate) fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Check that a record carries a well-formed id.
///
/// # Errors
///
/// Returns [`Error::Schema`] if `id` is missing, not a string, or not six
/// alphanumeric characters.
pub fn check_id(record: &Record) -> Result<&str> {
    match record_id(record) {
        Some(id) if is_valid_id(id) => Ok(id),
        _ => Err(Error::Schema(
            "the dictionary should have an id field which is alphanumerical of length 6"
                .to_string(),
        )),
    }
}

fn non_empty_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn string_list<'a>(result: &'a Record, key: &str, context: &str) -> Result<Vec<&'a str>> {
    let err = || Error::Schema(format!("{key} in {context} should be a list of strings"));
    result
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(err)?
        .iter()
        .map(|v| v.as_str().ok_or_else(err))
        .collect()
}

/// Check the content fields of an experiment record.
///
/// Enforces a non-empty `results` list of dictionaries, non-empty `name` and
/// `description`, and for every result the required keys plus the titer grid
/// shape. The first violation is reported with the result position and the
/// experiment name.
///
/// # Errors
///
/// Returns [`Error::Schema`] describing the first violation found.
pub fn check_experiment(record: &Record) -> Result<()> {
    let entry = match (record_id(record), non_empty_str(record, "name")) {
        (Some(id), Some(name)) => format!("experiment entry {id} ({name})"),
        (Some(id), None) => format!("experiment entry {id}"),
        (None, Some(name)) => format!("experiment entry {name}"),
        (None, None) => "experiment entry".to_string(),
    };

    let results = record
        .get("results")
        .and_then(Value::as_array)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| {
            Error::Schema(format!("{entry} should contain a non-empty results field"))
        })?;

    if let Some(bad) = results.iter().find(|r| !r.is_object()) {
        return Err(Error::Schema(format!(
            "all entries in results of {entry} should be a dictionary, found {}",
            kind_of(bad)
        )));
    }

    if non_empty_str(record, "description").is_none() {
        return Err(Error::Schema(format!(
            "{entry} should contain a non-empty description"
        )));
    }

    let name = non_empty_str(record, "name")
        .ok_or_else(|| Error::Schema(format!("{entry} should contain a non-empty name")))?;

    for (index, result) in results.iter().filter_map(Value::as_object).enumerate() {
        check_result(result, &format!("result {index} of experiment {name}"))?;
    }

    Ok(())
}

fn check_result(result: &Record, context: &str) -> Result<()> {
    if let Some(key) = REQUIRED_RESULT_KEYS.iter().find(|k| !result.contains_key(**k)) {
        return Err(Error::Schema(format!("{key} does not exist in {context}")));
    }

    let serum_ids = string_list(result, "serum_ids", context)?;
    let antigen_ids = string_list(result, "antigen_ids", context)?;

    let rows = result
        .get("titers")
        .and_then(Value::as_array)
        .filter(|rows| rows.iter().all(Value::is_array))
        .ok_or_else(|| Error::Schema(format!("titers in {context} should be a list of lists")))?;

    let cells = rows.iter().filter_map(Value::as_array).flatten();
    let mut titers = Vec::new();
    for cell in cells {
        let titer = cell.as_str().ok_or_else(|| {
            Error::Schema(format!("titers in {context} should all be of string format"))
        })?;
        titers.push(titer);
    }

    if rows.len() != antigen_ids.len() {
        return Err(Error::Schema(format!(
            "titers in {context} should have one row per antigen ({} rows, {} antigens)",
            rows.len(),
            antigen_ids.len()
        )));
    }

    if let Some(row) = rows
        .iter()
        .filter_map(Value::as_array)
        .position(|row| row.len() != serum_ids.len())
    {
        return Err(Error::Schema(format!(
            "titer row {row} in {context} should have one value per serum ({} sera)",
            serum_ids.len()
        )));
    }

    if let Some(bad) = titers.iter().find(|t| !is_valid_titer(t)) {
        return Err(Error::Schema(format!(
            "some titers in {context} have unknown format: {bad:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test fixture must be an object"),
        }
    }

    fn experiment(results: Value) -> Record {
        record(json!({
            "id": "EXP001",
            "name": "HI panel",
            "description": "Haemagglutination inhibition",
            "results": results,
        }))
    }

    fn result_with(titers: Value) -> Value {
        json!({
            "antigen_ids": ["AAAAAA"],
            "serum_ids": ["BBBBBB"],
            "date": "now",
            "file": "fake.csv",
            "conducted_by": "lab",
            "assay": "HI",
            "titers": titers,
        })
    }

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("AAAAAA"));
        assert!(is_valid_id("3F9A0C"));
        assert!(!is_valid_id("AAAAA"));
        assert!(!is_valid_id("AAAAAAA"));
        assert!(!is_valid_id("AAA-AA"));
    }

    #[test]
    fn test_valid_titers() {
        assert!(is_valid_titer("1260"));
        assert!(is_valid_titer("<10"));
        assert!(is_valid_titer("*"));
        assert!(is_valid_titer(" "));
        assert!(!is_valid_titer("put later"));
        assert!(!is_valid_titer("12.5"));
    }

    #[test]
    fn test_check_id_missing() {
        let err = check_id(&record(json!({"long": "x"}))).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_check_id_not_string() {
        assert!(check_id(&record(json!({"id": 123_456}))).is_err());
    }

    #[test]
    fn test_experiment_valid() {
        check_experiment(&experiment(json!([result_with(json!([["1260"]]))]))).unwrap();
    }

    #[test]
    fn test_experiment_empty_results() {
        let err = check_experiment(&experiment(json!([]))).unwrap_err();
        assert!(err.to_string().contains("non-empty results"));
    }

    #[test]
    fn test_experiment_results_not_dicts() {
        let err = check_experiment(&experiment(json!(["Stop pestering me"]))).unwrap_err();
        assert!(err.to_string().contains("should be a dictionary"));
    }

    #[test]
    fn test_experiment_missing_result_key() {
        let err = check_experiment(&experiment(json!([{}]))).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("titers does not exist"));
        assert!(msg.contains("result 0 of experiment HI panel"));
    }

    #[test]
    fn test_experiment_missing_name() {
        let mut rec = experiment(json!([result_with(json!([["1260"]]))]));
        rec.insert("name".to_string(), json!(""));
        let err = check_experiment(&rec).unwrap_err();
        assert!(err.to_string().contains("experiment entry EXP001 should contain a non-empty name"));
    }

    #[test]
    fn test_record_level_errors_name_the_entry() {
        let mut rec = experiment(json!([result_with(json!([["1260"]]))]));
        rec.insert("description".to_string(), json!(""));
        let err = check_experiment(&rec).unwrap_err();
        assert!(err.to_string().contains("EXP001 (HI panel)"));

        let err = check_experiment(&experiment(json!(["oops"]))).unwrap_err();
        assert!(err.to_string().contains("results of experiment entry EXP001 (HI panel)"));
    }

    #[test]
    fn test_experiment_unknown_titer() {
        let err =
            check_experiment(&experiment(json!([result_with(json!([["put later"]]))]))).unwrap_err();
        assert!(err.to_string().contains("unknown format"));
    }

    #[test]
    fn test_experiment_row_count_mismatch() {
        let err = check_experiment(&experiment(json!([result_with(json!([["10"], ["20"]]))])))
            .unwrap_err();
        assert!(err.to_string().contains("one row per antigen"));
    }

    #[test]
    fn test_experiment_column_count_mismatch() {
        let err =
            check_experiment(&experiment(json!([result_with(json!([["10", "20"]]))]))).unwrap_err();
        assert!(err.to_string().contains("one value per serum"));
    }

    #[test]
    fn test_experiment_numeric_titer_rejected() {
        let err = check_experiment(&experiment(json!([result_with(json!([[1260]]))]))).unwrap_err();
        assert!(err.to_string().contains("string format"));
    }

    #[test]
    fn test_second_result_position_reported() {
        let results = json!([result_with(json!([["40"]])), {"titers": []}]);
        let err = check_experiment(&experiment(results)).unwrap_err();
        assert!(err.to_string().contains("result 1 of experiment HI panel"));
    }
}
