//! Dataset Walkthrough
//!
//! Loads a small antigen / serum / experiment dataset, exercises the insert
//! checks, and shows how the cross-check gates writing experiments.
//!
//! Run with: RUST_LOG=info cargo run --example walkthrough

use anyhow::{Context, Result};
use serde_json::{json, Value};
use titer_db::collection::{Collection, EntityCollection, ExperimentCollection, LoadOptions};

const ANTIGENS: &str = r#"[{"id": "H3N2A1", "long": "A/Perth/16/2009"}]"#;
const SERA: &str = r#"[{"id": "FERR01", "long": "F12/14 ferret antiserum"}]"#;
const EXPERIMENTS: &str = r#"[{
    "id": "EXP001",
    "name": "HI panel 2014",
    "description": "Haemagglutination inhibition",
    "results": [{
        "titers": [["1280"]],
        "antigen_ids": ["H3N2A1"],
        "serum_ids": ["FERR01"],
        "assay": "HI",
        "file": "panel2014.csv",
        "conducted_by": "lab",
        "date": "2014-11-02"
    }]
}]"#;

fn fake_result() -> Vec<Value> {
    vec![json!({
        "antigen_ids": ["AAAAAA"],
        "serum_ids": ["BBBBBB"],
        "date": "now",
        "file": "fake.csv",
        "conducted_by": "lab",
        "assay": "HI",
        "titers": [["1260"]],
    })]
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    println!("=== Titer-DB Dataset Walkthrough ===\n");

    let dir = tempfile::tempdir().context("creating scratch directory")?;
    let out = dir.path().join("results.json");

    let mut antigens = EntityCollection::from_slice(ANTIGENS.as_bytes(), LoadOptions::new().name("antigens"))?;
    let mut sera = EntityCollection::from_slice(SERA.as_bytes(), LoadOptions::new().name("sera"))?;
    let mut experiments = ExperimentCollection::from_slice(
        EXPERIMENTS.as_bytes(),
        LoadOptions::new().name("test experiment list"),
    )?;

    // -------------------------------------------------------------------------
    // 1. Insert checks
    // -------------------------------------------------------------------------
    println!("1. Appending a copy of an existing experiment...");
    let mut entry = experiments.get(0).cloned().context("dataset is empty")?;
    if let Err(e) = experiments.append(entry.clone()) {
        println!("   Rejected: {e}");
    }
    entry.insert("id".to_string(), Value::String(experiments.generate_id()?));
    experiments.append(entry)?;
    println!("   With a fresh id: {} experiments\n", experiments.len());

    println!("2. Creating entries with bad results...");
    for results in [vec![], vec![json!("Stop pestering me")], vec![json!({})]] {
        if let Err(e) = experiments.create("New entry", "created to fail", results, None) {
            println!("   Rejected: {e}");
        }
    }
    println!();

    // -------------------------------------------------------------------------
    // 2. Cross-check gate
    // -------------------------------------------------------------------------
    println!("3. Writing before a cross-check...");
    if let Err(e) = experiments.write(&out) {
        println!("   Refused: {e}");
    }

    let status = experiments.cross_check(&antigens, &sera);
    println!("   Cross-check: {status:?}");
    experiments.write(&out)?;
    println!("   Written to {}\n", out.display());

    println!("4. Adding a result with unknown antigen and serum...");
    experiments.create("New result", "Some fake new result", fake_result(), None)?;
    let status = experiments.cross_check(&antigens, &sera);
    println!("   Cross-check: {status:?}");
    if let Err(e) = experiments.write(&out) {
        println!("   Refused: {e}");
    }

    antigens.create("Antigen1", Some("AAAAAA"))?;
    sera.create("Serum1", Some("BBBBBB"))?;
    let status = experiments.cross_check(&antigens, &sera);
    println!("   After adding them: {status:?}\n");
    experiments.write(&out)?;

    println!("5. Duplicating an antigen with checks disabled...");
    antigens.set_enforce_insert_checks(false);
    antigens.create("Maybe new antigen?", Some("AAAAAA"))?;
    let status = experiments.cross_check(&antigens, &sera);
    println!("   Cross-check: {status:?}");
    if let Some(report) = experiments.last_report() {
        for violation in report.violations() {
            println!("   - {violation}");
        }
    }

    let last = antigens.len() - 1;
    antigens.remove(last)?;
    let status = experiments.cross_check(&antigens, &sera);
    println!("   After removing the duplicate: {status:?}");

    println!("\n=== Done ===");
    Ok(())
}
