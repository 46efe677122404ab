//! Diff command implementation.

use crate::json::{document_to_json, read_documents};
use colldiff_core::{CollectionDiff, DiffEngine, DiffOptions, KeyExtractor, VecCursor};
use serde::Serialize;
use serde_json::Value as Json;
use std::path::Path;
use tracing::info;

/// A differing pair, as reported.
#[derive(Debug, Serialize)]
pub struct PairReport {
    /// Document from the source dump.
    pub source: Json,
    /// Document from the syncing dump.
    pub syncing: Json,
}

/// Diff command result.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    /// Source dump path.
    pub source: String,
    /// Syncing dump path.
    pub syncing: String,
    /// Key field.
    pub key: String,
    /// Pairs sharing a key but differing in content.
    pub different_contents: Vec<PairReport>,
    /// Documents only in the syncing dump.
    pub missing_on_source: Vec<Json>,
    /// Documents only in the source dump.
    pub missing_on_syncing: Vec<Json>,
}

impl DiffReport {
    fn new(source: &Path, syncing: &Path, key: &str, diff: &CollectionDiff) -> Self {
        Self {
            source: source.display().to_string(),
            syncing: syncing.display().to_string(),
            key: key.to_string(),
            different_contents: diff
                .docs_with_different_contents
                .iter()
                .map(|pair| PairReport {
                    source: document_to_json(&pair.source_node),
                    syncing: document_to_json(&pair.syncing_node),
                })
                .collect(),
            missing_on_source: diff
                .docs_missing_on_source
                .iter()
                .map(document_to_json)
                .collect(),
            missing_on_syncing: diff
                .docs_missing_on_syncing
                .iter()
                .map(document_to_json)
                .collect(),
        }
    }

    fn is_empty(&self) -> bool {
        self.different_contents.is_empty()
            && self.missing_on_source.is_empty()
            && self.missing_on_syncing.is_empty()
    }
}

/// Computes the diff between two dump files.
pub fn compute(
    source: &Path,
    syncing: &Path,
    key: &str,
    sort: bool,
) -> Result<CollectionDiff, Box<dyn std::error::Error>> {
    let mut source_docs = read_documents(source)?;
    let mut syncing_docs = read_documents(syncing)?;
    info!(
        source = source_docs.len(),
        syncing = syncing_docs.len(),
        "loaded dumps"
    );

    if sort {
        let keys = KeyExtractor::new(key);
        keys.sort(&mut source_docs);
        keys.sort(&mut syncing_docs);
    }

    let engine = DiffEngine::new(DiffOptions::new().with_key_field(key));
    let diff = engine.diff(VecCursor::new(source_docs), VecCursor::new(syncing_docs))?;
    Ok(diff)
}

/// Runs the diff command.
///
/// Fails if the dumps differ, after printing the report.
pub fn run(
    source: &Path,
    syncing: &Path,
    key: &str,
    sort: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let diff = compute(source, syncing, key, sort)?;
    let report = DiffReport::new(source, syncing, key, &diff);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&diff, &report);
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(format!("collections differ ({} differences)", diff.total_differences()).into())
    }
}

fn print_text_output(diff: &CollectionDiff, report: &DiffReport) {
    println!("Source:  {}", report.source);
    println!("Syncing: {}", report.syncing);
    println!("Key:     {}", report.key);
    println!();

    if diff.is_empty() {
        println!("✓ Collections match");
        return;
    }

    if !diff.docs_with_different_contents.is_empty() {
        println!(
            "Different contents ({}):",
            diff.docs_with_different_contents.len()
        );
        for pair in &diff.docs_with_different_contents {
            println!("  source:  {}", pair.source_node);
            println!("  syncing: {}", pair.syncing_node);
        }
    }

    if !diff.docs_missing_on_source.is_empty() {
        println!("Missing on source ({}):", diff.docs_missing_on_source.len());
        for doc in &diff.docs_missing_on_source {
            println!("  {doc}");
        }
    }

    if !diff.docs_missing_on_syncing.is_empty() {
        println!("Missing on syncing ({}):", diff.docs_missing_on_syncing.len());
        for doc in &diff.docs_missing_on_syncing {
            println!("  {doc}");
        }
    }

    println!();
    println!("✗ {} differences", diff.total_differences());
}
