//! Hash command implementation.

use crate::json::read_documents;
use colldiff_core::{hash_collection, CollectionSummary, KeyExtractor, VecCursor};
use serde::Serialize;
use std::path::Path;

/// Hash command result.
#[derive(Debug, Serialize)]
pub struct HashResult {
    /// Dump path.
    pub path: String,
    /// Hex SHA-256 over the encoded documents.
    pub hash: String,
    /// Number of documents.
    pub count: u64,
}

/// Hashes a dump file, optionally sorting it by `key` first.
pub fn compute(
    input: &Path,
    key: &str,
    sort: bool,
) -> Result<CollectionSummary, Box<dyn std::error::Error>> {
    let mut documents = read_documents(input)?;
    if sort {
        KeyExtractor::new(key).sort(&mut documents);
    }
    Ok(hash_collection(VecCursor::new(documents))?)
}

/// Runs the hash command.
pub fn run(
    input: &Path,
    key: &str,
    sort: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let summary = compute(input, key, sort)?;
    let result = HashResult {
        path: input.display().to_string(),
        hash: summary.hash.to_hex(),
        count: summary.count,
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => println!("{}  {} ({} documents)", result.hash, result.path, result.count),
    }

    Ok(())
}
