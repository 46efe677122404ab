//! Check-indexes command implementation.
//!
//! Reads a catalog dump of the form
//!
//! ```json
//! {
//!   "shop.orders": {
//!     "shard0": [{"key": {"_id": 1}, "name": "_id_"}],
//!     "shard1": [{"key": {"_id": 1}, "name": "_id_"}]
//!   }
//! }
//! ```
//!
//! and reports the indexes that are not identical on every replica.

use crate::json::{document_from_json, document_to_json, JsonError};
use colldiff_core::{
    CatalogError, CatalogResult, IndexCatalog, IndexConsistencyChecker, IndexDescriptor,
    Namespace, NamespaceIndexReport, ReplicaId, RetryConfig,
};
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Index catalog loaded from a dump file.
#[derive(Debug, Default)]
pub struct FileCatalog {
    namespaces: BTreeMap<Namespace, BTreeMap<ReplicaId, Vec<IndexDescriptor>>>,
}

impl FileCatalog {
    /// Loads a catalog dump.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        Self::parse(&text)
    }

    /// Parses a catalog dump.
    pub fn parse(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let json: Json = serde_json::from_str(text).map_err(JsonError::from)?;
        let root = json.as_object().ok_or("catalog dump must be an object")?;

        let mut catalog = Self::default();
        for (full_name, replicas) in root {
            let namespace = Namespace::parse(full_name)
                .ok_or_else(|| format!("invalid namespace {full_name:?}"))?;
            let replicas = replicas
                .as_object()
                .ok_or_else(|| format!("{full_name}: expected replicas object"))?;

            let mut grouped = BTreeMap::new();
            for (replica, specs) in replicas {
                let specs = specs
                    .as_array()
                    .ok_or_else(|| format!("{full_name}/{replica}: expected index array"))?;
                let mut indexes = Vec::with_capacity(specs.len());
                for spec in specs {
                    let spec = document_from_json(spec)?;
                    let index = IndexDescriptor::from_spec(&spec).ok_or_else(|| {
                        format!("{full_name}/{replica}: index spec needs name and key: {spec}")
                    })?;
                    indexes.push(index);
                }
                grouped.insert(ReplicaId::from(replica.as_str()), indexes);
            }
            catalog.namespaces.insert(namespace, grouped);
        }
        Ok(catalog)
    }
}

impl IndexCatalog for FileCatalog {
    fn namespaces(&self) -> CatalogResult<Vec<Namespace>> {
        Ok(self.namespaces.keys().cloned().collect())
    }

    fn list_indexes_grouped_by_replica(
        &self,
        namespace: &Namespace,
    ) -> CatalogResult<BTreeMap<ReplicaId, Vec<IndexDescriptor>>> {
        self.namespaces
            .get(namespace)
            .cloned()
            .ok_or_else(|| CatalogError::failed(format!("namespace {namespace} not in dump")))
    }
}

/// Inconsistent indexes of one namespace, as reported.
#[derive(Debug, Serialize)]
pub struct NamespaceReport {
    /// Namespace.
    pub namespace: String,
    /// Per replica, the index specs not present identically elsewhere.
    pub inconsistent: BTreeMap<String, Vec<Json>>,
}

impl From<&NamespaceIndexReport> for NamespaceReport {
    fn from(report: &NamespaceIndexReport) -> Self {
        Self {
            namespace: report.namespace.to_string(),
            inconsistent: report
                .inconsistent
                .iter()
                .map(|(replica, indexes)| {
                    let specs = indexes
                        .iter()
                        .map(|index| document_to_json(&index.to_spec()))
                        .collect();
                    (replica.to_string(), specs)
                })
                .collect(),
        }
    }
}

/// Runs the check-indexes command.
///
/// Fails if any namespace is inconsistent, after printing the report.
pub fn run(catalog: &Path, retries: u32, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = FileCatalog::load(catalog)?;
    let checker = IndexConsistencyChecker::new(RetryConfig::new(retries));
    let reports = checker.check_all(&catalog)?;
    let rendered: Vec<NamespaceReport> = reports.iter().map(NamespaceReport::from).collect();

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        _ => {
            print_text_output(&reports);
        }
    }

    if reports.is_empty() {
        Ok(())
    } else {
        Err(format!("{} namespaces have inconsistent indexes", reports.len()).into())
    }
}

fn print_text_output(reports: &[NamespaceIndexReport]) {
    if reports.is_empty() {
        println!("✓ Indexes consistent across replicas");
        return;
    }

    for report in reports {
        println!("{}:", report.namespace);
        for (replica, indexes) in &report.inconsistent {
            for index in indexes {
                println!("  {replica}: {}", index.to_spec());
            }
        }
    }
    println!();
    println!("✗ {} inconsistent namespaces", reports.len());
}
