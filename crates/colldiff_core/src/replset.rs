//! Replica-set wide data consistency check.
//!
//! Every replicated collection is hashed on the primary and on each
//! secondary. Collections whose hashes differ are then diffed document by
//! document, primary as source and secondary as syncing, so the expensive
//! merge only runs where something actually diverged.

use crate::config::CheckConfig;
use crate::cursor::{CursorResult, DocumentCursor};
use crate::diff::{CollectionDiff, DiffEngine, Side};
use crate::error::CheckResult;
use crate::hash::{hash_sorted_collection, CollectionSummary};
use crate::namespace::Namespace;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// A member of a replica set, as seen by the checker.
pub trait ReplicaNode {
    /// Host name or other identity used in reports.
    fn name(&self) -> &str;

    /// Arbiters hold no data and are skipped.
    fn is_arbiter(&self) -> bool {
        false
    }

    /// Names of the databases present on this node.
    fn list_databases(&self) -> CursorResult<Vec<String>>;

    /// Names of the collections in `database` on this node.
    fn list_collections(&self, database: &str) -> CursorResult<Vec<String>>;

    /// A cursor over `namespace` sorted by the key field.
    ///
    /// A collection that does not exist on this node yields an empty cursor.
    fn open_sorted_cursor(
        &self,
        namespace: &Namespace,
    ) -> CursorResult<Box<dyn DocumentCursor + '_>>;
}

/// One collection that diverged between the primary and a secondary.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionMismatch {
    /// The collection.
    pub namespace: Namespace,
    /// Name of the secondary compared against the primary.
    pub secondary: String,
    /// Hash and count on the primary.
    pub source: CollectionSummary,
    /// Hash and count on the secondary.
    pub syncing: CollectionSummary,
    /// Document-level divergence.
    pub diff: CollectionDiff,
}

/// Outcome of a replica-set check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplicaSetReport {
    /// Collections that diverged, in namespace then secondary order.
    pub mismatches: Vec<CollectionMismatch>,
    /// Number of namespaces compared.
    pub collections_checked: usize,
    /// Nodes not compared (arbiters).
    pub nodes_skipped: Vec<String>,
}

impl ReplicaSetReport {
    /// Returns true if every secondary matched the primary.
    pub fn is_consistent(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Compares every data-bearing secondary against the primary.
#[derive(Debug, Clone, Default)]
pub struct ReplicaSetChecker {
    config: CheckConfig,
    engine: DiffEngine,
}

impl ReplicaSetChecker {
    /// Creates a checker.
    pub fn new(config: CheckConfig) -> Self {
        let engine = DiffEngine::new(config.diff.clone());
        Self { config, engine }
    }

    /// The active configuration.
    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Run the check.
    ///
    /// Databases and collections are the union over all data-bearing nodes,
    /// minus the configured exclusions, so a collection present on only one
    /// side still shows up (as documents missing on the other).
    ///
    /// # Errors
    ///
    /// Any cursor failure or precondition violation aborts the whole check.
    pub fn check(
        &self,
        primary: &dyn ReplicaNode,
        secondaries: &[&dyn ReplicaNode],
    ) -> CheckResult<ReplicaSetReport> {
        let mut report = ReplicaSetReport::default();

        let mut data_bearing: Vec<&dyn ReplicaNode> = Vec::with_capacity(secondaries.len());
        for node in secondaries {
            if node.is_arbiter() {
                debug!(node = node.name(), "skipping arbiter");
                report.nodes_skipped.push(node.name().to_string());
            } else {
                data_bearing.push(*node);
            }
        }

        let all_nodes: Vec<&dyn ReplicaNode> = std::iter::once(primary)
            .chain(data_bearing.iter().copied())
            .collect();

        let mut databases = BTreeSet::new();
        for node in &all_nodes {
            databases.extend(node.list_databases()?);
        }
        databases.retain(|db| !self.config.is_excluded(db));

        for database in &databases {
            let mut collections = BTreeSet::new();
            for node in &all_nodes {
                collections.extend(node.list_collections(database)?);
            }
            info!(
                database = %database,
                collections = collections.len(),
                "checking database"
            );

            for collection in collections {
                let namespace = Namespace::new(database.as_str(), collection);
                self.check_namespace(&namespace, primary, &data_bearing, &mut report)?;
                report.collections_checked += 1;
            }
        }

        if report.is_consistent() {
            info!(
                collections = report.collections_checked,
                secondaries = data_bearing.len(),
                "replica set consistent"
            );
        }

        Ok(report)
    }

    fn check_namespace(
        &self,
        namespace: &Namespace,
        primary: &dyn ReplicaNode,
        secondaries: &[&dyn ReplicaNode],
        report: &mut ReplicaSetReport,
    ) -> CheckResult<()> {
        let keys = self.engine.keys();
        let source = hash_sorted_collection(
            primary.open_sorted_cursor(namespace)?,
            keys,
            Side::Source,
        )?;

        for secondary in secondaries {
            let syncing = hash_sorted_collection(
                secondary.open_sorted_cursor(namespace)?,
                keys,
                Side::Syncing,
            )?;
            if source.hash == syncing.hash {
                continue;
            }

            let diff = self.engine.diff(
                primary.open_sorted_cursor(namespace)?,
                secondary.open_sorted_cursor(namespace)?,
            )?;

            warn!(
                %namespace,
                primary = primary.name(),
                secondary = secondary.name(),
                source_hash = %source.hash,
                syncing_hash = %syncing.hash,
                different = diff.docs_with_different_contents.len(),
                missing_on_source = diff.docs_missing_on_source.len(),
                missing_on_syncing = diff.docs_missing_on_syncing.len(),
                "collection hash mismatch"
            );

            report.mismatches.push(CollectionMismatch {
                namespace: namespace.clone(),
                secondary: secondary.name().to_string(),
                source,
                syncing,
                diff,
            });
        }

        Ok(())
    }
}
