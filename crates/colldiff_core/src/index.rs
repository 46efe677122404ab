//! Cross-replica index consistency checks.
//!
//! Index lists per namespace are small (tens of entries), so unlike the
//! collection diff this is a direct set comparison over the descriptors
//! grouped by replica: a descriptor is inconsistent when a structurally
//! identical descriptor is not present on every replica.

use crate::config::RetryConfig;
use crate::error::{CheckError, CheckResult};
use crate::namespace::Namespace;
use colldiff_codec::{Document, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for catalog queries.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors returned by an [`IndexCatalog`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A replica was not known to the catalog at query time. Membership
    /// changes during long checks, so this is worth re-querying.
    #[error("replica {replica} is not currently known")]
    ReplicaUnknown {
        /// Identity of the unknown replica.
        replica: String,
    },

    /// Any other catalog failure.
    #[error("catalog query failed: {message}")]
    Failed {
        /// Error message.
        message: String,
    },
}

impl CatalogError {
    /// Creates a replica-unknown error.
    pub fn replica_unknown(replica: impl Into<String>) -> Self {
        Self::ReplicaUnknown {
            replica: replica.into(),
        }
    }

    /// Creates a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Returns true if the query may succeed when re-issued.
    pub fn is_transient(&self) -> bool {
        matches!(self, CatalogError::ReplicaUnknown { .. })
    }
}

/// Identity of a replica (a shard or replica-set member).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Creates a replica identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// An index as reported by one replica.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescriptor {
    /// Index name.
    pub name: String,
    /// Key pattern, e.g. `{ a: 1, b: -1 }`.
    pub key: Document,
    /// Every other option (`unique`, `sparse`, `expireAfterSeconds`, ...),
    /// in reported order.
    pub options: Document,
}

impl IndexDescriptor {
    /// Creates a descriptor without options.
    pub fn new(name: impl Into<String>, key: Document) -> Self {
        Self {
            name: name.into(),
            key,
            options: Document::new(),
        }
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: Document) -> Self {
        self.options = options;
        self
    }

    /// Builds a descriptor from an index spec document such as those returned
    /// by `listIndexes`: `name` and `key` are extracted and every other field
    /// becomes an option.
    ///
    /// Returns `None` if `name` is not text or `key` is not a document.
    pub fn from_spec(spec: &Document) -> Option<Self> {
        let name = spec.get("name")?.as_text()?.to_string();
        let key = spec.get("key")?.as_document()?.clone();
        let options = spec
            .iter()
            .filter(|(field, _)| *field != "name" && *field != "key")
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect::<Vec<_>>();
        Some(Self {
            name,
            key,
            options: Document::from_fields(options),
        })
    }

    /// Renders the descriptor back into a spec document.
    pub fn to_spec(&self) -> Document {
        let mut fields = vec![
            ("key".to_string(), Value::Document(self.key.clone())),
            ("name".to_string(), Value::Text(self.name.clone())),
        ];
        fields.extend(self.options.fields().iter().cloned());
        Document::from_fields(fields)
    }

    /// Exact equality of name, key pattern and options.
    pub fn structurally_eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.key.structurally_eq(&other.key)
            && self.options.structurally_eq(&other.options)
    }
}

/// Source of per-replica index lists.
pub trait IndexCatalog {
    /// Namespaces to check.
    fn namespaces(&self) -> CatalogResult<Vec<Namespace>>;

    /// Index descriptors for `namespace`, grouped by the replica that
    /// reported them.
    fn list_indexes_grouped_by_replica(
        &self,
        namespace: &Namespace,
    ) -> CatalogResult<BTreeMap<ReplicaId, Vec<IndexDescriptor>>>;
}

/// Index inconsistencies found in one namespace.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceIndexReport {
    /// The namespace checked.
    pub namespace: Namespace,
    /// Per replica, the descriptors that are not present identically on
    /// every other replica. Replicas with none are omitted.
    pub inconsistent: BTreeMap<ReplicaId, Vec<IndexDescriptor>>,
}

impl NamespaceIndexReport {
    /// Returns true if every replica reported the same indexes.
    pub fn is_consistent(&self) -> bool {
        self.inconsistent.is_empty()
    }

    /// Names of all inconsistent indexes, across replicas.
    pub fn inconsistent_index_names(&self) -> BTreeSet<&str> {
        self.inconsistent
            .values()
            .flatten()
            .map(|index| index.name.as_str())
            .collect()
    }
}

/// Compares index descriptors across replicas.
#[derive(Debug, Clone, Default)]
pub struct IndexConsistencyChecker {
    retry: RetryConfig,
}

impl IndexConsistencyChecker {
    /// Creates a checker with the given retry policy.
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// Check a single namespace.
    ///
    /// # Errors
    ///
    /// [`CheckError::RetriesExhausted`] if the catalog keeps reporting an
    /// unknown replica, [`CheckError::Catalog`] for any other catalog error.
    pub fn check_namespace<C>(
        &self,
        catalog: &C,
        namespace: &Namespace,
    ) -> CheckResult<NamespaceIndexReport>
    where
        C: IndexCatalog + ?Sized,
    {
        let grouped = self.with_retry(
            || format!("listing indexes of {namespace}"),
            || catalog.list_indexes_grouped_by_replica(namespace),
        )?;

        let inconsistent = find_inconsistent(&grouped);
        debug!(
            %namespace,
            replicas = grouped.len(),
            inconsistent_replicas = inconsistent.len(),
            "checked index consistency"
        );

        Ok(NamespaceIndexReport {
            namespace: namespace.clone(),
            inconsistent,
        })
    }

    /// Check every namespace the catalog knows, returning reports for the
    /// inconsistent ones only.
    pub fn check_all<C>(&self, catalog: &C) -> CheckResult<Vec<NamespaceIndexReport>>
    where
        C: IndexCatalog + ?Sized,
    {
        let namespaces =
            self.with_retry(|| "listing namespaces".to_string(), || catalog.namespaces())?;

        let mut reports = Vec::new();
        for namespace in &namespaces {
            let report = self.check_namespace(catalog, namespace)?;
            if !report.is_consistent() {
                warn!(
                    %namespace,
                    indexes = ?report.inconsistent_index_names(),
                    "inconsistent indexes"
                );
                reports.push(report);
            }
        }
        Ok(reports)
    }

    fn with_retry<T>(
        &self,
        describe: impl Fn() -> String,
        mut query: impl FnMut() -> CatalogResult<T>,
    ) -> CheckResult<T> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            let delay = self.retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            attempt += 1;

            match query() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        operation = %describe(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "transient catalog error, retrying"
                    );
                }
                Err(e) if e.is_transient() => {
                    return Err(CheckError::RetriesExhausted {
                        operation: describe(),
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => return Err(CheckError::Catalog(e)),
            }
        }
    }
}

fn find_inconsistent(
    grouped: &BTreeMap<ReplicaId, Vec<IndexDescriptor>>,
) -> BTreeMap<ReplicaId, Vec<IndexDescriptor>> {
    let mut inconsistent = BTreeMap::new();

    for (replica, indexes) in grouped {
        let flagged: Vec<IndexDescriptor> = indexes
            .iter()
            .filter(|index| {
                !grouped
                    .iter()
                    .filter(|(other, _)| *other != replica)
                    .all(|(_, theirs)| theirs.iter().any(|t| t.structurally_eq(index)))
            })
            .cloned()
            .collect();

        if !flagged.is_empty() {
            inconsistent.insert(replica.clone(), flagged);
        }
    }

    inconsistent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn id_index() -> IndexDescriptor {
        IndexDescriptor::new("_id_", Document::new().with("_id", 1))
    }

    fn a_index() -> IndexDescriptor {
        IndexDescriptor::new("a_1", Document::new().with("a", 1))
    }

    fn grouped(
        entries: Vec<(&str, Vec<IndexDescriptor>)>,
    ) -> BTreeMap<ReplicaId, Vec<IndexDescriptor>> {
        entries
            .into_iter()
            .map(|(id, indexes)| (ReplicaId::from(id), indexes))
            .collect()
    }

    /// Catalog that fails transiently a fixed number of times.
    struct FlakyCatalog {
        failures_left: Cell<u32>,
        calls: Cell<u32>,
        indexes: BTreeMap<ReplicaId, Vec<IndexDescriptor>>,
    }

    impl FlakyCatalog {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: Cell::new(failures),
                calls: Cell::new(0),
                indexes: grouped(vec![
                    ("shard0", vec![id_index(), a_index()]),
                    ("shard1", vec![id_index()]),
                ]),
            }
        }
    }

    impl IndexCatalog for FlakyCatalog {
        fn namespaces(&self) -> CatalogResult<Vec<Namespace>> {
            Ok(vec![Namespace::new("test", "coll")])
        }

        fn list_indexes_grouped_by_replica(
            &self,
            _namespace: &Namespace,
        ) -> CatalogResult<BTreeMap<ReplicaId, Vec<IndexDescriptor>>> {
            self.calls.set(self.calls.get() + 1);
            if self.failures_left.get() > 0 {
                self.failures_left.set(self.failures_left.get() - 1);
                return Err(CatalogError::replica_unknown("shard1"));
            }
            Ok(self.indexes.clone())
        }
    }

    #[test]
    fn identical_indexes_are_consistent() {
        let result = find_inconsistent(&grouped(vec![
            ("shard0", vec![id_index(), a_index()]),
            ("shard1", vec![a_index(), id_index()]),
        ]));
        assert!(result.is_empty());
    }

    #[test]
    fn missing_index_is_reported_on_the_replica_that_has_it() {
        let result = find_inconsistent(&grouped(vec![
            ("shard0", vec![id_index(), a_index()]),
            ("shard1", vec![id_index()]),
        ]));

        assert_eq!(result.len(), 1);
        assert_eq!(result[&ReplicaId::from("shard0")], vec![a_index()]);
    }

    #[test]
    fn differing_options_are_reported_on_both_replicas() {
        let unique = a_index().with_options(Document::new().with("unique", true));
        let result = find_inconsistent(&grouped(vec![
            ("shard0", vec![id_index(), a_index()]),
            ("shard1", vec![id_index(), unique.clone()]),
        ]));

        assert_eq!(result[&ReplicaId::from("shard0")], vec![a_index()]);
        assert_eq!(result[&ReplicaId::from("shard1")], vec![unique]);
    }

    #[test]
    fn differing_key_pattern_is_inconsistent() {
        let descending = IndexDescriptor::new("a_1", Document::new().with("a", -1));
        let result = find_inconsistent(&grouped(vec![
            ("shard0", vec![a_index()]),
            ("shard1", vec![descending]),
        ]));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn replica_without_indexes_flags_everything_elsewhere() {
        let result = find_inconsistent(&grouped(vec![
            ("shard0", vec![id_index()]),
            ("shard1", vec![]),
            ("shard2", vec![id_index()]),
        ]));
        assert_eq!(result.len(), 2);
        assert!(!result.contains_key(&ReplicaId::from("shard1")));
    }

    #[test]
    fn transient_errors_are_retried() {
        let catalog = FlakyCatalog::new(2);
        let checker = IndexConsistencyChecker::new(RetryConfig::new(3));

        let report = checker
            .check_namespace(&catalog, &Namespace::new("test", "coll"))
            .unwrap();

        assert_eq!(catalog.calls.get(), 3);
        assert!(!report.is_consistent());
        assert_eq!(
            report.inconsistent_index_names().into_iter().collect::<Vec<_>>(),
            vec!["a_1"]
        );
    }

    #[test]
    fn retries_are_bounded() {
        let catalog = FlakyCatalog::new(10);
        let checker = IndexConsistencyChecker::new(RetryConfig::new(3));

        let err = checker
            .check_namespace(&catalog, &Namespace::new("test", "coll"))
            .unwrap_err();

        assert_eq!(catalog.calls.get(), 3);
        match err {
            CheckError::RetriesExhausted { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(last.is_transient());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_transient_errors_are_not_retried() {
        struct BrokenCatalog {
            calls: Cell<u32>,
        }

        impl IndexCatalog for BrokenCatalog {
            fn namespaces(&self) -> CatalogResult<Vec<Namespace>> {
                Err(CatalogError::failed("unauthorized"))
            }

            fn list_indexes_grouped_by_replica(
                &self,
                _namespace: &Namespace,
            ) -> CatalogResult<BTreeMap<ReplicaId, Vec<IndexDescriptor>>> {
                self.calls.set(self.calls.get() + 1);
                Err(CatalogError::failed("unauthorized"))
            }
        }

        let catalog = BrokenCatalog {
            calls: Cell::new(0),
        };
        let checker = IndexConsistencyChecker::default();

        let err = checker
            .check_namespace(&catalog, &Namespace::new("test", "coll"))
            .unwrap_err();
        assert!(matches!(err, CheckError::Catalog(_)));
        assert_eq!(catalog.calls.get(), 1);

        assert!(matches!(
            checker.check_all(&catalog),
            Err(CheckError::Catalog(_))
        ));
    }

    #[test]
    fn check_all_returns_only_inconsistent_namespaces() {
        let catalog = FlakyCatalog::new(0);
        let reports = IndexConsistencyChecker::default().check_all(&catalog).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].namespace, Namespace::new("test", "coll"));
    }

    #[test]
    fn spec_round_trip_keeps_options() {
        let spec = Document::new()
            .with("v", 2)
            .with("key", Document::new().with("ttl", 1))
            .with("name", "ttl_1")
            .with("expireAfterSeconds", 3600);

        let descriptor = IndexDescriptor::from_spec(&spec).unwrap();
        assert_eq!(descriptor.name, "ttl_1");
        assert_eq!(
            descriptor.options.keys().collect::<Vec<_>>(),
            vec!["v", "expireAfterSeconds"]
        );

        let back = IndexDescriptor::from_spec(&descriptor.to_spec()).unwrap();
        assert!(back.structurally_eq(&descriptor));
    }

    #[test]
    fn spec_without_name_is_rejected() {
        let spec = Document::new().with("key", Document::new().with("a", 1));
        assert!(IndexDescriptor::from_spec(&spec).is_none());
    }
}
