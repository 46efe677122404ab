//! Test fixtures and in-memory test doubles.
//!
//! Provides the canonical replication scenario, a scripted index catalog,
//! in-memory replica nodes and cursors that fail on demand.

use colldiff_codec::{Document, Value};
use colldiff_core::{
    CatalogError, CatalogResult, CursorError, CursorResult, DocumentCursor, IndexCatalog,
    IndexDescriptor, KeyExtractor, Namespace, ReplicaId, ReplicaNode, VecCursor,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Two copies of one collection after a replication run went slightly wrong.
#[derive(Debug, Clone)]
pub struct ReplicationScenario {
    /// The reference copy, sorted by `_id`.
    pub source: Vec<Document>,
    /// The copy under scrutiny, sorted by `_id`.
    pub syncing: Vec<Document>,
}

impl ReplicationScenario {
    /// Cursor over the source copy.
    pub fn source_cursor(&self) -> VecCursor {
        VecCursor::new(self.source.clone())
    }

    /// Cursor over the syncing copy.
    pub fn syncing_cursor(&self) -> VecCursor {
        VecCursor::new(self.syncing.clone())
    }
}

/// Builds the canonical divergence scenario.
///
/// Source holds `{_id: i, num: i * 2}` for `i` in `0..100`, except that
/// `_id: 2` stores `num` as a 64-bit integer and `_id` 40 and 90 carry an
/// extra field `extra: "yes"`. Syncing holds the plain documents without
/// `_id` 10 and 50, plus `{_id: 30.2, num: -1}` and `{_id: 70.4, num: -2}`.
pub fn replication_scenario() -> ReplicationScenario {
    let plain = |i: i32| Document::new().with("_id", i).with("num", i * 2);

    let source = (0..100)
        .map(|i| match i {
            2 => Document::new().with("_id", i).with("num", i64::from(i * 2)),
            40 | 90 => plain(i).with("extra", "yes"),
            _ => plain(i),
        })
        .collect();

    let mut syncing: Vec<Document> = (0..100)
        .filter(|i| *i != 10 && *i != 50)
        .map(plain)
        .collect();
    syncing.push(Document::new().with("_id", 30.2).with("num", -1));
    syncing.push(Document::new().with("_id", 70.4).with("num", -2));
    KeyExtractor::default().sort(&mut syncing);

    ReplicationScenario { source, syncing }
}

/// Documents `{_id: i, num: i * 2}` for `i` in `range`.
pub fn sequential_documents(range: std::ops::Range<i32>) -> Vec<Document> {
    range
        .map(|i| Document::new().with("_id", i).with("num", i * 2))
        .collect()
}

/// The `_id` values of `documents`, in order.
pub fn ids(documents: &[Document]) -> Vec<Value> {
    documents
        .iter()
        .map(|doc| doc.get("_id").cloned().unwrap_or(Value::Null))
        .collect()
}

/// A cursor that yields some documents and then fails.
pub struct FailingCursor {
    inner: VecCursor,
    error: CursorError,
}

impl FailingCursor {
    /// Yields `documents`, then returns `error` from every call.
    pub fn after(documents: Vec<Document>, error: CursorError) -> Self {
        Self {
            inner: VecCursor::new(documents),
            error,
        }
    }

    /// Fails on the first call.
    pub fn immediately(error: CursorError) -> Self {
        Self::after(Vec::new(), error)
    }
}

impl DocumentCursor for FailingCursor {
    fn has_next(&mut self) -> CursorResult<bool> {
        if self.inner.remaining() == 0 {
            return Err(self.error.clone());
        }
        Ok(true)
    }

    fn next_document(&mut self) -> CursorResult<Document> {
        if self.inner.remaining() == 0 {
            return Err(self.error.clone());
        }
        self.inner.next_document()
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    transient_failures: u32,
    permanent_failure: Option<String>,
    calls: u32,
}

/// In-memory [`IndexCatalog`] with scripted failures.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    indexes: BTreeMap<Namespace, BTreeMap<ReplicaId, Vec<IndexDescriptor>>>,
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the indexes `replica` reports for `namespace`.
    #[must_use]
    pub fn with_indexes(
        mut self,
        namespace: Namespace,
        replica: impl Into<ReplicaId>,
        indexes: Vec<IndexDescriptor>,
    ) -> Self {
        self.indexes
            .entry(namespace)
            .or_default()
            .insert(replica.into(), indexes);
        self
    }

    /// The next `count` index listings fail with an unknown-replica error.
    #[must_use]
    pub fn fail_transiently(self, count: u32) -> Self {
        self.state.lock().transient_failures = count;
        self
    }

    /// Every query fails with a non-transient error.
    #[must_use]
    pub fn fail_permanently(self, message: impl Into<String>) -> Self {
        self.state.lock().permanent_failure = Some(message.into());
        self
    }

    /// Number of index listings served or refused so far.
    pub fn calls(&self) -> u32 {
        self.state.lock().calls
    }
}

impl IndexCatalog for MemoryCatalog {
    fn namespaces(&self) -> CatalogResult<Vec<Namespace>> {
        if let Some(message) = &self.state.lock().permanent_failure {
            return Err(CatalogError::failed(message.clone()));
        }
        Ok(self.indexes.keys().cloned().collect())
    }

    fn list_indexes_grouped_by_replica(
        &self,
        namespace: &Namespace,
    ) -> CatalogResult<BTreeMap<ReplicaId, Vec<IndexDescriptor>>> {
        let mut state = self.state.lock();
        state.calls += 1;

        if let Some(message) = &state.permanent_failure {
            return Err(CatalogError::failed(message.clone()));
        }
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            let replica = self
                .indexes
                .get(namespace)
                .and_then(|grouped| grouped.keys().last())
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            return Err(CatalogError::replica_unknown(replica));
        }

        Ok(self.indexes.get(namespace).cloned().unwrap_or_default())
    }
}

/// In-memory [`ReplicaNode`].
///
/// Cursors are sorted by `_id` when opened, regardless of insertion order.
#[derive(Debug, Clone)]
pub struct MemoryNode {
    name: String,
    arbiter: bool,
    collections: BTreeMap<Namespace, Vec<Document>>,
    failing: BTreeMap<Namespace, CursorError>,
}

impl MemoryNode {
    /// Creates a data-bearing node with no collections.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arbiter: false,
            collections: BTreeMap::new(),
            failing: BTreeMap::new(),
        }
    }

    /// Creates an arbiter.
    pub fn arbiter(name: impl Into<String>) -> Self {
        Self {
            arbiter: true,
            ..Self::new(name)
        }
    }

    /// Adds a collection. `namespace` is `db.coll`.
    ///
    /// # Panics
    ///
    /// Panics if `namespace` does not parse.
    #[must_use]
    pub fn with_collection(mut self, namespace: &str, documents: Vec<Document>) -> Self {
        let namespace = Namespace::parse(namespace).expect("namespace must be db.coll");
        self.collections.insert(namespace, documents);
        self
    }

    /// Opening a cursor on `namespace` fails with `error`.
    ///
    /// # Panics
    ///
    /// Panics if `namespace` does not parse.
    #[must_use]
    pub fn with_failing_cursor(mut self, namespace: &str, error: CursorError) -> Self {
        let namespace = Namespace::parse(namespace).expect("namespace must be db.coll");
        self.failing.insert(namespace, error);
        self
    }
}

impl ReplicaNode for MemoryNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_arbiter(&self) -> bool {
        self.arbiter
    }

    fn list_databases(&self) -> CursorResult<Vec<String>> {
        let mut databases: Vec<String> =
            self.collections.keys().map(|ns| ns.database.clone()).collect();
        databases.dedup();
        Ok(databases)
    }

    fn list_collections(&self, database: &str) -> CursorResult<Vec<String>> {
        Ok(self
            .collections
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect())
    }

    fn open_sorted_cursor(
        &self,
        namespace: &Namespace,
    ) -> CursorResult<Box<dyn DocumentCursor + '_>> {
        if let Some(error) = self.failing.get(namespace) {
            return Ok(Box::new(FailingCursor::immediately(error.clone())));
        }
        let mut documents = self.collections.get(namespace).cloned().unwrap_or_default();
        KeyExtractor::default().sort(&mut documents);
        Ok(Box::new(VecCursor::new(documents)))
    }
}
