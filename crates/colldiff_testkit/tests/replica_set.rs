//! Replica-set wide checks against in-memory nodes.

use colldiff_codec::{Document, Value};
use colldiff_core::{
    CheckConfig, CheckError, CursorError, DiffOptions, Namespace, ReplicaNode, ReplicaSetChecker,
};
use colldiff_testkit::prelude::*;

fn scenario_nodes() -> (MemoryNode, MemoryNode) {
    let scenario = replication_scenario();
    let primary = MemoryNode::new("node0:27017")
        .with_collection("test.coll", scenario.source)
        .with_collection("test.users", sequential_documents(0..10))
        .with_collection("local.startup_log", sequential_documents(0..3));
    let secondary = MemoryNode::new("node1:27017")
        .with_collection("test.coll", scenario.syncing)
        .with_collection("test.users", sequential_documents(0..10))
        .with_collection("local.startup_log", sequential_documents(0..1));
    (primary, secondary)
}

#[test]
fn only_divergent_collections_are_diffed() {
    let (primary, secondary) = scenario_nodes();
    let report = ReplicaSetChecker::default()
        .check(&primary, &[&secondary])
        .unwrap();

    assert_eq!(report.collections_checked, 2);
    assert_eq!(report.mismatches.len(), 1);

    let mismatch = &report.mismatches[0];
    assert_eq!(mismatch.namespace, Namespace::new("test", "coll"));
    assert_eq!(mismatch.secondary, "node1:27017");
    assert_ne!(mismatch.source.hash, mismatch.syncing.hash);
    assert_eq!(mismatch.diff.docs_with_different_contents.len(), 3);
    assert_eq!(
        ids(&mismatch.diff.docs_missing_on_syncing),
        vec![Value::Int32(10), Value::Int32(50)]
    );
}

#[test]
fn excluded_databases_are_configurable() {
    let (primary, secondary) = scenario_nodes();
    let checker = ReplicaSetChecker::new(CheckConfig::new().exclude_database("test"));

    let report = checker.check(&primary, &[&secondary]).unwrap();
    assert!(report.is_consistent());
    assert_eq!(report.collections_checked, 0);
}

#[test]
fn local_is_compared_when_not_excluded() {
    let (primary, secondary) = scenario_nodes();
    let mut config = CheckConfig::new().exclude_database("test");
    config.excluded_databases.retain(|db| db != "local");

    let report = ReplicaSetChecker::new(config)
        .check(&primary, &[&secondary])
        .unwrap();
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(
        report.mismatches[0].namespace,
        Namespace::new("local", "startup_log")
    );
}

#[test]
fn arbiter_is_skipped_and_reported() {
    let (primary, secondary) = scenario_nodes();
    let arbiter = MemoryNode::arbiter("node2:27017");

    let report = ReplicaSetChecker::default()
        .check(&primary, &[&arbiter, &secondary])
        .unwrap();

    assert_eq!(report.nodes_skipped, vec!["node2:27017".to_string()]);
    assert_eq!(report.mismatches.len(), 1);
}

#[test]
fn every_secondary_is_checked() {
    let (primary, secondary) = scenario_nodes();
    let healthy = MemoryNode::new("node2:27017")
        .with_collection("test.coll", replication_scenario().source)
        .with_collection("test.users", sequential_documents(0..10));

    let report = ReplicaSetChecker::default()
        .check(&primary, &[&secondary, &healthy])
        .unwrap();

    let secondaries: Vec<&str> = report
        .mismatches
        .iter()
        .map(|m| m.secondary.as_str())
        .collect();
    assert_eq!(secondaries, vec!["node1:27017"]);
}

#[test]
fn insertion_order_does_not_matter() {
    let mut shuffled = sequential_documents(0..10);
    shuffled.reverse();

    let primary = MemoryNode::new("p").with_collection("test.users", sequential_documents(0..10));
    let secondary = MemoryNode::new("s").with_collection("test.users", shuffled);

    let report = ReplicaSetChecker::default()
        .check(&primary, &[&secondary])
        .unwrap();
    assert!(report.is_consistent());
}

#[test]
fn custom_key_field_is_used_for_diffs() {
    let primary = MemoryNode::new("p").with_collection(
        "test.users",
        vec![Document::new().with("_id", 1).with("email", "a@x")],
    );
    let secondary = MemoryNode::new("s").with_collection(
        "test.users",
        vec![Document::new().with("_id", 1)],
    );
    let config = CheckConfig::new().with_diff(DiffOptions::new().with_key_field("email"));

    let err = ReplicaSetChecker::new(config)
        .check(&primary, &[&secondary])
        .unwrap_err();
    assert!(matches!(err, CheckError::MissingKey { .. }));
}

#[test]
fn cursor_failure_aborts_the_check() {
    let (primary, secondary) = scenario_nodes();
    let secondary =
        secondary.with_failing_cursor("test.users", CursorError::network("connection refused"));

    let err = ReplicaSetChecker::default()
        .check(&primary, &[&secondary])
        .unwrap_err();
    assert!(matches!(err, CheckError::Cursor(CursorError::Network { .. })));
}

#[test]
fn node_names_are_reported() {
    let (primary, secondary) = scenario_nodes();
    assert_eq!(primary.name(), "node0:27017");
    assert!(!secondary.is_arbiter());
}
