//! The canonical replication divergence scenario, end to end.

use colldiff_codec::{to_bytes, Document, Value};
use colldiff_core::{
    diff_collections, hash_collection, CheckError, CursorError, DiffEngine, DiffOptions,
    IterCursor, VecCursor,
};
use colldiff_testkit::prelude::*;

/// Ids 10 and 50 exist only on the source, so the merge files them under
/// missing-on-syncing; the opposite labelling arises with roles exchanged.
#[test]
fn scenario_diff_classifies_every_divergence() {
    let scenario = replication_scenario();
    let diff = diff_collections(scenario.source_cursor(), scenario.syncing_cursor()).unwrap();

    let differing: Vec<Value> = diff
        .docs_with_different_contents
        .iter()
        .map(|pair| pair.source_node.get("_id").cloned().unwrap())
        .collect();
    assert_eq!(
        differing,
        vec![Value::Int32(2), Value::Int32(40), Value::Int32(90)]
    );

    assert_eq!(
        ids(&diff.docs_missing_on_syncing),
        vec![Value::Int32(10), Value::Int32(50)]
    );
    assert_eq!(
        ids(&diff.docs_missing_on_source),
        vec![Value::Double(30.2), Value::Double(70.4)]
    );
    assert_eq!(diff.total_differences(), 7);
}

#[test]
fn scenario_with_roles_exchanged() {
    // Reading the modified copy as the source flips both missing lists.
    let scenario = replication_scenario();
    let diff = diff_collections(scenario.syncing_cursor(), scenario.source_cursor()).unwrap();

    assert_eq!(
        ids(&diff.docs_missing_on_source),
        vec![Value::Int32(10), Value::Int32(50)]
    );
    assert_eq!(
        ids(&diff.docs_missing_on_syncing),
        vec![Value::Double(30.2), Value::Double(70.4)]
    );
    assert_eq!(diff.docs_with_different_contents.len(), 3);
}

#[test]
fn scenario_pairs_keep_both_sides() {
    let scenario = replication_scenario();
    let diff = diff_collections(scenario.source_cursor(), scenario.syncing_cursor()).unwrap();

    let widened = &diff.docs_with_different_contents[0];
    assert_eq!(widened.source_node.get("num"), Some(&Value::Int64(4)));
    assert_eq!(widened.syncing_node.get("num"), Some(&Value::Int32(4)));

    let extra = &diff.docs_with_different_contents[1];
    assert_eq!(extra.source_node.get("extra"), Some(&Value::from("yes")));
    assert!(extra.syncing_node.get("extra").is_none());
}

#[test]
fn scenario_pairs_differ_in_encoded_form() {
    let scenario = replication_scenario();
    let diff = diff_collections(scenario.source_cursor(), scenario.syncing_cursor()).unwrap();

    for pair in &diff.docs_with_different_contents {
        assert_ne!(
            to_bytes(&pair.source_node).unwrap(),
            to_bytes(&pair.syncing_node).unwrap()
        );
    }
}

#[test]
fn scenario_hashes_differ() {
    let scenario = replication_scenario();
    let source = hash_collection(scenario.source_cursor()).unwrap();
    let syncing = hash_collection(scenario.syncing_cursor()).unwrap();

    assert_ne!(source.hash, syncing.hash);
    assert_eq!(source.count, 100);
    assert_eq!(syncing.count, 100);
}

#[test]
fn custom_key_field() {
    let source = vec![
        Document::new().with("sku", "a").with("qty", 1),
        Document::new().with("sku", "b").with("qty", 2),
    ];
    let syncing = vec![Document::new().with("sku", "b").with("qty", 3)];

    let engine = DiffEngine::new(DiffOptions::new().with_key_field("sku"));
    let diff = engine
        .diff(VecCursor::new(source), VecCursor::new(syncing))
        .unwrap();

    assert_eq!(diff.docs_missing_on_syncing.len(), 1);
    assert_eq!(diff.docs_with_different_contents.len(), 1);
}

#[test]
fn mid_stream_cursor_failure_aborts_the_diff() {
    let scenario = replication_scenario();
    let truncated = scenario.syncing[..20].to_vec();
    let failing = FailingCursor::after(truncated, CursorError::network("connection reset"));

    let err = diff_collections(scenario.source_cursor(), failing).unwrap_err();
    assert!(matches!(err, CheckError::Cursor(CursorError::Network { .. })));
    assert!(!err.is_precondition_violation());
}

#[test]
fn server_error_from_iterator_cursor_is_propagated() {
    let batches = vec![
        Ok(Document::new().with("_id", 0)),
        Err(CursorError::server(43, "cursor not found")),
    ];

    let source = VecCursor::new(sequential_documents(0..3));
    let err = diff_collections(source, IterCursor::new(batches.into_iter())).unwrap_err();
    assert!(matches!(
        err,
        CheckError::Cursor(CursorError::Server { code: 43, .. })
    ));
}
