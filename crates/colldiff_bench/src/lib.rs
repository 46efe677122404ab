//! Benchmark workloads for colldiff.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use colldiff_codec::Document;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A user-like document with a handful of typed fields.
pub fn sample_document(id: i64) -> Document {
    Document::new()
        .with("_id", id)
        .with("name", format!("user_{id}"))
        .with("email", format!("user_{id}@example.com"))
        .with("age", (id % 90) as i32)
        .with("score", id as f64 * 0.25)
        .with(
            "address",
            Document::new()
                .with("city", "Springfield")
                .with("zip", format!("{:05}", id % 100_000)),
        )
}

/// `count` sorted documents.
pub fn sorted_collection(count: usize) -> Vec<Document> {
    (0..count as i64).map(sample_document).collect()
}

/// Two sorted copies of a collection where roughly `divergence` of the
/// documents (0.0 to 1.0) are dropped from, added to or changed on the
/// syncing side. Deterministic for a given `seed`.
pub fn divergent_collections(
    count: usize,
    divergence: f64,
    seed: u64,
) -> (Vec<Document>, Vec<Document>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let source = sorted_collection(count);
    let mut syncing = Vec::with_capacity(count);

    for doc in &source {
        if !rng.gen_bool(divergence) {
            syncing.push(doc.clone());
            continue;
        }
        match rng.gen_range(0..3) {
            0 => {}
            1 => syncing.push(doc.clone().with("stale", true)),
            _ => {
                syncing.push(doc.clone());
                // Half-step keys sort between neighbours without colliding.
                if let Some(id) = doc.get("_id").and_then(|v| v.as_integer()) {
                    syncing.push(sample_document(id).with("_id", id as f64 + 0.5));
                }
            }
        }
    }

    (source, syncing)
}
