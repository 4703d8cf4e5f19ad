//! Vector similarity utilities.
//!
//! Pure-Rust cosine similarity and top-k ranking over embedded records.

use dealdesk_core::retrieval::RetrievedRecord;
use serde::{Deserialize, Serialize};

/// A record together with the embedding it is ranked by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedRecord {
    #[serde(flatten)]
    pub record: RetrievedRecord,
    pub embedding: Vec<f32>,
}

impl EmbeddedRecord {
    pub fn new(record: RetrievedRecord, embedding: Vec<f32>) -> Self {
        Self { record, embedding }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if the lengths differ or either vector is empty or zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank records by cosine similarity to a query embedding.
///
/// Returns at most `limit` records with `similarity >= min_similarity`,
/// most similar first, each with `similarity` filled in.
pub fn vector_search(
    records: &[EmbeddedRecord],
    query_embedding: &[f32],
    limit: usize,
    min_similarity: f32,
) -> Vec<RetrievedRecord> {
    let mut scored: Vec<RetrievedRecord> = records
        .iter()
        .filter_map(|entry| {
            let sim = cosine_similarity(&entry.embedding, query_embedding);
            (sim >= min_similarity).then(|| {
                let mut record = entry.record.clone();
                record.similarity = sim;
                record
            })
        })
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(id: &str, embedding: Vec<f32>) -> EmbeddedRecord {
        EmbeddedRecord::new(
            RetrievedRecord::new(id, format!("Content for {id}"), 0.0),
            embedding,
        )
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        let sim = cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // 1 / sqrt(2)
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn ranks_by_similarity() {
        let records = vec![
            embedded("a", vec![0.0, 1.0, 0.0]),
            embedded("b", vec![1.0, 0.0, 0.0]),
            embedded("c", vec![0.5, 0.5, 0.0]),
        ];

        let results = vector_search(&records, &[1.0, 0.0, 0.0], 10, 0.0);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn threshold_is_inclusive() {
        let records = vec![
            embedded("a", vec![1.0, 0.0]),
            embedded("b", vec![0.0, 1.0]),
        ];
        let results = vector_search(&records, &[1.0, 0.0], 10, 1.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
    }

    #[test]
    fn respects_limit() {
        let records: Vec<_> = (0..10)
            .map(|i| embedded(&format!("e{i}"), vec![1.0, i as f32 * 0.1]))
            .collect();
        let results = vector_search(&records, &[1.0, 0.0], 3, 0.0);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].id, "e0");
    }
}
