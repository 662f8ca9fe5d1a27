//! Near-duplicate question merging.
//!
//! Greedy anchor clustering over question embeddings: the first unclustered record anchors a
//! cluster and absorbs every later unclustered record whose cosine similarity to it is
//! strictly above the threshold. Absorbed records never anchor and are never compared
//! again, so a chain A~B~C where A and C fall below the threshold ends up as {A, B} and {C}.
use std::collections::HashMap;

use tracing::debug;

use crate::error::DedupError;
use crate::model::{MergedRecord, Record};

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.85;

/// Cosine of the angle between `a` and `b`.
///
/// Zero when either vector has zero magnitude or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    similarity_with_norms(a, b, norm(a), norm(b))
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn similarity_with_norms(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if a.len() != b.len() || norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (norm_a * norm_b)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub id: ClusterId,
    /// Input position of the record whose question and title the cluster keeps.
    pub anchor: usize,
    /// Other input positions, in discovery order.
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        1 + self.members.len()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.is_empty()
    }
}

/// Result of the clustering pass.
///
/// Every input position ends up `clustered`. A position skipped as an exact-text repeat points
/// at the cluster that claimed its text but is not one of its members, so its answers are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    pub clusters: Vec<Cluster>,
    pub clustered: Vec<bool>,
    pub cluster_of: Vec<Option<ClusterId>>,
}

/// Partition `records` into clusters of near-identical questions.
///
/// A record whose exact question text was already claimed by an earlier cluster, but which the
/// similarity scan did not absorb, is skipped: it neither anchors nor contributes answers.
pub fn cluster(
    records: &[Record],
    embeddings: &[Vec<f32>],
    threshold: f32,
) -> Result<Clustering, DedupError> {
    if records.len() != embeddings.len() {
        return Err(DedupError::LengthMismatch {
            records: records.len(),
            embeddings: embeddings.len(),
        });
    }

    let n = records.len();
    let norms: Vec<f32> = embeddings.iter().map(|e| norm(e)).collect();
    let mut clustered = vec![false; n];
    let mut cluster_of: Vec<Option<ClusterId>> = vec![None; n];
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut claimed: HashMap<&str, ClusterId> = HashMap::new();

    for i in 0..n {
        if clustered[i] {
            continue;
        }
        let question = records[i].question.as_str();

        if let Some(&id) = claimed.get(question) {
            debug!(index = i, cluster = id.0, "skipping already seen question");
            clustered[i] = true;
            cluster_of[i] = Some(id);
            continue;
        }

        let id = ClusterId(clusters.len());
        clustered[i] = true;
        cluster_of[i] = Some(id);
        claimed.insert(question, id);

        let mut members = Vec::new();
        for j in (i + 1)..n {
            if clustered[j] {
                continue;
            }
            let similarity =
                similarity_with_norms(&embeddings[i], &embeddings[j], norms[i], norms[j]);
            if similarity > threshold {
                members.push(j);
                clustered[j] = true;
                cluster_of[j] = Some(id);
                claimed.entry(records[j].question.as_str()).or_insert(id);
            }
        }

        clusters.push(Cluster {
            id,
            anchor: i,
            members,
        });
    }

    Ok(Clustering {
        clusters,
        clustered,
        cluster_of,
    })
}

/// Fold each cluster into one record: anchor question and title, then every member's
/// answers appended after the anchor's in discovery order.
pub fn merge(records: Vec<Record>, clustering: &Clustering) -> Vec<MergedRecord> {
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();

    clustering
        .clusters
        .iter()
        .filter_map(|cluster| {
            let anchor = slots.get_mut(cluster.anchor).and_then(Option::take)?;
            let mut merged = MergedRecord::single(cluster.anchor, anchor);
            for &member in &cluster.members {
                if let Some(record) = slots.get_mut(member).and_then(Option::take) {
                    merged.answers.extend(record.answers);
                    merged.sources.push(member);
                }
            }
            Some(merged)
        })
        .collect()
}

pub fn deduplicate(
    records: Vec<Record>,
    embeddings: &[Vec<f32>],
    threshold: f32,
) -> Result<Vec<MergedRecord>, DedupError> {
    let clustering = cluster(&records, embeddings, threshold)?;
    let merged_clusters = clustering
        .clusters
        .iter()
        .filter(|c| !c.is_singleton())
        .count();
    debug!(
        records = records.len(),
        clusters = clustering.clusters.len(),
        merged_clusters,
        threshold,
        "deduplicated records"
    );
    Ok(merge(records, &clustering))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answer;

    fn answer(text: &str) -> Answer {
        Answer {
            author_name: "دکتر".to_string(),
            author_credential: "عمومی".to_string(),
            text: text.to_string(),
        }
    }

    fn record(question: &str, answers: &[&str]) -> Record {
        Record {
            title: format!("title {question}"),
            question: question.to_string(),
            answers: answers.iter().map(|a| answer(a)).collect(),
            link: None,
        }
    }

    fn texts(merged: &MergedRecord) -> Vec<&str> {
        merged.answers.iter().map(|a| a.text.as_str()).collect()
    }

    #[test]
    fn merges_similar_questions_into_the_anchor() {
        let records = vec![
            record("A", &["x"]),
            record("B", &["y"]),
            record("A2", &["z"]),
        ];
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.9, (1.0f32 - 0.81).sqrt()],
        ];
        assert!((cosine_similarity(&embeddings[0], &embeddings[2]) - 0.9).abs() < 1e-6);

        let merged = deduplicate(records, &embeddings, DEFAULT_SIMILARITY_THRESHOLD)
            .expect("aligned input");

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].question, "A");
        assert_eq!(merged[0].title, "title A");
        assert_eq!(texts(&merged[0]), ["x", "z"]);
        assert_eq!(merged[0].sources, [0, 2]);
        assert_eq!(merged[1].question, "B");
        assert_eq!(texts(&merged[1]), ["y"]);
    }

    #[test]
    fn similarity_exactly_at_threshold_does_not_merge() {
        // 17 / 20 with every intermediate exactly representable.
        let a = vec![1.0, 0.0, 0.0, 0.0, 0.0];
        let b = vec![17.0, 10.0, 3.0, 1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), DEFAULT_SIMILARITY_THRESHOLD);

        let records = vec![record("q1", &["a"]), record("q2", &["b"])];
        let embeddings = vec![a, b];
        let merged = deduplicate(records.clone(), &embeddings, DEFAULT_SIMILARITY_THRESHOLD)
            .expect("aligned input");
        assert_eq!(merged.len(), 2);

        let merged = deduplicate(records, &embeddings, 0.84).expect("aligned input");
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let merged = deduplicate(vec![], &[], DEFAULT_SIMILARITY_THRESHOLD).expect("empty is fine");
        assert!(merged.is_empty());
    }

    #[test]
    fn misaligned_embeddings_are_rejected() {
        let err = deduplicate(vec![record("q", &[])], &[], DEFAULT_SIMILARITY_THRESHOLD)
            .expect_err("one record, no embeddings");
        assert_eq!(
            err,
            DedupError::LengthMismatch {
                records: 1,
                embeddings: 0
            }
        );
    }

    #[test]
    fn transitive_chain_is_not_merged_past_the_anchor() {
        // A~B and B~C are above the threshold, A~C is not.
        let embeddings = vec![vec![1.0, 0.0], vec![0.906, 0.423], vec![0.643, 0.766]];
        assert!(cosine_similarity(&embeddings[0], &embeddings[1]) > 0.85);
        assert!(cosine_similarity(&embeddings[1], &embeddings[2]) > 0.85);
        assert!(cosine_similarity(&embeddings[0], &embeddings[2]) < 0.85);

        let records = vec![record("A", &["a"]), record("B", &["b"]), record("C", &["c"])];
        let clustering =
            cluster(&records, &embeddings, DEFAULT_SIMILARITY_THRESHOLD).expect("aligned input");

        assert_eq!(clustering.clusters.len(), 2);
        assert_eq!(clustering.clusters[0].anchor, 0);
        assert_eq!(clustering.clusters[0].members, [1]);
        assert!(clustering.clusters[1].is_singleton());
        assert_eq!(clustering.clustered, [true, true, true]);
        assert_eq!(
            clustering.cluster_of,
            [Some(ClusterId(0)), Some(ClusterId(0)), Some(ClusterId(1))]
        );

        let merged = merge(records, &clustering);
        assert_eq!(texts(&merged[0]), ["a", "b"]);
        assert_eq!(texts(&merged[1]), ["c"]);
    }

    #[test]
    fn already_seen_question_text_is_skipped_with_its_answers() {
        let records = vec![
            record("anchor", &["a"]),
            record("dup", &["b"]),
            record("dup", &["c"]),
        ];
        let embeddings = vec![vec![1.0, 0.0], vec![0.95, 0.312], vec![0.0, 1.0]];

        let clustering =
            cluster(&records, &embeddings, DEFAULT_SIMILARITY_THRESHOLD).expect("aligned input");
        assert_eq!(clustering.clusters.len(), 1);
        assert_eq!(clustering.clusters[0].members, [1]);
        assert_eq!(clustering.clustered, [true, true, true]);
        assert_eq!(clustering.cluster_of[2], Some(ClusterId(0)));

        let merged = merge(records, &clustering);
        assert_eq!(merged.len(), 1);
        assert_eq!(texts(&merged[0]), ["a", "b"]);
        assert_eq!(merged[0].sources, [0, 1]);
    }

    #[test]
    fn degenerate_vectors_have_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[2.0, 0.0], &[5.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
