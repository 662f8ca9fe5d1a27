use serde::{Deserialize, Serialize};

use faq_common::mcp_api::FaqSearchResult;

/// A FAQ entry returned by vector search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqHit {
    /// Row id, e.g. "faq-12"
    pub id: String,
    /// Canonical question text
    pub question: String,
    /// Doctor answers, one per line
    pub answers: String,
    /// Similarity score, higher is closer
    pub score: f32,
}

impl From<FaqHit> for FaqSearchResult {
    fn from(hit: FaqHit) -> Self {
        Self {
            id: hit.id,
            question: hit.question,
            answers: hit.answers,
            score: hit.score,
        }
    }
}
