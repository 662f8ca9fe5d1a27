use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchFaqsParams {
    /// The patient question or keywords to look up (Persian or English).
    pub query: String,
    /// Maximum number of FAQ entries to return (default: 5, max: 20).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AskQuestionParams {
    /// The patient question to answer from the FAQ knowledge base.
    pub question: String,
    /// How many FAQ entries to retrieve as context (default: server configured top-k, max: 20).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FaqSearchResult {
    pub id: String,
    /// Canonical question text of the deduplicated FAQ entry.
    pub question: String,
    /// Doctor answers, one per line, formatted as `name credential: text`.
    pub answers: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchFaqsResponse {
    pub results: Vec<FaqSearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskQuestionResponse {
    pub answer: String,
    /// The FAQ entries handed to the model as context.
    pub sources: Vec<FaqSearchResult>,
}
