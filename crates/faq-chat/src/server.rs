/// MCP server for the medical FAQ knowledge base.
///
/// Exposes two tools:
/// - `search_faqs`: semantic search over deduplicated FAQ entries
/// - `ask_question`: retrieve the closest entries and answer from the doctors' replies
use std::sync::Arc;

use faq_pipeline::normalize::Normalizer;
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use crate::answer::{self, ChatAnswerGenerator};
use crate::search::SearchEngine;
use faq_common::mcp_api::{
    AskQuestionParams, AskQuestionResponse, FaqSearchResult, SearchFaqsParams,
    SearchFaqsResponse,
};

const DEFAULT_SEARCH_LIMIT: u32 = 5;
const MAX_LIMIT: u32 = 20;

#[derive(Clone)]
pub struct FaqChatServer {
    normalizer: Arc<Normalizer>,
    search_engine: Arc<SearchEngine>,
    generator: Arc<ChatAnswerGenerator>,
    top_k: u32,
    tool_router: ToolRouter<FaqChatServer>,
}

impl FaqChatServer {
    pub fn new(
        normalizer: Arc<Normalizer>,
        search_engine: Arc<SearchEngine>,
        generator: Arc<ChatAnswerGenerator>,
        top_k: usize,
    ) -> Self {
        Self {
            normalizer,
            search_engine,
            generator,
            top_k: u32::try_from(top_k).unwrap_or(MAX_LIMIT).min(MAX_LIMIT),
            tool_router: Self::tool_router(),
        }
    }

    fn prepare_query(&self, raw: &str, field: &str) -> Result<String, String> {
        normalize_query(&self.normalizer, raw, field)
    }
}

/// Normalize `raw` the same way the indexed questions were. Surrounding whitespace is
/// dropped first.
fn normalize_query(normalizer: &Normalizer, raw: &str, field: &str) -> Result<String, String> {
    let query = normalizer.normalize(raw.trim());
    if query.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(query)
}

/// Requested limit, defaulted and clamped to `1..=MAX_LIMIT`.
fn effective_limit(requested: Option<u32>, default: u32) -> usize {
    requested.unwrap_or(default).clamp(1, MAX_LIMIT) as usize
}

#[tool_router]
impl FaqChatServer {
    #[tool(description = "Search the medical FAQ (doctor-answered patient questions, mostly Persian) by semantic similarity. Returns ranked entries with the doctors' answers.")]
    async fn search_faqs(
        &self,
        Parameters(params): Parameters<SearchFaqsParams>,
    ) -> Result<Json<SearchFaqsResponse>, String> {
        let query = self.prepare_query(&params.query, "query")?;
        let limit = effective_limit(params.limit, DEFAULT_SEARCH_LIMIT);

        let hits = self
            .search_engine
            .search(&query, limit)
            .await
            .map_err(|e| format!("search failed: {e}"))?;

        Ok(Json(SearchFaqsResponse {
            results: hits.into_iter().map(FaqSearchResult::from).collect(),
        }))
    }

    #[tool(description = "Answer a patient question from the doctors' answers in the FAQ. Retrieves the closest FAQ entries and returns a generated answer together with the entries it was based on.")]
    async fn ask_question(
        &self,
        Parameters(params): Parameters<AskQuestionParams>,
    ) -> Result<Json<AskQuestionResponse>, String> {
        let question = self.prepare_query(&params.question, "question")?;
        let limit = effective_limit(params.limit, self.top_k);

        let hits = self
            .search_engine
            .search(&question, limit)
            .await
            .map_err(|e| format!("search failed: {e}"))?;
        info!(hits = hits.len(), limit, "answering question");

        let answer = answer::answer_from_hits(self.generator.as_ref(), &question, &hits)
            .await
            .map_err(|e| format!("answer generation failed: {e}"))?;

        Ok(Json(AskQuestionResponse {
            answer,
            sources: hits.into_iter().map(FaqSearchResult::from).collect(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for FaqChatServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "faq-chat".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Medical FAQ MCP server. The knowledge base holds patient questions from a \
                 Persian medical Q&A forum, deduplicated and paired with the doctors' answers. \
                 Use search_faqs to find related entries and ask_question to get an answer \
                 grounded in those entries."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_publish_output_schemas() {
        let tools = FaqChatServer::tool_router().list_all();
        for name in ["search_faqs", "ask_question"] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[test]
    fn limits_are_defaulted_and_clamped() {
        assert_eq!(effective_limit(None, DEFAULT_SEARCH_LIMIT), 5);
        assert_eq!(effective_limit(Some(3), DEFAULT_SEARCH_LIMIT), 3);
        assert_eq!(effective_limit(Some(500), DEFAULT_SEARCH_LIMIT), 20);
        assert_eq!(effective_limit(Some(0), DEFAULT_SEARCH_LIMIT), 1);
        assert_eq!(effective_limit(None, 4), 4);
    }

    #[test]
    fn queries_are_trimmed_and_normalized() {
        let normalizer = Normalizer::new();
        assert_eq!(
            normalize_query(&normalizer, "\tسردرد ۲ روزه ", "query"),
            Ok("سردرد 2 روزه".to_string())
        );
        assert_eq!(
            normalize_query(&normalizer, " \u{200c} ", "question"),
            Err("question must not be empty".to_string())
        );
    }
}
