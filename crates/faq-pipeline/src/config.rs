use std::path::PathBuf;

use url::Url;

use crate::crawl::{DEFAULT_PAGE_LIMIT, DEFAULT_START_URL};
use crate::dedup::DEFAULT_SIMILARITY_THRESHOLD;
use crate::error::PipelineError;

/// Pipeline configuration. Every option can come from a flag or from the environment.
///
/// `LANCEDB_PATH` is only required by the stages that write the index.
/// `REDIS_URL` is optional; without it the chat cache is simply not invalidated.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// First listing page of the forum FAQ.
    #[arg(long, env = "FAQ_START_URL", default_value = DEFAULT_START_URL)]
    pub start_url: Url,

    /// Listing pages to follow after the first one.
    #[arg(long, env = "FAQ_PAGE_LIMIT", default_value_t = DEFAULT_PAGE_LIMIT)]
    pub page_limit: u32,

    /// Crawl output, prepare input.
    #[arg(long, env = "FAQ_RECORDS_PATH", default_value = "chats.json")]
    pub records_path: PathBuf,

    /// Prepare output, index input.
    #[arg(long, env = "FAQ_DOCS_PATH", default_value = "docs.json")]
    pub docs_path: PathBuf,

    /// Cosine similarity above which two questions are merged.
    #[arg(
        long,
        env = "FAQ_SIMILARITY_THRESHOLD",
        default_value_t = DEFAULT_SIMILARITY_THRESHOLD,
        value_parser = parse_threshold
    )]
    pub similarity_threshold: f32,

    /// LanceDB data directory.
    #[arg(long, env = "LANCEDB_PATH")]
    pub lancedb_path: Option<String>,

    /// Redis connection URL (e.g. "redis://127.0.0.1:6379").
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,
}

impl Config {
    pub fn lancedb_path(&self) -> Result<&str, PipelineError> {
        self.lancedb_path.as_deref().ok_or_else(|| {
            PipelineError::Config("LANCEDB_PATH environment variable is required".to_string())
        })
    }
}

fn parse_threshold(raw: &str) -> Result<f32, String> {
    let value: f32 = raw
        .trim()
        .parse()
        .map_err(|e| format!("not a number: {e}"))?;
    if !(-1.0..=1.0).contains(&value) {
        return Err(format!("{value} is outside the cosine range [-1, 1]"));
    }
    Ok(value)
}
