use std::path::PathBuf;

use faq_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Dedup(#[from] DedupError),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid css selector {selector:?}: {message}")]
    Selector { selector: String, message: String },

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed json in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a thread page could not be turned into a record. Never fatal for a crawl.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("required element missing: {0}")]
    MissingField(&'static str),

    #[error("required element is empty: {0}")]
    EmptyField(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("http client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DedupError {
    #[error("got {embeddings} embeddings for {records} records")]
    LengthMismatch { records: usize, embeddings: usize },
}
