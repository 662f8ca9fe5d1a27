mod answer;
mod cache;
mod config;
mod error;
mod model;
mod search;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use answer::ChatAnswerGenerator;
use cache::FaqCache;
use config::Config;
use faq_common::openai::{OpenAiClient, OpenAiClientConfig};
use faq_common::vectordb::FAQ_TABLE_NAME;
use faq_pipeline::normalize::Normalizer;
use search::SearchEngine;
use server::FaqChatServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting faq-chat MCP server");

    let config = Config::from_env()?;
    let llm_config = OpenAiClientConfig::from_env();
    info!(
        lancedb_path = %config.lancedb_path,
        redis = config.redis_url.is_some(),
        chat_model = %config.chat_model,
        llm_base_url = %llm_config.base_url,
        top_k = config.top_k,
        "configuration loaded"
    );

    let redis_cache = faq_common::redis::RedisCache::new(config.redis_url.as_deref());
    if redis_cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, running without cache");
    }
    let cache = Arc::new(FaqCache::new(redis_cache));

    info!("initializing embedding model (may download on first run)");
    let embedder = Arc::new(faq_common::embedding::Embedder::new().await?);
    info!("embedding model ready");

    let vectordb = Arc::new(faq_common::vectordb::VectorDb::connect(&config.lancedb_path).await?);
    if vectordb.table_exists(FAQ_TABLE_NAME).await? {
        let entries = vectordb.row_count(FAQ_TABLE_NAME).await?;
        info!(entries, "lancedb connected");
    } else {
        warn!(
            table = FAQ_TABLE_NAME,
            "faq table missing, searches will fail until `faq-pipeline index` runs"
        );
    }

    let generator = Arc::new(ChatAnswerGenerator::new(
        OpenAiClient::new(llm_config)?,
        config.chat_model.clone(),
        config.temperature,
    ));
    let search_engine = Arc::new(SearchEngine::new(embedder, vectordb, cache));
    let server = FaqChatServer::new(
        Arc::new(Normalizer::new()),
        search_engine,
        generator,
        config.top_k,
    );

    if let Ok(addr) = std::env::var("MCP_TCP_LISTEN_ADDR") {
        let listener = TcpListener::bind(&addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
