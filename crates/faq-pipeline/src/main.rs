use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use faq_common::embedding::{Embedder, EMBEDDING_DIM};
use faq_common::redis::RedisCache;
use faq_common::vectordb::VectorDb;
use faq_pipeline::config::Config;
use faq_pipeline::crawl::{Crawler, HttpFetcher, ListingParser, ListingSelectors};
use faq_pipeline::error::PipelineError;
use faq_pipeline::extract::{Extractor, ThreadSelectors};
use faq_pipeline::normalize::Normalizer;
use faq_pipeline::{files, index, prepare};

#[derive(Debug, Parser)]
#[command(
    name = "faq-pipeline",
    version,
    about = "Crawl, deduplicate and index the medical FAQ forum"
)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl the forum and write the records file.
    Crawl,
    /// Merge near-duplicate questions and write the documents file.
    Prepare,
    /// Embed the documents file into the vector table.
    Index,
    /// Crawl, prepare and index in one go.
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    info!(
        start_url = %config.start_url,
        page_limit = config.page_limit,
        records = %config.records_path.display(),
        docs = %config.docs_path.display(),
        threshold = config.similarity_threshold,
        "configuration loaded"
    );

    let normalizer = Arc::new(Normalizer::new());

    match cli.command {
        Command::Crawl => {
            crawl(&config, &normalizer).await?;
        }
        Command::Prepare => {
            let embedder = load_embedder().await?;
            prepare_documents(&config, &normalizer, &embedder).await?;
        }
        Command::Index => {
            let documents = files::read_documents(&config.docs_path)?;
            let embedder = load_embedder().await?;
            let (vectordb, cache) = connect_index(&config).await?;
            index::embed_and_index(&documents, &embedder, EMBEDDING_DIM, &vectordb, &cache)
                .await?;
        }
        Command::Run => {
            // Open the index first so a missing LANCEDB_PATH fails before the crawl.
            let (vectordb, cache) = connect_index(&config).await?;
            crawl(&config, &normalizer).await?;
            let embedder = load_embedder().await?;
            let prepared = prepare_documents(&config, &normalizer, &embedder).await?;
            index::write_index(
                &prepared.documents,
                &prepared.embeddings,
                EMBEDDING_DIM,
                &vectordb,
                &cache,
            )
            .await?;
        }
    }

    info!("done");
    Ok(())
}

async fn crawl(config: &Config, normalizer: &Arc<Normalizer>) -> Result<(), PipelineError> {
    let listing = ListingParser::new(Arc::clone(normalizer), &ListingSelectors::default())?;
    let extractor = Extractor::new(Arc::clone(normalizer), &ThreadSelectors::default())?;
    let crawler = Crawler::new(HttpFetcher::new()?, listing, extractor, config.page_limit);
    crawler
        .run_to_file(&config.start_url, &config.records_path)
        .await?;
    Ok(())
}

async fn prepare_documents(
    config: &Config,
    normalizer: &Normalizer,
    embedder: &Embedder,
) -> Result<prepare::Prepared, PipelineError> {
    let records = files::read_records(&config.records_path)?;
    let prepared =
        prepare::prepare(records, normalizer, embedder, config.similarity_threshold).await?;
    files::write_documents(&config.docs_path, &prepared.documents)?;
    Ok(prepared)
}

async fn load_embedder() -> Result<Embedder, PipelineError> {
    info!("initializing embedding model (may download on first run)");
    let embedder = Embedder::new().await?;
    info!(dimensions = embedder.dimensions(), "embedding model ready");
    Ok(embedder)
}

async fn connect_index(config: &Config) -> Result<(VectorDb, RedisCache), PipelineError> {
    let vectordb = VectorDb::connect(config.lancedb_path()?).await?;
    info!("lancedb connected");

    let cache = RedisCache::new(config.redis_url.as_deref());
    if cache.is_available().await {
        info!("redis connected");
    } else {
        info!("redis unavailable, chat cache will not be invalidated");
    }
    Ok((vectordb, cache))
}
