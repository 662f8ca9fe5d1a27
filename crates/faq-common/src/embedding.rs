/// Sentence embeddings for FAQ questions.
///
/// `TextEmbedding` from fastembed is synchronous and CPU-bound. All embed calls go through
/// `tokio::task::spawn_blocking`, with the model shared behind an `Arc`.
///
/// The corpus is Persian, so the multilingual paraphrase-mpnet model is used. It takes raw
/// text with no task prefix, and the same call serves both indexing and query embedding.
use std::future::Future;
use std::sync::Arc;

use crate::error::CommonError;

/// Output dimension of paraphrase-multilingual-mpnet-base-v2.
pub const EMBEDDING_DIM: usize = 768;

/// Anything that turns an ordered batch of texts into one vector per text.
///
/// Implementations must preserve order and length: `embed(t)[i]` belongs to `t[i]`.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, CommonError>> + Send;
}

/// Wraps fastembed's `TextEmbedding` model.
pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
    batch_size: usize,
}

impl Embedder {
    /// Initialize the embedding model.
    ///
    /// Downloads the model on first run (~1GB). The download happens inside a blocking task.
    pub async fn new() -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(|| {
            let options =
                fastembed::InitOptions::new(fastembed::EmbeddingModel::ParaphraseMLMpnetBaseV2)
                    .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
            batch_size: 16,
        })
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        let mut results = self.embed(&[query.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }

    pub fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

impl EmbeddingProvider for Embedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let inputs = texts.to_vec();
        let expected = inputs.len();
        let batch_size = self.batch_size;
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(inputs, Some(batch_size)))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("embedding failed: {e}")))?;

        if vectors.len() != expected {
            return Err(CommonError::Embedding(format!(
                "embedding count mismatch: expected {expected}, got {}",
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}
