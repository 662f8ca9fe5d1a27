//! `index` stage: write documents and their embeddings into the FAQ vector table.
//!
//! The table is rebuilt from scratch on every run, then every cached chat response is dropped.
use std::sync::Arc;

use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use faq_common::embedding::EmbeddingProvider;
use faq_common::error::CommonError;
use faq_common::redis::{RedisCache, FAQ_CACHE_PREFIX};
use faq_common::vectordb::{VectorDb, FAQ_TABLE_NAME};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::model::Document;

/// Row id of the document at `position` in the documents file.
pub fn document_id(position: usize) -> String {
    format!("faq-{position}")
}

pub fn faq_schema(dim: usize) -> Result<Arc<Schema>, PipelineError> {
    let dim = list_size(dim)?;
    Ok(Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
        Field::new("answers", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim),
            false,
        ),
    ])))
}

fn list_size(dim: usize) -> Result<i32, PipelineError> {
    i32::try_from(dim)
        .map_err(|_| CommonError::VectorDb(format!("embedding dimension {dim} too large")).into())
}

/// Build one Arrow batch holding every document.
pub fn build_record_batch(
    documents: &[Document],
    embeddings: &[Vec<f32>],
    dim: usize,
) -> Result<RecordBatch, PipelineError> {
    if documents.len() != embeddings.len() {
        return Err(CommonError::Embedding(format!(
            "embedding count mismatch: expected {}, got {}",
            documents.len(),
            embeddings.len()
        ))
        .into());
    }
    if let Some((position, e)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != dim) {
        return Err(CommonError::Embedding(format!(
            "embedding {position} has dimension {}, expected {dim}",
            e.len()
        ))
        .into());
    }

    let schema = faq_schema(dim)?;

    let ids: Vec<String> = (0..documents.len()).map(document_id).collect();
    let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
    let answers: Vec<&str> = documents
        .iter()
        .map(|d| d.metadata.answers.as_str())
        .collect();

    let id_array: ArrayRef = Arc::new(StringArray::from(ids));
    let content_array: ArrayRef = Arc::new(StringArray::from(contents));
    let answers_array: ArrayRef = Arc::new(StringArray::from(answers));

    let flat_values: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let embedding_array: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            list_size(dim)?,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| CommonError::VectorDb(format!("failed to build embedding array: {e}")))?,
    );

    RecordBatch::try_new(
        schema,
        vec![id_array, content_array, answers_array, embedding_array],
    )
    .map_err(|e| CommonError::VectorDb(format!("failed to build record batch: {e}")).into())
}

/// Replace the FAQ table with `documents` and invalidate the chat cache.
///
/// Returns the number of rows written.
pub async fn write_index(
    documents: &[Document],
    embeddings: &[Vec<f32>],
    dim: usize,
    vectordb: &VectorDb,
    cache: &RedisCache,
) -> Result<usize, PipelineError> {
    let batch = build_record_batch(documents, embeddings, dim)?;
    let rows = batch.num_rows();
    vectordb
        .create_or_replace_table(FAQ_TABLE_NAME, batch.schema(), vec![batch])
        .await?;

    if !cache.delete_by_prefix(FAQ_CACHE_PREFIX).await {
        warn!(prefix = FAQ_CACHE_PREFIX, "chat cache not invalidated");
    }
    info!(table = FAQ_TABLE_NAME, rows, "index written");
    Ok(rows)
}

/// Embed every document's content, then [`write_index`].
pub async fn embed_and_index<E: EmbeddingProvider>(
    documents: &[Document],
    embedder: &E,
    dim: usize,
    vectordb: &VectorDb,
    cache: &RedisCache,
) -> Result<usize, PipelineError> {
    let contents: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
    info!(documents = contents.len(), "embedding documents");
    let embeddings = embedder.embed(&contents).await?;
    write_index(documents, &embeddings, dim, vectordb, cache).await
}
