/// LanceDB vector database wrapper.
///
/// The FAQ table written by `faq-pipeline index` and read by `faq-chat` has the schema:
/// - id: Utf8 (not null), `faq-{position}` in the documents file
/// - content: Utf8 (not null), the canonical question text that was embedded
/// - answers: Utf8 (not null), the formatted doctor answers
/// - embedding: FixedSizeList<Float32, EMBEDDING_DIM> (not null)
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchIterator};
use arrow_schema::Schema;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::info;

use crate::error::CommonError;

/// Table holding the deduplicated FAQ documents.
pub const FAQ_TABLE_NAME: &str = "faqs";

pub struct VectorDb {
    db: lancedb::Connection,
}

impl VectorDb {
    /// Connect to a LanceDB database at the given filesystem path.
    pub async fn connect(path: &str) -> Result<Self, CommonError> {
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("connection failed: {e}")))?;
        Ok(Self { db })
    }

    /// Drop the table if present and create it again from `batches`.
    ///
    /// Each pipeline run recomputes every document, so there is nothing to merge with.
    pub async fn create_or_replace_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        batches: Vec<RecordBatch>,
    ) -> Result<(), CommonError> {
        if self.table_exists(table_name).await? {
            self.db
                .drop_table(table_name)
                .await
                .map_err(|e| CommonError::VectorDb(format!("drop table failed: {e}")))?;
        }

        let batch_iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);
        self.db
            .create_table(table_name, Box::new(batch_iter))
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("create table failed: {e}")))?;

        info!(table = table_name, "vector table created");
        Ok(())
    }

    /// Number of rows in `table_name`.
    pub async fn row_count(&self, table_name: &str) -> Result<usize, CommonError> {
        self.open(table_name)
            .await?
            .count_rows(None)
            .await
            .map_err(|e| CommonError::VectorDb(format!("count rows failed: {e}")))
    }

    async fn open(&self, table_name: &str) -> Result<lancedb::Table, CommonError> {
        self.db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table {table_name} failed: {e}")))
    }

    pub async fn table_exists(&self, table_name: &str) -> Result<bool, CommonError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("listing tables failed: {e}")))?;
        Ok(names.iter().any(|n| n == table_name))
    }

    /// Search for the nearest vectors to the given query embedding.
    ///
    /// Returns up to `limit` rows, each carrying the `_distance` column LanceDB adds.
    pub async fn search(
        &self,
        table_name: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let results = self
            .open(table_name)
            .await?
            .vector_search(query_embedding)
            .map_err(|e| CommonError::VectorDb(format!("vector search setup failed: {e}")))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("vector search failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting search results failed: {e}")))
    }
}
