/// Search engine over the FAQ vector table.
///
/// Embeds a query using the fastembed model, performs vector search in LanceDB,
/// and caches results in Redis when available.
use std::sync::Arc;

use arrow_array::{Array, Float32Array, RecordBatch, StringArray};
use tracing::{info, warn};

use crate::cache::FaqCache;
use crate::error::AppError;
use crate::model::FaqHit;
use faq_common::embedding::Embedder;
use faq_common::vectordb::{VectorDb, FAQ_TABLE_NAME};

pub struct SearchEngine {
    embedder: Arc<Embedder>,
    vectordb: Arc<VectorDb>,
    cache: Arc<FaqCache>,
}

impl SearchEngine {
    pub fn new(embedder: Arc<Embedder>, vectordb: Arc<VectorDb>, cache: Arc<FaqCache>) -> Self {
        Self {
            embedder,
            vectordb,
            cache,
        }
    }

    /// Return up to `limit` FAQ entries closest to `query`, best first.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<FaqHit>, AppError> {
        if let Some(cached) = self.cache.get_search_results(query, limit).await {
            info!(query, "search cache hit");
            return Ok(cached);
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let batches = self
            .vectordb
            .search(FAQ_TABLE_NAME, &query_embedding, limit)
            .await?;
        let results = extract_hits(&batches);

        self.cache.set_search_results(query, limit, &results).await;
        Ok(results)
    }
}

/// Expected columns: id, content, answers (Utf8) and `_distance` (Float32).
fn extract_hits(batches: &[RecordBatch]) -> Vec<FaqHit> {
    let mut results = Vec::new();

    for batch in batches {
        let id_col = string_column(batch, "id");
        let content_col = string_column(batch, "content");
        let answers_col = string_column(batch, "answers");
        let distance_col = batch
            .column_by_name("_distance")
            .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

        let (Some(id_col), Some(content_col), Some(answers_col)) =
            (id_col, content_col, answers_col)
        else {
            warn!("search result batch missing expected columns");
            continue;
        };

        for row in 0..batch.num_rows() {
            let distance = distance_col.map(|c| c.value(row)).unwrap_or(0.0);
            results.push(FaqHit {
                id: id_col.value(row).to_string(),
                question: content_col.value(row).to_string(),
                answers: answers_col.value(row).to_string(),
                // L2 distance, lower is closer; flipped so higher is better, floored at 0.
                score: (1.0_f32 - distance).max(0.0),
            });
        }
    }

    results
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch
        .column_by_name(name)?
        .as_any()
        .downcast_ref::<StringArray>()
}

#[cfg(test)]
mod tests {
    use arrow_array::ArrayRef;
    use arrow_schema::{DataType, Field, Schema};

    use super::*;

    fn batch(with_answers: bool) -> RecordBatch {
        let mut fields = vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["faq-0", "faq-3"])),
            Arc::new(StringArray::from(vec!["سردرد", "تب"])),
        ];
        if with_answers {
            fields.push(Field::new("answers", DataType::Utf8, false));
            columns.push(Arc::new(StringArray::from(vec!["دکتر الف: استراحت", ""])));
        }
        fields.push(Field::new("_distance", DataType::Float32, true));
        columns.push(Arc::new(Float32Array::from(vec![0.25, 1.5])));

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).expect("valid batch")
    }

    #[test]
    fn rows_become_scored_hits() {
        let hits = extract_hits(&[batch(true)]);
        assert_eq!(
            hits,
            [
                FaqHit {
                    id: "faq-0".to_string(),
                    question: "سردرد".to_string(),
                    answers: "دکتر الف: استراحت".to_string(),
                    score: 0.75,
                },
                FaqHit {
                    id: "faq-3".to_string(),
                    question: "تب".to_string(),
                    answers: String::new(),
                    score: 0.0,
                },
            ]
        );
    }

    #[test]
    fn batches_missing_columns_are_skipped() {
        assert!(extract_hits(&[batch(false)]).is_empty());
    }
}
