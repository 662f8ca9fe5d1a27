//! `prepare` stage: crawled records in, deduplicated documents out.
use faq_common::embedding::EmbeddingProvider;
use tracing::info;

use crate::dedup;
use crate::document;
use crate::error::PipelineError;
use crate::model::{Answer, Document, Record};
use crate::normalize::Normalizer;

/// Documents ready for indexing, with the embedding of each document's content.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub documents: Vec<Document>,
    pub embeddings: Vec<Vec<f32>>,
}

/// Re-normalize every field of `record`.
///
/// Records written by the crawler are already normalized, so this only matters for files
/// produced elsewhere or by an older mapping table.
pub fn renormalize(normalizer: &Normalizer, record: Record) -> Record {
    Record {
        title: normalizer.normalize(&record.title),
        question: normalizer.normalize(&record.question),
        answers: record
            .answers
            .into_iter()
            .map(|a| Answer {
                author_name: normalizer.normalize(&a.author_name),
                author_credential: normalizer.normalize(&a.author_credential),
                text: normalizer.normalize(&a.text),
            })
            .collect(),
        link: record.link,
    }
}

/// Normalize, embed every question in one batch, merge near-duplicates and build documents.
pub async fn prepare<E: EmbeddingProvider>(
    records: Vec<Record>,
    normalizer: &Normalizer,
    embedder: &E,
    threshold: f32,
) -> Result<Prepared, PipelineError> {
    let records: Vec<Record> = records
        .into_iter()
        .map(|r| renormalize(normalizer, r))
        .collect();
    let chats = records.len();

    let questions: Vec<String> = records.iter().map(|r| r.question.clone()).collect();
    info!(questions = questions.len(), "embedding questions");
    let embeddings = embedder.embed(&questions).await?;

    let merged = dedup::deduplicate(records, &embeddings, threshold)?;
    let documents = document::build_all(&merged);
    let embeddings = merged
        .iter()
        .map(|m| embeddings[m.sources[0]].clone())
        .collect();

    info!("{chats} chats → {} documents", documents.len());
    Ok(Prepared {
        documents,
        embeddings,
    })
}
