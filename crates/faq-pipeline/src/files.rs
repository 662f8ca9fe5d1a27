//! JSON artifacts exchanged between pipeline stages.
//!
//! Both files are a single JSON array, pretty-printed so they diff well between runs.
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::PipelineError;
use crate::model::{Document, Record};

pub fn read_records(path: &Path) -> Result<Vec<Record>, PipelineError> {
    let records: Vec<Record> = read_json(path)?;
    info!(path = %path.display(), records = records.len(), "records loaded");
    Ok(records)
}

pub fn write_records(path: &Path, records: &[Record]) -> Result<(), PipelineError> {
    write_json(path, records)?;
    info!(path = %path.display(), records = records.len(), "records written");
    Ok(())
}

pub fn read_documents(path: &Path) -> Result<Vec<Document>, PipelineError> {
    let documents: Vec<Document> = read_json(path)?;
    info!(path = %path.display(), documents = documents.len(), "documents loaded");
    Ok(documents)
}

pub fn write_documents(path: &Path, documents: &[Document]) -> Result<(), PipelineError> {
    write_json(path, documents)?;
    info!(path = %path.display(), documents = documents.len(), "documents written");
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let raw = fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
