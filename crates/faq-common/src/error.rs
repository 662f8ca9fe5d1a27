/// Error types shared across the FAQ pipeline and chat server.
///
/// These errors represent failures in infrastructure components (vector DB, embeddings)
/// used by more than one binary. Crate-specific errors wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("vector db error: {0}")]
    VectorDb(String),

    #[error("embedding error: {0}")]
    Embedding(String),
}
