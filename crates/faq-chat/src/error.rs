use faq_common::error::CommonError;
use faq_common::openai::OpenAiClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("config error: {0}")]
    Config(String),

    #[error("answer generation failed: {0}")]
    Generation(#[from] OpenAiClientError),

    #[error("model returned an empty answer")]
    EmptyAnswer,
}
