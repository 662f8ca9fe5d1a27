use crate::error::AppError;

pub const DEFAULT_CHAT_MODEL: &str = "llama3.1";
pub const DEFAULT_TOP_K: usize = 4;

/// Chat server configuration loaded explicitly from environment variables.
///
/// The chat endpoint itself (`OPENAI_BASE_URL`, `OPENAI_API_KEY`, retries) is configured by
/// `OpenAiClientConfig::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// LanceDB data directory written by `faq-pipeline index`.
    pub lancedb_path: String,
    /// Model name passed to the chat completions endpoint.
    pub chat_model: String,
    /// FAQ entries handed to the model when `ask_question` sets no limit.
    pub top_k: usize,
    pub temperature: Option<f32>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `LANCEDB_PATH`: path to LanceDB data directory
    ///
    /// Optional:
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `FAQ_CHAT_MODEL`: chat model name (default `llama3.1`)
    /// - `FAQ_TOP_K`: retrieved entries per answer (default 4)
    /// - `FAQ_CHAT_TEMPERATURE`: sampling temperature (upstream default when unset)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let lancedb_path = lookup("LANCEDB_PATH").ok_or_else(|| {
            AppError::Config("LANCEDB_PATH environment variable is required".to_string())
        })?;

        let chat_model = lookup("FAQ_CHAT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string());

        let top_k = match lookup("FAQ_TOP_K") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(k) if k > 0 => k,
                _ => {
                    return Err(AppError::Config(format!(
                        "FAQ_TOP_K must be a positive integer, got {raw:?}"
                    )))
                }
            },
            None => DEFAULT_TOP_K,
        };

        let temperature = lookup("FAQ_CHAT_TEMPERATURE")
            .map(|raw| {
                raw.trim().parse::<f32>().map_err(|e| {
                    AppError::Config(format!("FAQ_CHAT_TEMPERATURE is not a number: {e}"))
                })
            })
            .transpose()?;

        Ok(Self {
            redis_url: lookup("REDIS_URL"),
            lancedb_path,
            chat_model,
            top_k,
            temperature,
        })
    }
}
