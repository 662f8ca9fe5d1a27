/// Minimal client for an OpenAI-compatible `/chat/completions` endpoint.
///
/// The default base URL points at a local Ollama instance, which serves the same API under
/// `/v1`. Transient failures (timeouts, connection errors, 429, 5xx) are retried with capped
/// exponential backoff plus jitter.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_error_body_bytes: usize,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434/v1".to_string(),
            api_key: None,
            default_timeout: Duration::from_secs(60),
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl OpenAiClientConfig {
    /// Optional overrides:
    /// - `OPENAI_BASE_URL` (default: local Ollama)
    /// - `OPENAI_API_KEY`
    /// - `OPENAI_TIMEOUT_SECS`, `OPENAI_MAX_RETRIES`
    /// - `OPENAI_RETRY_INITIAL_MS`, `OPENAI_RETRY_MAX_MS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.base_url);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            default_timeout: env_parse::<u64>("OPENAI_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.default_timeout),
            max_retries: env_parse("OPENAI_MAX_RETRIES").unwrap_or(defaults.max_retries),
            initial_backoff: env_parse::<u64>("OPENAI_RETRY_INITIAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.initial_backoff),
            max_backoff: env_parse::<u64>("OPENAI_RETRY_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_backoff),
            max_error_body_bytes: defaults.max_error_body_bytes,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },
}

#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiClientConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, OpenAiClientError> {
        let http = reqwest::Client::builder()
            .user_agent("faq-chat")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OpenAiClientConfig {
        &self.config
    }

    pub async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err = match self.post_once(&url, request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };
            if attempt > self.config.max_retries || !should_retry(&err) {
                return Err(err);
            }
            let delay = backoff_delay(
                self.config.initial_backoff,
                self.config.max_backoff,
                attempt - 1,
            );
            warn!(
                attempt,
                delay_ms = delay.as_millis(),
                error = %err,
                "chat completion failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn post_once(
        &self,
        url: &str,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let mut builder = self
            .http
            .post(url)
            .timeout(self.config.default_timeout)
            .json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<ChatCompletionResponse>().await?);
        }

        let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
        match serde_json::from_str::<OpenAiErrorEnvelope>(&body) {
            Ok(parsed) => Err(OpenAiClientError::Upstream {
                status,
                message: parsed
                    .error
                    .message
                    .unwrap_or_else(|| "unknown upstream error".to_string()),
            }),
            Err(_) => Err(OpenAiClientError::UpstreamBody { status, body }),
        }
    }
}

fn should_retry(err: &OpenAiClientError) -> bool {
    match err {
        OpenAiClientError::Request(e) => e.is_timeout() || e.is_connect() || e.is_body(),
        OpenAiClientError::Upstream { status, .. }
        | OpenAiClientError::UpstreamBody { status, .. } => {
            *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
    }
}

/// `initial * 2^exponent`, capped at `max`, plus up to 25% jitter.
fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as u64)
        .unwrap_or(0);
    nanos % (max_inclusive + 1)
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            b.truncate(max_bytes);
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorObject,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorObject {
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Option<ChatCompletionUsage>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if the upstream returned one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped_with_bounded_jitter() {
        let initial = Duration::from_millis(200);
        let max = Duration::from_millis(1_000);

        let first = backoff_delay(initial, max, 0);
        assert!(first >= Duration::from_millis(200) && first <= Duration::from_millis(250));

        let huge = backoff_delay(initial, max, 40);
        assert!(huge >= max && huge <= Duration::from_millis(1_250));
    }

    #[test]
    fn only_throttling_and_server_errors_are_retried() {
        let upstream = |status| OpenAiClientError::Upstream {
            status,
            message: String::new(),
        };
        assert!(should_retry(&upstream(StatusCode::TOO_MANY_REQUESTS)));
        assert!(should_retry(&upstream(StatusCode::BAD_GATEWAY)));
        assert!(!should_retry(&upstream(StatusCode::BAD_REQUEST)));
        assert!(!should_retry(&OpenAiClientError::UpstreamBody {
            status: StatusCode::UNAUTHORIZED,
            body: "nope".to_string(),
        }));
    }

    #[test]
    fn first_content_reads_first_choice() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"سلام"},"finish_reason":"stop"}]}"#,
        )
        .expect("valid response json");
        assert_eq!(response.first_content(), Some("سلام"));
        assert!(response.usage.is_none());
    }

    #[test]
    fn request_omits_unset_sampling_fields() {
        let request = ChatCompletionRequest {
            model: "llama3.1".to_string(),
            messages: vec![Message::user("hi")],
            temperature: None,
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).expect("serializable");
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
