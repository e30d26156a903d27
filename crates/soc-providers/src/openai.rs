//! OpenAI-compatible HTTP client

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use soc_cache::{EmbedError, Embedder};
use soc_core::{InferenceModel, ModelError};
use std::fmt;
use std::time::Duration;

/// Longest error body kept in a `ModelError::Status`
const MAX_ERROR_BODY: usize = 512;

/// Endpoint and model settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API base, e.g. `https://api.openai.com/v1`
    pub base_url: String,
    /// Bearer token
    pub api_key: Option<String>,
    /// Model for report synthesis
    pub chat_model: String,
    /// Model for classification
    pub fast_chat_model: String,
    /// Model for cache embeddings
    pub embedding_model: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            chat_model: "gpt-4o".to_string(),
            fast_chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            timeout_secs: 60,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("chat_model", &self.chat_model)
            .field("fast_chat_model", &self.fast_chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for chat completions and embeddings
///
/// Completions run at temperature 0. Cloning shares the connection pool.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
}

impl OpenAiCompatClient {
    /// Build client for `config.chat_model`
    ///
    /// # Errors
    /// Returns `ProviderError::Client` if the HTTP client cannot be built
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
        })
    }

    /// Same endpoint, different chat model
    #[must_use]
    pub fn with_chat_model(&self, model: impl Into<String>) -> Self {
        Self {
            chat_model: model.into(),
            ..self.clone()
        }
    }

    /// Chat model in use
    #[inline]
    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let request = self.http.post(format!("{}/{endpoint}", self.base_url));
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<String, ModelError> {
        let response = self
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(ModelError::Status {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            })
        }
    }
}

impl fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("base_url", &self.base_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish_non_exhaustive()
    }
}

/// First completion text of a chat response body
fn parse_completion(body: &str) -> Result<String, ModelError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ModelError::Malformed(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ModelError::Empty)
}

/// First vector of an embeddings response body
fn parse_embedding(body: &str) -> Result<Vec<f32>, EmbedError> {
    let response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| EmbedError::Request(e.to_string()))?;
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(EmbedError::Empty)
}

#[async_trait]
impl InferenceModel for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = ChatRequest {
            model: &self.chat_model,
            temperature: 0.0,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let body = self.send("chat/completions", &request).await?;
        let completion = parse_completion(&body)?;
        tracing::debug!(model = %self.chat_model, chars = completion.len(), "completion received");
        Ok(completion)
    }

    fn model_id(&self) -> String {
        self.chat_model.clone()
    }
}

#[async_trait]
impl Embedder for OpenAiCompatClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: text,
        };
        let body = self
            .send("embeddings", &request)
            .await
            .map_err(|e| EmbedError::Request(e.to_string()))?;
        parse_embedding(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o",
            temperature: 0.0,
            messages: [ChatMessage {
                role: "user",
                content: "classify this",
            }],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gpt-4o",
                "temperature": 0.0,
                "messages": [{"role": "user", "content": "classify this"}]
            })
        );
    }

    #[test]
    fn completion_parsing() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Phishing"}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "Phishing");

        assert_eq!(parse_completion(r#"{"choices":[]}"#), Err(ModelError::Empty));
        assert_eq!(
            parse_completion(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ModelError::Empty)
        );
        assert!(matches!(parse_completion("<html>"), Err(ModelError::Malformed(_))));
    }

    #[test]
    fn embedding_parsing() {
        let body = r#"{"data":[{"embedding":[0.5,-0.25]}]}"#;
        assert_eq!(parse_embedding(body).unwrap(), vec![0.5, -0.25]);
        assert_eq!(parse_embedding(r#"{"data":[]}"#), Err(EmbedError::Empty));
    }

    #[test]
    fn client_builds_and_switches_models() {
        let config = ProviderConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..ProviderConfig::default()
        };
        let client = OpenAiCompatClient::new(&config).unwrap();
        let fast = client.with_chat_model(config.fast_chat_model.clone());

        assert_eq!(client.model_id(), "gpt-4o");
        assert_eq!(fast.chat_model(), "gpt-4o-mini");
        assert_eq!(fast.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn debug_hides_api_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..ProviderConfig::default()
        };
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let config = ProviderConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..ProviderConfig::default()
        };
        let client = OpenAiCompatClient::new(&config).unwrap();

        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)));
        assert!(err.is_transient());
    }
}
