//! Chat completion and embedding requests against an OpenAI-compatible API.
//!
//! The client shapes requests and surfaces provider failures unchanged;
//! retry policy is the caller's concern.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::AppConfig;
use crate::error::{Result, ServerError};

/// Model used for embeddings unless the caller picks another one.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// One role/content pair in a conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Per-call knobs for [`LlmClient::chat_completion`].
///
/// `extra` is passed through to the provider verbatim (e.g. `top_p`,
/// `stop`, `user`).
#[derive(Debug, Clone)]
pub struct ChatOptions {
    /// Overrides the configured default model
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub extra: Map<String, Value>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: None,
            extra: Map::new(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

/// Shared handle to the configured LLM API.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    default_model: String,
}

impl LlmClient {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.openai_timeout_seconds))
            .build()
            .map_err(|e| {
                ServerError::ResourceUnavailable(format!("failed to build LLM HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.openai_api_key.clone(),
            default_model: config.openai_model.clone(),
        })
    }

    /// Send a conversation and return the first completion choice's text.
    pub async fn chat_completion(
        &self,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<String> {
        let ChatOptions {
            model,
            temperature,
            max_tokens,
            extra,
        } = options;
        let model = model.as_deref().unwrap_or(&self.default_model);

        let request = ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
            extra,
        };

        debug!(model, messages = messages.len(), "sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let completion: ChatCompletionResponse = response.json().await?;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ServerError::Llm("no completion choices returned".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    /// Embedding vector for a single text.
    pub async fn create_embedding(&self, text: &str, model: Option<&str>) -> Result<Vec<f32>> {
        let items = self
            .request_embeddings(EmbeddingInput::Single(text), model)
            .await?;
        items
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| ServerError::Llm("no embedding returned".to_string()))
    }

    /// Embedding vectors for several texts in one request.
    ///
    /// The i-th output vector corresponds to the i-th input text;
    /// downstream consumers zip inputs to outputs.
    pub async fn create_embeddings_batch(
        &self,
        texts: &[String],
        model: Option<&str>,
    ) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut items = self
            .request_embeddings(EmbeddingInput::Batch(texts), model)
            .await?;
        // providers label each vector with its input index
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }

    async fn request_embeddings(
        &self,
        input: EmbeddingInput<'_>,
        model: Option<&str>,
    ) -> Result<Vec<EmbeddingItem>> {
        let model = model.unwrap_or(DEFAULT_EMBEDDING_MODEL);
        let request = EmbeddingRequest { model, input };

        debug!(model, "sending embedding request");

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: EmbeddingResponse = response.json().await?;
        Ok(parsed.data)
    }
}

/// Map non-success provider responses onto [`ServerError::Llm`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authentication failed ({status}): {body}")
        }
        StatusCode::TOO_MANY_REQUESTS => format!("rate limited ({status}): {body}"),
        _ => format!("provider rejected request ({status}): {body}"),
    };
    Err(ServerError::Llm(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chat_request_serializes_defaults_and_extras() {
        let messages = vec![
            ChatMessage::system("You are helpful"),
            ChatMessage::user("Hello"),
        ];
        let mut extra = Map::new();
        extra.insert("top_p".to_string(), json!(0.9));

        let request = ChatRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: 0.7,
            max_tokens: None,
            extra,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4");
        assert_eq!(value["temperature"], 0.7);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Hello");
        // extras are flattened to top level, absent options are omitted
        assert_eq!(value["top_p"], 0.9);
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn chat_request_includes_max_tokens_when_set() {
        let messages = vec![ChatMessage::user("Hi")];
        let request = ChatRequest {
            model: "gpt-4",
            messages: &messages,
            temperature: 0.2,
            max_tokens: Some(256),
            extra: Map::new(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["max_tokens"], 256);
    }

    #[test]
    fn chat_response_yields_first_choice_content() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [
                {"message": {"role": "assistant", "content": "first"}},
                {"message": {"role": "assistant", "content": "second"}}
            ]
        }))
        .unwrap();

        let first = response.choices.into_iter().next().unwrap();
        assert_eq!(first.message.content.as_deref(), Some("first"));
    }

    #[test]
    fn chat_response_tolerates_missing_content() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant"}}]
        }))
        .unwrap();

        let first = response.choices.into_iter().next().unwrap();
        assert_eq!(first.message.content, None);
    }

    #[test]
    fn embedding_input_serializes_untagged() {
        let single = serde_json::to_value(EmbeddingInput::Single("hello")).unwrap();
        assert_eq!(single, json!("hello"));

        let texts = vec!["a".to_string(), "b".to_string()];
        let batch = serde_json::to_value(EmbeddingInput::Batch(&texts)).unwrap();
        assert_eq!(batch, json!(["a", "b"]));
    }

    #[test]
    fn batch_embeddings_are_reordered_by_index() {
        let response: EmbeddingResponse = serde_json::from_value(json!({
            "data": [
                {"index": 2, "embedding": [2.0]},
                {"index": 0, "embedding": [0.0]},
                {"index": 1, "embedding": [1.0]}
            ]
        }))
        .unwrap();

        let mut items = response.data;
        items.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = items.into_iter().map(|item| item.embedding).collect();
        assert_eq!(vectors, vec![vec![0.0], vec![1.0], vec![2.0]]);
    }

    #[test]
    fn default_options_match_facade_contract() {
        let options = ChatOptions::default();
        assert_eq!(options.model, None);
        assert_eq!(options.temperature, 0.7);
        assert_eq!(options.max_tokens, None);
        assert!(options.extra.is_empty());
    }
}
