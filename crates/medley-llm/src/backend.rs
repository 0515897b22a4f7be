//! Chat-completion and embedding backends.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A completion call. `None` fields fall back to the backend's defaults.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError>;
    fn model_id(&self) -> &str;
}

// ── Wire format ───────────────────────────────────────────────────────────────

const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionReply {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Default, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingReply {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Default, Deserialize)]
struct ErrorReply {
    error: Option<ErrorDetail>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl CompletionReply {
    fn into_response(self, fallback_model: &str) -> Result<LlmResponse, LlmError> {
        let content = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Malformed("missing choices[0].message.content".into()))?;
        Ok(LlmResponse {
            content,
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
            prompt_tokens: self.usage.prompt_tokens,
            completion_tokens: self.usage.completion_tokens,
        })
    }
}

/// Body text of a 2xx reply, or `ApiError` carrying the provider's message.
async fn read_success(resp: reqwest::Response) -> Result<String, LlmError> {
    let status = resp.status();
    let text = resp.text().await?;
    if status.is_success() {
        return Ok(text);
    }
    let reply: ErrorReply = serde_json::from_str(&text).unwrap_or_default();
    let message = reply
        .error
        .and_then(|e| e.message)
        .or(reply.message)
        .unwrap_or_else(|| "unknown API error".to_string());
    tracing::warn!(status = status.as_u16(), body = %text, "LLM backend returned an error");
    Err(LlmError::ApiError { status: status.as_u16(), message })
}

// ── OpenAI-compatible endpoint (Groq, OpenAI, vLLM, Ollama /v1, ...) ────────

pub struct OpenAiCompatibleBackend {
    base_url: String,
    model: String,
    embedding_model: Option<String>,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatibleBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: Option<SecretString>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            embedding_model: None,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = Some(model.into());
        self
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<String, LlmError> {
        let url = format!("{}/v1/{path}", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key.expose_secret());
        }
        read_success(req.send().await?).await
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = CompletionBody {
            model: req.model.as_deref().unwrap_or(&self.model),
            messages: &req.messages,
            max_tokens: req.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: req.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };
        let text = self.post("chat/completions", &body).await?;
        serde_json::from_str::<CompletionReply>(&text)?.into_response(&self.model)
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = EmbeddingBody {
            model: self.embedding_model.as_deref().unwrap_or(&self.model),
            input: &texts,
        };
        let text = self.post("embeddings", &body).await?;
        let reply: EmbeddingReply = serde_json::from_str(&text)?;
        Ok(reply.data.into_iter().map(|item| item.embedding).collect())
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
