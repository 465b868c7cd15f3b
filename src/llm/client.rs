use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the text-generation service boundary.
///
/// Everything the service can do wrong is caught here and surfaced as a typed
/// error; callers convert these into user-facing failures and never let them
/// mutate stored plans.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unauthorized: API key missing or invalid")]
    Unauthorized,

    #[error("rate limited by the generation service")]
    RateLimited,

    #[error("generation service error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    #[error("generation service returned no content")]
    EmptyResponse,
}

/// One chat-style request: a system instruction plus user content.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Token usage reported by the service for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The raw text of one completion plus its usage accounting.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub usage: TokenUsage,
}

/// A chat-completion backend.
///
/// The trait is the seam between plan generation and the outside world: the
/// production implementation speaks HTTP, tests substitute canned responses.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;

    /// Model identifier used for cost estimation in the evaluation harness.
    fn model(&self) -> &str;
}

/// HTTP client for an OpenAI-style chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireChoiceMessage,
}

#[derive(Deserialize)]
struct WireChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

impl HttpChatClient {
    /// Create with explicit configuration.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = WireRequest {
            model: &self.model,
            temperature: request.temperature,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let mut req = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized,
                StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited,
                _ => LlmError::Api { status, body },
            });
        }

        let wire: WireResponse = response.json().await?;
        let usage = wire
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        let text = wire
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(ChatResponse { text, usage })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
