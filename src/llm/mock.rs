use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ChatClient, ChatRequest, ChatResponse, LlmError, TokenUsage};

/// Canned-response chat client for tests and mock evaluation runs.
///
/// Responses are consumed in order; once the queue is empty the default text
/// is returned indefinitely. `fail_all` makes every call error, which is how
/// reconciliation failure paths are exercised.
pub struct MockChatClient {
    queue: Mutex<VecDeque<String>>,
    default: String,
    fail_all: bool,
}

impl MockChatClient {
    /// A client that always returns `default`.
    pub fn with_default(default: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: default.into(),
            fail_all: false,
        }
    }

    /// A client that returns each queued response once, then the default.
    pub fn with_responses(responses: Vec<String>, default: impl Into<String>) -> Self {
        Self {
            queue: Mutex::new(responses.into()),
            default: default.into(),
            fail_all: false,
        }
    }

    /// A client whose every call fails with a service error.
    pub fn failing() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default: String::new(),
            fail_all: true,
        }
    }

    /// Queue one more response.
    pub fn push(&self, response: impl Into<String>) {
        self.queue
            .lock()
            .expect("mock queue lock poisoned")
            .push_back(response.into());
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        if self.fail_all {
            return Err(LlmError::Api {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "mock failure".to_string(),
            });
        }
        let text = self
            .queue
            .lock()
            .expect("mock queue lock poisoned")
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        Ok(ChatResponse {
            text,
            usage: TokenUsage {
                prompt_tokens: 700,
                completion_tokens: 2200,
            },
        })
    }

    fn model(&self) -> &str {
        "mock"
    }
}
