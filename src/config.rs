//! Process configuration.
//!
//! One [`AppConfig`] is built at startup from the environment and passed by
//! reference into the components that need it. Nothing here is read at
//! import time and there are no process-global clients; lifecycle belongs to
//! `main`.

use std::path::PathBuf;

/// Generation-service settings.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    /// Base URL of the chat-completions API.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Model identifier, also the cost-table key.
    pub model: String,
}

/// Full process configuration.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    /// Base URL of the vector-store retrieval service, if configured.
    pub retrieval_url: Option<String>,
    /// Bearer token required by the HTTP API; None disables auth.
    pub api_key: Option<String>,
    /// Where evaluation logs and reports are written.
    pub eval_output_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let llm = LlmConfig {
            base_url: std::env::var("PLANFLOW_LLM_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("PLANFLOW_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
        };

        Self {
            llm,
            retrieval_url: std::env::var("PLANFLOW_RETRIEVAL_URL").ok(),
            api_key: std::env::var("PLANFLOW_API_KEY").ok(),
            eval_output_dir: std::env::var("EVAL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_eval_dir()),
        }
    }
}

fn default_eval_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planflow_eval")
        .join("logs")
}
