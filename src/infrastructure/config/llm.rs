//! Generation model configuration.
//!
//! The API key is read from the environment variable named by
//! `api_key_env` at runtime, never from the config file.

use serde::Deserialize;

/// Completion endpoint and model selection.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API base, without `/chat/completions`.
    ///
    /// Defaults to Venice.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used when a request names none.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Cheaper model that grades generated content.
    #[serde(default = "default_evaluation_model")]
    pub evaluation_model: String,

    /// Models a request may name. Requests for other models are refused
    /// before any payment.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            default_model: default_model(),
            evaluation_model: default_evaluation_model(),
            models: default_models(),
        }
    }
}

impl LlmConfig {
    /// API key from the configured environment variable, if set.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

fn default_base_url() -> String {
    crate::adapter::outbound::llm::openai::DEFAULT_BASE_URL.into()
}

fn default_api_key_env() -> String {
    "VENICE_API_KEY".into()
}

fn default_model() -> String {
    "mistral-31-24b".into()
}

fn default_evaluation_model() -> String {
    "anthropic/claude-3-haiku".into()
}

fn default_models() -> Vec<String> {
    vec!["mistral-31-24b".into(), "llama-3.2-3b".into()]
}
