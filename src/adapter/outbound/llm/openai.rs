//! OpenAI-compatible chat completion client.
//!
//! Provides an implementation of the [`Llm`] trait for any endpoint that
//! speaks the OpenAI Chat Completions protocol (OpenAI itself, Venice, and
//! similar gateways). The base URL and API key variable are configurable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Error, Result};
use crate::port::outbound::llm::{CompletionRequest, Llm};

/// Default API base, without the `/chat/completions` suffix.
pub const DEFAULT_BASE_URL: &str = "https://api.venice.ai/api/v1";

/// OpenAI-compatible API client.
#[derive(Debug)]
pub struct OpenAi {
    client: Client,
    api_key: String,
    base_url: String,
    /// Used when a request names no model.
    default_model: String,
}

impl OpenAi {
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_model: default_model.into(),
        }
    }

    /// Create a client reading its key from the environment variable `key_var`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] if the variable is not set.
    pub fn from_env(
        key_var: &'static str,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingField { field: key_var })?;
        Ok(Self::new(api_key, base_url, default_model))
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, request: &CompletionRequest) -> Request {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(Message {
                role: "system",
                content: system.clone(),
            });
        }
        messages.push(Message {
            role: "user",
            content: request.prompt.clone(),
        });
        Request {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages,
        }
    }
}

#[derive(Serialize)]
struct Request {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl Response {
    fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Connection("completion returned no content".into()))
    }
}

#[async_trait]
impl Llm for OpenAi {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_request(request);
        debug!(model = %body.model, max_tokens = body.max_tokens, "Sending completion request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .json::<Response>()
            .await?;

        response.into_content()
    }
}
