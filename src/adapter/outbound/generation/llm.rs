//! LLM-backed joke generator with a second-model evaluation pass.

use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::generation::{Evaluation, GenerationResult};
use crate::domain::quote::GenerationRequest;
use crate::error::{ConfigError, Error, Result};
use crate::port::{CompletionRequest, Generator, Llm};

const GENERATION_SYSTEM: &str =
    "You are a professional comedian who creates jokes based on user specifications.";
const EVALUATION_SYSTEM: &str =
    "You are an expert joke evaluator who provides structured feedback.";

const GENERATION_MAX_TOKENS: u32 = 500;
const EVALUATION_MAX_TOKENS: u32 = 300;
const EVALUATION_TEMPERATURE: f64 = 0.5;

/// Generator that asks one model for content and a cheaper one to grade it.
pub struct LlmGenerator {
    llm: Arc<dyn Llm>,
    evaluation_model: String,
    /// Models a request may name. Empty accepts any.
    models: Vec<String>,
}

impl LlmGenerator {
    pub fn new(llm: Arc<dyn Llm>, evaluation_model: impl Into<String>, models: Vec<String>) -> Self {
        Self {
            llm,
            evaluation_model: evaluation_model.into(),
            models,
        }
    }

    fn build_prompt(request: &GenerationRequest) -> String {
        format!(
            "Create a {tone} {kind} joke about {topic}.\n\
             The joke should be entertaining and match the requested tone.\n\
             Only return the joke text without any additional commentary or explanation.",
            tone = request.tone,
            kind = request.kind,
            topic = request.topic,
        )
    }

    fn build_evaluation_prompt(content: &str, request: &GenerationRequest) -> String {
        format!(
            r#"Analyze the following joke and provide an evaluation:

Joke: "{content}"

Parameters used to generate this joke:
- Topic: {topic}
- Tone: {tone}
- Type: {kind}

Evaluate the joke on these criteria:
1. Humor Level (Hilarious, Funny, Amusing, Mild, or Flat)
2. Appropriateness (Family-friendly, Appropriate, Edgy, Inappropriate, or Offensive)
3. Originality (Brilliant, Original, Decent, Common, or Cliché)

Also provide a brief feedback comment (1-2 sentences) on the joke.

Format your response as a JSON object with the following structure:
{{
  "humorLevel": "one of the options above",
  "appropriateness": "one of the options above",
  "originality": "one of the options above",
  "feedback": "your brief feedback"
}}

Only return the JSON object, nothing else."#,
            topic = request.topic,
            tone = request.tone,
            kind = request.kind,
        )
    }

    /// Grade `content`. Never fails: a bad reply or a failed call yields
    /// neutral scores.
    async fn evaluate(&self, content: &str, request: &GenerationRequest) -> Evaluation {
        let completion = CompletionRequest::new(Self::build_evaluation_prompt(content, request))
            .with_model(&self.evaluation_model)
            .with_system(EVALUATION_SYSTEM)
            .with_temperature(EVALUATION_TEMPERATURE)
            .with_max_tokens(EVALUATION_MAX_TOKENS);

        match self.llm.complete(&completion).await {
            Ok(reply) => parse_evaluation(&reply).unwrap_or_else(|e| {
                warn!(error = %e, "Evaluation reply unparsable, using fallback");
                Evaluation::fallback()
            }),
            Err(e) => {
                warn!(error = %e, model = %self.evaluation_model, "Evaluation call failed");
                Evaluation::unavailable(&e.to_string())
            }
        }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    fn name(&self) -> &'static str {
        "llm"
    }

    fn supports(&self, model: &str) -> bool {
        self.models.is_empty() || self.models.iter().any(|m| m == model)
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        account: Address,
    ) -> Result<GenerationResult> {
        if !self.supports(&request.model) {
            return Err(ConfigError::InvalidValue {
                field: "model",
                reason: format!("unknown model '{}'", request.model),
            }
            .into());
        }

        let completion = CompletionRequest::new(Self::build_prompt(request))
            .with_model(&request.model)
            .with_system(GENERATION_SYSTEM)
            .with_temperature(request.creativity)
            .with_max_tokens(GENERATION_MAX_TOKENS);

        let content = self.llm.complete(&completion).await?.trim().to_string();
        debug!(provider = self.llm.name(), account = %account, "Generation complete");

        let evaluation = self.evaluate(&content, request).await;
        info!(
            model = %request.model,
            kind = %request.kind,
            humor = %evaluation.humor_level,
            "Generated content"
        );

        Ok(GenerationResult {
            content,
            evaluation,
            model: request.model.clone(),
        })
    }
}

fn parse_evaluation(text: &str) -> Result<Evaluation> {
    let json = extract_json(text)?;
    serde_json::from_str(json).map_err(|e| Error::Parse(format!("Invalid evaluation JSON: {e}")))
}

fn extract_json(text: &str) -> Result<&str> {
    // Find JSON in markdown code block or raw
    if let Some(start) = text.find("```json") {
        let start = start + 7;
        let end = text[start..]
            .find("```")
            .map_or(text.len(), |i| start + i);
        Ok(text[start..end].trim())
    } else if let Some(start) = text.find('{') {
        let end = text.rfind('}').map_or(text.len(), |i| i + 1);
        Ok(&text[start..end])
    } else {
        Err(Error::Parse("No JSON found in response".into()))
    }
}
