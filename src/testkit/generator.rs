//! Generator double that records calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::generation::{Evaluation, GenerationResult};
use crate::domain::quote::GenerationRequest;
use crate::error::{Error, Result};
use crate::port::Generator;

/// Returns canned content and counts how often it was asked.
pub struct RecordingGenerator {
    calls: AtomicUsize,
    failure: Option<String>,
    delay: Duration,
    requests: Mutex<Vec<(GenerationRequest, Address)>>,
    last_content: Mutex<Option<String>>,
}

impl Default for RecordingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            last_content: Mutex::new(None),
        }
    }

    /// A generator whose every call fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(GenerationRequest, Address)> {
        self.requests.lock().clone()
    }

    pub fn last_content(&self) -> Option<String> {
        self.last_content.lock().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
        account: Address,
    ) -> Result<GenerationResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().push((request.clone(), account));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(reason) = &self.failure {
            return Err(Error::Connection(reason.clone()));
        }

        let content = format!("{} joke #{call} about {}", request.kind, request.topic);
        *self.last_content.lock() = Some(content.clone());
        Ok(GenerationResult {
            content,
            evaluation: Evaluation::fallback(),
            model: request.model.clone(),
        })
    }
}
