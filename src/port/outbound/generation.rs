//! Generation collaborator port.
//!
//! The gate hands a captured [`GenerationRequest`] to a [`Generator`] only
//! after the request's query transaction has been mined.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::domain::generation::GenerationResult;
use crate::domain::quote::GenerationRequest;
use crate::error::Result;

/// Produces content for an authorized request.
///
/// # Thread Safety
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Errors
///
/// [`generate`](Self::generate) fails when the upstream model call fails.
/// By the time it is called the request has already been paid for.
#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `model` can serve a request. Checked before any payment.
    fn supports(&self, _model: &str) -> bool {
        true
    }

    /// Generate content for `request` on behalf of `account`.
    async fn generate(&self, request: &GenerationRequest, account: Address)
        -> Result<GenerationResult>;
}
