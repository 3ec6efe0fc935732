//! Generation requests and the token cost they are charged.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use crate::error::{GateError, GateResult};

/// Lowest accepted creativity (sampling temperature).
pub const MIN_CREATIVITY: f64 = 0.1;
/// Highest accepted creativity.
pub const MAX_CREATIVITY: f64 = 1.0;

const BASE_COST: i64 = 3;
const LONG_SURCHARGE: i64 = 2;
const ONE_LINER_DISCOUNT: i64 = 1;
const MIN_COST: i64 = 1;

/// Length class of the requested content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    OneLiner,
    #[default]
    Short,
    Long,
}

impl RequestKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneLiner => "one-liner",
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-liner" | "oneliner" | "one_liner" => Ok(Self::OneLiner),
            "short" => Ok(Self::Short),
            "long" => Ok(Self::Long),
            other => Err(DomainError::UnknownRequestKind(other.to_string())),
        }
    }
}

/// Parameters of a paid generation, captured at submission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub tone: String,
    pub kind: RequestKind,
    pub creativity: f64,
    pub model: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            tone: "witty".into(),
            kind: RequestKind::default(),
            creativity: 0.7,
            model: model.into(),
        }
    }

    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = tone.into();
        self
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub const fn with_creativity(mut self, creativity: f64) -> Self {
        self.creativity = creativity;
        self
    }

    /// Check the request before any cost is quoted or charged.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidRequest`] for an empty topic or model, or
    /// creativity outside `0.1..=1.0`.
    pub fn validate(&self) -> GateResult<()> {
        if self.topic.trim().is_empty() {
            return Err(GateError::InvalidRequest {
                reason: "topic must not be empty".into(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(GateError::InvalidRequest {
                reason: "model must not be empty".into(),
            });
        }
        if !(MIN_CREATIVITY..=MAX_CREATIVITY).contains(&self.creativity) {
            return Err(GateError::InvalidRequest {
                reason: format!(
                    "creativity {} outside {MIN_CREATIVITY}..={MAX_CREATIVITY}",
                    self.creativity
                ),
            });
        }
        Ok(())
    }
}

/// Whole-token cost of a generation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryCostQuote {
    tokens: u64,
}

impl QueryCostQuote {
    /// Price a request: base 3, long +2, one-liner -1, plus
    /// `round(creativity * 2)`, never below 1.
    #[must_use]
    pub fn for_request(request: &GenerationRequest) -> Self {
        let mut cost = BASE_COST;
        match request.kind {
            RequestKind::Long => cost += LONG_SURCHARGE,
            RequestKind::OneLiner => cost -= ONE_LINER_DISCOUNT,
            RequestKind::Short => {}
        }
        // Rounds half away from zero
        cost += (request.creativity * 2.0).round() as i64;
        Self {
            tokens: cost.max(MIN_COST) as u64,
        }
    }

    #[must_use]
    pub const fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Cost as a decimal token amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::from(self.tokens)
    }
}

impl fmt::Display for QueryCostQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens)
    }
}
