//! Output of a paid generation.

use serde::{Deserialize, Serialize};

/// Reviewer scores attached to generated content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub humor_level: String,
    pub appropriateness: String,
    pub originality: String,
    pub feedback: String,
}

impl Evaluation {
    /// Neutral scores used when the reviewer reply cannot be parsed.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            humor_level: "Amusing".into(),
            appropriateness: "Appropriate".into(),
            originality: "Decent".into(),
            feedback: "This joke meets the requested parameters.".into(),
        }
    }

    /// Neutral scores used when the reviewer call itself failed.
    #[must_use]
    pub fn unavailable(reason: &str) -> Self {
        Self {
            feedback: format!("Unable to properly evaluate this joke: {reason}"),
            ..Self::fallback()
        }
    }
}

/// Generated content together with its evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub content: String,
    pub evaluation: Evaluation,
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_reads_camel_case_json() {
        let json = r#"{"humorLevel":"Hilarious","appropriateness":"Appropriate",
            "originality":"Fresh","feedback":"Great timing."}"#;
        let eval: Evaluation = serde_json::from_str(json).unwrap();
        assert_eq!(eval.humor_level, "Hilarious");
        assert_eq!(eval.feedback, "Great timing.");
    }

    #[test]
    fn unavailable_keeps_neutral_scores() {
        let eval = Evaluation::unavailable("timeout");
        assert_eq!(eval.humor_level, "Amusing");
        assert_eq!(eval.feedback, "Unable to properly evaluate this joke: timeout");
    }
}
