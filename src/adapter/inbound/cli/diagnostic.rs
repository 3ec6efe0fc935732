//! Miette-based error diagnostics for CLI error presentation.
//!
//! Renders configuration failures with the offending file content, a
//! labeled span and a help suggestion.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, Error};

/// Configuration error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(paygate::config))]
pub struct ConfigDiagnostic {
    /// Human-readable error message.
    pub message: String,

    /// Source content (typically the configuration file).
    #[source_code]
    pub src: String,

    /// Byte offset and length of the problematic region.
    #[label("here")]
    pub span: Option<SourceSpan>,

    /// Optional help text with suggestions for fixing the error.
    #[help]
    pub help: Option<String>,
}

impl ConfigDiagnostic {
    /// Create a configuration error pointing at `offset..offset + len`.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        src: impl Into<String>,
        offset: usize,
        len: usize,
    ) -> Self {
        Self {
            message: message.into(),
            src: src.into(),
            span: Some((offset, len).into()),
            help: None,
        }
    }

    /// Add a help suggestion to the error.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Build a diagnostic for `err` raised while loading `src`.
    ///
    /// Returns `None` for errors unrelated to the file content.
    #[must_use]
    pub fn from_error(err: &Error, src: &str) -> Option<Self> {
        let Error::Config(config) = err else {
            return None;
        };
        match config {
            ConfigError::Parse(parse) => {
                let span = parse.span().unwrap_or(0..0);
                Some(
                    Self::new(parse.message(), src, span.start, span.len())
                        .with_help("check the TOML syntax near the marked location"),
                )
            }
            ConfigError::InvalidValue { field, reason } => {
                let diagnostic = Self {
                    message: format!("invalid value for {field}: {reason}"),
                    src: src.to_string(),
                    span: locate_key(src, field),
                    help: None,
                };
                Some(diagnostic.with_help(format!("fix `{field}` and run `paygate check config`")))
            }
            ConfigError::MissingField { .. } | ConfigError::ReadFile(_) => None,
        }
    }
}

/// Span of the first `key =` assignment in `src`.
fn locate_key(src: &str, key: &str) -> Option<SourceSpan> {
    let mut offset = 0;
    for line in src.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed
            .strip_prefix(key)
            .is_some_and(|rest| rest.trim_start().starts_with('='))
        {
            let start = offset + (line.len() - trimmed.len());
            return Some((start, trimmed.trim_end().len()).into());
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::Config;

    #[test]
    fn parse_error_points_into_source() {
        let src = "[monitor]\npoll_initial_ms = \"fast\"\n";
        let err = Config::parse_toml(src).unwrap_err();
        let diagnostic = ConfigDiagnostic::from_error(&err, src).unwrap();
        let span = diagnostic.span.unwrap();
        assert!(span.offset() >= 10, "span should be on line two: {span:?}");
        assert!(diagnostic.help.is_some());
    }

    #[test]
    fn invalid_value_locates_key() {
        let src = "[query]\n  gas_limit = 0\n";
        let err = Config::parse_toml(src).unwrap_err();
        let diagnostic = ConfigDiagnostic::from_error(&err, src).unwrap();
        let span = diagnostic.span.unwrap();
        assert_eq!(&src[span.offset()..span.offset() + span.len()], "gas_limit = 0");
    }

    #[test]
    fn unrelated_errors_have_no_diagnostic() {
        let err = Error::Connection("down".into());
        assert!(ConfigDiagnostic::from_error(&err, "").is_none());
    }
}
