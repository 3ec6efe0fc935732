//! Domain validation errors.
//!
//! These are raised when a domain rule is violated, for example when the
//! paid-generation flow receives an event its current state cannot accept.
//!
//! # Examples
//!
//! ```
//! use paygate::domain::error::DomainError;
//! use paygate::domain::flow::{transition, FlowEvent, FlowState};
//!
//! let result = transition(&FlowState::idle(), &FlowEvent::QueryConfirmed);
//! assert!(matches!(result, Err(DomainError::InvalidTransition { .. })));
//! ```

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The flow received an event it cannot accept in its current state.
    #[error("cannot apply '{event}' while {from}")]
    InvalidTransition {
        /// Name of the state the flow was in.
        from: &'static str,
        /// Name of the rejected event.
        event: &'static str,
    },

    /// Token metadata reported an unusable decimals exponent.
    #[error("token reports {decimals} decimals, at most {max} are supported")]
    UnsupportedDecimals {
        /// Value read from the contract.
        decimals: u8,
        /// Largest supported exponent.
        max: u8,
    },

    /// Request kind text did not name a known kind.
    #[error("unknown request kind '{0}', expected one-liner, short or long")]
    UnknownRequestKind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_names_state_and_event() {
        let err = DomainError::InvalidTransition {
            from: "idle",
            event: "query-confirmed",
        };
        assert_eq!(err.to_string(), "cannot apply 'query-confirmed' while idle");
    }

    #[test]
    fn unknown_kind_lists_choices() {
        let err = DomainError::UnknownRequestKind("epic".into());
        assert!(err.to_string().contains("one-liner, short or long"));
    }
}
