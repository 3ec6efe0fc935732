//! State machine of a single paid generation.
//!
//! The flow is a pure function from `(state, event)` to the next state so
//! every path can be tested without a ledger. Wallet cancellation always
//! lands in [`FlowState::Idle`] with a notice and never in
//! [`FlowState::Failed`]. Terminal states accept a new [`FlowEvent::Start`].
//!
//! ```text
//! idle ─start─▶ estimating ─sufficient──────────────────────────▶ submitting
//!                    │                                                │
//!                    └─insufficient─▶ approving ─submitted─▶ awaiting-approval
//!                                                                     │ confirmed
//! submitting ─submitted─▶ awaiting-query ─confirmed─▶ authorized      ▼
//!                                                                submitting
//! ```

use alloy_primitives::TxHash;

use super::error::DomainError;
use super::transaction::TxKind;
use crate::error::GateError;

/// Why the flow came back to idle without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Cancelled,
    /// The approval or query of `tx` outlived the stuck ceiling.
    TimedOut { kind: TxKind, tx: TxHash },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle { notice: Option<Notice> },
    Estimating { cost: u64 },
    Approving { cost: u64 },
    AwaitingApproval { cost: u64, tx: TxHash },
    Submitting { cost: u64 },
    AwaitingQuery { cost: u64, tx: TxHash },
    Authorized { tx: TxHash },
    Failed { error: GateError },
}

impl Default for FlowState {
    fn default() -> Self {
        Self::idle()
    }
}

impl FlowState {
    #[must_use]
    pub const fn idle() -> Self {
        Self::Idle { notice: None }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle { .. } => "idle",
            Self::Estimating { .. } => "estimating",
            Self::Approving { .. } => "approving",
            Self::AwaitingApproval { .. } => "awaiting-approval",
            Self::Submitting { .. } => "submitting",
            Self::AwaitingQuery { .. } => "awaiting-query",
            Self::Authorized { .. } => "authorized",
            Self::Failed { .. } => "failed",
        }
    }

    /// States from which a new flow may start.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Idle { .. } | Self::Authorized { .. } | Self::Failed { .. }
        )
    }

    /// Cost carried by an active flow.
    #[must_use]
    pub const fn cost(&self) -> Option<u64> {
        match self {
            Self::Estimating { cost }
            | Self::Approving { cost }
            | Self::AwaitingApproval { cost, .. }
            | Self::Submitting { cost }
            | Self::AwaitingQuery { cost, .. } => Some(*cost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowEvent {
    Start { cost: u64 },
    AllowanceSufficient,
    AllowanceInsufficient,
    ApprovalSubmitted { tx: TxHash },
    ApprovalConfirmed,
    QuerySubmitted { tx: TxHash },
    QueryConfirmed,
    Cancelled,
    TimedOut { tx: TxHash },
    Failed { error: GateError },
}

impl FlowEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::AllowanceSufficient => "allowance-sufficient",
            Self::AllowanceInsufficient => "allowance-insufficient",
            Self::ApprovalSubmitted { .. } => "approval-submitted",
            Self::ApprovalConfirmed => "approval-confirmed",
            Self::QuerySubmitted { .. } => "query-submitted",
            Self::QueryConfirmed => "query-confirmed",
            Self::Cancelled => "cancelled",
            Self::TimedOut { .. } => "timed-out",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Compute the next state.
///
/// # Errors
///
/// Returns [`DomainError::InvalidTransition`] when `event` is not accepted in
/// `state`.
pub fn transition(state: &FlowState, event: &FlowEvent) -> Result<FlowState, DomainError> {
    use FlowEvent as E;
    use FlowState as S;

    let next = match (state, event) {
        (s, E::Start { cost }) if s.is_terminal() => S::Estimating { cost: *cost },

        (S::Estimating { cost }, E::AllowanceSufficient) => S::Submitting { cost: *cost },
        (S::Estimating { cost }, E::AllowanceInsufficient) => S::Approving { cost: *cost },

        (S::Approving { cost }, E::ApprovalSubmitted { tx }) => S::AwaitingApproval {
            cost: *cost,
            tx: *tx,
        },
        (S::AwaitingApproval { cost, .. }, E::ApprovalConfirmed) => S::Submitting { cost: *cost },

        (S::Submitting { cost }, E::QuerySubmitted { tx }) => S::AwaitingQuery {
            cost: *cost,
            tx: *tx,
        },
        (S::AwaitingQuery { tx, .. }, E::QueryConfirmed) => S::Authorized { tx: *tx },

        (S::AwaitingApproval { .. }, E::TimedOut { tx }) => S::Idle {
            notice: Some(Notice::TimedOut {
                kind: TxKind::Approval,
                tx: *tx,
            }),
        },
        (S::AwaitingQuery { .. }, E::TimedOut { tx }) => S::Idle {
            notice: Some(Notice::TimedOut {
                kind: TxKind::Query,
                tx: *tx,
            }),
        },

        (s, E::Cancelled) if !s.is_terminal() => S::Idle {
            notice: Some(Notice::Cancelled),
        },
        (s, E::Failed { error }) if !s.is_terminal() => {
            if error.is_cancellation() {
                S::Idle {
                    notice: Some(Notice::Cancelled),
                }
            } else {
                S::Failed {
                    error: error.clone(),
                }
            }
        }

        (s, e) => {
            return Err(DomainError::InvalidTransition {
                from: s.name(),
                event: e.name(),
            })
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(byte: u8) -> TxHash {
        TxHash::repeat_byte(byte)
    }

    fn run(events: &[FlowEvent]) -> FlowState {
        events.iter().fold(FlowState::idle(), |state, event| {
            transition(&state, event).unwrap()
        })
    }

    #[test]
    fn happy_path_with_approval() {
        let state = run(&[
            FlowEvent::Start { cost: 5 },
            FlowEvent::AllowanceInsufficient,
            FlowEvent::ApprovalSubmitted { tx: tx(1) },
            FlowEvent::ApprovalConfirmed,
            FlowEvent::QuerySubmitted { tx: tx(2) },
            FlowEvent::QueryConfirmed,
        ]);
        assert_eq!(state, FlowState::Authorized { tx: tx(2) });
    }

    #[test]
    fn sufficient_allowance_skips_approval() {
        let state = run(&[FlowEvent::Start { cost: 3 }, FlowEvent::AllowanceSufficient]);
        assert_eq!(state, FlowState::Submitting { cost: 3 });
    }

    #[test]
    fn cancellation_returns_to_idle_not_failed() {
        let state = run(&[
            FlowEvent::Start { cost: 5 },
            FlowEvent::AllowanceInsufficient,
            FlowEvent::Failed {
                error: GateError::UserCancelled,
            },
        ]);
        assert_eq!(
            state,
            FlowState::Idle {
                notice: Some(Notice::Cancelled)
            }
        );
    }

    #[test]
    fn other_failures_are_failed() {
        let state = run(&[
            FlowEvent::Start { cost: 5 },
            FlowEvent::AllowanceSufficient,
            FlowEvent::Failed {
                error: GateError::AlreadyInProgress,
            },
        ]);
        assert_eq!(state.name(), "failed");
    }

    #[test]
    fn timeout_while_waiting_goes_idle_with_hash() {
        let state = run(&[
            FlowEvent::Start { cost: 4 },
            FlowEvent::AllowanceSufficient,
            FlowEvent::QuerySubmitted { tx: tx(9) },
            FlowEvent::TimedOut { tx: tx(9) },
        ]);
        assert_eq!(
            state,
            FlowState::Idle {
                notice: Some(Notice::TimedOut {
                    kind: TxKind::Query,
                    tx: tx(9)
                })
            }
        );
    }

    #[test]
    fn approval_timeout_notice_names_the_approval() {
        let state = run(&[
            FlowEvent::Start { cost: 4 },
            FlowEvent::AllowanceInsufficient,
            FlowEvent::ApprovalSubmitted { tx: tx(5) },
            FlowEvent::TimedOut { tx: tx(5) },
        ]);
        assert_eq!(
            state,
            FlowState::Idle {
                notice: Some(Notice::TimedOut {
                    kind: TxKind::Approval,
                    tx: tx(5)
                })
            }
        );
    }

    #[test]
    fn terminal_states_accept_start() {
        let failed = FlowState::Failed {
            error: GateError::NotReady,
        };
        let authorized = FlowState::Authorized { tx: tx(3) };
        for state in [FlowState::idle(), failed, authorized] {
            let next = transition(&state, &FlowEvent::Start { cost: 1 }).unwrap();
            assert_eq!(next, FlowState::Estimating { cost: 1 });
        }
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let err = transition(&FlowState::Approving { cost: 2 }, &FlowEvent::QueryConfirmed)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "approving",
                event: "query-confirmed"
            }
        );
        assert!(transition(&FlowState::Submitting { cost: 2 }, &FlowEvent::Start { cost: 2 }).is_err());
    }
}
