use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{FlowAction, FlowEvent, FlowState, TransitionOutcome};

/// Transition table for the request/hold/confirm cycle.
#[derive(Clone, Copy, Debug, Default)]
pub struct QuoteFlow;

impl QuoteFlow {
    pub fn initial_state(&self) -> FlowState {
        FlowState::Request
    }

    pub fn transition(
        &self,
        current: FlowState,
        event: FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        use FlowAction::{CommitQuote, StoreHold};
        use FlowEvent::{
            ConfirmationAccepted, ConfirmationRejected, HoldMissing, RequestPriced,
            RequestRejected,
        };
        use FlowState::{Committed, Held, Request};

        let (to, actions) = match (current, event) {
            (_, RequestPriced) => (Held, vec![StoreHold]),
            // Invalid request input never touches an outstanding hold.
            (Held, RequestRejected) => (Held, vec![]),
            (Request, RequestRejected) | (Committed, RequestRejected) => (Request, vec![]),
            (Request, HoldMissing) | (Committed, HoldMissing) => (Request, vec![]),
            (Held, ConfirmationAccepted) => (Committed, vec![CommitQuote]),
            // The hold was consumed by the confirm attempt and is not restored.
            (Held, ConfirmationRejected) => (Request, vec![]),
            _ => return Err(FlowTransitionError::InvalidTransition { state: current, event }),
        };

        Ok(TransitionOutcome { from: current, to, event, actions })
    }
}

pub struct FlowEngine {
    flow: QuoteFlow,
}

impl FlowEngine {
    pub fn new(flow: QuoteFlow) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> FlowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: FlowState,
        event: FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: FlowState,
        event: FlowEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine {
    fn default() -> Self {
        Self::new(QuoteFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
}
