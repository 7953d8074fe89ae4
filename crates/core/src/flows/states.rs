use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    /// No pending hold; the customer is filling in the request form.
    Request,
    /// A priced quote is held for the session awaiting confirmation.
    Held,
    /// The held quote was persisted. Terminal for the current cycle.
    Committed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    RequestPriced,
    RequestRejected,
    HoldMissing,
    ConfirmationAccepted,
    ConfirmationRejected,
}

/// Store effects a transition requires. The workflow performs them in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    StoreHold,
    CommitQuote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
