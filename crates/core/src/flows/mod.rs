pub mod engine;
pub mod states;

pub use engine::{FlowEngine, FlowTransitionError, QuoteFlow};
pub use states::{FlowAction, FlowEvent, FlowState, TransitionOutcome};
