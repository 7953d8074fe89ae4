pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod gate;
pub mod ports;
pub mod pricing;
pub mod profile;
pub mod workflow;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use domain::customer::{CustomerContext, CustomerId, DeliveryProfile, ProfileForm, SessionId};
pub use domain::quote::{CommittedQuote, PricedQuote, QuoteForm, QuoteId, QuoteRequest};
pub use domain::validation::FieldErrors;
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use gate::{GateDecision, Gated, ProfileGate, PROFILE_CREATE_PATH};
pub use ports::{HoldStore, ProfileDirectory, QuoteStore, StoreError};
pub use pricing::{
    compute_price, price_with_trace, total_due, FuelPricingEngine, PricingEngine, PricingTrace,
};
pub use profile::{ProfileOutcome, ProfilePage, ProfileService, PROFILE_EDIT_PATH};
pub use workflow::{
    Caller, ConfirmOutcome, QuoteWorkflow, RequestDefaults, RequestOutcome, ReviewOutcome,
};
