//! Two-step quote workflow: price and hold, then confirm and commit.
//!
//! Every entry point runs behind the [`ProfileGate`]. Confirmation always
//! consumes the session hold, so a hold is committed at most once.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use crate::domain::customer::{CustomerContext, CustomerId, SessionId};
use crate::domain::quote::{CommittedQuote, PricedQuote, QuoteForm, QuoteRequest};
use crate::domain::validation::FieldErrors;
use crate::errors::{ApplicationError, DomainError};
use crate::flows::{FlowAction, FlowEngine, FlowEvent, FlowState, TransitionOutcome};
use crate::gate::{Gated, ProfileGate};
use crate::pricing::{FuelPricingEngine, PricingEngine};
use crate::ports::{HoldStore, ProfileDirectory, QuoteStore};

pub const DEFAULT_HOME_STATE: &str = "TX";

/// Who is calling, resolved from the session before the workflow runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Caller {
    pub session_id: SessionId,
    pub customer_id: CustomerId,
    pub correlation_id: String,
}

impl Caller {
    pub fn new(
        session_id: SessionId,
        customer_id: CustomerId,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { session_id, customer_id, correlation_id: correlation_id.into() }
    }

    fn audit_context(&self) -> AuditContext {
        AuditContext::new(
            None,
            Some(self.session_id.0.clone()),
            self.correlation_id.clone(),
            self.customer_id.0.clone(),
        )
    }
}

/// Values used to pre-fill the request form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequestDefaults {
    pub delivery_address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    Held(PricedQuote),
    Invalid(FieldErrors),
    ProfileRequired(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewOutcome {
    Review(PricedQuote),
    NoHold,
    ProfileRequired(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmOutcome {
    Committed(CommittedQuote),
    /// The hold was consumed; it is echoed back so the review can be re-shown.
    Invalid {
        hold: PricedQuote,
        errors: FieldErrors,
    },
    NoHold,
    ProfileRequired(String),
}

pub struct QuoteWorkflow {
    gate: ProfileGate,
    profiles: Arc<dyn ProfileDirectory>,
    quotes: Arc<dyn QuoteStore>,
    holds: Arc<dyn HoldStore>,
    pricing: Arc<dyn PricingEngine>,
    audit: Arc<dyn AuditSink>,
    flow: FlowEngine,
    home_state: String,
}

impl QuoteWorkflow {
    pub fn new(
        profiles: Arc<dyn ProfileDirectory>,
        quotes: Arc<dyn QuoteStore>,
        holds: Arc<dyn HoldStore>,
    ) -> Self {
        Self {
            gate: ProfileGate::new(profiles.clone()),
            profiles,
            quotes,
            holds,
            pricing: Arc::new(FuelPricingEngine),
            audit: Arc::new(NoopAuditSink),
            flow: FlowEngine::default(),
            home_state: DEFAULT_HOME_STATE.to_string(),
        }
    }

    pub fn with_home_state(mut self, home_state: impl Into<String>) -> Self {
        self.home_state = home_state.into();
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_pricing_engine(mut self, pricing: Arc<dyn PricingEngine>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn home_state(&self) -> &str {
        &self.home_state
    }

    /// Pre-fill values for the request step, taken from the delivery profile.
    pub async fn start_request(
        &self,
        caller: &Caller,
    ) -> Result<Gated<RequestDefaults>, ApplicationError> {
        let gated = self
            .gate
            .guard(Some(&caller.customer_id), || async {
                let profile = self.profiles.get_profile(&caller.customer_id).await?;
                Ok::<_, ApplicationError>(RequestDefaults {
                    delivery_address: profile.map(|profile| profile.address1),
                })
            })
            .await?;
        self.note_gate(caller, &gated, "start_request");
        Ok(gated)
    }

    pub async fn request_quote(
        &self,
        caller: &Caller,
        form: &QuoteForm,
    ) -> Result<RequestOutcome, ApplicationError> {
        let gated = self
            .gate
            .guard(Some(&caller.customer_id), || self.price_and_hold(caller, form))
            .await?;
        self.note_gate(caller, &gated, "request_quote");
        Ok(match gated {
            Gated::Proceeded(outcome) => outcome,
            Gated::Redirected(target) => RequestOutcome::ProfileRequired(target),
        })
    }

    /// Shows the pending hold without consuming it.
    pub async fn view_hold(&self, caller: &Caller) -> Result<ReviewOutcome, ApplicationError> {
        let gated = self
            .gate
            .guard(Some(&caller.customer_id), || async {
                Ok::<_, ApplicationError>(self.holds.peek(&caller.session_id).await?)
            })
            .await?;
        self.note_gate(caller, &gated, "view_hold");
        Ok(match gated {
            Gated::Proceeded(Some(hold)) => ReviewOutcome::Review(hold),
            Gated::Proceeded(None) => ReviewOutcome::NoHold,
            Gated::Redirected(target) => ReviewOutcome::ProfileRequired(target),
        })
    }

    pub async fn confirm_quote(
        &self,
        caller: &Caller,
        form: &QuoteForm,
    ) -> Result<ConfirmOutcome, ApplicationError> {
        let gated = self
            .gate
            .guard(Some(&caller.customer_id), || self.confirm_held(caller, form))
            .await?;
        self.note_gate(caller, &gated, "confirm_quote");
        Ok(match gated {
            Gated::Proceeded(outcome) => outcome,
            Gated::Redirected(target) => ConfirmOutcome::ProfileRequired(target),
        })
    }

    /// Committed quotes for the caller, oldest first.
    pub async fn history(
        &self,
        caller: &Caller,
    ) -> Result<Gated<Vec<CommittedQuote>>, ApplicationError> {
        let gated = self
            .gate
            .guard(Some(&caller.customer_id), || async {
                Ok::<_, ApplicationError>(
                    self.quotes.list_by_customer(&caller.customer_id).await?,
                )
            })
            .await?;
        self.note_gate(caller, &gated, "history");
        Ok(gated)
    }

    /// Drops holds that were not refreshed within `max_age`, so abandoned
    /// sessions do not accumulate.
    pub async fn purge_stale_holds(&self, max_age: Duration) -> Result<u64, ApplicationError> {
        let removed = self.holds.purge_before(Utc::now() - max_age).await?;
        if removed > 0 {
            let context = AuditContext::new(None, None, "hold-sweep", "system");
            self.audit.emit(
                AuditEvent::new(
                    &context,
                    "quote.holds_expired",
                    AuditCategory::Persistence,
                    AuditOutcome::Success,
                )
                .with_metadata("removed", removed.to_string())
                .with_metadata("max_age_secs", max_age.num_seconds().to_string()),
            );
        }
        Ok(removed)
    }

    /// Resolves pricing facts for the customer from the current profile and
    /// quote history. `None` when the customer has no profile.
    pub async fn resolve_context(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<CustomerContext>, ApplicationError> {
        let Some(profile) = self.profiles.get_profile(customer_id).await? else {
            return Ok(None);
        };
        let has_prior_quotes = self.quotes.has_any_quote(customer_id).await?;

        Ok(Some(CustomerContext {
            customer_id: customer_id.clone(),
            is_in_state: profile.is_in_state(&self.home_state),
            has_prior_quotes,
        }))
    }

    async fn price_and_hold(
        &self,
        caller: &Caller,
        form: &QuoteForm,
    ) -> Result<RequestOutcome, ApplicationError> {
        let audit = caller.audit_context();
        let current = match self.holds.peek(&caller.session_id).await? {
            Some(_) => FlowState::Held,
            None => FlowState::Request,
        };

        let request = match form.validate() {
            Ok(request) => request,
            Err(errors) => {
                self.transition(current, FlowEvent::RequestRejected, &audit)?;
                return Ok(RequestOutcome::Invalid(errors));
            }
        };

        let Some(quote) = self.price(&caller.customer_id, request).await? else {
            return Ok(RequestOutcome::ProfileRequired(self.gate.redirect_target().to_string()));
        };

        let outcome = self.transition(current, FlowEvent::RequestPriced, &audit)?;
        self.perform(&outcome, caller, &audit, &quote).await?;

        Ok(RequestOutcome::Held(quote))
    }

    async fn confirm_held(
        &self,
        caller: &Caller,
        form: &QuoteForm,
    ) -> Result<ConfirmOutcome, ApplicationError> {
        let audit = caller.audit_context();

        let Some(hold) = self.holds.take(&caller.session_id).await? else {
            self.transition(FlowState::Request, FlowEvent::HoldMissing, &audit)?;
            return Ok(ConfirmOutcome::NoHold);
        };

        let request = match form.validate() {
            Ok(request) => request,
            Err(errors) => {
                self.transition(FlowState::Held, FlowEvent::ConfirmationRejected, &audit)?;
                return Ok(ConfirmOutcome::Invalid { hold, errors });
            }
        };
        let errors = differences(hold.request(), &request);
        if !errors.is_empty() {
            self.transition(FlowState::Held, FlowEvent::ConfirmationRejected, &audit)?;
            return Ok(ConfirmOutcome::Invalid { hold, errors });
        }

        // Same request as reviewed; the price is recomputed rather than read from the hold.
        let Some(quote) = self.price(&caller.customer_id, request).await? else {
            return Ok(ConfirmOutcome::ProfileRequired(self.gate.redirect_target().to_string()));
        };

        let outcome = self.transition(FlowState::Held, FlowEvent::ConfirmationAccepted, &audit)?;
        match self.perform(&outcome, caller, &audit, &quote).await? {
            Some(committed) => Ok(ConfirmOutcome::Committed(committed)),
            None => Err(ApplicationError::Domain(DomainError::InvariantViolation(
                "accepted confirmation did not commit a quote".to_string(),
            ))),
        }
    }

    /// Runs the store effects named by `outcome`. Returns the committed quote
    /// when one of them was a commit.
    async fn perform(
        &self,
        outcome: &TransitionOutcome,
        caller: &Caller,
        audit: &AuditContext,
        quote: &PricedQuote,
    ) -> Result<Option<CommittedQuote>, ApplicationError> {
        let mut committed = None;
        for action in &outcome.actions {
            match action {
                FlowAction::StoreHold => self.store_hold(caller, audit, quote).await?,
                FlowAction::CommitQuote => {
                    committed = Some(self.commit(caller, audit, quote.clone()).await?);
                }
            }
        }
        Ok(committed)
    }

    async fn store_hold(
        &self,
        caller: &Caller,
        audit: &AuditContext,
        quote: &PricedQuote,
    ) -> Result<(), ApplicationError> {
        self.holds.put(&caller.session_id, quote.clone()).await?;
        self.audit.emit(
            AuditEvent::new(audit, "quote.hold_created", AuditCategory::Pricing, AuditOutcome::Success)
                .with_metadata("gallons_requested", quote.gallons_requested().to_string())
                .with_metadata("unit_price", quote.unit_price().to_string())
                .with_metadata("total_due", quote.total_due().to_string()),
        );
        Ok(())
    }

    async fn commit(
        &self,
        caller: &Caller,
        audit: &AuditContext,
        quote: PricedQuote,
    ) -> Result<CommittedQuote, ApplicationError> {
        let committed = CommittedQuote::new(caller.customer_id.clone(), quote);
        let audit = audit.with_quote_id(committed.id.clone());

        match self.quotes.commit(committed.clone()).await {
            Ok(()) => {
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "quote.committed",
                        AuditCategory::Persistence,
                        AuditOutcome::Success,
                    )
                    .with_metadata("unit_price", committed.quote.unit_price().to_string())
                    .with_metadata("total_due", committed.quote.total_due().to_string()),
                );
                Ok(committed)
            }
            Err(error) => {
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "quote.commit_failed",
                        AuditCategory::Persistence,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                Err(error.into())
            }
        }
    }

    async fn price(
        &self,
        customer_id: &CustomerId,
        request: QuoteRequest,
    ) -> Result<Option<PricedQuote>, ApplicationError> {
        let Some(context) = self.resolve_context(customer_id).await? else {
            return Ok(None);
        };
        let unit_price = self.pricing.unit_price(request.gallons_requested, &context);
        Ok(Some(PricedQuote::new(request, unit_price)))
    }

    fn transition(
        &self,
        current: FlowState,
        event: FlowEvent,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, ApplicationError> {
        self.flow
            .apply_with_audit(current, event, self.audit.as_ref(), audit)
            .map_err(|error| ApplicationError::Domain(DomainError::from(error)))
    }

    fn note_gate<T>(&self, caller: &Caller, gated: &Gated<T>, operation: &str) {
        if let Gated::Redirected(target) = gated {
            self.audit.emit(
                AuditEvent::new(
                    &caller.audit_context(),
                    "gate.profile_required",
                    AuditCategory::Gate,
                    AuditOutcome::Rejected,
                )
                .with_metadata("operation", operation)
                .with_metadata("redirect", target.clone()),
            );
        }
    }
}

/// Field errors for every field the confirmation changed relative to the
/// quote the customer reviewed.
fn differences(reviewed: &QuoteRequest, submitted: &QuoteRequest) -> FieldErrors {
    const CHANGED: &str = "does not match the reviewed quote; request a new quote to change it";

    let mut errors = FieldErrors::new();
    if submitted.gallons_requested != reviewed.gallons_requested {
        errors.add("gallons_requested", CHANGED);
    }
    if submitted.delivery_address != reviewed.delivery_address {
        errors.add("delivery_address", CHANGED);
    }
    if submitted.delivery_date != reviewed.delivery_date {
        errors.add("delivery_date", CHANGED);
    }
    errors
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use crate::domain::customer::{CustomerId, DeliveryProfile, SessionId};
    use crate::domain::quote::{CommittedQuote, PricedQuote};
    use crate::ports::{HoldStore, ProfileDirectory, QuoteStore, StoreError};

    pub(crate) fn profile(customer_id: &str, state: &str) -> DeliveryProfile {
        DeliveryProfile {
            customer_id: CustomerId(customer_id.to_string()),
            full_name: "Dana Reyes".to_string(),
            address1: "123 Main St".to_string(),
            address2: None,
            city: "Houston".to_string(),
            state: state.to_string(),
            zipcode: "77001".to_string(),
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeProfiles {
        profiles: Mutex<HashMap<CustomerId, DeliveryProfile>>,
    }

    impl FakeProfiles {
        pub(crate) fn with(profiles: Vec<DeliveryProfile>) -> Self {
            Self {
                profiles: Mutex::new(
                    profiles.into_iter().map(|profile| (profile.customer_id.clone(), profile)).collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl ProfileDirectory for FakeProfiles {
        async fn get_profile(
            &self,
            customer_id: &CustomerId,
        ) -> Result<Option<DeliveryProfile>, StoreError> {
            Ok(self.profiles.lock().expect("profiles lock").get(customer_id).cloned())
        }

        async fn save_profile(&self, profile: DeliveryProfile) -> Result<(), StoreError> {
            self.profiles.lock().expect("profiles lock").insert(profile.customer_id.clone(), profile);
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeQuotes {
        quotes: Mutex<Vec<CommittedQuote>>,
        failing: AtomicBool,
    }

    impl FakeQuotes {
        pub(crate) fn with(quotes: Vec<CommittedQuote>) -> Self {
            Self { quotes: Mutex::new(quotes), failing: AtomicBool::new(false) }
        }

        pub(crate) fn fail_commits(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }

        pub(crate) fn all(&self) -> Vec<CommittedQuote> {
            self.quotes.lock().expect("quotes lock").clone()
        }
    }

    #[async_trait]
    impl QuoteStore for FakeQuotes {
        async fn has_any_quote(&self, customer_id: &CustomerId) -> Result<bool, StoreError> {
            Ok(self.quotes.lock().expect("quotes lock").iter().any(|q| &q.customer_id == customer_id))
        }

        async fn commit(&self, quote: CommittedQuote) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("disk full".to_string()));
            }
            self.quotes.lock().expect("quotes lock").push(quote);
            Ok(())
        }

        async fn list_by_customer(
            &self,
            customer_id: &CustomerId,
        ) -> Result<Vec<CommittedQuote>, StoreError> {
            Ok(self
                .quotes
                .lock()
                .expect("quotes lock")
                .iter()
                .filter(|quote| &quote.customer_id == customer_id)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    pub(crate) struct FakeHolds {
        holds: Mutex<HashMap<SessionId, (PricedQuote, DateTime<Utc>)>>,
    }

    impl FakeHolds {
        pub(crate) fn put_at(&self, session_id: &SessionId, quote: PricedQuote, at: DateTime<Utc>) {
            self.holds.lock().expect("holds lock").insert(session_id.clone(), (quote, at));
        }
    }

    #[async_trait]
    impl HoldStore for FakeHolds {
        async fn put(&self, session_id: &SessionId, quote: PricedQuote) -> Result<(), StoreError> {
            self.put_at(session_id, quote, Utc::now());
            Ok(())
        }

        async fn take(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
            Ok(self.holds.lock().expect("holds lock").remove(session_id).map(|(quote, _)| quote))
        }

        async fn peek(&self, session_id: &SessionId) -> Result<Option<PricedQuote>, StoreError> {
            let holds = self.holds.lock().expect("holds lock");
            Ok(holds.get(session_id).map(|(quote, _)| quote.clone()))
        }

        async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
            let mut holds = self.holds.lock().expect("holds lock");
            let before = holds.len();
            holds.retain(|_, (_, written_at)| *written_at >= cutoff);
            Ok((before - holds.len()) as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::fakes::{profile, FakeHolds, FakeProfiles, FakeQuotes};
    use super::{Caller, ConfirmOutcome, QuoteWorkflow, RequestOutcome, ReviewOutcome};
    use crate::audit::InMemoryAuditSink;
    use crate::domain::customer::{CustomerId, SessionId};
    use crate::domain::quote::{CommittedQuote, PricedQuote, QuoteForm, QuoteRequest};
    use crate::errors::ApplicationError;
    use crate::gate::{Gated, PROFILE_CREATE_PATH};
    use crate::ports::{HoldStore, QuoteStore};

    struct Harness {
        workflow: QuoteWorkflow,
        quotes: Arc<FakeQuotes>,
        holds: Arc<FakeHolds>,
        audit: InMemoryAuditSink,
    }

    fn harness(profiles: FakeProfiles, quotes: FakeQuotes) -> Harness {
        let quotes = Arc::new(quotes);
        let holds = Arc::new(FakeHolds::default());
        let audit = InMemoryAuditSink::default();
        let workflow = QuoteWorkflow::new(Arc::new(profiles), quotes.clone(), holds.clone())
            .with_audit_sink(Arc::new(audit.clone()));
        Harness { workflow, quotes, holds, audit }
    }

    fn caller(customer: &str) -> Caller {
        Caller::new(SessionId(format!("sess-{customer}")), CustomerId(customer.to_string()), "req-1")
    }

    fn form(gallons: i64) -> QuoteForm {
        QuoteForm {
            gallons_requested: Some(gallons),
            delivery_address: Some("123 Main St".to_string()),
            delivery_date: Some("2026-11-02".to_string()),
        }
    }

    fn prior_quote(customer: &str) -> CommittedQuote {
        let request = QuoteRequest {
            gallons_requested: 10,
            delivery_address: "1 Old Rd".to_string(),
            delivery_date: "2026-01-01".to_string(),
        };
        CommittedQuote::new(CustomerId(customer.to_string()), PricedQuote::new(request, Decimal::ONE))
    }

    #[tokio::test]
    async fn in_state_first_request_holds_priced_quote() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");

        let outcome = h.workflow.request_quote(&caller, &form(500)).await.expect("request succeeds");

        let RequestOutcome::Held(quote) = outcome else { panic!("expected hold, got {outcome:?}") };
        assert_eq!(quote.unit_price(), Decimal::new(1725, 3));
        assert_eq!(quote.total_due(), Decimal::new(8625, 1));
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), Some(quote));
        assert!(h.quotes.all().is_empty());
        assert!(h.audit.event_types().contains(&"quote.hold_created".to_string()));
    }

    #[tokio::test]
    async fn out_of_state_repeat_customer_is_priced_with_history_credit() {
        let h = harness(
            FakeProfiles::with(vec![profile("cust-1", "CA")]),
            FakeQuotes::with(vec![prior_quote("cust-1")]),
        );

        let outcome =
            h.workflow.request_quote(&caller("cust-1"), &form(1500)).await.expect("request");

        let RequestOutcome::Held(quote) = outcome else { panic!("expected hold") };
        assert_eq!(quote.unit_price(), Decimal::new(1725, 3));
    }

    #[tokio::test]
    async fn home_state_is_configurable() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "ca")]), FakeQuotes::default());
        let workflow = h.workflow.with_home_state("CA");

        let outcome = workflow.request_quote(&caller("cust-1"), &form(100)).await.expect("request");

        let RequestOutcome::Held(quote) = outcome else { panic!("expected hold") };
        assert_eq!(quote.unit_price(), Decimal::new(1725, 3));
    }

    #[tokio::test]
    async fn invalid_request_keeps_previous_hold() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("first request");

        let outcome = h.workflow.request_quote(&caller, &form(0)).await.expect("second request");

        let RequestOutcome::Invalid(errors) = outcome else { panic!("expected field errors") };
        assert!(errors.contains("gallons_requested"));
        let hold = h.holds.peek(&caller.session_id).await.expect("peek").expect("hold kept");
        assert_eq!(hold.gallons_requested(), 500);
    }

    #[tokio::test]
    async fn second_request_replaces_hold() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("first");
        h.workflow.request_quote(&caller, &form(1200)).await.expect("second");

        let hold = h.holds.peek(&caller.session_id).await.expect("peek").expect("hold");
        assert_eq!(hold.gallons_requested(), 1200);
    }

    #[tokio::test]
    async fn view_hold_does_not_consume() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");

        assert_eq!(h.workflow.view_hold(&caller).await.expect("view"), ReviewOutcome::NoHold);

        h.workflow.request_quote(&caller, &form(500)).await.expect("request");
        let first = h.workflow.view_hold(&caller).await.expect("view");
        let second = h.workflow.view_hold(&caller).await.expect("view again");
        assert!(matches!(first, ReviewOutcome::Review(_)));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn confirm_commits_recomputed_quote_and_clears_hold() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("request");

        let outcome = h.workflow.confirm_quote(&caller, &form(500)).await.expect("confirm");

        let ConfirmOutcome::Committed(committed) = outcome else { panic!("expected commit") };
        assert_eq!(committed.customer_id, caller.customer_id);
        assert_eq!(committed.quote.unit_price(), Decimal::new(1725, 3));
        assert_eq!(committed.quote.total_due(), Decimal::new(8625, 1));
        assert_eq!(h.quotes.all(), vec![committed]);
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), None);
        assert!(h.audit.event_types().contains(&"quote.committed".to_string()));
    }

    #[tokio::test]
    async fn confirm_without_hold_persists_nothing() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());

        let outcome = h.workflow.confirm_quote(&caller("cust-1"), &form(500)).await.expect("confirm");

        assert_eq!(outcome, ConfirmOutcome::NoHold);
        assert!(h.quotes.all().is_empty());
    }

    #[tokio::test]
    async fn duplicate_confirmation_commits_once() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("request");

        let first = h.workflow.confirm_quote(&caller, &form(500)).await.expect("first confirm");
        let second = h.workflow.confirm_quote(&caller, &form(500)).await.expect("second confirm");

        assert!(matches!(first, ConfirmOutcome::Committed(_)));
        assert_eq!(second, ConfirmOutcome::NoHold);
        assert_eq!(h.quotes.all().len(), 1);
    }

    #[tokio::test]
    async fn invalid_confirmation_discards_hold_and_echoes_it() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("request");

        let mut bad = form(500);
        bad.delivery_date = None;
        let outcome = h.workflow.confirm_quote(&caller, &bad).await.expect("confirm");

        let ConfirmOutcome::Invalid { hold, errors } = outcome else { panic!("expected invalid") };
        assert_eq!(hold.gallons_requested(), 500);
        assert!(errors.contains("delivery_date"));
        assert!(h.quotes.all().is_empty());
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), None);
    }

    #[tokio::test]
    async fn confirmation_with_changed_request_commits_nothing() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("request");

        let mut changed = form(50_000);
        changed.delivery_address = Some("9 Elsewhere Ln".to_string());
        let outcome = h.workflow.confirm_quote(&caller, &changed).await.expect("confirm");

        let ConfirmOutcome::Invalid { hold, errors } = outcome else { panic!("expected invalid") };
        assert_eq!(hold.gallons_requested(), 500);
        assert_eq!(hold.total_due(), Decimal::new(8625, 1));
        assert!(errors.contains("gallons_requested"));
        assert!(errors.contains("delivery_address"));
        assert!(!errors.contains("delivery_date"));
        assert!(h.quotes.all().is_empty());
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), None);
    }

    #[tokio::test]
    async fn stale_holds_are_purged_and_fresh_ones_kept() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let fresh = caller("cust-1");
        let abandoned = caller("cust-2");
        h.workflow.request_quote(&fresh, &form(500)).await.expect("request");
        let old = PricedQuote::new(form(200).validate().expect("valid"), Decimal::new(1725, 3));
        h.holds.put_at(&abandoned.session_id, old, Utc::now() - Duration::hours(3));

        let removed = h.workflow.purge_stale_holds(Duration::minutes(30)).await.expect("purge");

        assert_eq!(removed, 1);
        assert_eq!(h.holds.peek(&abandoned.session_id).await.expect("peek"), None);
        assert!(h.holds.peek(&fresh.session_id).await.expect("peek").is_some());
        assert!(h.audit.event_types().contains(&"quote.holds_expired".to_string()));
    }

    #[tokio::test]
    async fn confirmation_ignores_tampered_hold_price() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());
        let caller = caller("cust-1");
        let cheap = PricedQuote::new(form(500).validate().expect("valid"), Decimal::new(1, 2));
        h.holds.put(&caller.session_id, cheap).await.expect("put");

        let outcome = h.workflow.confirm_quote(&caller, &form(500)).await.expect("confirm");

        let ConfirmOutcome::Committed(committed) = outcome else { panic!("expected commit") };
        assert_eq!(committed.quote.unit_price(), Decimal::new(1725, 3));
    }

    #[tokio::test]
    async fn customer_without_profile_is_redirected_everywhere() {
        let h = harness(FakeProfiles::default(), FakeQuotes::default());
        let caller = caller("cust-2");
        let redirect = PROFILE_CREATE_PATH.to_string();

        assert_eq!(
            h.workflow.request_quote(&caller, &form(500)).await.expect("request"),
            RequestOutcome::ProfileRequired(redirect.clone())
        );
        assert_eq!(
            h.workflow.view_hold(&caller).await.expect("view"),
            ReviewOutcome::ProfileRequired(redirect.clone())
        );
        assert_eq!(
            h.workflow.confirm_quote(&caller, &form(500)).await.expect("confirm"),
            ConfirmOutcome::ProfileRequired(redirect.clone())
        );
        assert_eq!(h.workflow.history(&caller).await.expect("history"), Gated::Redirected(redirect));
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), None);
        assert!(h.audit.event_types().iter().all(|kind| kind == "gate.profile_required"));
    }

    #[tokio::test]
    async fn commit_failure_surfaces_and_hold_stays_consumed() {
        let quotes = FakeQuotes::default();
        quotes.fail_commits();
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), quotes);
        let caller = caller("cust-1");
        h.workflow.request_quote(&caller, &form(500)).await.expect("request");

        let error = h.workflow.confirm_quote(&caller, &form(500)).await.expect_err("commit fails");

        assert!(matches!(error, ApplicationError::Persistence(_)));
        assert_eq!(h.holds.peek(&caller.session_id).await.expect("peek"), None);
        assert!(h.audit.event_types().contains(&"quote.commit_failed".to_string()));
    }

    #[tokio::test]
    async fn history_lists_only_callers_quotes() {
        let h = harness(
            FakeProfiles::with(vec![profile("cust-1", "TX")]),
            FakeQuotes::with(vec![prior_quote("cust-1"), prior_quote("cust-2")]),
        );

        let Gated::Proceeded(quotes) = h.workflow.history(&caller("cust-1")).await.expect("history")
        else {
            panic!("expected history");
        };

        assert_eq!(quotes.len(), 1);
        assert!(h.quotes.has_any_quote(&CustomerId("cust-2".to_string())).await.expect("lookup"));
    }

    #[tokio::test]
    async fn start_request_prefills_profile_address() {
        let h = harness(FakeProfiles::with(vec![profile("cust-1", "TX")]), FakeQuotes::default());

        let Gated::Proceeded(defaults) =
            h.workflow.start_request(&caller("cust-1")).await.expect("defaults")
        else {
            panic!("expected defaults");
        };

        assert_eq!(defaults.delivery_address.as_deref(), Some("123 Main St"));
    }

    #[tokio::test]
    async fn resolve_context_reports_history_and_location() {
        let h = harness(
            FakeProfiles::with(vec![profile("cust-1", "tx")]),
            FakeQuotes::with(vec![prior_quote("cust-1")]),
        );

        let context = h
            .workflow
            .resolve_context(&CustomerId("cust-1".to_string()))
            .await
            .expect("lookup")
            .expect("profile exists");

        assert!(context.is_in_state);
        assert!(context.has_prior_quotes);
        assert_eq!(h.workflow.resolve_context(&CustomerId("nobody".to_string())).await, Ok(None));
    }
}
