//! Fuel quote routes.
//!
//! - `GET  /fuel-quote`          request form defaults
//! - `POST /fuel-quote`          price and hold, then 303 to the confirm view
//! - `GET  /fuel-quote/confirm`  review the pending hold
//! - `POST /fuel-quote/confirm`  commit, then 303 to history
//! - `GET  /fuel-quote/history`  committed quotes for the caller

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fuelquote_core::domain::quote::{CommittedQuote, PricedQuote, QuoteForm};
use fuelquote_core::domain::validation::FieldErrors;
use fuelquote_core::gate::Gated;
use fuelquote_core::workflow::{ConfirmOutcome, RequestOutcome, ReviewOutcome};
use serde::Serialize;
use tracing::info;

use crate::app::{failure, see_other, AppState};
use crate::identity::Identity;

pub const REQUEST_PATH: &str = "/fuel-quote";
pub const CONFIRM_PATH: &str = "/fuel-quote/confirm";
pub const HISTORY_PATH: &str = "/fuel-quote/history";

#[derive(Debug, Serialize)]
pub struct RequestView {
    pub delivery_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub quote: PricedQuote,
}

#[derive(Debug, Serialize)]
pub struct ValidationView {
    pub errors: FieldErrors,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<PricedQuote>,
}

#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub quotes: Vec<CommittedQuote>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(REQUEST_PATH, get(request_form).post(submit_request))
        .route(CONFIRM_PATH, get(review_hold).post(submit_confirmation))
        .route(HISTORY_PATH, get(history))
}

fn unprocessable(errors: FieldErrors, quote: Option<PricedQuote>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ValidationView { errors, quote })).into_response()
}

fn unreadable_body(rejection: JsonRejection) -> Response {
    let mut errors = FieldErrors::new();
    errors.add("body", rejection.body_text());
    unprocessable(errors, None)
}

async fn request_form(State(state): State<AppState>, identity: Identity) -> Response {
    let caller = match identity.caller() {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match state.workflow.start_request(&caller).await {
        Ok(Gated::Proceeded(defaults)) => {
            Json(RequestView { delivery_address: defaults.delivery_address }).into_response()
        }
        Ok(Gated::Redirected(target)) => see_other(&target),
        Err(error) => failure(error, &caller.correlation_id),
    }
}

async fn submit_request(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<QuoteForm>, JsonRejection>,
) -> Response {
    let caller = match identity.caller() {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    let Json(form) = match body {
        Ok(form) => form,
        Err(rejection) => return unreadable_body(rejection),
    };

    match state.workflow.request_quote(&caller, &form).await {
        Ok(RequestOutcome::Held(quote)) => {
            info!(
                event_name = "http.quote.held",
                correlation_id = %caller.correlation_id,
                session_id = %caller.session_id,
                unit_price = %quote.unit_price(),
                "quote held for confirmation"
            );
            see_other(CONFIRM_PATH)
        }
        Ok(RequestOutcome::Invalid(errors)) => unprocessable(errors, None),
        Ok(RequestOutcome::ProfileRequired(target)) => see_other(&target),
        Err(error) => failure(error, &caller.correlation_id),
    }
}

async fn review_hold(State(state): State<AppState>, identity: Identity) -> Response {
    let caller = match identity.caller() {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match state.workflow.view_hold(&caller).await {
        Ok(ReviewOutcome::Review(quote)) => Json(ReviewView { quote }).into_response(),
        Ok(ReviewOutcome::NoHold) => see_other(REQUEST_PATH),
        Ok(ReviewOutcome::ProfileRequired(target)) => see_other(&target),
        Err(error) => failure(error, &caller.correlation_id),
    }
}

async fn submit_confirmation(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<QuoteForm>, JsonRejection>,
) -> Response {
    let caller = match identity.caller() {
        Ok(caller) => caller,
        Err(response) => return response,
    };
    // An unreadable body counts as an empty form so the hold is still consumed.
    let form = match body {
        Ok(Json(form)) => form,
        Err(_) => QuoteForm::default(),
    };

    match state.workflow.confirm_quote(&caller, &form).await {
        Ok(ConfirmOutcome::Committed(committed)) => {
            info!(
                event_name = "http.quote.committed",
                correlation_id = %caller.correlation_id,
                quote_id = %committed.id,
                total_due = %committed.quote.total_due(),
                "quote committed"
            );
            see_other(HISTORY_PATH)
        }
        Ok(ConfirmOutcome::Invalid { hold, errors }) => unprocessable(errors, Some(hold)),
        Ok(ConfirmOutcome::NoHold) => see_other(REQUEST_PATH),
        Ok(ConfirmOutcome::ProfileRequired(target)) => see_other(&target),
        Err(error) => failure(error, &caller.correlation_id),
    }
}

async fn history(State(state): State<AppState>, identity: Identity) -> Response {
    let caller = match identity.caller() {
        Ok(caller) => caller,
        Err(response) => return response,
    };

    match state.workflow.history(&caller).await {
        Ok(Gated::Proceeded(quotes)) => Json(HistoryView { quotes }).into_response(),
        Ok(Gated::Redirected(target)) => see_other(&target),
        Err(error) => failure(error, &caller.correlation_id),
    }
}
