use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json, Router,
};
use fuelquote_core::errors::{ApplicationError, InterfaceError};
use fuelquote_core::profile::ProfileService;
use fuelquote_core::workflow::QuoteWorkflow;
use serde::Serialize;
use tracing::error;

use crate::{profiles, quotes};

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<QuoteWorkflow>,
    pub profiles: Arc<ProfileService>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().merge(quotes::router()).merge(profiles::router()).with_state(state)
}

pub fn see_other(target: &str) -> Response {
    Redirect::to(target).into_response()
}

/// Maps an application failure to a user-safe response; details go to the log.
pub fn failure(error: ApplicationError, correlation_id: &str) -> Response {
    error!(
        event_name = "http.request.failed",
        correlation_id = %correlation_id,
        error = %error,
        "request failed"
    );
    let interface = error.into_interface(correlation_id);
    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. }
        | InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: interface.user_message().to_string(),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
        .into_response()
}
