//! Request identity as set by the upstream identity proxy.
//!
//! The customer and session ids are read from headers only; request bodies
//! never carry ownership.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use fuelquote_core::domain::customer::{CustomerId, SessionId};
use fuelquote_core::workflow::Caller;
use uuid::Uuid;

use crate::app::ErrorBody;

pub const CUSTOMER_HEADER: &str = "x-customer-id";
pub const SESSION_HEADER: &str = "x-session-id";
pub const CORRELATION_HEADER: &str = "x-correlation-id";
pub const LOGIN_PATH: &str = "/account/login";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub customer_id: Option<CustomerId>,
    pub session_id: Option<SessionId>,
    pub correlation_id: String,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            customer_id: header_value(headers, CUSTOMER_HEADER).map(CustomerId),
            session_id: header_value(headers, SESSION_HEADER).map(SessionId),
            correlation_id: header_value(headers, CORRELATION_HEADER)
                .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple())),
        }
    }

    /// Signed-in customer, or a redirect to the login page.
    pub fn customer(&self) -> Result<CustomerId, Response> {
        self.customer_id.clone().ok_or_else(|| Redirect::to(LOGIN_PATH).into_response())
    }

    /// Signed-in customer with a session to scope holds to.
    pub fn caller(&self) -> Result<Caller, Response> {
        let customer_id = self.customer()?;
        let Some(session_id) = self.session_id.clone() else {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: format!("missing {SESSION_HEADER} header"),
                    correlation_id: self.correlation_id.clone(),
                }),
            )
                .into_response());
        };
        Ok(Caller::new(session_id, customer_id, self.correlation_id.clone()))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
