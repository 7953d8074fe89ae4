use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fuelquote_core::domain::customer::{DeliveryProfile, ProfileForm};
use fuelquote_core::domain::validation::FieldErrors;
use fuelquote_core::gate::PROFILE_CREATE_PATH;
use fuelquote_core::profile::{ProfileOutcome, ProfilePage, PROFILE_EDIT_PATH};
use serde::Serialize;

use crate::app::{failure, see_other, AppState};
use crate::identity::Identity;
use crate::quotes::REQUEST_PATH;

pub const PROFILE_PATH: &str = "/profile";

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub profile: DeliveryProfile,
}

#[derive(Debug, Serialize)]
pub struct ProfileFormView {
    pub form: ProfileForm,
}

#[derive(Debug, Serialize)]
pub struct ProfileErrors {
    pub errors: FieldErrors,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(PROFILE_PATH, get(show_profile))
        .route(PROFILE_CREATE_PATH, get(create_form).post(create_profile))
        .route(PROFILE_EDIT_PATH, get(edit_form).post(edit_profile))
}

async fn show_profile(State(state): State<AppState>, identity: Identity) -> Response {
    let customer_id = match identity.customer() {
        Ok(customer_id) => customer_id,
        Err(response) => return response,
    };

    match state.profiles.current(&customer_id).await {
        Ok(Some(profile)) => Json(ProfileView { profile }).into_response(),
        Ok(None) => see_other(PROFILE_CREATE_PATH),
        Err(error) => failure(error, &identity.correlation_id),
    }
}

async fn create_form(State(state): State<AppState>, identity: Identity) -> Response {
    let customer_id = match identity.customer() {
        Ok(customer_id) => customer_id,
        Err(response) => return response,
    };

    render_page(state.profiles.create_page(&customer_id).await, &identity.correlation_id)
}

async fn edit_form(State(state): State<AppState>, identity: Identity) -> Response {
    let customer_id = match identity.customer() {
        Ok(customer_id) => customer_id,
        Err(response) => return response,
    };

    render_page(state.profiles.edit_page(&customer_id).await, &identity.correlation_id)
}

fn render_page(
    page: Result<ProfilePage, fuelquote_core::ApplicationError>,
    correlation_id: &str,
) -> Response {
    match page {
        Ok(ProfilePage::Form(form)) => Json(ProfileFormView { form }).into_response(),
        Ok(ProfilePage::Redirect(target)) => see_other(&target),
        Err(error) => failure(error, correlation_id),
    }
}

async fn create_profile(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<ProfileForm>, JsonRejection>,
) -> Response {
    let customer_id = match identity.customer() {
        Ok(customer_id) => customer_id,
        Err(response) => return response,
    };
    let form = match body {
        Ok(Json(form)) => form,
        Err(rejection) => return unreadable_body(rejection),
    };

    let outcome =
        state.profiles.create_profile(&customer_id, &form, &identity.correlation_id).await;
    respond(outcome, REQUEST_PATH, &identity.correlation_id)
}

async fn edit_profile(
    State(state): State<AppState>,
    identity: Identity,
    body: Result<Json<ProfileForm>, JsonRejection>,
) -> Response {
    let customer_id = match identity.customer() {
        Ok(customer_id) => customer_id,
        Err(response) => return response,
    };
    let form = match body {
        Ok(Json(form)) => form,
        Err(rejection) => return unreadable_body(rejection),
    };

    let outcome =
        state.profiles.update_profile(&customer_id, &form, &identity.correlation_id).await;
    respond(outcome, PROFILE_PATH, &identity.correlation_id)
}

fn respond(
    outcome: Result<ProfileOutcome, fuelquote_core::ApplicationError>,
    saved_target: &str,
    correlation_id: &str,
) -> Response {
    match outcome {
        Ok(ProfileOutcome::Saved(_)) => see_other(saved_target),
        Ok(ProfileOutcome::Invalid(errors)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ProfileErrors { errors })).into_response()
        }
        Ok(ProfileOutcome::Redirect(target)) => see_other(&target),
        Err(error) => failure(error, correlation_id),
    }
}

fn unreadable_body(rejection: JsonRejection) -> Response {
    let mut errors = FieldErrors::new();
    errors.add("body", rejection.body_text());
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ProfileErrors { errors })).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::LOCATION, Request, StatusCode},
        response::Response,
        Router,
    };
    use fuelquote_core::profile::ProfileService;
    use fuelquote_core::workflow::QuoteWorkflow;
    use fuelquote_db::{InMemoryHoldStore, InMemoryProfileDirectory, InMemoryQuoteStore};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::app::{router, AppState};

    fn app() -> Router {
        let profiles = Arc::new(InMemoryProfileDirectory::default());
        let workflow = QuoteWorkflow::new(
            profiles.clone(),
            Arc::new(InMemoryQuoteStore::default()),
            Arc::new(InMemoryHoldStore::default()),
        );
        router(AppState {
            workflow: Arc::new(workflow),
            profiles: Arc::new(ProfileService::new(profiles)),
        })
    }

    fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-customer-id", "cust-1")
            .header("x-session-id", "sess-1")
            .header("content-type", "application/json")
            .body(body.map(|value| Body::from(value.to_string())).unwrap_or_else(Body::empty))
            .expect("request")
    }

    fn location(response: &Response) -> Option<&str> {
        response.headers().get(LOCATION).and_then(|value| value.to_str().ok())
    }

    fn profile(state: &str, zipcode: &str) -> Value {
        json!({
            "full_name": "Dana Reyes",
            "address1": "500 Oak Ave",
            "city": "Austin",
            "state": state,
            "zipcode": zipcode,
            "customer_id": "someone-else"
        })
    }

    #[tokio::test]
    async fn create_then_show_then_edit() {
        let app = app();

        let missing = app.clone().oneshot(request("GET", "/profile", None)).await.expect("show");
        assert_eq!(location(&missing), Some("/profile/create"));

        let created = app
            .clone()
            .oneshot(request("POST", "/profile/create", Some(profile("tx", "78701"))))
            .await
            .expect("create");
        assert_eq!(created.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&created), Some("/fuel-quote"));

        let shown = app.clone().oneshot(request("GET", "/profile", None)).await.expect("show");
        assert_eq!(shown.status(), StatusCode::OK);
        let bytes = to_bytes(shown.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["profile"]["customer_id"], "cust-1");
        assert_eq!(body["profile"]["state"], "TX");

        let again = app
            .clone()
            .oneshot(request("POST", "/profile/create", Some(profile("CA", "90001"))))
            .await
            .expect("create again");
        assert_eq!(location(&again), Some("/profile/edit"));

        let edited = app
            .oneshot(request("POST", "/profile/edit", Some(profile("CA", "90001"))))
            .await
            .expect("edit");
        assert_eq!(location(&edited), Some("/profile"));
    }

    #[tokio::test]
    async fn edit_without_profile_redirects_to_create() {
        let response = app()
            .oneshot(request("POST", "/profile/edit", Some(profile("CA", "90001"))))
            .await
            .expect("edit");

        assert_eq!(location(&response), Some("/profile/create"));
    }

    #[tokio::test]
    async fn invalid_profile_returns_field_errors() {
        let response = app()
            .oneshot(request("POST", "/profile/create", Some(profile("Texas", "7"))))
            .await
            .expect("create");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert!(body["errors"]["state"].is_array());
        assert!(body["errors"]["zipcode"].is_array());
    }

    #[tokio::test]
    async fn gate_redirect_lands_on_a_usable_create_form() {
        let app = app();

        let gated = app.clone().oneshot(request("GET", "/fuel-quote", None)).await.expect("gated");
        assert_eq!(gated.status(), StatusCode::SEE_OTHER);
        let target = location(&gated).expect("location").to_string();
        assert_eq!(target, "/profile/create");

        let form = app.clone().oneshot(request("GET", &target, None)).await.expect("create form");
        assert_eq!(form.status(), StatusCode::OK);
        let bytes = to_bytes(form.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert!(body["form"]["full_name"].is_null());

        let edit = app.clone().oneshot(request("GET", "/profile/edit", None)).await.expect("edit");
        assert_eq!(location(&edit), Some("/profile/create"));
    }

    #[tokio::test]
    async fn create_form_redirects_to_prefilled_edit_once_saved() {
        let app = app();
        app.clone()
            .oneshot(request("POST", "/profile/create", Some(profile("TX", "78701"))))
            .await
            .expect("create");

        let create = app.clone().oneshot(request("GET", "/profile/create", None)).await.expect("get");
        assert_eq!(create.status(), StatusCode::SEE_OTHER);
        let target = location(&create).expect("location").to_string();
        assert_eq!(target, "/profile/edit");

        let edit = app.oneshot(request("GET", &target, None)).await.expect("edit form");
        assert_eq!(edit.status(), StatusCode::OK);
        let bytes = to_bytes(edit.into_body(), usize::MAX).await.expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["form"]["city"], "Austin");
        assert_eq!(body["form"]["state"], "TX");
    }
}
