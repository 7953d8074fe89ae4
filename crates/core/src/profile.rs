use std::sync::Arc;

use crate::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use crate::domain::customer::{CustomerId, DeliveryProfile, ProfileForm};
use crate::domain::validation::FieldErrors;
use crate::errors::ApplicationError;
use crate::gate::PROFILE_CREATE_PATH;
use crate::ports::ProfileDirectory;

pub const PROFILE_EDIT_PATH: &str = "/profile/edit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfileOutcome {
    Saved(DeliveryProfile),
    Invalid(FieldErrors),
    /// Create was called for a customer that already has a profile, or edit
    /// for one that has none.
    Redirect(String),
}

/// What the create and edit entry points show before anything is submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProfilePage {
    /// Blank for create, pre-filled from the stored profile for edit.
    Form(ProfileForm),
    Redirect(String),
}

/// Create and edit flows for the customer's delivery profile.
pub struct ProfileService {
    profiles: Arc<dyn ProfileDirectory>,
    audit: Arc<dyn AuditSink>,
}

impl ProfileService {
    pub fn new(profiles: Arc<dyn ProfileDirectory>) -> Self {
        Self { profiles, audit: Arc::new(NoopAuditSink) }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub async fn current(
        &self,
        customer_id: &CustomerId,
    ) -> Result<Option<DeliveryProfile>, ApplicationError> {
        Ok(self.profiles.get_profile(customer_id).await?)
    }

    /// Blank create form, or a redirect to edit when a profile already exists.
    pub async fn create_page(
        &self,
        customer_id: &CustomerId,
    ) -> Result<ProfilePage, ApplicationError> {
        Ok(match self.profiles.get_profile(customer_id).await? {
            Some(_) => ProfilePage::Redirect(PROFILE_EDIT_PATH.to_string()),
            None => ProfilePage::Form(ProfileForm::default()),
        })
    }

    /// Edit form pre-filled from the stored profile, or a redirect to create.
    pub async fn edit_page(&self, customer_id: &CustomerId) -> Result<ProfilePage, ApplicationError> {
        Ok(match self.profiles.get_profile(customer_id).await? {
            Some(profile) => ProfilePage::Form(ProfileForm::from(&profile)),
            None => ProfilePage::Redirect(PROFILE_CREATE_PATH.to_string()),
        })
    }

    pub async fn create_profile(
        &self,
        customer_id: &CustomerId,
        form: &ProfileForm,
        correlation_id: &str,
    ) -> Result<ProfileOutcome, ApplicationError> {
        if self.profiles.get_profile(customer_id).await?.is_some() {
            return Ok(ProfileOutcome::Redirect(PROFILE_EDIT_PATH.to_string()));
        }
        self.save(customer_id, form, correlation_id, "profile.created").await
    }

    pub async fn update_profile(
        &self,
        customer_id: &CustomerId,
        form: &ProfileForm,
        correlation_id: &str,
    ) -> Result<ProfileOutcome, ApplicationError> {
        if self.profiles.get_profile(customer_id).await?.is_none() {
            return Ok(ProfileOutcome::Redirect(PROFILE_CREATE_PATH.to_string()));
        }
        self.save(customer_id, form, correlation_id, "profile.updated").await
    }

    async fn save(
        &self,
        customer_id: &CustomerId,
        form: &ProfileForm,
        correlation_id: &str,
        event_type: &str,
    ) -> Result<ProfileOutcome, ApplicationError> {
        let profile = match form.validate(customer_id) {
            Ok(profile) => profile,
            Err(errors) => return Ok(ProfileOutcome::Invalid(errors)),
        };

        self.profiles.save_profile(profile.clone()).await?;
        let context = AuditContext::new(None, None, correlation_id, customer_id.0.clone());
        self.audit.emit(
            AuditEvent::new(&context, event_type, AuditCategory::Persistence, AuditOutcome::Success)
                .with_metadata("state", profile.state.clone()),
        );

        Ok(ProfileOutcome::Saved(profile))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ProfileOutcome, ProfilePage, ProfileService, PROFILE_EDIT_PATH};
    use crate::audit::InMemoryAuditSink;
    use crate::domain::customer::{CustomerId, ProfileForm};
    use crate::gate::PROFILE_CREATE_PATH;
    use crate::workflow::fakes::{profile, FakeProfiles};

    fn form(state: &str) -> ProfileForm {
        ProfileForm {
            full_name: Some("Dana Reyes".to_string()),
            address1: Some("500 Oak Ave".to_string()),
            address2: None,
            city: Some("Austin".to_string()),
            state: Some(state.to_string()),
            zipcode: Some("78701".to_string()),
        }
    }

    fn customer(id: &str) -> CustomerId {
        CustomerId(id.to_string())
    }

    #[tokio::test]
    async fn create_saves_profile_for_new_customer() {
        let audit = InMemoryAuditSink::default();
        let service = ProfileService::new(Arc::new(FakeProfiles::default()))
            .with_audit_sink(Arc::new(audit.clone()));

        let outcome =
            service.create_profile(&customer("cust-1"), &form("tx"), "req-1").await.expect("create");

        let ProfileOutcome::Saved(saved) = outcome else { panic!("expected saved profile") };
        assert_eq!(saved.state, "TX");
        assert_eq!(service.current(&customer("cust-1")).await.expect("lookup"), Some(saved));
        assert_eq!(audit.event_types(), vec!["profile.created".to_string()]);
    }

    #[tokio::test]
    async fn create_redirects_to_edit_when_profile_exists() {
        let service =
            ProfileService::new(Arc::new(FakeProfiles::with(vec![profile("cust-1", "TX")])));

        let outcome =
            service.create_profile(&customer("cust-1"), &form("CA"), "req-1").await.expect("create");

        assert_eq!(outcome, ProfileOutcome::Redirect(PROFILE_EDIT_PATH.to_string()));
        let current = service.current(&customer("cust-1")).await.expect("lookup");
        assert_eq!(current.map(|p| p.state), Some("TX".to_string()));
    }

    #[tokio::test]
    async fn edit_requires_existing_profile() {
        let service = ProfileService::new(Arc::new(FakeProfiles::default()));

        let outcome =
            service.update_profile(&customer("cust-1"), &form("CA"), "req-1").await.expect("edit");

        assert_eq!(outcome, ProfileOutcome::Redirect(PROFILE_CREATE_PATH.to_string()));
    }

    #[tokio::test]
    async fn edit_replaces_state_and_rejects_invalid_fields() {
        let service =
            ProfileService::new(Arc::new(FakeProfiles::with(vec![profile("cust-1", "TX")])));

        let mut bad = form("CA");
        bad.zipcode = Some("123".to_string());
        let invalid = service.update_profile(&customer("cust-1"), &bad, "req-1").await.expect("edit");
        assert!(matches!(invalid, ProfileOutcome::Invalid(ref errors) if errors.contains("zipcode")));

        let outcome =
            service.update_profile(&customer("cust-1"), &form("CA"), "req-2").await.expect("edit");
        let ProfileOutcome::Saved(saved) = outcome else { panic!("expected saved profile") };
        assert_eq!(saved.state, "CA");
    }

    #[tokio::test]
    async fn pages_redirect_between_create_and_edit() {
        let empty = ProfileService::new(Arc::new(FakeProfiles::default()));
        assert_eq!(
            empty.create_page(&customer("cust-1")).await.expect("create page"),
            ProfilePage::Form(ProfileForm::default())
        );
        assert_eq!(
            empty.edit_page(&customer("cust-1")).await.expect("edit page"),
            ProfilePage::Redirect(PROFILE_CREATE_PATH.to_string())
        );

        let existing =
            ProfileService::new(Arc::new(FakeProfiles::with(vec![profile("cust-1", "TX")])));
        assert_eq!(
            existing.create_page(&customer("cust-1")).await.expect("create page"),
            ProfilePage::Redirect(PROFILE_EDIT_PATH.to_string())
        );
        let ProfilePage::Form(prefilled) =
            existing.edit_page(&customer("cust-1")).await.expect("edit page")
        else {
            panic!("expected edit form");
        };
        assert_eq!(prefilled.state.as_deref(), Some("TX"));
    }
}
