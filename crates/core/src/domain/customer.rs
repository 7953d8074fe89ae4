use serde::{Deserialize, Serialize};

use super::validation::{required_text, FieldErrors};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the browser session a pending hold is scoped to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryProfile {
    pub customer_id: CustomerId,
    pub full_name: String,
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl DeliveryProfile {
    pub fn is_in_state(&self, home_state: &str) -> bool {
        self.state.trim().eq_ignore_ascii_case(home_state.trim())
    }
}

/// Facts about the requesting customer, resolved fresh for every pricing call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContext {
    pub customer_id: CustomerId,
    pub is_in_state: bool,
    pub has_prior_quotes: bool,
}

/// Profile fields as submitted by the customer. The owner is never part of the form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileForm {
    pub full_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
}

impl From<&DeliveryProfile> for ProfileForm {
    fn from(profile: &DeliveryProfile) -> Self {
        Self {
            full_name: Some(profile.full_name.clone()),
            address1: Some(profile.address1.clone()),
            address2: profile.address2.clone(),
            city: Some(profile.city.clone()),
            state: Some(profile.state.clone()),
            zipcode: Some(profile.zipcode.clone()),
        }
    }
}

impl ProfileForm {
    pub fn validate(&self, customer_id: &CustomerId) -> Result<DeliveryProfile, FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = required_text(&mut errors, "full_name", self.full_name.as_deref(), 50);
        let address1 = required_text(&mut errors, "address1", self.address1.as_deref(), 100);
        let city = required_text(&mut errors, "city", self.city.as_deref(), 100);

        let address2 =
            self.address2.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(
                |value| {
                    if value.chars().count() > 100 {
                        errors.add("address2", "address2 must be at most 100 characters");
                    }
                    value.to_string()
                },
            );

        let state = self.state.as_deref().map(str::trim).unwrap_or_default().to_ascii_uppercase();
        if state.is_empty() {
            errors.add("state", "state is required");
        } else if state.len() != 2 || !state.chars().all(|ch| ch.is_ascii_alphabetic()) {
            errors.add("state", "state must be a two-letter state code");
        }

        let zipcode = self.zipcode.as_deref().map(str::trim).unwrap_or_default().to_string();
        if zipcode.is_empty() {
            errors.add("zipcode", "zipcode is required");
        } else if !(5..=9).contains(&zipcode.chars().count()) {
            errors.add("zipcode", "zipcode must be 5 to 9 characters");
        }

        errors.into_result(DeliveryProfile {
            customer_id: customer_id.clone(),
            full_name,
            address1,
            address2,
            city,
            state,
            zipcode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CustomerId, ProfileForm};

    fn form() -> ProfileForm {
        ProfileForm {
            full_name: Some("Dana Reyes".to_string()),
            address1: Some("123 Main St".to_string()),
            address2: Some("  ".to_string()),
            city: Some("Houston".to_string()),
            state: Some("tx".to_string()),
            zipcode: Some("77001".to_string()),
        }
    }

    #[test]
    fn valid_form_builds_profile_owned_by_session_customer() {
        let profile = form().validate(&CustomerId("cust-1".to_string())).expect("valid profile");

        assert_eq!(profile.customer_id, CustomerId("cust-1".to_string()));
        assert_eq!(profile.state, "TX");
        assert_eq!(profile.address2, None);
        assert!(profile.is_in_state("TX"));
        assert!(!profile.is_in_state("CA"));
    }

    #[test]
    fn zipcode_length_is_bounded() {
        let mut short = form();
        short.zipcode = Some("1234".to_string());
        let mut long = form();
        long.zipcode = Some("1234567890".to_string());
        let mut plus_four = form();
        plus_four.zipcode = Some("770011234".to_string());

        let customer = CustomerId("cust-1".to_string());
        assert!(short.validate(&customer).expect_err("too short").contains("zipcode"));
        assert!(long.validate(&customer).expect_err("too long").contains("zipcode"));
        assert!(plus_four.validate(&customer).is_ok());
    }

    #[test]
    fn missing_required_fields_are_reported_together() {
        let errors = ProfileForm::default()
            .validate(&CustomerId("cust-1".to_string()))
            .expect_err("empty form is invalid");

        assert_eq!(
            errors.field_names(),
            vec!["address1", "city", "full_name", "state", "zipcode"]
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn state_must_be_two_letters() {
        let mut texas = form();
        texas.state = Some("Texas".to_string());

        let errors = texas.validate(&CustomerId("cust-1".to_string())).expect_err("invalid state");
        assert_eq!(errors.messages("state"), ["state must be a two-letter state code"]);
    }
}
