use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field-level validation messages keyed by form field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join("; ")))
            .collect();
        write!(f, "{}", rendered.join(", "))
    }
}

pub(crate) fn required_text(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> String {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.add(field, format!("{field} is required"));
    } else if trimmed.chars().count() > max_len {
        errors.add(field, format!("{field} must be at most {max_len} characters"));
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::{required_text, FieldErrors};

    #[test]
    fn collects_multiple_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("zipcode", "zipcode is required");
        errors.add("zipcode", "zipcode must be 5 to 9 characters");

        assert_eq!(errors.messages("zipcode").len(), 2);
        assert!(errors.messages("city").is_empty());
        assert_eq!(
            errors.to_string(),
            "zipcode: zipcode is required; zipcode must be 5 to 9 characters"
        );
    }

    #[test]
    fn required_text_trims_and_flags_blank_values() {
        let mut errors = FieldErrors::new();
        let city = required_text(&mut errors, "city", Some("  Houston "), 100);
        let blank = required_text(&mut errors, "address1", Some("   "), 100);

        assert_eq!(city, "Houston");
        assert_eq!(blank, "");
        assert_eq!(errors.field_names(), vec!["address1".to_string()]);
    }

    #[test]
    fn serializes_as_plain_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("delivery_date", "delivery_date is required");

        let json = serde_json::to_value(&errors).expect("serialize");
        assert_eq!(json["delivery_date"][0], "delivery_date is required");
    }
}
