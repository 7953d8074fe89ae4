use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::customer::CustomerId;
use crate::domain::validation::{required_text, FieldErrors};
use crate::errors::DomainError;
use crate::pricing;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub String);

impl QuoteId {
    pub fn generate() -> Self {
        Self(format!("FQ-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Quote fields exactly as submitted. Anything else the client sends
/// (owner, suggested price, total) is dropped during deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteForm {
    pub gallons_requested: Option<i64>,
    pub delivery_address: Option<String>,
    pub delivery_date: Option<String>,
}

impl QuoteForm {
    pub fn validate(&self) -> Result<QuoteRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let gallons_requested = match self.gallons_requested {
            None => {
                errors.add("gallons_requested", "gallons_requested is required");
                0
            }
            Some(value) if value <= 0 => {
                errors.add("gallons_requested", "gallons_requested must be a positive whole number");
                0
            }
            Some(value) => u32::try_from(value).unwrap_or_else(|_| {
                errors.add("gallons_requested", "gallons_requested is too large");
                0
            }),
        };

        let delivery_address =
            required_text(&mut errors, "delivery_address", self.delivery_address.as_deref(), 200);
        let delivery_date =
            required_text(&mut errors, "delivery_date", self.delivery_date.as_deref(), 32);

        errors.into_result(QuoteRequest { gallons_requested, delivery_address, delivery_date })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub gallons_requested: u32,
    pub delivery_address: String,
    pub delivery_date: String,
}

/// A request with its computed price. `total_due` is always derived from
/// `unit_price` and `gallons_requested`; a serialized copy whose total
/// disagrees is rejected on load.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PricedQuoteRecord", into = "PricedQuoteRecord")]
pub struct PricedQuote {
    request: QuoteRequest,
    unit_price: Decimal,
    total_due: Decimal,
}

impl PricedQuote {
    pub fn new(request: QuoteRequest, unit_price: Decimal) -> Self {
        let total_due = pricing::total_due(unit_price, request.gallons_requested);
        Self { request, unit_price, total_due }
    }

    pub fn request(&self) -> &QuoteRequest {
        &self.request
    }

    pub fn gallons_requested(&self) -> u32 {
        self.request.gallons_requested
    }

    pub fn delivery_address(&self) -> &str {
        &self.request.delivery_address
    }

    pub fn delivery_date(&self) -> &str {
        &self.request.delivery_date
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn total_due(&self) -> Decimal {
        self.total_due
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PricedQuoteRecord {
    gallons_requested: u32,
    delivery_address: String,
    delivery_date: String,
    unit_price: Decimal,
    total_due: Decimal,
}

impl From<PricedQuote> for PricedQuoteRecord {
    fn from(value: PricedQuote) -> Self {
        Self {
            gallons_requested: value.request.gallons_requested,
            delivery_address: value.request.delivery_address,
            delivery_date: value.request.delivery_date,
            unit_price: value.unit_price,
            total_due: value.total_due,
        }
    }
}

impl TryFrom<PricedQuoteRecord> for PricedQuote {
    type Error = DomainError;

    fn try_from(value: PricedQuoteRecord) -> Result<Self, Self::Error> {
        let quote = PricedQuote::new(
            QuoteRequest {
                gallons_requested: value.gallons_requested,
                delivery_address: value.delivery_address,
                delivery_date: value.delivery_date,
            },
            value.unit_price,
        );
        if quote.total_due != value.total_due {
            return Err(DomainError::InvariantViolation(format!(
                "total_due {} does not match unit_price {} x {} gallons",
                value.total_due, quote.unit_price, quote.request.gallons_requested
            )));
        }
        Ok(quote)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedQuote {
    pub id: QuoteId,
    pub customer_id: CustomerId,
    #[serde(flatten)]
    pub quote: PricedQuote,
    pub created_at: DateTime<Utc>,
}

impl CommittedQuote {
    pub fn new(customer_id: CustomerId, quote: PricedQuote) -> Self {
        Self { id: QuoteId::generate(), customer_id, quote, created_at: Utc::now() }
    }
}
