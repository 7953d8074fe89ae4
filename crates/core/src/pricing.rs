use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerContext;

const BASE_PRICE: Decimal = Decimal::from_parts(150, 0, 0, false, 2);
const IN_STATE_FACTOR: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
const OUT_OF_STATE_FACTOR: Decimal = Decimal::from_parts(4, 0, 0, false, 2);
const HISTORY_FACTOR: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
const HIGH_VOLUME_FACTOR: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
const STANDARD_VOLUME_FACTOR: Decimal = Decimal::from_parts(3, 0, 0, false, 2);
const PROFIT_FACTOR: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
const HIGH_VOLUME_THRESHOLD: u32 = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub unit_price: Decimal,
    pub steps: Vec<PricingTraceStep>,
}

pub trait PricingEngine: Send + Sync {
    fn unit_price(&self, gallons_requested: u32, context: &CustomerContext) -> Decimal;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FuelPricingEngine;

impl PricingEngine for FuelPricingEngine {
    fn unit_price(&self, gallons_requested: u32, context: &CustomerContext) -> Decimal {
        compute_price(gallons_requested, context.is_in_state, context.has_prior_quotes)
    }
}

/// Unit price per gallon: base price plus a margin built from location,
/// rate history, requested volume and company profit.
pub fn compute_price(gallons_requested: u32, is_in_state: bool, has_prior_quotes: bool) -> Decimal {
    price_with_trace(gallons_requested, is_in_state, has_prior_quotes).unit_price
}

/// Amount due for `gallons_requested` at `unit_price`.
pub fn total_due(unit_price: Decimal, gallons_requested: u32) -> Decimal {
    (unit_price * Decimal::from(gallons_requested)).normalize()
}

pub fn price_with_trace(
    gallons_requested: u32,
    is_in_state: bool,
    has_prior_quotes: bool,
) -> PricingTrace {
    let location_factor = if is_in_state { IN_STATE_FACTOR } else { OUT_OF_STATE_FACTOR };
    let history_factor = if has_prior_quotes { HISTORY_FACTOR } else { Decimal::ZERO };
    let volume_factor = if gallons_requested > HIGH_VOLUME_THRESHOLD {
        HIGH_VOLUME_FACTOR
    } else {
        STANDARD_VOLUME_FACTOR
    };

    let margin =
        BASE_PRICE * (location_factor - history_factor + volume_factor + PROFIT_FACTOR);
    let unit_price = (BASE_PRICE + margin).normalize();

    let step = |stage: &str, detail: String, amount: Decimal| PricingTraceStep {
        stage: stage.to_string(),
        detail,
        amount,
    };

    PricingTrace {
        unit_price,
        steps: vec![
            step("base_price", "current price per gallon".to_string(), BASE_PRICE),
            step(
                "location_factor",
                if is_in_state { "in state" } else { "out of state" }.to_string(),
                location_factor,
            ),
            step(
                "history_factor",
                if has_prior_quotes { "prior quotes on file" } else { "no quote history" }
                    .to_string(),
                history_factor,
            ),
            step(
                "volume_factor",
                format!("{gallons_requested} gallons (threshold {HIGH_VOLUME_THRESHOLD})"),
                volume_factor,
            ),
            step("profit_factor", "company profit".to_string(), PROFIT_FACTOR),
            step("margin", "base_price * sum(factors)".to_string(), margin),
            step("unit_price", "base_price + margin".to_string(), unit_price),
        ],
    }
}
