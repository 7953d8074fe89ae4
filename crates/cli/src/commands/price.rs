use fuelquote_core::pricing::{price_with_trace, total_due};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct PricePreview {
    command: &'static str,
    status: &'static str,
    gallons_requested: u32,
    in_state: bool,
    has_history: bool,
    unit_price: Decimal,
    total_due: Decimal,
    steps: Vec<fuelquote_core::pricing::PricingTraceStep>,
}

/// Prices a hypothetical quote without touching the database.
pub fn run(gallons_requested: u32, in_state: bool, has_history: bool) -> CommandResult {
    if gallons_requested == 0 {
        return CommandResult::failure(
            "price",
            "invalid_input",
            "gallons must be greater than zero",
            2,
        );
    }

    let trace = price_with_trace(gallons_requested, in_state, has_history);
    let preview = PricePreview {
        command: "price",
        status: "ok",
        gallons_requested,
        in_state,
        has_history,
        unit_price: trace.unit_price,
        total_due: total_due(trace.unit_price, gallons_requested),
        steps: trace.steps,
    };

    match serde_json::to_string(&preview) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure("price", "serialization", error.to_string(), 3),
    }
}
