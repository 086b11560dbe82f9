use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use valuation_core::analysis::report::{self, ValuationInput};
use valuation_core::valuation::assumptions::Assumptions;
use valuation_core::valuation::controller::AssumptionController;
use valuation_core::FinancialYear;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Raw slider positions as sent by the UI, before clamping.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAssumptions {
    growth_rate: f64,
    discount_rate: f64,
    terminal_growth: f64,
}

// ---------------------------------------------------------------------------
// Enterprise value
// ---------------------------------------------------------------------------

/// `years_json`: array of financial years (camelCase fields).
#[napi]
pub fn decompose_enterprise_value(years_json: String) -> NapiResult<String> {
    let years: Vec<FinancialYear> = serde_json::from_str(&years_json).map_err(to_napi_error)?;
    let input = ValuationInput {
        years,
        assumptions: Assumptions::default(),
    };
    let output = report::build_ev_history(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// DCF
// ---------------------------------------------------------------------------

/// `input_json`: `{ "years": [...], "assumptions": { "growthRate", "discountRate", "terminalGrowth" } }`
#[napi]
pub fn value_dcf(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = report::build_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn valuation_report(input_json: String) -> NapiResult<String> {
    let input = parse_input(&input_json)?;
    let output = report::build_report(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Assumptions
// ---------------------------------------------------------------------------

/// Clamp and snap raw slider values to the admissible assumption grid.
#[napi]
pub fn clamp_assumptions(raw_json: String) -> NapiResult<String> {
    let raw: RawAssumptions = serde_json::from_str(&raw_json).map_err(to_napi_error)?;
    let assumptions = Assumptions::from_raw(raw.growth_rate, raw.discount_rate, raw.terminal_growth)
        .map_err(to_napi_error)?;
    serde_json::to_string(&assumptions).map_err(to_napi_error)
}

/// Range, step and default of each slider, keyed `growthRate`, `discountRate`,
/// `terminalGrowth`.
#[napi]
pub fn assumption_bounds() -> NapiResult<String> {
    serde_json::to_string(&AssumptionController::bounds()).map_err(to_napi_error)
}

fn parse_input(input_json: &str) -> NapiResult<ValuationInput> {
    let mut input: ValuationInput = serde_json::from_str(input_json).map_err(to_napi_error)?;
    input.assumptions = input.assumptions.clamped();
    Ok(input)
}
