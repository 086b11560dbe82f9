use clap::Args;
use serde_json::Value;

use valuation_core::analysis::report::{self, ValuationInput};
use valuation_core::valuation::assumptions::{
    Assumptions, DISCOUNT_RATE_BOUNDS, GROWTH_RATE_BOUNDS, TERMINAL_GROWTH_BOUNDS,
};
use valuation_core::financials::latest_first;
use valuation_core::valuation::enterprise_value::EnterpriseValueRecord;
use valuation_core::FinancialYear;

use crate::input;

/// Row order for per-year sections of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// As supplied: oldest year first
    Chronological,
    /// Most recent year first, for tables read top-down
    LatestFirst,
}

/// Dataset and assumption overrides shared by every valuation command
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct DatasetArgs {
    /// Path to a JSON or YAML file: an array of years, or {"years": [...], "assumptions": {...}}
    #[arg(long)]
    pub input: Option<String>,

    /// FCF growth over the 5-year projection, in percent (0 to 10, step 0.5)
    #[arg(long)]
    pub growth_rate: Option<f64>,

    /// Discount rate (WACC), in percent (5 to 15, step 0.5)
    #[arg(long, alias = "wacc")]
    pub discount_rate: Option<f64>,

    /// Terminal growth rate, in percent (0 to 5, step 0.5)
    #[arg(long)]
    pub terminal_growth: Option<f64>,
}

pub fn run_ev_history(
    args: DatasetArgs,
    order: RowOrder,
) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation_input = load_input(&args)?;
    let mut result = report::build_ev_history(&valuation_input)?;
    result.result = ordered(result.result, order);
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: DatasetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation_input = load_input(&args)?;
    let result = report::build_dcf(&valuation_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_report(args: DatasetArgs, order: RowOrder) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation_input = load_input(&args)?;
    let mut result = report::build_report(&valuation_input)?;
    let history = std::mem::take(&mut result.result.enterprise_value_history);
    result.result.enterprise_value_history = ordered(history, order);
    Ok(serde_json::to_value(result)?)
}

fn ordered(records: Vec<EnterpriseValueRecord>, order: RowOrder) -> Vec<EnterpriseValueRecord> {
    match order {
        RowOrder::Chronological => records,
        RowOrder::LatestFirst => latest_first(&records).into_iter().cloned().collect(),
    }
}

/// Read the dataset from `--input` or stdin and resolve the assumptions.
///
/// Assumptions from the document are clamped to their bounds; command-line
/// flags override them field by field.
fn load_input(args: &DatasetArgs) -> Result<ValuationInput, Box<dyn std::error::Error>> {
    let document: Value = if let Some(ref path) = args.input {
        input::file::read_document(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input file is required (or pipe JSON on stdin)".into());
    };

    let mut valuation_input = parse_document(document)?;
    valuation_input.assumptions = resolve_assumptions(valuation_input.assumptions.clamped(), args)?;
    tracing::debug!(
        years = valuation_input.years.len(),
        assumptions = ?valuation_input.assumptions,
        "loaded dataset"
    );
    Ok(valuation_input)
}

fn parse_document(document: Value) -> Result<ValuationInput, Box<dyn std::error::Error>> {
    match document {
        Value::Array(_) => {
            let years: Vec<FinancialYear> = serde_json::from_value(document)?;
            Ok(ValuationInput {
                years,
                assumptions: Assumptions::default(),
            })
        }
        Value::Object(_) => Ok(serde_json::from_value(document)?),
        _ => Err("input must be an array of financial years or an object with a \"years\" field".into()),
    }
}

fn resolve_assumptions(
    mut assumptions: Assumptions,
    args: &DatasetArgs,
) -> Result<Assumptions, Box<dyn std::error::Error>> {
    if let Some(raw) = args.growth_rate {
        assumptions.growth_rate = GROWTH_RATE_BOUNDS.apply_raw("growth_rate", raw)?;
    }
    if let Some(raw) = args.discount_rate {
        assumptions.discount_rate = DISCOUNT_RATE_BOUNDS.apply_raw("discount_rate", raw)?;
    }
    if let Some(raw) = args.terminal_growth {
        assumptions.terminal_growth = TERMINAL_GROWTH_BOUNDS.apply_raw("terminal_growth", raw)?;
    }
    Ok(assumptions)
}
