use clap::Args;
use serde::de::DeserializeOwned;
use serde_json::Value;

use ccr_margin_core::var::engine::{self, VarInput};

use crate::input;

/// Arguments for Value-at-Risk
#[derive(Args)]
pub struct VarArgs {
    /// Path to JSON input file (positions, parameters, historical data)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the confidence level: 90%, 95%, 97.5% or 99%
    #[arg(long)]
    pub confidence: Option<String>,

    /// Override the horizon: 1D or 10D
    #[arg(long)]
    pub horizon: Option<String>,

    /// Override the method: HISTORICAL_SIMULATION, PARAMETRIC or MONTE_CARLO
    #[arg(long)]
    pub method: Option<String>,

    /// Override the Monte Carlo seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parse a command-line label with the same names the JSON input accepts.
fn parse_label<T: DeserializeOwned>(flag: &str, label: &str) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(label.to_string()))
        .map_err(|_| format!("Invalid value '{}' for --{}", label, flag).into())
}

pub fn run_var(args: VarArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut var_input: VarInput = input::load(args.input.as_deref(), "VaR")?;
    let params = &mut var_input.parameters;
    if let Some(ref c) = args.confidence {
        params.confidence_level = parse_label("confidence", c)?;
    }
    if let Some(ref h) = args.horizon {
        params.time_horizon = parse_label("horizon", h)?;
    }
    if let Some(ref m) = args.method {
        params.method = parse_label("method", &m.to_uppercase())?;
    }
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    let result = engine::calculate_var(&var_input)?;
    Ok(serde_json::to_value(result)?)
}
