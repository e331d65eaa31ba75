use clap::Args;
use serde_json::Value;

use ccr_margin_core::grid::parameters::GridScheduleParameters;
use ccr_margin_core::grid::schedule::{self, GridScheduleInput};
use ccr_margin_core::simm::margin::{self as simm, SimmInput};
use ccr_margin_core::simm::parameters::SimmParameters;

use super::EngineArgs;
use crate::input;

/// Arguments for SIMM initial margin
#[derive(Args)]
pub struct SimmArgs {
    #[command(flatten)]
    pub engine: EngineArgs,

    /// Include the inter-bucket correlations used for each risk class
    #[arg(long)]
    pub correlation_matrix: bool,
}

pub fn run_grid_im(args: EngineArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid_input: GridScheduleInput =
        input::load(args.input.as_deref(), "schedule initial margin")?;
    let result = match args.params {
        Some(ref path) => {
            let params: GridScheduleParameters = input::file::read_params(path)?;
            params.validate()?;
            schedule::calculate_grid_schedule_im_with(&grid_input, &params)?
        }
        None => schedule::calculate_grid_schedule_im(&grid_input)?,
    };
    Ok(serde_json::to_value(result)?)
}

pub fn run_simm(args: SimmArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let raw: Value = input::load(args.engine.input.as_deref(), "SIMM")?;
    let mut simm_input = SimmInput::from_value(raw)?;
    if args.correlation_matrix {
        simm_input.include_correlation_matrix = true;
    }
    let result = match args.engine.params {
        Some(ref path) => {
            let params: SimmParameters = input::file::read_params(path)?;
            params.validate()?;
            simm::calculate_simm_with(&simm_input, &params)?
        }
        None => simm::calculate_simm(&simm_input)?,
    };
    Ok(serde_json::to_value(result)?)
}
