use serde_json::Value;

use ccr_margin_core::pfe::exposure::{self as pfe, PfeInput};
use ccr_margin_core::pfe::parameters::PfeParameters;
use ccr_margin_core::sa_ccr::exposure::{self as sa_ccr, SaCcrInput};
use ccr_margin_core::sa_ccr::parameters::SaCcrParameters;

use super::EngineArgs;
use crate::input;

pub fn run_sa_ccr(args: EngineArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sa_input: SaCcrInput = input::load(args.input.as_deref(), "SA-CCR")?;
    let result = match args.params {
        Some(ref path) => {
            let params: SaCcrParameters = input::file::read_params(path)?;
            params.validate()?;
            sa_ccr::calculate_sa_ccr_with(&sa_input, &params)?
        }
        None => sa_ccr::calculate_sa_ccr(&sa_input)?,
    };
    Ok(serde_json::to_value(result)?)
}

pub fn run_pfe(args: EngineArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pfe_input: PfeInput = input::load(args.input.as_deref(), "PFE")?;
    let result = match args.params {
        Some(ref path) => {
            let params: PfeParameters = input::file::read_params(path)?;
            params.validate()?;
            pfe::calculate_pfe_with(&pfe_input, &params)?
        }
        None => pfe::calculate_pfe(&pfe_input)?,
    };
    Ok(serde_json::to_value(result)?)
}
