use clap::{Args, ValueEnum};
use serde_json::Value;

use ccr_margin_core::grid::parameters::GridScheduleParameters;
use ccr_margin_core::pfe::parameters::PfeParameters;
use ccr_margin_core::sa_ccr::parameters::SaCcrParameters;
use ccr_margin_core::simm::parameters::SimmParameters;

#[derive(Debug, Clone, ValueEnum)]
pub enum Engine {
    SaCcr,
    Pfe,
    GridIm,
    Simm,
}

/// Arguments for dumping a built-in parameter table
#[derive(Args)]
pub struct ParamsArgs {
    /// Engine whose default table to print
    #[arg(long, value_enum)]
    pub engine: Engine,

    /// Print YAML instead of the selected output format, ready for --params
    #[arg(long)]
    pub yaml: bool,
}

pub fn default_table(engine: &Engine) -> Result<Value, serde_json::Error> {
    match engine {
        Engine::SaCcr => serde_json::to_value(SaCcrParameters::basel_cre52()),
        Engine::Pfe => serde_json::to_value(PfeParameters::cem()),
        Engine::GridIm => serde_json::to_value(GridScheduleParameters::bcbs_iosco()),
        Engine::Simm => serde_json::to_value(SimmParameters::v2_6()),
    }
}

pub fn run_params(args: &ParamsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(default_table(&args.engine)?)
}

pub fn to_yaml(value: &Value) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_yaml::to_string(value)?)
}
