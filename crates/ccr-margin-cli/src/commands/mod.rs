pub mod exposure;
pub mod margin;
pub mod params;
pub mod risk;

use clap::Args;

/// Input document plus an optional replacement parameter table.
#[derive(Args)]
pub struct EngineArgs {
    /// Path to JSON input file (reads stdin when omitted)
    #[arg(long)]
    pub input: Option<String>,

    /// Parameter table to use instead of the built-in one (.json, .yaml or .yml)
    #[arg(long)]
    pub params: Option<String>,
}
