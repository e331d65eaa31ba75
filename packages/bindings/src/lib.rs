use napi::Result as NapiResult;
use napi_derive::napi;

use ccr_margin_core::grid::{parameters::GridScheduleParameters, schedule};
use ccr_margin_core::pfe::{exposure as pfe, parameters::PfeParameters};
use ccr_margin_core::sa_ccr::{exposure as sa_ccr, parameters::SaCcrParameters};
use ccr_margin_core::simm::{margin as simm, parameters::SimmParameters};
use ccr_margin_core::var::engine as var;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Exposure
// ---------------------------------------------------------------------------

/// SA-CCR exposure at default. `params_json` replaces the CRE52 table.
#[napi]
pub fn calculate_sa_ccr(input_json: String, params_json: Option<String>) -> NapiResult<String> {
    let input: sa_ccr::SaCcrInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = match params_json {
        Some(p) => {
            let params = SaCcrParameters::from_json(&p).map_err(to_napi_error)?;
            sa_ccr::calculate_sa_ccr_with(&input, &params)
        }
        None => sa_ccr::calculate_sa_ccr(&input),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_pfe(input_json: String, params_json: Option<String>) -> NapiResult<String> {
    let input: pfe::PfeInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = match params_json {
        Some(p) => {
            let params = PfeParameters::from_json(&p).map_err(to_napi_error)?;
            pfe::calculate_pfe_with(&input, &params)
        }
        None => pfe::calculate_pfe(&input),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Market risk
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_var(input_json: String) -> NapiResult<String> {
    let input: var::VarInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = var::calculate_var(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Initial margin
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_grid_schedule_im(
    input_json: String,
    params_json: Option<String>,
) -> NapiResult<String> {
    let input: schedule::GridScheduleInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = match params_json {
        Some(p) => {
            let params = GridScheduleParameters::from_json(&p).map_err(to_napi_error)?;
            schedule::calculate_grid_schedule_im_with(&input, &params)
        }
        None => schedule::calculate_grid_schedule_im(&input),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// ISDA SIMM delta margin. `params_json` replaces the v2.6 calibration.
#[napi]
pub fn calculate_simm(input_json: String, params_json: Option<String>) -> NapiResult<String> {
    let input = simm::SimmInput::from_json(&input_json).map_err(to_napi_error)?;
    let output = match params_json {
        Some(p) => {
            let params = SimmParameters::from_json(&p).map_err(to_napi_error)?;
            simm::calculate_simm_with(&input, &params)
        }
        None => simm::calculate_simm(&input),
    }
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Parameter tables
// ---------------------------------------------------------------------------

/// Built-in table for "sa_ccr", "pfe", "grid_schedule" or "simm".
#[napi]
pub fn default_parameters(engine: String) -> NapiResult<String> {
    match engine.as_str() {
        "sa_ccr" => serde_json::to_string(SaCcrParameters::basel_cre52()),
        "pfe" => serde_json::to_string(PfeParameters::cem()),
        "grid_schedule" => serde_json::to_string(GridScheduleParameters::bcbs_iosco()),
        "simm" => serde_json::to_string(SimmParameters::v2_6()),
        other => return Err(to_napi_error(format!("Unknown engine '{}'", other))),
    }
    .map_err(to_napi_error)
}
