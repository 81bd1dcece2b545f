use std::time::Instant;

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use finproj_core::types::with_metadata;
use finproj_core::FinProjResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse `input_json`, run `compute`, and return the enveloped result as JSON.
fn call<I, O>(
    input_json: &str,
    methodology: &str,
    compute: impl FnOnce(&I) -> FinProjResult<O>,
) -> NapiResult<String>
where
    I: DeserializeOwned + Serialize,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let start = Instant::now();
    let result = compute(&input).map_err(to_napi_error)?;
    let output = with_metadata(
        methodology,
        &input,
        Vec::new(),
        start.elapsed().as_micros() as u64,
        result,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Amortization
// ---------------------------------------------------------------------------

#[napi]
pub fn amortize_loan(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "Fixed-payment annuity amortisation",
        finproj_core::amortization::amortize,
    )
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn project_value(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "Period projection under growth, churn and fees",
        finproj_core::projection::run_projection,
    )
}

// ---------------------------------------------------------------------------
// Return metrics
// ---------------------------------------------------------------------------

#[napi]
pub fn net_present_value(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "NPV",
        |input: &finproj_core::returns::NpvInput| {
            let npv = finproj_core::time_value::npv(&input.cash_flows, input.rate)?;
            Ok(serde_json::json!({ "npv": npv }))
        },
    )
}

#[napi]
pub fn internal_rate_of_return(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "IRR (Newton-Raphson)",
        finproj_core::returns::solve_irr,
    )
}

#[napi]
pub fn return_metrics(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "Return metrics: NPV, IRR, equity multiple, payback, DSCR",
        finproj_core::returns::evaluate,
    )
}

// ---------------------------------------------------------------------------
// Sensitivity and scoring
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_analysis(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "One-at-a-time elasticity",
        finproj_core::sensitivity::run_sensitivity,
    )
}

#[napi]
pub fn score_metrics(input_json: String) -> NapiResult<String> {
    call(
        &input_json,
        "Weighted threshold score",
        |input: &finproj_core::scoring::ScoreInput| Ok(finproj_core::scoring::run_score(input)),
    )
}
