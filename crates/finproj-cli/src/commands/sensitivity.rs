use std::time::Instant;

use clap::Args;
use serde_json::Value;

use finproj_core::sensitivity::{self, SensitivityInput};

use crate::input;

/// Arguments for a one-at-a-time sensitivity run
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to JSON with base assumptions, target and optional variables/bump
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sens_input: SensitivityInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for sensitivity")?;

    let start = Instant::now();
    let result = sensitivity::run_sensitivity(&sens_input)?;

    let warnings = result
        .entries
        .iter()
        .filter(|e| e.base_input.is_zero())
        .map(|e| format!("{} is zero at base; a multiplicative bump cannot move it", e.field))
        .collect();

    super::envelope(
        "Elasticity: (dy / y) / bump, one input at a time",
        &sens_input,
        warnings,
        start,
        result,
    )
}
