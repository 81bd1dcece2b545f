use std::time::Instant;

use clap::Args;
use serde_json::Value;

use finproj_core::scoring::{self, ScoreInput};

use crate::input;

/// Arguments for threshold scoring
#[derive(Args)]
pub struct ScoreArgs {
    /// Path to JSON with metrics, bands and optional weights/grades
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_score(args: ScoreArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let score_input: ScoreInput = input::load(args.input.as_deref())?
        .ok_or("--input <file.json> or stdin required for scoring")?;

    let start = Instant::now();
    let output = scoring::run_score(&score_input);

    let warnings = score_input
        .bands
        .keys()
        .filter(|name| !score_input.metrics.contains_key(*name))
        .map(|name| format!("No value for banded metric '{name}'; it scores nothing"))
        .collect();

    super::envelope(
        "Weighted threshold score, clamped to 0-100, mapped to a grade",
        &score_input,
        warnings,
        start,
        output,
    )
}
