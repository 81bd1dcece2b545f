use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finproj_core::projection::{self, ProjectionAssumptions};

use crate::input;

/// Arguments for a value projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to JSON projection assumptions (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Value at period 0
    #[arg(long, allow_hyphen_values = true)]
    pub starting_value: Option<Decimal>,

    /// Per-period growth rate as a decimal
    #[arg(long, allow_hyphen_values = true)]
    pub growth_rate: Option<Decimal>,

    /// Per-period churn rate as a decimal
    #[arg(long, default_value = "0")]
    pub churn_rate: Decimal,

    /// Per-period fee rate on the opening value
    #[arg(long, default_value = "0")]
    pub fee_rate: Decimal,

    /// Amount added at the end of each period
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    pub contribution: Decimal,

    /// Number of periods to project
    #[arg(long)]
    pub horizon: Option<u32>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let assumptions: ProjectionAssumptions = match input::load(args.input.as_deref())? {
        Some(a) => a,
        None => ProjectionAssumptions {
            starting_value: args
                .starting_value
                .ok_or("--starting-value is required (or provide --input)")?,
            growth_rate: args
                .growth_rate
                .ok_or("--growth-rate is required (or provide --input)")?,
            churn_rate: args.churn_rate,
            fee_rate: args.fee_rate,
            contribution: args.contribution,
            horizon: args.horizon.ok_or("--horizon is required (or provide --input)")?,
            overrides: None,
        },
    };

    let start = Instant::now();
    let output = projection::run_projection(&assumptions)?;

    let mut warnings = Vec::new();
    if let Some(row) = output.rows.iter().find(|r| r.closing_value < Decimal::ZERO) {
        warnings.push(format!("Projected value turns negative at period {}", row.period));
    }

    super::envelope(
        "Period projection: v[t] = v[t-1] * (1 + g) * (1 - c) - f * v[t-1] + contribution",
        &assumptions,
        warnings,
        start,
        output,
    )
}
