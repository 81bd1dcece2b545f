use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use finproj_core::returns::{self, IrrInput, NpvInput, ReturnMetricsInput};
use finproj_core::time_value::{self, DEFAULT_IRR_GUESS};
use finproj_core::CashFlowSeries;

use crate::input;

fn cash_flows_flag(flows: Option<Vec<Decimal>>) -> Result<CashFlowSeries, Box<dyn std::error::Error>> {
    let flows = flows.ok_or("--cash-flows is required (or provide --input)")?;
    Ok(CashFlowSeries::from_amounts(flows))
}

/// Arguments for net present value
#[derive(Args)]
pub struct NpvArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows from period 0 (comma-separated, e.g. "-1000,300,400,500")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Per-period discount rate as a decimal
    #[arg(long, allow_hyphen_values = true)]
    pub rate: Option<Decimal>,
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let npv_input: NpvInput = match input::load(args.input.as_deref())? {
        Some(i) => i,
        None => NpvInput {
            cash_flows: cash_flows_flag(args.cash_flows)?,
            rate: args.rate.ok_or("--rate is required (or provide --input)")?,
        },
    };

    let start = Instant::now();
    let npv = time_value::npv(&npv_input.cash_flows, npv_input.rate)?;

    super::envelope(
        "NPV: sum of flows[t] / (1 + r)^t",
        &npv_input,
        Vec::new(),
        start,
        json!({ "npv": npv }),
    )
}

/// Arguments for internal rate of return
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows from period 0 (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Starting rate for the solver
    #[arg(long, default_value_t = DEFAULT_IRR_GUESS, allow_hyphen_values = true)]
    pub guess: Decimal,

    /// Also report the effective annual rate for this many periods per year
    #[arg(long)]
    pub periods_per_year: Option<u32>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let irr_input: IrrInput = match input::load(args.input.as_deref())? {
        Some(i) => i,
        None => IrrInput {
            cash_flows: cash_flows_flag(args.cash_flows)?,
            guess: args.guess,
            periods_per_year: args.periods_per_year,
        },
    };

    let start = Instant::now();
    let output = returns::solve_irr(&irr_input)?;

    super::envelope(
        "IRR: Newton-Raphson on NPV(r) = 0",
        &irr_input,
        Vec::new(),
        start,
        output,
    )
}

/// Arguments for the bundled return metrics
#[derive(Args)]
pub struct MetricsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows from period 0 (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Per-period discount rate for NPV and discounted payback
    #[arg(long, allow_hyphen_values = true)]
    pub discount_rate: Option<Decimal>,

    /// Net operating income, for DSCR
    #[arg(long)]
    pub noi: Option<Decimal>,

    /// Annual debt service, for DSCR
    #[arg(long)]
    pub debt_service: Option<Decimal>,
}

pub fn run_metrics(args: MetricsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let metrics_input: ReturnMetricsInput = match input::load(args.input.as_deref())? {
        Some(i) => i,
        None => ReturnMetricsInput {
            cash_flows: cash_flows_flag(args.cash_flows)?,
            discount_rate: args
                .discount_rate
                .ok_or("--discount-rate is required (or provide --input)")?,
            irr_guess: DEFAULT_IRR_GUESS,
            net_operating_income: args.noi,
            annual_debt_service: args.debt_service,
        },
    };

    let start = Instant::now();
    let metrics = returns::evaluate(&metrics_input)?;

    let mut warnings = Vec::new();
    if metrics.irr.is_none() {
        warnings.push("IRR did not converge; series may not change sign".into());
    }
    if metrics.equity_multiple.is_none() {
        warnings.push("No period-0 outlay; equity multiple is undefined".into());
    }
    if metrics.payback_period.is_none() {
        warnings.push("Cumulative cash flow never turns non-negative".into());
    }

    super::envelope(
        "Return metrics: NPV, IRR, equity multiple, cash-on-cash, payback, DSCR",
        &metrics_input,
        warnings,
        start,
        metrics,
    )
}
