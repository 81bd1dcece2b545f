use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use finproj_core::amortization::{self, LoanTerms};

use crate::input;

/// Arguments for a loan amortisation schedule
#[derive(Args)]
pub struct AmortizeArgs {
    /// Path to JSON loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate as a decimal (0.065 = 6.5%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Number of payment periods
    #[arg(long)]
    pub term_periods: Option<u32>,

    /// Payment periods per year
    #[arg(long, default_value_t = 12)]
    pub periods_per_year: u32,

    /// Additional principal paid every period
    #[arg(long)]
    pub extra_payment: Option<Decimal>,

    /// Report the payment and totals without the period rows
    #[arg(long)]
    pub summary: bool,
}

pub fn run_amortize(args: AmortizeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = match input::load(args.input.as_deref())? {
        Some(terms) => terms,
        None => {
            let principal = args
                .principal
                .ok_or("--principal is required (or provide --input)")?;
            let annual_rate = args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?;
            let term_periods = args
                .term_periods
                .ok_or("--term-periods is required (or provide --input)")?;
            let mut terms = LoanTerms::new(principal, annual_rate, term_periods, args.periods_per_year);
            terms.extra_payment = args.extra_payment.unwrap_or(Decimal::ZERO);
            terms
        }
    };

    let start = Instant::now();
    let mut schedule = amortization::amortize(&terms)?;

    let mut warnings = Vec::new();
    if schedule.payoff_period() < terms.term_periods {
        warnings.push(format!(
            "Extra payments retire the loan after {} of {} periods",
            schedule.payoff_period(),
            terms.term_periods
        ));
    }
    if args.summary {
        schedule.periods.clear();
    }

    super::envelope(
        "Fixed-payment annuity amortisation: P * r / (1 - (1 + r)^-n)",
        &terms,
        warnings,
        start,
        schedule,
    )
}
