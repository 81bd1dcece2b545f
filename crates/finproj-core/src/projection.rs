//! Period-by-period projection of a scalar quantity (balance, revenue,
//! customer count) under growth, churn and fee drag.
//!
//! For each period `t` in `1..=horizon`:
//!
//! ```text
//! value[t] = value[t-1] * (1 + growth[t]) * (1 - churn[t]) - fee[t] * value[t-1] + contribution
//! ```
//!
//! Per-period override series take precedence over the flat rates for the
//! periods they cover. Negative values are allowed (a depleting account).

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::FinProjError;
use crate::types::*;
use crate::FinProjResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Scalar inputs of [`ProjectionAssumptions`] that can be read or replaced by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionField {
    StartingValue,
    GrowthRate,
    ChurnRate,
    FeeRate,
    Contribution,
}

impl ProjectionField {
    pub const ALL: [ProjectionField; 5] = [
        ProjectionField::StartingValue,
        ProjectionField::GrowthRate,
        ProjectionField::ChurnRate,
        ProjectionField::FeeRate,
        ProjectionField::Contribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionField::StartingValue => "starting_value",
            ProjectionField::GrowthRate => "growth_rate",
            ProjectionField::ChurnRate => "churn_rate",
            ProjectionField::FeeRate => "fee_rate",
            ProjectionField::Contribution => "contribution",
        }
    }
}

impl fmt::Display for ProjectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit per-period rate schedules. Entry `t - 1` applies to period `t`;
/// periods past the end of a schedule use the flat rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<Vec<Rate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub churn: Option<Vec<Rate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Vec<Rate>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionAssumptions {
    pub starting_value: Money,
    /// Per-period growth rate
    pub growth_rate: Rate,
    /// Per-period decay / churn rate
    #[serde(default)]
    pub churn_rate: Rate,
    /// Per-period fee / drag rate, charged on the opening value
    #[serde(default)]
    pub fee_rate: Rate,
    /// Flat amount added at the end of every period
    #[serde(default)]
    pub contribution: Money,
    /// Number of periods to project
    pub horizon: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<RateOverrides>,
}

impl ProjectionAssumptions {
    /// Plain compounding: no churn, fees, contributions or overrides.
    pub fn compounding(starting_value: Money, growth_rate: Rate, horizon: u32) -> Self {
        Self {
            starting_value,
            growth_rate,
            churn_rate: Decimal::ZERO,
            fee_rate: Decimal::ZERO,
            contribution: Decimal::ZERO,
            horizon,
            overrides: None,
        }
    }

    pub fn field(&self, field: ProjectionField) -> Decimal {
        match field {
            ProjectionField::StartingValue => self.starting_value,
            ProjectionField::GrowthRate => self.growth_rate,
            ProjectionField::ChurnRate => self.churn_rate,
            ProjectionField::FeeRate => self.fee_rate,
            ProjectionField::Contribution => self.contribution,
        }
    }

    /// A copy with one scalar input replaced.
    pub fn with_field(&self, field: ProjectionField, value: Decimal) -> Self {
        let mut next = self.clone();
        match field {
            ProjectionField::StartingValue => next.starting_value = value,
            ProjectionField::GrowthRate => next.growth_rate = value,
            ProjectionField::ChurnRate => next.churn_rate = value,
            ProjectionField::FeeRate => next.fee_rate = value,
            ProjectionField::Contribution => next.contribution = value,
        }
        next
    }

    /// (growth, churn, fee) applied in `period` (1-based).
    fn rates_for(&self, period: Period) -> (Rate, Rate, Rate) {
        let idx = period as usize - 1;
        let pick = |schedule: Option<&Vec<Rate>>, flat: Rate| {
            schedule.and_then(|s| s.get(idx).copied()).unwrap_or(flat)
        };
        let ov = self.overrides.as_ref();
        (
            pick(ov.and_then(|o| o.growth.as_ref()), self.growth_rate),
            pick(ov.and_then(|o| o.churn.as_ref()), self.churn_rate),
            pick(ov.and_then(|o| o.fee.as_ref()), self.fee_rate),
        )
    }
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A single projected period with the movement broken out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionRow {
    pub period: Period,
    pub opening_value: Money,
    pub growth_rate: Rate,
    pub churn_rate: Rate,
    pub fee_rate: Rate,
    pub growth: Money,
    pub churn: Money,
    pub fee: Money,
    pub contribution: Money,
    pub closing_value: Money,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn overflow(period: Period) -> FinProjError {
    FinProjError::Undefined {
        context: format!("projected value exceeds decimal range at period {period}"),
    }
}

/// Project every period, returning the movement for each.
pub fn project_detailed(assumptions: &ProjectionAssumptions) -> FinProjResult<Vec<ProjectionRow>> {
    if assumptions.horizon == 0 {
        return Err(FinProjError::InvalidHorizon {
            horizon: assumptions.horizon,
        });
    }

    let mut rows = Vec::with_capacity(assumptions.horizon as usize);
    let mut value = assumptions.starting_value;

    for period in 1..=assumptions.horizon {
        let (g, c, f) = assumptions.rates_for(period);
        let opening = value;

        let grown = opening
            .checked_mul(Decimal::ONE + g)
            .ok_or_else(|| overflow(period))?;
        let retained = grown
            .checked_mul(Decimal::ONE - c)
            .ok_or_else(|| overflow(period))?;
        let fee = opening.checked_mul(f).ok_or_else(|| overflow(period))?;
        let closing = retained
            .checked_sub(fee)
            .and_then(|v| v.checked_add(assumptions.contribution))
            .ok_or_else(|| overflow(period))?;

        rows.push(ProjectionRow {
            period,
            opening_value: opening,
            growth_rate: g,
            churn_rate: c,
            fee_rate: f,
            growth: grown - opening,
            churn: grown - retained,
            fee,
            contribution: assumptions.contribution,
            closing_value: closing,
        });
        value = closing;
    }

    Ok(rows)
}

/// Project the value path. Period 0 holds the starting value; periods
/// `1..=horizon` hold each projected value.
pub fn project(assumptions: &ProjectionAssumptions) -> FinProjResult<CashFlowSeries> {
    let rows = project_detailed(assumptions)?;
    Ok(CashFlowSeries::from_amounts(
        std::iter::once(assumptions.starting_value).chain(rows.iter().map(|r| r.closing_value)),
    ))
}

/// Projection with the per-period movement and headline values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub ending_value: Money,
    /// Sum of the projected values for periods 1..=horizon
    pub cumulative_value: Money,
    pub series: CashFlowSeries,
    pub rows: Vec<ProjectionRow>,
}

pub fn run_projection(assumptions: &ProjectionAssumptions) -> FinProjResult<ProjectionOutput> {
    let rows = project_detailed(assumptions)?;
    let series = CashFlowSeries::from_amounts(
        std::iter::once(assumptions.starting_value).chain(rows.iter().map(|r| r.closing_value)),
    );
    let cumulative_value = rows
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.closing_value))
        .ok_or_else(|| FinProjError::Undefined {
            context: "cumulative projected value exceeds decimal range".into(),
        })?;
    Ok(ProjectionOutput {
        ending_value: series.last_amount().unwrap_or(assumptions.starting_value),
        cumulative_value,
        series,
        rows,
    })
}
