use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::FinProjError;
use crate::projection::{self, ProjectionAssumptions, ProjectionField};
use crate::time_value;
use crate::types::*;
use crate::FinProjResult;

pub const DEFAULT_BUMP: Rate = dec!(0.10);

/// Named projection outputs the adapters can ask elasticities for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProjectionTarget {
    /// Value after the final period
    EndingValue,
    /// Sum of the projected values for periods 1..=horizon
    CumulativeValue,
    /// Projected values for periods 1..=horizon discounted at `rate`
    PresentValue { rate: Rate },
    /// Projected values treated as inflows against an initial outlay
    InvestmentNpv { rate: Rate, initial_outlay: Money },
}

impl ProjectionTarget {
    pub fn evaluate(&self, assumptions: &ProjectionAssumptions) -> FinProjResult<Decimal> {
        let series = projection::project(assumptions)?;
        match self {
            ProjectionTarget::EndingValue => series.last_amount().ok_or_else(|| {
                FinProjError::InsufficientData("projection produced no periods".into())
            }),
            ProjectionTarget::CumulativeValue => Ok(series.excluding_initial().total()),
            ProjectionTarget::PresentValue { rate } => {
                time_value::npv(&series.excluding_initial(), *rate)
            }
            ProjectionTarget::InvestmentNpv {
                rate,
                initial_outlay,
            } => time_value::npv(&series.with_initial_outlay(-initial_outlay.abs()), *rate),
        }
    }
}

/// Input for a one-at-a-time sensitivity run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub base: ProjectionAssumptions,
    /// Fields to perturb; every scalar field when omitted
    #[serde(default = "all_fields")]
    pub variables: Vec<ProjectionField>,
    pub target: ProjectionTarget,
    #[serde(default = "default_bump")]
    pub bump: Rate,
}

fn all_fields() -> Vec<ProjectionField> {
    ProjectionField::ALL.to_vec()
}

fn default_bump() -> Rate {
    DEFAULT_BUMP
}

/// Result of bumping a single input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityEntry {
    pub field: ProjectionField,
    pub base_input: Decimal,
    pub bumped_input: Decimal,
    pub bumped_value: Decimal,
    /// % change in target per % change in input
    pub elasticity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityResult {
    pub base_value: Decimal,
    pub bump: Rate,
    /// Elasticity by input name
    pub elasticities: BTreeMap<String, Decimal>,
    pub entries: Vec<SensitivityEntry>,
}

impl SensitivityResult {
    pub fn elasticity(&self, field: ProjectionField) -> Option<Decimal> {
        self.elasticities.get(field.as_str()).copied()
    }

    /// Entries ordered by absolute elasticity, largest first (tornado order).
    pub fn ranked(&self) -> Vec<&SensitivityEntry> {
        let mut ranked: Vec<&SensitivityEntry> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.elasticity.abs().cmp(&a.elasticity.abs()));
        ranked
    }
}

/// Elasticity of `target` to each variable field of `base`.
///
/// Each field is multiplied by `1 + bump` with every other field at its
/// base value. `target` runs once for the base case and once per distinct
/// field. A field whose base value is zero does not move and reports zero
/// elasticity.
pub fn sensitivity<F>(
    base: &ProjectionAssumptions,
    variables: &[ProjectionField],
    target: F,
    bump: Rate,
) -> FinProjResult<SensitivityResult>
where
    F: Fn(&ProjectionAssumptions) -> FinProjResult<Decimal> + Sync,
{
    if bump.is_zero() {
        return Err(FinProjError::InvalidInput {
            field: "bump".into(),
            reason: "Bump must be non-zero".into(),
        });
    }

    let fields: Vec<ProjectionField> = variables
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let base_value = target(base)?;
    if base_value.is_zero() && !fields.is_empty() {
        return Err(FinProjError::Undefined {
            context: "elasticity against a zero base target".into(),
        });
    }

    let bump_one = |field: ProjectionField| -> FinProjResult<SensitivityEntry> {
        let base_input = base.field(field);
        let bumped_input = base_input * (Decimal::ONE + bump);
        let bumped_value = target(&base.with_field(field, bumped_input))?;
        let elasticity = (bumped_value - base_value)
            .checked_div(base_value)
            .and_then(|change| change.checked_div(bump))
            .ok_or_else(|| FinProjError::Undefined {
                context: format!("elasticity of {field} exceeds decimal range"),
            })?;
        Ok(SensitivityEntry {
            field,
            base_input,
            bumped_input,
            bumped_value,
            elasticity,
        })
    };

    #[cfg(feature = "parallel")]
    let entries = fields
        .par_iter()
        .map(|f| bump_one(*f))
        .collect::<FinProjResult<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let entries = fields
        .iter()
        .map(|f| bump_one(*f))
        .collect::<FinProjResult<Vec<_>>>()?;

    let elasticities = entries
        .iter()
        .map(|e| (e.field.as_str().to_string(), e.elasticity))
        .collect();

    Ok(SensitivityResult {
        base_value,
        bump,
        elasticities,
        entries,
    })
}

/// Run a sensitivity described by a serialisable input.
pub fn run_sensitivity(input: &SensitivityInput) -> FinProjResult<SensitivityResult> {
    sensitivity(
        &input.base,
        &input.variables,
        |a| input.target.evaluate(a),
        input.bump,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn base() -> ProjectionAssumptions {
        ProjectionAssumptions::compounding(dec!(1000), dec!(0.05), 10)
    }

    #[test]
    fn test_growth_elasticity_positive() {
        let result = sensitivity(
            &base(),
            &[ProjectionField::GrowthRate],
            |a| ProjectionTarget::EndingValue.evaluate(a),
            DEFAULT_BUMP,
        )
        .unwrap();
        assert!(result.elasticity(ProjectionField::GrowthRate).unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_starting_value_elasticity_is_one() {
        // Ending value is linear in the starting value
        let result = sensitivity(
            &base(),
            &[ProjectionField::StartingValue],
            |a| ProjectionTarget::EndingValue.evaluate(a),
            dec!(0.10),
        )
        .unwrap();
        let e = result.elasticity(ProjectionField::StartingValue).unwrap();
        assert!((e - Decimal::ONE).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_evaluation_count() {
        let calls = AtomicUsize::new(0);
        let fields = [
            ProjectionField::GrowthRate,
            ProjectionField::StartingValue,
            ProjectionField::GrowthRate,
        ];
        let result = sensitivity(
            &base(),
            &fields,
            |a| {
                calls.fetch_add(1, Ordering::SeqCst);
                ProjectionTarget::EndingValue.evaluate(a)
            },
            DEFAULT_BUMP,
        )
        .unwrap();
        // base + two distinct fields
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.entries.len(), 2);
    }

    #[test]
    fn test_zero_field_has_zero_elasticity() {
        let result = sensitivity(
            &base(),
            &[ProjectionField::FeeRate],
            |a| ProjectionTarget::EndingValue.evaluate(a),
            DEFAULT_BUMP,
        )
        .unwrap();
        assert_eq!(result.elasticity(ProjectionField::FeeRate), Some(Decimal::ZERO));
    }

    #[test]
    fn test_zero_base_target_is_undefined() {
        let a = ProjectionAssumptions::compounding(Decimal::ZERO, dec!(0.05), 3);
        let result = sensitivity(
            &a,
            &[ProjectionField::GrowthRate],
            |a| ProjectionTarget::EndingValue.evaluate(a),
            DEFAULT_BUMP,
        );
        assert!(matches!(result, Err(FinProjError::Undefined { .. })));
    }

    #[test]
    fn test_zero_bump_rejected() {
        let result = sensitivity(
            &base(),
            &[ProjectionField::GrowthRate],
            |a| ProjectionTarget::EndingValue.evaluate(a),
            Decimal::ZERO,
        );
        assert!(matches!(result, Err(FinProjError::InvalidInput { .. })));
    }

    #[test]
    fn test_ranked_orders_by_magnitude() {
        let mut a = base();
        a.churn_rate = dec!(0.02);
        let input = SensitivityInput {
            base: a,
            variables: vec![ProjectionField::ChurnRate, ProjectionField::StartingValue],
            target: ProjectionTarget::EndingValue,
            bump: DEFAULT_BUMP,
        };
        let result = run_sensitivity(&input).unwrap();
        let ranked = result.ranked();
        assert_eq!(ranked[0].field, ProjectionField::StartingValue);
        assert!(result.elasticity(ProjectionField::ChurnRate).unwrap() < Decimal::ZERO);
    }

    #[test]
    fn test_investment_npv_target() {
        let a = ProjectionAssumptions::compounding(dec!(100), dec!(0.0), 2);
        let target = ProjectionTarget::InvestmentNpv {
            rate: dec!(0.0),
            initial_outlay: dec!(150),
        };
        // -150 + 100 + 100
        assert_eq!(target.evaluate(&a).unwrap(), dec!(50));
    }
}
