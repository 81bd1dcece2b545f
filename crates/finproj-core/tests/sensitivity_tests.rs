use finproj_core::projection::{ProjectionAssumptions, ProjectionField};
use finproj_core::sensitivity::{
    run_sensitivity, sensitivity, ProjectionTarget, SensitivityInput, DEFAULT_BUMP,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn savings_plan() -> ProjectionAssumptions {
    ProjectionAssumptions {
        starting_value: dec!(10000),
        growth_rate: dec!(0.06),
        churn_rate: Decimal::ZERO,
        fee_rate: dec!(0.01),
        contribution: dec!(500),
        horizon: 20,
        overrides: None,
    }
}

#[test]
fn test_all_fields_by_default() {
    let input: SensitivityInput = serde_json::from_value(serde_json::json!({
        "base": savings_plan(),
        "target": {"kind": "ending_value"}
    }))
    .unwrap();
    assert_eq!(input.variables.len(), 5);
    assert_eq!(input.bump, DEFAULT_BUMP);

    let result = run_sensitivity(&input).unwrap();
    assert_eq!(
        result.elasticities.keys().cloned().collect::<Vec<_>>(),
        vec![
            "churn_rate".to_string(),
            "contribution".to_string(),
            "fee_rate".to_string(),
            "growth_rate".to_string(),
            "starting_value".to_string(),
        ]
    );
}

#[test]
fn test_signs_follow_economics() {
    let result = sensitivity(
        &savings_plan(),
        &ProjectionField::ALL,
        |a| ProjectionTarget::EndingValue.evaluate(a),
        DEFAULT_BUMP,
    )
    .unwrap();

    assert!(result.elasticity(ProjectionField::GrowthRate).unwrap() > Decimal::ZERO);
    assert!(result.elasticity(ProjectionField::Contribution).unwrap() > Decimal::ZERO);
    assert!(result.elasticity(ProjectionField::StartingValue).unwrap() > Decimal::ZERO);
    assert!(result.elasticity(ProjectionField::FeeRate).unwrap() < Decimal::ZERO);
    // Zero churn cannot be bumped multiplicatively
    assert_eq!(result.elasticity(ProjectionField::ChurnRate), Some(Decimal::ZERO));
}

#[test]
fn test_present_value_target_discounts() {
    let a = ProjectionAssumptions::compounding(dec!(100), dec!(0), 2);
    let pv = ProjectionTarget::PresentValue { rate: dec!(0) }.evaluate(&a).unwrap();
    assert_eq!(pv, dec!(200));
    let discounted = ProjectionTarget::PresentValue { rate: dec!(0.10) }
        .evaluate(&a)
        .unwrap();
    assert!(discounted < pv);
}

#[test]
fn test_cumulative_target_elasticity_to_start_is_one() {
    let a = ProjectionAssumptions::compounding(dec!(1000), dec!(0.04), 8);
    let result = sensitivity(
        &a,
        &[ProjectionField::StartingValue],
        |a| ProjectionTarget::CumulativeValue.evaluate(a),
        dec!(0.05),
    )
    .unwrap();
    let e = result.elasticity(ProjectionField::StartingValue).unwrap();
    assert!((e - Decimal::ONE).abs() < dec!(0.0000001), "got {e}");
}

#[test]
fn test_custom_target_closure() {
    // Only the contribution reaches the target
    let result = sensitivity(
        &savings_plan(),
        &[ProjectionField::Contribution, ProjectionField::GrowthRate],
        |a| Ok(a.contribution * dec!(2)),
        dec!(0.20),
    )
    .unwrap();
    assert_eq!(result.elasticity(ProjectionField::Contribution), Some(dec!(1)));
    assert_eq!(result.elasticity(ProjectionField::GrowthRate), Some(dec!(0)));
    assert_eq!(result.ranked()[0].field, ProjectionField::Contribution);
}

#[test]
fn test_negative_bump() {
    let a = ProjectionAssumptions::compounding(dec!(1000), dec!(0.05), 5);
    let result = sensitivity(
        &a,
        &[ProjectionField::StartingValue],
        |a| ProjectionTarget::EndingValue.evaluate(a),
        dec!(-0.10),
    )
    .unwrap();
    let entry = &result.entries[0];
    assert_eq!(entry.bumped_input, dec!(900));
    assert!((entry.elasticity - Decimal::ONE).abs() < dec!(0.0000001));
}
