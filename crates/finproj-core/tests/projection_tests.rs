use finproj_core::projection::{project, project_detailed, ProjectionAssumptions, RateOverrides};
use finproj_core::time_value;
use finproj_core::FinProjError;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;

// ===========================================================================
// Known-answer projections
// ===========================================================================

#[test]
fn test_compounding_matches_closed_form() {
    let a = ProjectionAssumptions::compounding(dec!(5000), dec!(0.07), 10);
    let series = project(&a).unwrap();
    let expected = dec!(5000) * dec!(1.07).powu(10);
    let ending = series.last_amount().unwrap();
    assert!(
        (ending - expected).abs() < dec!(0.0000001),
        "Expected {expected}, got {ending}"
    );
}

#[test]
fn test_series_includes_starting_value() {
    let a = ProjectionAssumptions::compounding(dec!(250), dec!(0.02), 4);
    let series = project(&a).unwrap();
    assert_eq!(series.len(), 5);
    assert_eq!(series.initial_outlay(), Some(dec!(250)));
    assert_eq!(series.flows().last().map(|cf| cf.period), Some(4));
}

#[test]
fn test_subscriber_base_with_churn_and_fees() {
    // 10k subscribers, +8% acquisition, 3% churn, 0.5% drag, +100 per period
    let a = ProjectionAssumptions {
        starting_value: dec!(10000),
        growth_rate: dec!(0.08),
        churn_rate: dec!(0.03),
        fee_rate: dec!(0.005),
        contribution: dec!(100),
        horizon: 2,
        overrides: None,
    };
    let rows = project_detailed(&a).unwrap();
    // 10000 * 1.08 * 0.97 - 50 + 100 = 10526
    assert_eq!(rows[0].closing_value, dec!(10526));
    assert_eq!(rows[1].opening_value, dec!(10526));
    assert_eq!(rows[0].growth, dec!(800));
    assert_eq!(rows[0].churn, dec!(324));
}

#[test]
fn test_per_period_overrides_for_each_rate() {
    let mut a = ProjectionAssumptions::compounding(dec!(1000), dec!(0.05), 3);
    a.overrides = Some(RateOverrides {
        growth: Some(vec![dec!(0.10)]),
        churn: Some(vec![dec!(0), dec!(0.50)]),
        fee: Some(vec![dec!(0), dec!(0), dec!(0.01)]),
    });
    let rows = project_detailed(&a).unwrap();
    assert_eq!(
        rows.iter()
            .map(|r| (r.growth_rate, r.churn_rate, r.fee_rate))
            .collect::<Vec<_>>(),
        vec![
            (dec!(0.10), dec!(0), dec!(0)),
            (dec!(0.05), dec!(0.50), dec!(0)),
            (dec!(0.05), dec!(0), dec!(0.01)),
        ]
    );
}

#[test]
fn test_assumptions_deserialise_with_defaults() {
    let a: ProjectionAssumptions = serde_json::from_str(
        r#"{"starting_value": "1000", "growth_rate": "0.1", "horizon": 2}"#,
    )
    .unwrap();
    assert_eq!(a.churn_rate, Decimal::ZERO);
    assert_eq!(project(&a).unwrap().last_amount(), Some(dec!(1210)));
}

#[test]
fn test_projection_feeds_npv() {
    // Flat 100 for 3 periods at 0% => 300
    let a = ProjectionAssumptions::compounding(dec!(100), dec!(0), 3);
    let inflows = project(&a).unwrap().excluding_initial();
    assert_eq!(time_value::npv(&inflows, Decimal::ZERO).unwrap(), dec!(300));
}

#[test]
fn test_zero_horizon_is_invalid() {
    let a = ProjectionAssumptions::compounding(dec!(100), dec!(0.05), 0);
    assert!(matches!(
        project_detailed(&a),
        Err(FinProjError::InvalidHorizon { horizon: 0 })
    ));
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_projection_is_deterministic(
        start in -1_000_000i64..1_000_000,
        growth_bps in -500i64..2_000,
        churn_bps in 0i64..1_000,
        fee_bps in 0i64..200,
        contribution in -1_000i64..1_000,
        horizon in 1u32..120,
    ) {
        let a = ProjectionAssumptions {
            starting_value: Decimal::from(start),
            growth_rate: Decimal::new(growth_bps, 4),
            churn_rate: Decimal::new(churn_bps, 4),
            fee_rate: Decimal::new(fee_bps, 4),
            contribution: Decimal::from(contribution),
            horizon,
            overrides: None,
        };
        let first = project(&a).unwrap();
        let second = project(&a.clone()).unwrap();
        prop_assert_eq!(first.len(), horizon as usize + 1);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_rows_chain(
        start in 0i64..1_000_000,
        growth_bps in 0i64..1_000,
        horizon in 1u32..60,
    ) {
        let a = ProjectionAssumptions::compounding(
            Decimal::from(start),
            Decimal::new(growth_bps, 4),
            horizon,
        );
        let rows = project_detailed(&a).unwrap();
        for pair in rows.windows(2) {
            prop_assert_eq!(pair[1].opening_value, pair[0].closing_value);
            prop_assert!(pair[1].closing_value >= pair[0].closing_value);
        }
    }
}
