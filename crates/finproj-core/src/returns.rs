use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinProjError;
use crate::time_value::{self, DEFAULT_IRR_GUESS};
use crate::types::*;
use crate::FinProjResult;

/// Input for the bundled return metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnMetricsInput {
    /// Period 0 = initial outlay (negative), then periodic flows
    pub cash_flows: CashFlowSeries,
    /// Per-period discount rate for NPV and discounted payback
    pub discount_rate: Rate,
    #[serde(default = "default_irr_guess")]
    pub irr_guess: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_operating_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_debt_service: Option<Money>,
}

fn default_irr_guess() -> Rate {
    DEFAULT_IRR_GUESS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpvInput {
    pub cash_flows: CashFlowSeries,
    pub rate: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrrInput {
    pub cash_flows: CashFlowSeries,
    #[serde(default = "default_irr_guess")]
    pub guess: Rate,
    /// When set, the periodic IRR is also reported as an effective annual rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods_per_year: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrOutput {
    pub irr: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annual_irr: Option<Rate>,
}

/// Solve the IRR of a serialisable input. Unlike [`evaluate`], a series
/// without a root is an error here.
pub fn solve_irr(input: &IrrInput) -> FinProjResult<IrrOutput> {
    let irr = time_value::irr(&input.cash_flows, input.guess)?;
    let annual_irr = input
        .periods_per_year
        .map(|n| time_value::periodic_to_annual(irr, n))
        .transpose()?;
    Ok(IrrOutput { irr, annual_irr })
}

/// Return metrics for one cash-flow series. `None` marks a metric that is
/// undefined for the series (no IRR root, zero outlay, zero debt service,
/// never paid back).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnMetrics {
    pub npv: Money,
    pub irr: Option<Rate>,
    pub equity_multiple: Option<Multiple>,
    pub cash_on_cash: Option<Multiple>,
    pub payback_period: Option<Period>,
    pub discounted_payback_period: Option<Period>,
    pub dscr: Option<Multiple>,
    /// Sum of absolute negative flows
    pub total_outflows: Money,
    /// Sum of positive flows
    pub total_inflows: Money,
}

impl ReturnMetrics {
    /// Defined metrics by name, ready for scoring.
    pub fn to_metric_map(&self) -> BTreeMap<String, Decimal> {
        let mut map = BTreeMap::new();
        map.insert("npv".to_string(), self.npv);
        let optional = [
            ("irr", self.irr),
            ("equity_multiple", self.equity_multiple),
            ("cash_on_cash", self.cash_on_cash),
            ("payback_period", self.payback_period.map(Decimal::from)),
            (
                "discounted_payback_period",
                self.discounted_payback_period.map(Decimal::from),
            ),
            ("dscr", self.dscr),
        ];
        for (name, value) in optional {
            if let Some(v) = value {
                map.insert(name.to_string(), v);
            }
        }
        map
    }
}

/// Sum of positive flows over the absolute period-0 outlay.
///
/// `None` when there is no period-0 flow or it is zero.
pub fn equity_multiple(flows: &CashFlowSeries) -> Option<Multiple> {
    let outlay = flows.initial_outlay()?;
    if outlay.is_zero() {
        return None;
    }
    let inflows: Money = flows
        .iter()
        .filter(|cf| cf.amount.is_sign_positive())
        .map(|cf| cf.amount)
        .sum();
    Some(inflows / outlay.abs())
}

/// First period at which the running total of flows reaches zero or above.
pub fn payback_period(flows: &CashFlowSeries) -> Option<Period> {
    let mut cumulative = Decimal::ZERO;
    for cf in flows.iter() {
        cumulative += cf.amount;
        if cumulative >= Decimal::ZERO {
            return Some(cf.period);
        }
    }
    None
}

/// Payback period on flows discounted at `rate`.
///
/// `None` once the discount factor leaves decimal range in either direction;
/// a discounted value or running total that overflows is `Undefined`.
pub fn discounted_payback_period(flows: &CashFlowSeries, rate: Rate) -> FinProjResult<Option<Period>> {
    if rate <= dec!(-1) {
        return Err(FinProjError::InvalidRate {
            rate,
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let one_plus_r = Decimal::ONE + rate;
    let mut cumulative = Decimal::ZERO;
    let mut discount = Decimal::ONE;
    let mut at = 0u32;

    for cf in flows.iter() {
        while at < cf.period {
            discount = match discount.checked_mul(one_plus_r) {
                Some(d) => d,
                // Later flows are worth nothing today; the running total can no longer rise
                None => return Ok(None),
            };
            at += 1;
        }
        if discount.is_zero() {
            // Below 28 decimal places: the factor is no longer meaningful
            return Ok(None);
        }
        cumulative = cf
            .amount
            .checked_div(discount)
            .and_then(|pv| cumulative.checked_add(pv))
            .ok_or_else(|| FinProjError::Undefined {
                context: format!("discounted payback at rate {rate} exceeds decimal range"),
            })?;
        if cumulative >= Decimal::ZERO {
            return Ok(Some(cf.period));
        }
    }
    Ok(None)
}

/// Debt service coverage ratio. `None` when debt service is zero.
pub fn dscr(net_operating_income: Money, annual_debt_service: Money) -> Option<Multiple> {
    if annual_debt_service.is_zero() {
        return None;
    }
    Some(net_operating_income / annual_debt_service)
}

/// Annual pre-tax cash flow over total cash invested. `None` when nothing was invested.
pub fn cash_on_cash(annual_cash_flow: Money, cash_invested: Money) -> Option<Multiple> {
    if cash_invested.is_zero() {
        return None;
    }
    Some(annual_cash_flow / cash_invested.abs())
}

/// Compute every return metric for a series.
///
/// A series whose IRR cannot be solved reports `irr: None`; invalid rates
/// and out-of-range NPVs are errors.
pub fn evaluate(input: &ReturnMetricsInput) -> FinProjResult<ReturnMetrics> {
    let flows = &input.cash_flows;

    let npv = time_value::npv(flows, input.discount_rate)?;

    let irr = match time_value::irr(flows, input.irr_guess) {
        Ok(r) => Some(r),
        Err(FinProjError::IrrNotFound { .. }) | Err(FinProjError::InsufficientData(_)) => None,
        Err(e) => return Err(e),
    };

    let outlay = flows.initial_outlay().unwrap_or(Decimal::ZERO);
    let first_year = flows.amount_at(1).unwrap_or(Decimal::ZERO);

    let dscr = match (input.net_operating_income, input.annual_debt_service) {
        (Some(noi), Some(ds)) => dscr(noi, ds),
        _ => None,
    };

    let total_outflows = flows
        .iter()
        .filter(|cf| cf.amount.is_sign_negative())
        .map(|cf| cf.amount.abs())
        .sum();
    let total_inflows = flows
        .iter()
        .filter(|cf| cf.amount.is_sign_positive())
        .map(|cf| cf.amount)
        .sum();

    Ok(ReturnMetrics {
        npv,
        irr,
        equity_multiple: equity_multiple(flows),
        cash_on_cash: cash_on_cash(first_year, outlay),
        payback_period: payback_period(flows),
        discounted_payback_period: discounted_payback_period(flows, input.discount_rate)?,
        dscr,
        total_outflows,
        total_inflows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn series(amounts: &[Decimal]) -> CashFlowSeries {
        CashFlowSeries::from_amounts(amounts.to_vec())
    }

    #[test]
    fn test_equity_multiple() {
        // Invest 100, receive 50+50+150 => 2.5x
        let flows = series(&[dec!(-100), dec!(50), dec!(50), dec!(150)]);
        assert_eq!(equity_multiple(&flows), Some(dec!(2.5)));
    }

    #[test]
    fn test_equity_multiple_zero_outlay_is_undefined() {
        let flows = series(&[dec!(0), dec!(50)]);
        assert_eq!(equity_multiple(&flows), None);
    }

    #[test]
    fn test_payback_exact_boundary() {
        let flows = series(&[dec!(-100), dec!(50), dec!(50)]);
        assert_eq!(payback_period(&flows), Some(2));
    }

    #[test]
    fn test_payback_never() {
        let flows = series(&[dec!(-100), dec!(10), dec!(10)]);
        assert_eq!(payback_period(&flows), None);
    }

    #[test]
    fn test_discounted_payback_is_later() {
        let flows = series(&[dec!(-100), dec!(40), dec!(40), dec!(40), dec!(40)]);
        assert_eq!(payback_period(&flows), Some(3));
        assert_eq!(discounted_payback_period(&flows, dec!(0.10)).unwrap(), Some(4));
    }

    #[test]
    fn test_discounted_payback_vanishing_discount_factor() {
        // 0.01^15 rounds to zero at 28 decimal places
        let mut amounts = vec![dec!(-100)];
        amounts.extend(std::iter::repeat(dec!(-1)).take(20));
        let flows = series(&amounts);
        assert_eq!(discounted_payback_period(&flows, dec!(-0.99)).unwrap(), None);
    }

    #[test]
    fn test_discounted_payback_overflowing_value_is_undefined() {
        // 1 / 0.01^14 = 1e28 per unit; 10 units leave decimal range
        let mut amounts = vec![dec!(-100)];
        amounts.extend(std::iter::repeat(Decimal::ZERO).take(13));
        amounts.push(dec!(10));
        let flows = series(&amounts);
        assert!(matches!(
            discounted_payback_period(&flows, dec!(-0.99)),
            Err(FinProjError::Undefined { .. })
        ));
    }

    #[test]
    fn test_dscr() {
        assert_eq!(dscr(dec!(125000), dec!(100000)), Some(dec!(1.25)));
        assert_eq!(dscr(dec!(125000), Decimal::ZERO), None);
    }

    #[test]
    fn test_cash_on_cash() {
        assert_eq!(cash_on_cash(dec!(8000), dec!(-100000)), Some(dec!(0.08)));
        assert_eq!(cash_on_cash(dec!(8000), Decimal::ZERO), None);
    }

    #[test]
    fn test_evaluate_bundle() {
        let input = ReturnMetricsInput {
            cash_flows: series(&[dec!(-1000), dec!(400), dec!(400), dec!(400)]),
            discount_rate: dec!(0.08),
            irr_guess: DEFAULT_IRR_GUESS,
            net_operating_income: Some(dec!(600)),
            annual_debt_service: Some(dec!(400)),
        };
        let m = evaluate(&input).unwrap();
        assert!(m.npv > Decimal::ZERO);
        assert!((m.irr.unwrap() - dec!(0.097)).abs() < dec!(0.001));
        assert_eq!(m.equity_multiple, Some(dec!(1.2)));
        assert_eq!(m.cash_on_cash, Some(dec!(0.4)));
        assert_eq!(m.payback_period, Some(3));
        assert_eq!(m.dscr, Some(dec!(1.5)));
        assert_eq!(m.total_outflows, dec!(1000));
        assert_eq!(m.total_inflows, dec!(1200));

        let map = m.to_metric_map();
        assert_eq!(map.get("dscr"), Some(&dec!(1.5)));
        assert_eq!(map.get("payback_period"), Some(&dec!(3)));
    }

    #[test]
    fn test_solve_irr_annualises() {
        let input: IrrInput = serde_json::from_str(
            r#"{"cash_flows": ["-100", "110"], "periods_per_year": 12}"#,
        )
        .unwrap();
        assert_eq!(input.guess, DEFAULT_IRR_GUESS);
        let out = solve_irr(&input).unwrap();
        assert!((out.irr - dec!(0.10)).abs() < dec!(0.000001));
        // 1.1^12 - 1
        assert!((out.annual_irr.unwrap() - dec!(2.1384)).abs() < dec!(0.001));
    }

    #[test]
    fn test_solve_irr_without_root_is_error() {
        let input = IrrInput {
            cash_flows: series(&[dec!(100), dec!(100)]),
            guess: DEFAULT_IRR_GUESS,
            periods_per_year: None,
        };
        assert!(matches!(
            solve_irr(&input),
            Err(FinProjError::IrrNotFound { .. })
        ));
    }

    #[test]
    fn test_evaluate_without_irr_root() {
        let input = ReturnMetricsInput {
            cash_flows: series(&[dec!(100), dec!(100), dec!(100)]),
            discount_rate: dec!(0.05),
            irr_guess: DEFAULT_IRR_GUESS,
            net_operating_income: None,
            annual_debt_service: None,
        };
        let m = evaluate(&input).unwrap();
        assert_eq!(m.irr, None);
        assert_eq!(m.dscr, None);
        assert!(!m.to_metric_map().contains_key("irr"));
    }
}
