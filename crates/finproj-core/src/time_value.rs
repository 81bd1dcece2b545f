use log::{debug, trace};
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::FinProjError;
use crate::types::{CashFlowSeries, Money, Rate};
use crate::FinProjResult;

/// Absolute NPV (in the series' currency unit) below which IRR has converged.
pub const IRR_TOLERANCE: Decimal = dec!(0.0001);
pub const MAX_IRR_ITERATIONS: u32 = 100;
pub const DEFAULT_IRR_GUESS: Rate = dec!(0.10);
/// Lowest rate the solver will evaluate; keeps `(1 + rate)` away from zero.
pub const IRR_RATE_FLOOR: Rate = dec!(-0.99);
const IRR_RATE_CEILING: Rate = dec!(100.0);
/// Step taken when the NPV slope vanishes and Newton cannot move.
const FLAT_SLOPE_STEP: Rate = dec!(0.01);

/// Discounted sum of `flows` at `rate` and its derivative with respect to
/// the rate. `None` when an intermediate value leaves decimal range.
fn discounted_sums(flows: &CashFlowSeries, rate: Rate) -> Option<(Money, Money)> {
    let v = Decimal::ONE.checked_div(Decimal::ONE + rate)?;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;
    let mut factor = Decimal::ONE;
    let mut at = 0u32;

    for cf in flows.iter() {
        if cf.period > at {
            factor = factor.checked_mul(v.checked_powu(u64::from(cf.period - at))?)?;
            at = cf.period;
        }
        let pv = cf.amount.checked_mul(factor)?;
        value = value.checked_add(pv)?;
        if cf.period > 0 {
            // d/dr [cf / (1+r)^t] = -t * cf / (1+r)^(t+1)
            let t = Decimal::from(cf.period);
            slope = slope.checked_sub(t.checked_mul(pv)?.checked_mul(v)?)?;
        }
    }

    Some((value, slope))
}

/// Net Present Value: `Σ flows[t] / (1 + rate)^t`.
pub fn npv(flows: &CashFlowSeries, rate: Rate) -> FinProjResult<Money> {
    if rate <= dec!(-1) {
        return Err(FinProjError::InvalidRate {
            rate,
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    discounted_sums(flows, rate)
        .map(|(value, _)| value)
        .ok_or_else(|| FinProjError::Undefined {
            context: format!("NPV at rate {rate} exceeds decimal range"),
        })
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Iterates `r' = r - NPV(r) / NPV'(r)` from `guess` until `|NPV(r)|` drops
/// below [`IRR_TOLERANCE`], for at most [`MAX_IRR_ITERATIONS`]. The rate is
/// floored at [`IRR_RATE_FLOOR`]. A step that lands where the discounted
/// sum overflows is halved back toward the last rate that evaluated.
///
/// Same-signed series are not rejected upfront; they fail to converge and
/// surface as [`FinProjError::IrrNotFound`].
pub fn irr(flows: &CashFlowSeries, guess: Rate) -> FinProjResult<Rate> {
    if flows.len() < 2 {
        return Err(FinProjError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }

    let mut rate = clamp_rate(guess);
    let mut last_good: Option<Rate> = None;
    let mut last_npv = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((value, slope)) = discounted_sums(flows, rate) else {
            match last_good {
                Some(prev) => {
                    debug!("IRR iteration {i}: rate {rate} overflows, backing off toward {prev}");
                    rate = (rate + prev) / dec!(2);
                    continue;
                }
                None => {
                    return Err(FinProjError::IrrNotFound {
                        iterations: i,
                        last_npv,
                    })
                }
            }
        };

        trace!("IRR iteration {i}: rate={rate} npv={value} slope={slope}");
        last_npv = value;
        last_good = Some(rate);

        if value.abs() < IRR_TOLERANCE {
            return Ok(rate);
        }

        let next = match value.checked_div(slope) {
            Some(step) if !slope.is_zero() => rate - step,
            _ => rate + FLAT_SLOPE_STEP,
        };
        rate = clamp_rate(next);
    }

    Err(FinProjError::IrrNotFound {
        iterations: MAX_IRR_ITERATIONS,
        last_npv,
    })
}

/// IRR starting from [`DEFAULT_IRR_GUESS`].
pub fn irr_default(flows: &CashFlowSeries) -> FinProjResult<Rate> {
    irr(flows, DEFAULT_IRR_GUESS)
}

fn clamp_rate(rate: Rate) -> Rate {
    if rate < IRR_RATE_FLOOR {
        debug!("IRR rate {rate} clamped to floor {IRR_RATE_FLOOR}");
        IRR_RATE_FLOOR
    } else if rate > IRR_RATE_CEILING {
        IRR_RATE_CEILING
    } else {
        rate
    }
}

/// Effective annual rate of a periodic rate: `(1 + r)^n - 1`.
pub fn periodic_to_annual(rate: Rate, periods_per_year: u32) -> FinProjResult<Rate> {
    if periods_per_year == 0 {
        return Err(FinProjError::InvalidInput {
            field: "periods_per_year".into(),
            reason: "Must be at least 1".into(),
        });
    }
    if rate <= dec!(-1) {
        return Err(FinProjError::InvalidRate {
            rate,
            reason: "Periodic rate must be greater than -100%".into(),
        });
    }

    (Decimal::ONE + rate)
        .checked_powu(u64::from(periods_per_year))
        .map(|growth| growth - Decimal::ONE)
        .ok_or_else(|| FinProjError::Undefined {
            context: format!("annualised rate of {rate} over {periods_per_year} periods"),
        })
}
