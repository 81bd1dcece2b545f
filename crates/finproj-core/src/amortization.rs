use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinProjError;
use crate::types::*;
use crate::FinProjResult;

/// Differences smaller than this between the scheduled principal and the
/// outstanding balance are rounding drift, not an overpayment.
const DRIFT_TOLERANCE: Money = dec!(0.000000001);

/// Terms of a fixed-payment amortising loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// Nominal annual rate
    pub annual_rate: Rate,
    /// Number of payment periods
    pub term_periods: u32,
    /// Compounding / payment periods per year (12 = monthly)
    pub periods_per_year: u32,
    /// Additional principal paid every period
    #[serde(default)]
    pub extra_payment: Money,
}

impl LoanTerms {
    pub fn new(principal: Money, annual_rate: Rate, term_periods: u32, periods_per_year: u32) -> Self {
        Self {
            principal,
            annual_rate,
            term_periods,
            periods_per_year,
            extra_payment: Decimal::ZERO,
        }
    }

    pub fn periodic_rate(&self) -> Rate {
        self.annual_rate / Decimal::from(self.periods_per_year)
    }

    fn validate(&self) -> FinProjResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(FinProjError::InvalidTerms {
                field: "principal".into(),
                reason: "Principal must be positive".into(),
            });
        }
        if self.term_periods == 0 {
            return Err(FinProjError::InvalidTerms {
                field: "term_periods".into(),
                reason: "Term must be at least 1 period".into(),
            });
        }
        if self.annual_rate < Decimal::ZERO {
            return Err(FinProjError::InvalidTerms {
                field: "annual_rate".into(),
                reason: "Rate cannot be negative".into(),
            });
        }
        if self.periods_per_year == 0 {
            return Err(FinProjError::InvalidTerms {
                field: "periods_per_year".into(),
                reason: "Compounding frequency must be at least 1".into(),
            });
        }
        if self.extra_payment < Decimal::ZERO {
            return Err(FinProjError::InvalidTerms {
                field: "extra_payment".into(),
                reason: "Extra payment cannot be negative".into(),
            });
        }
        Ok(())
    }
}

/// A single period in the payment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationPeriod {
    pub period: Period,
    pub opening_balance: Money,
    /// Total paid this period, including any extra principal
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

/// Full amortisation schedule for a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    /// Fixed scheduled payment (excluding extra principal)
    pub payment: Money,
    pub periodic_rate: Rate,
    pub periods: Vec<AmortizationPeriod>,
    pub total_interest: Money,
    pub total_principal: Money,
    pub total_paid: Money,
}

impl PaymentSchedule {
    /// Remaining balance after `period` payments. Period 0 is the original principal.
    pub fn balance_after(&self, period: Period) -> Money {
        if period == 0 {
            return self
                .periods
                .first()
                .map(|p| p.opening_balance)
                .unwrap_or(Decimal::ZERO);
        }
        self.periods
            .iter()
            .take_while(|p| p.period <= period)
            .last()
            .map(|p| p.closing_balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Number of payments actually made (shorter than the term with extra payments).
    pub fn payoff_period(&self) -> Period {
        self.periods.last().map(|p| p.period).unwrap_or(0)
    }

    /// Payments as outflows at periods 1..k.
    pub fn borrower_cash_flows(&self) -> CashFlowSeries {
        let flows = self
            .periods
            .iter()
            .map(|p| CashFlow {
                period: p.period,
                amount: -p.payment,
            })
            .collect();
        CashFlowSeries::from_ordered(flows)
    }

    /// Principal advanced at period 0, payments received at periods 1..k.
    pub fn lender_cash_flows(&self) -> CashFlowSeries {
        let advanced = self.balance_after(0);
        let receipts: Vec<Money> = self.periods.iter().map(|p| p.payment).collect();
        CashFlowSeries::from_amounts(std::iter::once(-advanced).chain(receipts))
    }
}

/// Fixed periodic payment for an annuity: `P * r / (1 - (1 + r)^-n)`.
///
/// With `r == 0` the payment is `P / n`.
pub fn annuity_payment(periodic_rate: Rate, periods: u32, principal: Money) -> FinProjResult<Money> {
    if periods == 0 {
        return Err(FinProjError::InvalidTerms {
            field: "term_periods".into(),
            reason: "Term must be at least 1 period".into(),
        });
    }

    if periodic_rate.is_zero() {
        return Ok(principal / Decimal::from(periods));
    }

    let interest = principal
        .checked_mul(periodic_rate)
        .ok_or_else(|| out_of_range("periodic interest"))?;
    match (Decimal::ONE + periodic_rate).checked_powu(u64::from(periods)) {
        Some(growth) => {
            let annuity_factor = Decimal::ONE - Decimal::ONE / growth;
            if annuity_factor.is_zero() {
                return Err(FinProjError::Undefined {
                    context: "annuity factor is zero".into(),
                });
            }
            interest
                .checked_div(annuity_factor)
                .ok_or_else(|| out_of_range("annuity payment"))
        }
        // (1 + r)^-n is indistinguishable from zero
        None => Ok(interest),
    }
}

fn out_of_range(what: &str) -> FinProjError {
    FinProjError::Undefined {
        context: format!("{what} exceeds decimal range"),
    }
}

/// Build the period-by-period amortisation schedule for a loan.
pub fn amortize(terms: &LoanTerms) -> FinProjResult<PaymentSchedule> {
    terms.validate()?;

    let r = terms.periodic_rate();
    let payment = annuity_payment(r, terms.term_periods, terms.principal)?;
    let scheduled = payment
        .checked_add(terms.extra_payment)
        .ok_or_else(|| out_of_range("payment plus extra principal"))?;

    // Extra principal can end the schedule early, so grow on demand
    let mut periods = Vec::new();
    let mut balance = terms.principal;
    let mut total_interest = Decimal::ZERO;
    let mut total_principal = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for period in 1..=terms.term_periods {
        let opening = balance;
        let interest = opening
            .checked_mul(r)
            .ok_or_else(|| out_of_range("interest"))?;
        let mut paid = scheduled;
        let mut principal = paid
            .checked_sub(interest)
            .ok_or_else(|| out_of_range("principal"))?;

        let overpaid = principal
            .checked_sub(opening)
            .is_some_and(|excess| excess > DRIFT_TOLERANCE);
        if overpaid {
            // Extra principal retires the loan early: pay only what is owed
            principal = opening;
            paid = interest
                .checked_add(opening)
                .ok_or_else(|| out_of_range("final payment"))?;
            balance = Decimal::ZERO;
        } else {
            balance = opening
                .checked_sub(principal)
                .ok_or_else(|| out_of_range("closing balance"))?;
            if period == terms.term_periods || balance.abs() <= DRIFT_TOLERANCE {
                balance = Decimal::ZERO;
            }
        }

        total_interest = total_interest
            .checked_add(interest)
            .ok_or_else(|| out_of_range("total interest"))?;
        total_principal = total_principal
            .checked_add(principal)
            .ok_or_else(|| out_of_range("total principal"))?;
        total_paid = total_paid
            .checked_add(paid)
            .ok_or_else(|| out_of_range("total paid"))?;

        periods.push(AmortizationPeriod {
            period,
            opening_balance: opening,
            payment: paid,
            interest,
            principal,
            closing_balance: balance,
        });

        if balance.is_zero() {
            break;
        }
    }

    Ok(PaymentSchedule {
        payment,
        periodic_rate: r,
        periods,
        total_interest,
        total_principal,
        total_paid,
    })
}
