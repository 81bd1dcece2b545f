use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FinProjError;
use crate::FinProjResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples and coverage ratios (e.g., 1.25x DSCR)
pub type Multiple = Decimal;

/// Period index. Period 0 is the initial outlay / starting point.
pub type Period = u32;

/// A single cash flow at a period index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub period: Period,
    pub amount: Money,
}

/// Accepted JSON shapes for a series: bare amounts (periods 0..n) or
/// explicit `{period, amount}` entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum CashFlowSeriesRepr {
    Amounts(Vec<Money>),
    Entries(Vec<CashFlow>),
}

/// An ordered, immutable series of cash flows.
///
/// Periods are strictly increasing. Transformations return a new series;
/// nothing mutates an existing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "Vec<CashFlow>")]
pub struct CashFlowSeries {
    flows: Vec<CashFlow>,
}

impl CashFlowSeries {
    /// Build a series from explicit entries. Periods must be strictly increasing.
    pub fn new(flows: Vec<CashFlow>) -> FinProjResult<Self> {
        if let Some(pair) = flows.windows(2).find(|w| w[1].period <= w[0].period) {
            return Err(FinProjError::InvalidInput {
                field: "cash_flows".into(),
                reason: format!(
                    "Periods must be strictly increasing (period {} follows {})",
                    pair[1].period, pair[0].period
                ),
            });
        }
        Ok(Self { flows })
    }

    /// Build a series from consecutive amounts, assigning periods 0..n.
    pub fn from_amounts<I>(amounts: I) -> Self
    where
        I: IntoIterator<Item = Money>,
    {
        let flows = amounts
            .into_iter()
            .enumerate()
            .map(|(t, amount)| CashFlow {
                period: t as Period,
                amount,
            })
            .collect();
        Self { flows }
    }

    /// Wrap entries the caller already produced in strictly increasing period order.
    pub(crate) fn from_ordered(flows: Vec<CashFlow>) -> Self {
        debug_assert!(flows.windows(2).all(|w| w[0].period < w[1].period));
        Self { flows }
    }

    pub fn flows(&self) -> &[CashFlow] {
        &self.flows
    }

    pub fn iter(&self) -> impl Iterator<Item = &CashFlow> {
        self.flows.iter()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn amounts(&self) -> Vec<Money> {
        self.flows.iter().map(|cf| cf.amount).collect()
    }

    /// Amount recorded at `period`, if the series has an entry there.
    pub fn amount_at(&self, period: Period) -> Option<Money> {
        self.flows
            .binary_search_by_key(&period, |cf| cf.period)
            .ok()
            .map(|idx| self.flows[idx].amount)
    }

    /// The period-0 flow, conventionally the (negative) initial outlay.
    pub fn initial_outlay(&self) -> Option<Money> {
        self.amount_at(0)
    }

    pub fn last_amount(&self) -> Option<Money> {
        self.flows.last().map(|cf| cf.amount)
    }

    pub fn total(&self) -> Money {
        self.flows.iter().map(|cf| cf.amount).sum()
    }

    /// A new series with the period-0 entry set to `amount` (inserted or replaced).
    pub fn with_initial_outlay(&self, amount: Money) -> Self {
        let mut flows = Vec::with_capacity(self.flows.len() + 1);
        flows.push(CashFlow { period: 0, amount });
        flows.extend(self.flows.iter().filter(|cf| cf.period > 0).copied());
        Self { flows }
    }

    /// A new series with every period moved `by` periods later (a delayed start).
    pub fn shifted(&self, by: Period) -> FinProjResult<Self> {
        let flows = self
            .flows
            .iter()
            .map(|cf| {
                cf.period
                    .checked_add(by)
                    .map(|period| CashFlow { period, amount: cf.amount })
                    .ok_or_else(|| FinProjError::InvalidInput {
                        field: "shift".into(),
                        reason: format!("Period {} shifted by {by} exceeds range", cf.period),
                    })
            })
            .collect::<FinProjResult<Vec<_>>>()?;
        Ok(Self { flows })
    }

    /// A new series with every amount multiplied by `factor` (e.g. an ownership share).
    pub fn scaled(&self, factor: Decimal) -> FinProjResult<Self> {
        let flows = self
            .flows
            .iter()
            .map(|cf| {
                cf.amount
                    .checked_mul(factor)
                    .map(|amount| CashFlow { period: cf.period, amount })
                    .ok_or_else(|| FinProjError::Undefined {
                        context: format!("scaling period {} by {factor}", cf.period),
                    })
            })
            .collect::<FinProjResult<Vec<_>>>()?;
        Ok(Self { flows })
    }

    /// A new series without the period-0 entry.
    pub fn excluding_initial(&self) -> Self {
        Self {
            flows: self.flows.iter().filter(|cf| cf.period > 0).copied().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for CashFlowSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match CashFlowSeriesRepr::deserialize(deserializer)? {
            CashFlowSeriesRepr::Amounts(amounts) => Ok(Self::from_amounts(amounts)),
            CashFlowSeriesRepr::Entries(entries) => {
                Self::new(entries).map_err(serde::de::Error::custom)
            }
        }
    }
}

impl From<CashFlowSeries> for Vec<CashFlow> {
    fn from(series: CashFlowSeries) -> Self {
        series.flows
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_amounts_assigns_periods() {
        let series = CashFlowSeries::from_amounts(vec![dec!(-100), dec!(40), dec!(70)]);
        let periods: Vec<Period> = series.iter().map(|cf| cf.period).collect();
        assert_eq!(periods, vec![0, 1, 2]);
        assert_eq!(series.initial_outlay(), Some(dec!(-100)));
        assert_eq!(series.total(), dec!(10));
    }

    #[test]
    fn test_rejects_unordered_periods() {
        let flows = vec![
            CashFlow { period: 0, amount: dec!(-10) },
            CashFlow { period: 3, amount: dec!(5) },
            CashFlow { period: 3, amount: dec!(5) },
        ];
        assert!(CashFlowSeries::new(flows).is_err());
    }

    #[test]
    fn test_sparse_lookup() {
        let series = CashFlowSeries::new(vec![
            CashFlow { period: 0, amount: dec!(-10) },
            CashFlow { period: 4, amount: dec!(12) },
        ])
        .unwrap();
        assert_eq!(series.amount_at(4), Some(dec!(12)));
        assert_eq!(series.amount_at(2), None);
    }

    #[test]
    fn test_with_initial_outlay_leaves_original_untouched() {
        let series = CashFlowSeries::from_amounts(vec![dec!(500), dec!(510), dec!(520)]);
        let investment = series.with_initial_outlay(dec!(-1000));
        assert_eq!(investment.amounts(), vec![dec!(-1000), dec!(510), dec!(520)]);
        assert_eq!(series.amounts(), vec![dec!(500), dec!(510), dec!(520)]);
        assert_eq!(series.excluding_initial().len(), 2);
    }

    #[test]
    fn test_shift_and_scale_return_new_series() {
        let series = CashFlowSeries::from_amounts(vec![dec!(-100), dec!(60)]);
        let delayed = series.shifted(2).unwrap();
        assert_eq!(delayed.amount_at(2), Some(dec!(-100)));
        assert_eq!(delayed.amount_at(3), Some(dec!(60)));
        assert_eq!(delayed.initial_outlay(), None);

        let share = series.scaled(dec!(0.25)).unwrap();
        assert_eq!(share.amounts(), vec![dec!(-25), dec!(15)]);
        assert_eq!(series.amounts(), vec![dec!(-100), dec!(60)]);

        assert!(series.shifted(u32::MAX).is_err());
    }

    #[test]
    fn test_deserialize_both_shapes() {
        let bare: CashFlowSeries = serde_json::from_str(r#"["-100", "60", "60"]"#).unwrap();
        assert_eq!(bare.amount_at(2), Some(dec!(60)));

        let entries: CashFlowSeries =
            serde_json::from_str(r#"[{"period": 0, "amount": "-100"}, {"period": 5, "amount": "180"}]"#)
                .unwrap();
        assert_eq!(entries.amount_at(5), Some(dec!(180)));

        let bad = serde_json::from_str::<CashFlowSeries>(
            r#"[{"period": 2, "amount": "1"}, {"period": 1, "amount": "1"}]"#,
        );
        assert!(bad.is_err());
    }
}
