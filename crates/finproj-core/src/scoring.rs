//! Declarative weighted-threshold scoring.
//!
//! Each metric is looked up in its [`ScoreBand`] (the highest threshold the
//! value meets), the band points are weighted and summed, the total is
//! clamped to 0-100 and mapped to a grade through a [`GradeTable`].

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FinProjError;
use crate::FinProjResult;

const SCORE_MIN: Decimal = dec!(0);
const SCORE_MAX: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandRule {
    pub threshold: Decimal,
    pub points: Decimal,
}

/// Threshold rules for one metric, ascending by threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<BandRule>", into = "Vec<BandRule>")]
pub struct ScoreBand {
    rules: Vec<BandRule>,
}

impl ScoreBand {
    pub fn new(rules: Vec<BandRule>) -> FinProjResult<Self> {
        ensure_ascending("bands", rules.iter().map(|r| r.threshold))?;
        Ok(Self { rules })
    }

    /// Points of the highest threshold `value` meets; the later rule wins a
    /// tie. Zero when `value` is below every threshold.
    pub fn points_for(&self, value: Decimal) -> Decimal {
        self.rules
            .iter()
            .rev()
            .find(|r| value >= r.threshold)
            .map(|r| r.points)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn rules(&self) -> &[BandRule] {
        &self.rules
    }
}

impl TryFrom<Vec<BandRule>> for ScoreBand {
    type Error = FinProjError;

    fn try_from(rules: Vec<BandRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<ScoreBand> for Vec<BandRule> {
    fn from(band: ScoreBand) -> Self {
        band.rules
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeThreshold {
    pub threshold: Decimal,
    pub grade: String,
}

/// Score-to-grade table, ascending by threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GradeThreshold>", into = "Vec<GradeThreshold>")]
pub struct GradeTable {
    grades: Vec<GradeThreshold>,
}

impl GradeTable {
    pub fn new(grades: Vec<GradeThreshold>) -> FinProjResult<Self> {
        if grades.is_empty() {
            return Err(FinProjError::InvalidInput {
                field: "grades".into(),
                reason: "Grade table needs at least one grade".into(),
            });
        }
        ensure_ascending("grades", grades.iter().map(|g| g.threshold))?;
        Ok(Self { grades })
    }

    /// A (>= 90), B (>= 80), C (>= 70), D (>= 60), F otherwise.
    pub fn standard() -> Self {
        let grades = [
            (dec!(0), "F"),
            (dec!(60), "D"),
            (dec!(70), "C"),
            (dec!(80), "B"),
            (dec!(90), "A"),
        ]
        .into_iter()
        .map(|(threshold, grade)| GradeThreshold {
            threshold,
            grade: grade.to_string(),
        })
        .collect();
        Self { grades }
    }

    /// Grade for `score`; the lowest grade when no threshold is met.
    pub fn grade_for(&self, score: Decimal) -> &str {
        self.grades
            .iter()
            .rev()
            .find(|g| score >= g.threshold)
            .or_else(|| self.grades.first())
            .map(|g| g.grade.as_str())
            .unwrap_or_default()
    }
}

impl Default for GradeTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<GradeThreshold>> for GradeTable {
    type Error = FinProjError;

    fn try_from(grades: Vec<GradeThreshold>) -> Result<Self, Self::Error> {
        Self::new(grades)
    }
}

impl From<GradeTable> for Vec<GradeThreshold> {
    fn from(table: GradeTable) -> Self {
        table.grades
    }
}

fn ensure_ascending(field: &str, thresholds: impl Iterator<Item = Decimal>) -> FinProjResult<()> {
    let mut previous: Option<Decimal> = None;
    for t in thresholds {
        if let Some(p) = previous {
            if t < p {
                return Err(FinProjError::InvalidInput {
                    field: field.into(),
                    reason: format!("Thresholds must be ascending ({t} follows {p})"),
                });
            }
        }
        previous = Some(t);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreInput {
    pub metrics: BTreeMap<String, Decimal>,
    pub bands: BTreeMap<String, ScoreBand>,
    #[serde(default)]
    pub weights: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub grades: GradeTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreOutput {
    /// 0-100
    pub points: u32,
    pub grade: String,
    /// Weighted total before clamping, saturated at the decimal range
    pub raw_total: Decimal,
    /// Weighted points by metric
    pub contributions: BTreeMap<String, Decimal>,
}

/// Score a metric bundle. Metrics without a band are ignored; a banded
/// metric without a weight counts with weight 1.
///
/// Contributions and the total saturate at the decimal range rather than
/// overflowing; the clamp to 0-100 then applies as usual. The grade is
/// taken from the rounded points.
pub fn score(
    metrics: &BTreeMap<String, Decimal>,
    bands: &BTreeMap<String, ScoreBand>,
    weights: &BTreeMap<String, Decimal>,
    grades: &GradeTable,
) -> ScoreOutput {
    let contributions: BTreeMap<String, Decimal> = metrics
        .iter()
        .filter_map(|(name, value)| {
            let band = bands.get(name)?;
            let weight = weights.get(name).copied().unwrap_or(Decimal::ONE);
            Some((name.clone(), band.points_for(*value).saturating_mul(weight)))
        })
        .collect();

    let raw_total = contributions
        .values()
        .fold(Decimal::ZERO, |total, c| total.saturating_add(*c));
    let points = clamp_score(raw_total)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0);

    ScoreOutput {
        points,
        grade: grades.grade_for(Decimal::from(points)).to_string(),
        raw_total,
        contributions,
    }
}

/// Score a serialisable input.
pub fn run_score(input: &ScoreInput) -> ScoreOutput {
    score(&input.metrics, &input.bands, &input.weights, &input.grades)
}

fn clamp_score(score: Decimal) -> Decimal {
    if score < SCORE_MIN {
        SCORE_MIN
    } else if score > SCORE_MAX {
        SCORE_MAX
    } else {
        score
    }
}
