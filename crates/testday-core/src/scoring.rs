// Population min/max scoring and ranking for one category.

use crate::config::{Direction, Rounding, ScoreRange};
use std::collections::BTreeMap;

/// Scores and ranks for every player in the population. Players without a
/// value map to `None` in both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryResult {
    pub scores: BTreeMap<String, Option<i64>>,
    pub ranks: BTreeMap<String, Option<usize>>,
}

impl CategoryResult {
    pub fn score(&self, player: &str) -> Option<i64> {
        self.scores.get(player).copied().flatten()
    }

    pub fn rank(&self, player: &str) -> Option<usize> {
        self.ranks.get(player).copied().flatten()
    }
}

/// Round a fractional score to an integer.
///
/// `Floor` truncates toward zero and `Ceil` is truncation plus one for any
/// non-integral value, which matches floor/ceil for the positive ranges
/// scores live in.
pub fn round_score(value: f64, rounding: Rounding) -> i64 {
    let truncated = value.trunc();
    let rounded = match rounding {
        Rounding::Round => value.round_ties_even(),
        Rounding::Floor => truncated,
        Rounding::Ceil if value == truncated => truncated,
        Rounding::Ceil => truncated + 1.0,
    };
    rounded as i64
}

/// Map `value` linearly from the population spread onto the score range.
fn scale(value: f64, min: f64, max: f64, direction: Direction, range: ScoreRange) -> f64 {
    let spread = max - min;
    let ratio = match direction {
        Direction::LowerIsBetter => (max - value) / spread,
        Direction::HigherIsBetter => (value - min) / spread,
    };
    range.min + ratio * (range.max - range.min)
}

/// Score and rank a single category across the whole player population.
///
/// Steps:
/// 1. Keep players with a present value; with none, everything is absent.
/// 2. Take the population min and max.
/// 3. Scale each value onto the score range (zero spread scores everyone at
///    the midpoint).
/// 4. Round, then clamp to the integers inside the range.
/// 5. Rank by raw value, best first, 1-based by sorted position. Ties keep
///    population order and still get distinct ranks.
pub fn score_category(
    values: &BTreeMap<String, Option<f64>>,
    direction: Direction,
    range: ScoreRange,
    rounding: Rounding,
) -> CategoryResult {
    let mut result = CategoryResult {
        scores: values.keys().map(|name| (name.clone(), None)).collect(),
        ranks: values.keys().map(|name| (name.clone(), None)).collect(),
    };

    // ---- 1. Present values ----
    let present: Vec<(&str, f64)> = values
        .iter()
        .filter_map(|(name, value)| value.map(|v| (name.as_str(), v)))
        .collect();
    if present.is_empty() {
        return result;
    }

    // ---- 2. Population spread ----
    let min = present.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = present.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let midpoint = (range.min + range.max) / 2.0;

    // ---- 3+4. Scores ----
    let lo = range.min.ceil() as i64;
    let hi = range.max.floor() as i64;
    for (name, value) in &present {
        let raw = if max == min {
            midpoint
        } else {
            scale(*value, min, max, direction, range)
        };
        let mut score = round_score(raw, rounding);
        if lo <= hi {
            score = score.clamp(lo, hi);
        }
        result.scores.insert((*name).to_string(), Some(score));
    }

    // ---- 5. Ranks ----
    let mut ordered = present;
    match direction {
        Direction::HigherIsBetter => ordered.sort_by(|a, b| b.1.total_cmp(&a.1)),
        Direction::LowerIsBetter => ordered.sort_by(|a, b| a.1.total_cmp(&b.1)),
    }
    for (idx, (name, _)) in ordered.iter().enumerate() {
        result.ranks.insert((*name).to_string(), Some(idx + 1));
    }

    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
