//! Turns raw vote counts into one-decimal display percentages that always add
//! up to exactly 100.
//!
//! Percentages are computed in integer tenths of a percent, so "exactly 100" is
//! exact: the tenths always sum to [`FULL_SCALE`]. Each count is rounded to the
//! nearest tenth with halves rounded away from zero. The rounding drift is then
//! added to the entry with the largest rounded share, the lowest index winning
//! ties.

use serde::Serialize;
use std::fmt;

/// 100.0% expressed in tenths of a percent.
pub const FULL_SCALE: u64 = 1000;

/// Normalized percentages, index-aligned with the counts they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PercentageResult {
    tenths: Vec<u64>,
}

impl PercentageResult {
    /// Each entry as a percentage, e.g. `33.4`, for display.
    ///
    /// Adding these floats up is not guaranteed to give exactly `100.0`
    /// (`33.4 + 33.3 + 33.3` is `99.99999999999999` in `f64`). Use
    /// [`tenths`](Self::tenths) or [`total_tenths`](Self::total_tenths) when an
    /// exact sum matters.
    pub fn percentages(&self) -> Vec<f64> {
        self.tenths.iter().map(|t| tenths_to_percent(*t)).collect()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.tenths.get(index).map(|t| tenths_to_percent(*t))
    }

    /// Each entry in tenths of a percent, e.g. `334`.
    pub fn tenths(&self) -> &[u64] {
        &self.tenths
    }

    /// Sum of all entries in tenths: `FULL_SCALE`, or 0 when nobody voted.
    pub fn total_tenths(&self) -> u64 {
        self.tenths.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.tenths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.tenths.iter().map(|t| tenths_to_percent(*t))
    }
}

impl fmt::Display for PercentageResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|p| format!("{:.1}%", p)).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

fn tenths_to_percent(tenths: u64) -> f64 {
    tenths as f64 / 10.0
}

pub fn normalize(counts: &[u64]) -> PercentageResult {
    let total: u128 = counts.iter().map(|c| *c as u128).sum();
    if total == 0 {
        return PercentageResult { tenths: vec![0; counts.len()] };
    }

    // round(count / total * 1000), halves away from zero, in exact integer math
    let mut rounded: Vec<i128> = counts
        .iter()
        .map(|c| {
            let scaled = *c as u128 * FULL_SCALE as u128;
            ((2 * scaled + total) / (2 * total)) as i128
        })
        .collect();

    let drift = FULL_SCALE as i128 - rounded.iter().sum::<i128>();
    if drift != 0 {
        let leader = first_max_index(&rounded);
        rounded[leader] += drift;

        // Only reachable with dozens of near-equal options that all round up.
        // The leader can't absorb the whole negative drift, so the rest comes
        // off the next-largest entries instead of going below zero.
        if rounded[leader] < 0 {
            let mut deficit = -rounded[leader];
            rounded[leader] = 0;
            for index in descending_order(&rounded) {
                if deficit == 0 {
                    break;
                }
                let take = deficit.min(rounded[index]);
                rounded[index] -= take;
                deficit -= take;
            }
        }
    }

    PercentageResult {
        tenths: rounded.into_iter().map(|t| t as u64).collect(),
    }
}

fn first_max_index(values: &[i128]) -> usize {
    let mut best = 0;
    for (index, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = index;
        }
    }
    best
}

/// Indices by value, largest first, lower index first among equals.
fn descending_order(values: &[i128]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*b].cmp(&values[*a]).then(a.cmp(b)));
    order
}
