//! Numerically stable log-sum-exp.
//!
//! ```text
//! log Σ exp(x_i) = m + log Σ exp(x_i - m),   m = max_i x_i
//! ```
//!
//! Shifting by the maximum keeps every exponent ≤ 0, so nothing overflows,
//! and at least one term is exactly `exp(0) = 1`, so the sum never underflows
//! to zero. An all-`-inf` slice has no finite maximum to shift by and is
//! returned as `-inf` directly.

use ndarray::{Array1, ArrayView2, Axis};

/// Which way [`log_sum_exp_axis`] reduces a 2D array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LseAxis {
    /// One value per row.
    Rows,
    /// Collapse everything to a single value.
    All,
}

/// `log Σ exp(x)` over a slice. Empty and all-`-inf` input give `-inf`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
    log_sum_exp_iter(values.iter().copied())
}

fn log_sum_exp_iter<I>(values: I) -> f64
where
    I: Iterator<Item = f64> + Clone,
{
    let max_val = values.clone().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        // -inf: every term is zero. +inf: the sum is infinite.
        return max_val;
    }
    max_val + values.map(|v| (v - max_val).exp()).sum::<f64>().ln()
}

/// Row-wise log-sum-exp: one value per row of `x`.
pub fn log_sum_exp_rows(x: ArrayView2<'_, f64>) -> Array1<f64> {
    x.axis_iter(Axis(0))
        .map(|row| log_sum_exp_iter(row.iter().copied()))
        .collect()
}

/// Full reduction: log-sum-exp over every entry of `x`.
pub fn log_sum_exp_all(x: ArrayView2<'_, f64>) -> f64 {
    log_sum_exp_iter(x.iter().copied())
}

/// Log-sum-exp along the chosen axis. `All` yields a length-1 array.
pub fn log_sum_exp_axis(x: ArrayView2<'_, f64>, axis: LseAxis) -> Array1<f64> {
    match axis {
        LseAxis::Rows => log_sum_exp_rows(x),
        LseAxis::All => Array1::from_elem(1, log_sum_exp_all(x)),
    }
}
