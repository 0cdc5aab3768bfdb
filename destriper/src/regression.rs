//! Ordinary least squares between two column series.
//!
//! Fits `y ≈ gain·x + bias` over the point set `{(x_i, y_i)}`. Neighbouring
//! defect-free detector columns see nearly the same scene, so their fit should
//! sit close to the identity line (gain ≈ 1, bias ≈ 0).

use crate::config::QualityThresholds;

/// Slope and intercept of a least-squares line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub gain: f64,
    pub bias: f64,
}

impl Regression {
    pub const IDENTITY: Regression = Regression {
        gain: 1.0,
        bias: 0.0,
    };

    #[inline]
    pub fn predict(&self, x: f64) -> f64 {
        x * self.gain + self.bias
    }
}

/// Fits `y` against `x`.
///
/// Returns `None` when the fit is indeterminate: fewer than two points or a
/// constant `x` series.
pub fn fit(x: &[u16], y: &[u16]) -> Option<Regression> {
    assert_eq!(x.len(), y.len(), "column series must have equal length");

    let n = x.len();
    if n < 2 {
        return None;
    }

    // u16 sums are exact in f64 for any realistic column height
    let (sum_x, sum_y) = x
        .iter()
        .zip(y)
        .fold((0.0f64, 0.0f64), |(sx, sy), (&xi, &yi)| {
            (sx + xi as f64, sy + yi as f64)
        });
    let mean_x = sum_x / n as f64;
    let mean_y = sum_y / n as f64;

    let (sxx, sxy) = x
        .iter()
        .zip(y)
        .fold((0.0f64, 0.0f64), |(sxx, sxy), (&xi, &yi)| {
            let dx = xi as f64 - mean_x;
            (sxx + dx * dx, sxy + dx * (yi as f64 - mean_y))
        });

    if sxx <= common::EPSILON {
        return None;
    }

    let gain = sxy / sxx;
    let bias = mean_y - gain * mean_x;
    Some(Regression { gain, bias })
}

/// Returns `true` when the pair looks consistent.
///
/// An indeterminate fit is judged consistent: a constant column can't be
/// shown to be defective by this test alone.
pub fn judge(fit: Option<&Regression>, thresholds: &QualityThresholds) -> bool {
    let Some(fit) = fit else {
        return true;
    };
    // compare against the interval ends so 1.0 + t itself is inside
    let gain_ok = fit.gain >= 1.0 - thresholds.gain_threshold
        && fit.gain <= 1.0 + thresholds.gain_threshold;
    let bias_ok =
        fit.bias >= -thresholds.bias_threshold && fit.bias <= thresholds.bias_threshold;
    gain_ok && bias_ok
}

/// Counts samples of `x` that change when mapped through `fit` and rounded.
pub fn changed_samples(x: &[u16], fit: &Regression) -> usize {
    x.iter()
        .filter(|&&xi| fit.predict(xi as f64).round() != xi as f64)
        .count()
}
