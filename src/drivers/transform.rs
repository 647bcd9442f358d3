//! Baseline drift correction.
//!
//! Each channel gets an ordinary least-squares line fitted against its sample
//! index (`y = slope * i + intercept`, `i = 0..n-1`). The line is subtracted,
//! leaving a residual whose own best-fit line is flat at zero. The Pearson
//! coefficient of the two residuals summarizes how the channels move together
//! once drift is gone.
use ndarray::{Array1, ArrayView1};
use crate::drivers::{ChannelPair, SensorError};
/// Residuals within this many ulps per sample of the input's magnitude are
/// rounding noise, not signal.
const ROUNDING_ULPS: f64 = 4.0;
/// Least-squares line against the sample index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit {
    /// mV per sample.
    pub slope: f64,
    /// mV at sample 0.
    pub intercept: f64,
}
impl LinearFit {
    pub fn value_at(&self, index: f64) -> f64 {
        self.intercept + self.slope * index
    }
}
/// What [`correct_pair`] removed and what it measured afterwards.
#[derive(Clone, Copy, Debug)]
pub struct DriftReport {
    pub samples: usize,
    pub first_fit: LinearFit,
    pub second_fit: LinearFit,
    /// NaN when either detrended channel has zero variance.
    pub correlation: f64,
}
pub fn linear_fit(series: &[f64]) -> Result<LinearFit, SensorError> {
    let n = series.len();
    if n < 2 {
        return Err(SensorError::DataTooShort { len: n });
    }
    let y = ArrayView1::from(series);
    let x_mean = (n as f64 - 1.0) / 2.0;
    let x = Array1::from_iter((0..n).map(|i| i as f64 - x_mean));
    let y_centered = centered(&y);
    let slope = x.dot(&y_centered) / x.dot(&x);
    let y_mean = y.mean().unwrap_or(0.0);
    Ok(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}
/// Removes the least-squares linear trend from `series`.
///
/// A series that is exactly a line comes back as exact zeros.
pub fn detrend(series: &[f64]) -> Result<Vec<f64>, SensorError> {
    let fit = linear_fit(series)?;
    let y = ArrayView1::from(series);
    let trend = Array1::from_iter((0..series.len()).map(|i| fit.value_at(i as f64)));
    let mut residual = &y - &trend;
    if max_abs(&residual.view()) <= rounding_tolerance(&y) {
        residual.fill(0.0);
    }
    Ok(residual.to_vec())
}
/// Pearson product-moment correlation of two equal-length series.
///
/// Returns `NaN` (not an error) when either series is constant. Spread that
/// is only rounding error around the mean counts as constant.
pub fn correlation(x: &[f64], y: &[f64]) -> Result<f64, SensorError> {
    if x.len() != y.len() {
        return Err(SensorError::LengthMismatch {
            first: x.len(),
            second: y.len(),
        });
    }
    let n = x.len();
    if n < 2 {
        return Err(SensorError::DataTooShort { len: n });
    }
    let (x, y) = (ArrayView1::from(x), ArrayView1::from(y));
    let x_centered = centered(&x);
    let y_centered = centered(&y);
    if is_flat(&x_centered, &x) || is_flat(&y_centered, &y) {
        return Ok(f64::NAN);
    }
    let ss_x = x_centered.dot(&x_centered);
    let ss_y = y_centered.dot(&y_centered);
    let r = x_centered.dot(&y_centered) / (ss_x.sqrt() * ss_y.sqrt());
    Ok(r.clamp(-1.0, 1.0))
}
/// Detrends both channels independently and correlates the residuals.
pub fn correct_pair(pair: &ChannelPair) -> Result<(ChannelPair, DriftReport), SensorError> {
    pair.validate()?;
    let first_fit = linear_fit(&pair.first)?;
    let second_fit = linear_fit(&pair.second)?;
    let corrected = pair.with_values(detrend(&pair.first)?, detrend(&pair.second)?)?;
    let correlation = correlation(&corrected.first, &corrected.second)?;
    let report = DriftReport {
        samples: pair.len(),
        first_fit,
        second_fit,
        correlation,
    };
    Ok((corrected, report))
}
fn centered(values: &ArrayView1<f64>) -> Array1<f64> {
    let mean = values.mean().unwrap_or(0.0);
    values.mapv(|v| v - mean)
}
fn max_abs(values: &ArrayView1<f64>) -> f64 {
    values.fold(0.0_f64, |acc, v| acc.max(v.abs()))
}
fn rounding_tolerance(values: &ArrayView1<f64>) -> f64 {
    ROUNDING_ULPS * values.len() as f64 * f64::EPSILON * max_abs(values)
}
fn is_flat(centered: &Array1<f64>, values: &ArrayView1<f64>) -> bool {
    max_abs(&centered.view()) <= rounding_tolerance(values)
}
