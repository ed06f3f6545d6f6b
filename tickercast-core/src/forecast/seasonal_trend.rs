//! Seasonal-trend forecast model.
//!
//! Additive decomposition: Holt linear trend (with irregular-spacing
//! updates, so trading-day gaps are handled in calendar time) plus Fourier
//! seasonal components fitted by projection on the detrended residuals.
//! Two trend passes: the first detrends for the seasonal fit, the second
//! refits on the deseasonalized series. Confidence bounds come from the
//! residual sigma and a normal quantile, widening with distance into the
//! future.
//!
//! Fully deterministic: identical inputs and options produce identical
//! forecasts.

use super::{FittedModel, ForecastError, ForecastModel, ForecastRow, ModelOptions};
use crate::frame::TrainingFrame;
use chrono::NaiveDate;
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::HashMap;
use std::f64::consts::TAU;

/// Smoothing gain for the level update. The trend (slope) gain is the
/// user-facing `trend_flexibility` knob.
const LEVEL_GAIN: f64 = 0.5;

const WEEKLY_PERIOD_DAYS: f64 = 7.0;
const YEARLY_PERIOD_DAYS: f64 = 365.25;
const WEEKLY_HARMONICS: usize = 3;
const YEARLY_HARMONICS: usize = 3;

/// Default `ForecastModel` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalTrendModel;

impl ForecastModel for SeasonalTrendModel {
    fn name(&self) -> &str {
        "seasonal_trend"
    }

    fn fit(
        &self,
        frame: &TrainingFrame,
        options: &ModelOptions,
    ) -> Result<Box<dyn FittedModel>, ForecastError> {
        let fitted = FittedSeasonalTrend::fit(frame, options)?;
        Ok(Box::new(fitted))
    }
}

/// One additive Fourier seasonal component.
#[derive(Debug, Clone)]
struct FourierComponent {
    period_days: f64,
    /// (cos, sin) coefficient per harmonic; empty means the component is zero.
    coefficients: Vec<(f64, f64)>,
}

impl FourierComponent {
    fn zero(period_days: f64) -> Self {
        Self {
            period_days,
            coefficients: Vec::new(),
        }
    }

    /// Fit by projection onto the Fourier basis. On a (near-)regular daily
    /// grid the basis is close to orthogonal, so the projection is a sound
    /// spectral estimate without a linear solver.
    fn fit(t: &[f64], residuals: &[f64], period_days: f64, harmonics: usize) -> Self {
        let n = t.len() as f64;
        let coefficients = (1..=harmonics)
            .map(|k| {
                let omega = TAU * k as f64 / period_days;
                let mut cos_sum = 0.0;
                let mut sin_sum = 0.0;
                for (&ti, &ri) in t.iter().zip(residuals) {
                    cos_sum += ri * (omega * ti).cos();
                    sin_sum += ri * (omega * ti).sin();
                }
                (2.0 * cos_sum / n, 2.0 * sin_sum / n)
            })
            .collect();
        Self {
            period_days,
            coefficients,
        }
    }

    fn eval(&self, t: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| {
                let omega = TAU * (i + 1) as f64 / self.period_days;
                a * (omega * t).cos() + b * (omega * t).sin()
            })
            .sum()
    }
}

/// Holt linear trend pass over an irregularly spaced series.
///
/// Returns the smoothed level path plus the final (level, slope-per-day)
/// state used for extrapolation.
fn holt_trend(t: &[f64], y: &[f64], trend_gain: f64) -> (Vec<f64>, f64, f64) {
    let mut level = y[0];
    let mut slope = (y[1] - y[0]) / (t[1] - t[0]);
    let mut path = Vec::with_capacity(y.len());
    path.push(level);

    for i in 1..y.len() {
        let dt = t[i] - t[i - 1];
        let predicted = level + slope * dt;
        let new_level = LEVEL_GAIN * y[i] + (1.0 - LEVEL_GAIN) * predicted;
        slope = trend_gain * ((new_level - level) / dt) + (1.0 - trend_gain) * slope;
        level = new_level;
        path.push(level);
    }

    (path, level, slope)
}

/// Fitted seasonal-trend state.
#[derive(Debug)]
struct FittedSeasonalTrend {
    first_date: NaiveDate,
    last_date: NaiveDate,
    last_level: f64,
    last_slope: f64,
    weekly: FourierComponent,
    yearly: FourierComponent,
    sigma: f64,
    z: f64,
    span_days: f64,
    /// Precomputed rows for the historical timestamps.
    history: HashMap<NaiveDate, ForecastRow>,
}

impl FittedSeasonalTrend {
    fn fit(frame: &TrainingFrame, options: &ModelOptions) -> Result<Self, ForecastError> {
        let points = frame.points();
        if points.len() < 2 {
            return Err(ForecastError::FitFailed(format!(
                "need at least 2 distinct timestamps, got {}",
                points.len()
            )));
        }
        for p in points {
            if !p.value.is_finite() {
                return Err(ForecastError::FitFailed(format!(
                    "non-finite value at {}",
                    p.timestamp
                )));
            }
        }

        let first_date = frame.first_timestamp();
        let t: Vec<f64> = points
            .iter()
            .map(|p| (p.timestamp - first_date).num_days() as f64)
            .collect();
        let y: Vec<f64> = points.iter().map(|p| p.value).collect();
        let span_days = frame.span_days() as f64;

        // First trend pass detrends the series for the seasonal fit.
        let (detrend_path, _, _) = holt_trend(&t, &y, options.trend_flexibility);
        let mut residuals: Vec<f64> = y
            .iter()
            .zip(&detrend_path)
            .map(|(yi, tr)| yi - tr)
            .collect();

        // Longest period first; each component is fitted on what the
        // previous ones left behind. A component with fewer than two full
        // cycles of data is unidentifiable and stays zero.
        let yearly = if options.yearly_seasonality && span_days >= 2.0 * YEARLY_PERIOD_DAYS {
            FourierComponent::fit(&t, &residuals, YEARLY_PERIOD_DAYS, YEARLY_HARMONICS)
        } else {
            FourierComponent::zero(YEARLY_PERIOD_DAYS)
        };
        for (ri, &ti) in residuals.iter_mut().zip(&t) {
            *ri -= yearly.eval(ti);
        }

        let weekly = if options.weekly_seasonality && span_days >= 2.0 * WEEKLY_PERIOD_DAYS {
            FourierComponent::fit(&t, &residuals, WEEKLY_PERIOD_DAYS, WEEKLY_HARMONICS)
        } else {
            FourierComponent::zero(WEEKLY_PERIOD_DAYS)
        };
        // Daily seasonality is unidentifiable on daily input; the option is
        // accepted but the component stays zero.

        let seasonal: Vec<f64> = t.iter().map(|&ti| yearly.eval(ti) + weekly.eval(ti)).collect();

        // Second trend pass on the deseasonalized series.
        let deseasonalized: Vec<f64> = y.iter().zip(&seasonal).map(|(yi, s)| yi - s).collect();
        let (trend_path, last_level, last_slope) =
            holt_trend(&t, &deseasonalized, options.trend_flexibility);

        let fitted: Vec<f64> = trend_path
            .iter()
            .zip(&seasonal)
            .map(|(tr, s)| tr + s)
            .collect();
        let sse: f64 = y
            .iter()
            .zip(&fitted)
            .map(|(yi, fi)| (yi - fi) * (yi - fi))
            .sum();
        let sigma = (sse / (y.len() - 1) as f64).sqrt();
        let sigma = if sigma.is_finite() { sigma } else { 0.0 };

        let normal = Normal::new(0.0, 1.0).expect("standard normal");
        let z = normal.inverse_cdf(0.5 + options.interval_width / 2.0);

        let history = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let half_width = z * sigma;
                let row = ForecastRow {
                    timestamp: p.timestamp,
                    point_estimate: fitted[i],
                    lower_bound: fitted[i] - half_width,
                    upper_bound: fitted[i] + half_width,
                    trend: trend_path[i],
                    weekly: weekly.eval(t[i]),
                    yearly: yearly.eval(t[i]),
                };
                (p.timestamp, row)
            })
            .collect();

        Ok(Self {
            first_date,
            last_date: frame.last_timestamp(),
            last_level,
            last_slope,
            weekly,
            yearly,
            sigma,
            z,
            span_days: span_days.max(1.0),
            history,
        })
    }

    fn extrapolate(&self, date: NaiveDate) -> ForecastRow {
        let k = (date - self.last_date).num_days() as f64;
        let t = (date - self.first_date).num_days() as f64;

        let trend = self.last_level + self.last_slope * k;
        let weekly = self.weekly.eval(t);
        let yearly = self.yearly.eval(t);
        let point = trend + weekly + yearly;

        // Uncertainty grows with distance past the training window.
        let sigma_k = if k > 0.0 {
            self.sigma * (1.0 + k / self.span_days).sqrt()
        } else {
            self.sigma
        };
        let half_width = self.z * sigma_k;

        ForecastRow {
            timestamp: date,
            point_estimate: point,
            lower_bound: point - half_width,
            upper_bound: point + half_width,
            trend,
            weekly,
            yearly,
        }
    }
}

impl FittedModel for FittedSeasonalTrend {
    fn predict(&self, timestamps: &[NaiveDate]) -> Vec<ForecastRow> {
        timestamps
            .iter()
            .map(|date| {
                self.history
                    .get(date)
                    .copied()
                    .unwrap_or_else(|| self.extrapolate(*date))
            })
            .collect()
    }
}
