//! Forecast orchestration — configure a model, fit it, extend the axis,
//! and predict over history plus horizon.
//!
//! The model itself is a black box behind the `ForecastModel` trait; the
//! orchestrator owns the step sequence and the progress milestones:
//! fitting started (10%, after history loading) → fit → fitting complete
//! (50%) → extend timestamp axis → predict → forecast complete (100%).

pub mod seasonal_trend;

pub use seasonal_trend::SeasonalTrendModel;

use crate::frame::TrainingFrame;
use crate::progress::{ProgressSink, Stage};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured error types for forecasting.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("invalid forecast request: {0}")]
    InvalidRequest(String),

    #[error("model fit failed: {0}")]
    FitFailed(String),
}

/// Model configuration knobs.
///
/// Defaults mirror the canonical configuration: trend flexibility 0.1,
/// yearly and weekly seasonality on, daily seasonality off, 80% intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelOptions {
    /// Trend flexibility scale factor in (0, 1]: higher values let the trend
    /// react faster to level changes.
    pub trend_flexibility: f64,
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    /// Retained for API parity; with daily input this component is always zero.
    pub daily_seasonality: bool,
    /// Confidence interval width in (0, 1), e.g. 0.8 for an 80% interval.
    pub interval_width: f64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            trend_flexibility: 0.1,
            yearly_seasonality: true,
            weekly_seasonality: true,
            daily_seasonality: false,
            interval_width: 0.8,
        }
    }
}

/// A forecast request: horizon plus model configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Number of calendar days to forecast beyond the last observation.
    pub horizon_days: u32,
    pub options: ModelOptions,
}

impl ForecastRequest {
    pub fn new(horizon_days: u32, options: ModelOptions) -> Self {
        Self {
            horizon_days,
            options,
        }
    }

    /// Horizon expressed in whole years (the UI convention), 365 days each.
    pub fn from_years(years: u32, options: ModelOptions) -> Self {
        Self::new(years * 365, options)
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidRequest(
                "horizon_days must be positive".into(),
            ));
        }
        let o = &self.options;
        if !(o.trend_flexibility > 0.0 && o.trend_flexibility <= 1.0) {
            return Err(ForecastError::InvalidRequest(format!(
                "trend_flexibility must be in (0, 1], got {}",
                o.trend_flexibility
            )));
        }
        if !(o.interval_width > 0.0 && o.interval_width < 1.0) {
            return Err(ForecastError::InvalidRequest(format!(
                "interval_width must be in (0, 1), got {}",
                o.interval_width
            )));
        }
        Ok(())
    }
}

/// One forecasted point with confidence bounds and additive components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub timestamp: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Trend component (decomposition view).
    pub trend: f64,
    /// Weekly seasonal component.
    pub weekly: f64,
    /// Yearly seasonal component.
    pub yearly: f64,
}

/// Ordered forecast covering the full historical range plus the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    rows: Vec<ForecastRow>,
    /// Number of leading rows that correspond to historical observations.
    history_len: usize,
}

impl Forecast {
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history_len
    }

    /// Rows beyond the last historical observation.
    pub fn future_rows(&self) -> &[ForecastRow] {
        &self.rows[self.history_len..]
    }

    /// Last `n` rows (the "forecast tail" view).
    pub fn tail(&self, n: usize) -> &[ForecastRow] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.timestamp)
    }
}

/// A forecasting model, fit once per request.
pub trait ForecastModel: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &str;

    /// Fit against a training frame. Fails with `FitFailed` when the data is
    /// unusable (fewer than 2 distinct timestamps, non-finite values).
    fn fit(
        &self,
        frame: &TrainingFrame,
        options: &ModelOptions,
    ) -> Result<Box<dyn FittedModel>, ForecastError>;
}

/// A fitted model, ready to predict over a timestamp axis.
pub trait FittedModel: Send + std::fmt::Debug {
    /// Point estimates, bounds, and components for each timestamp.
    fn predict(&self, timestamps: &[NaiveDate]) -> Vec<ForecastRow>;
}

/// Extend the training timestamps by `horizon_days` calendar days.
///
/// The historical segment keeps the observed dates; the future segment is
/// strictly contiguous daily, ending exactly `horizon_days` days after the
/// last observation.
pub fn extended_axis(frame: &TrainingFrame, horizon_days: u32) -> Vec<NaiveDate> {
    let mut axis: Vec<NaiveDate> = frame.points().iter().map(|p| p.timestamp).collect();
    let last = frame.last_timestamp();
    axis.extend((1..=i64::from(horizon_days)).map(|k| last + Duration::days(k)));
    axis
}

/// Run the full forecast sequence for one request.
pub fn run_forecast(
    model: &dyn ForecastModel,
    frame: &TrainingFrame,
    request: &ForecastRequest,
    progress: &dyn ProgressSink,
) -> Result<Forecast, ForecastError> {
    request.validate()?;

    progress.report(Stage::FittingStarted, 10);
    let fitted = model.fit(frame, &request.options)?;
    progress.report(Stage::FittingComplete, 50);

    let axis = extended_axis(frame, request.horizon_days);
    let rows = fitted.predict(&axis);
    progress.report(Stage::ForecastComplete, 100);

    Ok(Forecast {
        rows,
        history_len: frame.len(),
    })
}
