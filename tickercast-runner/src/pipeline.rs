//! Full pipeline sequencing: catalog → history → training frame → forecast.
//!
//! Error policy (recoverable at this boundary, nothing crashes):
//! - catalog, horizon, and history failures abort the run — there is
//!   nothing to show without data
//! - training frame and forecast failures are soft: the report keeps the
//!   fetched history and carries the failure message, so already-rendered
//!   raw data survives a failed forecast

use crate::config::RunConfig;
use crate::loader::{load_history, LoadError, LoadOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tickercast_core::catalog::{CatalogCache, CatalogError};
use tickercast_core::data::cache::HistoryCache;
use tickercast_core::data::provider::{DataSource, PriceProvider, PriceRecord};
use tickercast_core::forecast::{run_forecast, Forecast, ForecastModel, ForecastRequest};
use tickercast_core::progress::ProgressSink;
use tickercast_core::frame::TrainingFrame;

/// Errors that abort a pipeline run before any output exists.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("symbol '{symbol}' is not in the catalog")]
    UnknownSymbol { symbol: String },

    #[error("forecast horizon of {years} years is outside the allowed range {min}–{max}")]
    HorizonOutOfBounds { years: u32, min: u32, max: u32 },

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// One user interaction: a catalog symbol and a horizon in whole years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub symbol: String,
    pub years: u32,
}

/// Result of a pipeline run.
///
/// `forecast` is `None` when the frame build or model fit failed; the
/// history section is still populated in that case.
#[derive(Debug)]
pub struct PipelineReport {
    pub symbol: String,
    pub display_name: String,
    pub source: DataSource,
    pub data_hash: String,
    pub history: Vec<PriceRecord>,
    pub horizon_days: u32,
    pub forecast: Option<Forecast>,
    pub forecast_error: Option<String>,
}

impl PipelineReport {
    /// Last `n` history records (the "raw data tail" view).
    pub fn history_tail(&self, n: usize) -> &[PriceRecord] {
        &self.history[self.history.len().saturating_sub(n)..]
    }
}

/// Run the full pipeline for one request.
pub fn run_pipeline(
    config: &RunConfig,
    catalogs: &CatalogCache,
    cache: &HistoryCache,
    provider: Option<&dyn PriceProvider>,
    model: &dyn ForecastModel,
    request: &PipelineRequest,
    opts: &LoadOptions,
    progress: &dyn ProgressSink,
) -> Result<PipelineReport, PipelineError> {
    if !config.horizon.contains(request.years) {
        return Err(PipelineError::HorizonOutOfBounds {
            years: request.years,
            min: config.horizon.min_years,
            max: config.horizon.max_years,
        });
    }

    let catalog = catalogs.load(&config.catalog)?;
    let display_name = catalog
        .display_name(&request.symbol)
        .ok_or_else(|| PipelineError::UnknownSymbol {
            symbol: request.symbol.clone(),
        })?
        .to_string();

    let loaded = load_history(&request.symbol, cache, provider, opts, progress)?;

    let forecast_request = ForecastRequest::from_years(request.years, config.model);
    let (forecast, forecast_error) = match TrainingFrame::from_history(&loaded.records) {
        Ok(frame) => match run_forecast(model, &frame, &forecast_request, progress) {
            Ok(forecast) => (Some(forecast), None),
            Err(e) => (None, Some(e.to_string())),
        },
        Err(e) => (None, Some(e.to_string())),
    };

    Ok(PipelineReport {
        symbol: loaded.symbol,
        display_name,
        source: loaded.source,
        data_hash: loaded.data_hash,
        history: loaded.records,
        horizon_days: forecast_request.horizon_days,
        forecast,
        forecast_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use tickercast_core::data::provider::{FetchError, FetchResult};
    use tickercast_core::forecast::{
        FittedModel, ForecastError, ModelOptions, SeasonalTrendModel,
    };
    use tickercast_core::NullProgress;

    struct FixedProvider {
        records: Vec<PriceRecord>,
    }

    impl PriceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, FetchError> {
            Ok(FetchResult {
                symbol: symbol.to_string(),
                records: self.records.clone(),
                source: DataSource::YahooFinance,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    /// Model whose fit always fails, for exercising the soft-failure path.
    struct FailingModel;

    impl ForecastModel for FailingModel {
        fn name(&self) -> &str {
            "failing"
        }

        fn fit(
            &self,
            _frame: &TrainingFrame,
            _options: &ModelOptions,
        ) -> Result<Box<dyn FittedModel>, ForecastError> {
            Err(ForecastError::FitFailed("synthetic failure".into()))
        }
    }

    fn daily_records(n: usize) -> Vec<PriceRecord> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + i as f64 * 0.1;
                PriceRecord {
                    date: start + Duration::days(i as i64),
                    open: close - 0.5,
                    high: close + 1.0,
                    low: close - 1.0,
                    close,
                    volume: 10_000,
                }
            })
            .collect()
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        config: RunConfig,
        cache: HistoryCache,
        catalogs: CatalogCache,
        opts: LoadOptions,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("symbols.csv");
        std::fs::write(
            &catalog_path,
            "symbol,name\nRELIANCE.NS,Reliance Industries\nTCS.NS,Tata Consultancy\n",
        )
        .unwrap();

        let mut config = RunConfig::default();
        config.catalog = catalog_path;
        config.cache_dir = dir.path().join("cache");

        let cache = HistoryCache::new(&config.cache_dir);
        let opts = LoadOptions {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            offline: false,
            synthetic: false,
            force: false,
        };

        Fixture {
            _dir: dir,
            config,
            cache,
            catalogs: CatalogCache::new(),
            opts,
        }
    }

    #[test]
    fn happy_path_produces_history_and_forecast() {
        let fx = fixture();
        let provider = FixedProvider {
            records: daily_records(120),
        };
        let request = PipelineRequest {
            symbol: "RELIANCE.NS".into(),
            years: 1,
        };

        let report = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            Some(&provider),
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap();

        assert_eq!(report.symbol, "RELIANCE.NS");
        assert_eq!(report.display_name, "Reliance Industries");
        assert_eq!(report.source, DataSource::YahooFinance);
        assert_eq!(report.history.len(), 120);
        assert_eq!(report.horizon_days, 365);
        assert!(report.forecast_error.is_none());

        let forecast = report.forecast.as_ref().unwrap();
        assert_eq!(forecast.len(), 120 + 365);
        assert_eq!(report.history_tail(5).len(), 5);
    }

    #[test]
    fn progress_percent_never_moves_backwards() {
        use std::sync::Mutex;
        use tickercast_core::progress::Stage;

        #[derive(Default)]
        struct RecordingSink {
            events: Mutex<Vec<(Stage, u8)>>,
        }

        impl ProgressSink for RecordingSink {
            fn report(&self, stage: Stage, percent: u8) {
                self.events.lock().unwrap().push((stage, percent));
            }
        }

        let fx = fixture();
        let provider = FixedProvider {
            records: daily_records(120),
        };
        let request = PipelineRequest {
            symbol: "RELIANCE.NS".into(),
            years: 1,
        };
        let sink = RecordingSink::default();

        run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            Some(&provider),
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &sink,
        )
        .unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.first(), Some(&(Stage::FetchStarted, 0)));
        assert_eq!(events.last(), Some(&(Stage::ForecastComplete, 100)));
        for pair in events.windows(2) {
            assert!(
                pair[0].1 <= pair[1].1,
                "percent went backwards: {:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn forecast_failure_keeps_the_history() {
        let fx = fixture();
        let provider = FixedProvider {
            records: daily_records(120),
        };
        let request = PipelineRequest {
            symbol: "TCS.NS".into(),
            years: 2,
        };

        let report = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            Some(&provider),
            &FailingModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap();

        assert_eq!(report.history.len(), 120);
        assert!(report.forecast.is_none());
        assert!(report
            .forecast_error
            .as_deref()
            .unwrap()
            .contains("synthetic failure"));
    }

    #[test]
    fn single_record_history_fails_softly_at_the_fit() {
        let fx = fixture();
        let provider = FixedProvider {
            records: daily_records(1),
        };
        let request = PipelineRequest {
            symbol: "TCS.NS".into(),
            years: 1,
        };

        let report = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            Some(&provider),
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap();

        assert_eq!(report.history.len(), 1);
        assert!(report.forecast.is_none());
        assert!(report.forecast_error.is_some());
    }

    #[test]
    fn unknown_symbol_aborts() {
        let fx = fixture();
        let provider = FixedProvider {
            records: daily_records(120),
        };
        let request = PipelineRequest {
            symbol: "NOPE".into(),
            years: 1,
        };

        let err = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            Some(&provider),
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::UnknownSymbol { .. }));
    }

    #[test]
    fn horizon_outside_bounds_aborts_before_any_work() {
        let fx = fixture();
        let request = PipelineRequest {
            symbol: "TCS.NS".into(),
            years: 9,
        };

        let err = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            None,
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::HorizonOutOfBounds { years: 9, min: 1, max: 4 }
        ));
    }

    #[test]
    fn missing_catalog_aborts() {
        let mut fx = fixture();
        fx.config.catalog = std::path::PathBuf::from("/nonexistent/symbols.csv");
        let request = PipelineRequest {
            symbol: "TCS.NS".into(),
            years: 1,
        };

        let err = run_pipeline(
            &fx.config,
            &fx.catalogs,
            &fx.cache,
            None,
            &SeasonalTrendModel,
            &request,
            &fx.opts,
            &NullProgress,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Catalog(CatalogError::NotFound { .. })
        ));
    }
}
