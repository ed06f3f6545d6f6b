//! Artifact export — JSON, CSV, and Markdown generation for a pipeline run.
//!
//! Three formats:
//! - **JSON**: the full run manifest with schema versioning
//! - **CSV**: forecast table and raw history for external analysis tools
//! - **Markdown**: a human-readable run summary
//!
//! Persisted manifests include a `schema_version` field; unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tickercast_core::data::provider::{DataSource, PriceRecord};
use tickercast_core::forecast::{Forecast, ForecastRow};

use crate::pipeline::PipelineReport;

/// Bumped whenever the manifest layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON export failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found} (max supported: {supported})")]
    SchemaVersion { found: u32, supported: u32 },

    #[error("CSV output is not valid UTF-8")]
    Encoding,
}

/// Serializable view of a pipeline run, persisted as `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub symbol: String,
    pub display_name: String,
    pub source: DataSource,
    pub data_hash: String,
    pub history_rows: usize,
    pub horizon_days: u32,
    pub forecast: Option<Forecast>,
    pub forecast_error: Option<String>,
}

impl RunManifest {
    pub fn from_report(report: &PipelineReport) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: report.symbol.clone(),
            display_name: report.display_name.clone(),
            source: report.source,
            data_hash: report.data_hash.clone(),
            history_rows: report.history.len(),
            horizon_days: report.horizon_days,
            forecast: report.forecast.clone(),
            forecast_error: report.forecast_error.clone(),
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a run manifest to pretty JSON.
pub fn export_json(manifest: &RunManifest) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(manifest)?)
}

/// Deserialize a run manifest from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunManifest, ExportError> {
    let manifest: RunManifest = serde_json::from_str(json)?;
    if manifest.schema_version > SCHEMA_VERSION {
        return Err(ExportError::SchemaVersion {
            found: manifest.schema_version,
            supported: SCHEMA_VERSION,
        });
    }
    Ok(manifest)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export forecast rows as CSV.
///
/// Columns: date, forecast, lower, upper, trend, weekly, yearly
pub fn export_forecast_csv(rows: &[ForecastRow]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["date", "forecast", "lower", "upper", "trend", "weekly", "yearly"])?;
    for r in rows {
        wtr.write_record([
            &r.timestamp.to_string(),
            &format!("{:.4}", r.point_estimate),
            &format!("{:.4}", r.lower_bound),
            &format!("{:.4}", r.upper_bound),
            &format!("{:.4}", r.trend),
            &format!("{:.4}", r.weekly),
            &format!("{:.4}", r.yearly),
        ])?;
    }

    finish_csv(wtr)
}

/// Export raw OHLCV history as CSV.
///
/// Columns: date, open, high, low, close, volume
pub fn export_history_csv(records: &[PriceRecord]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["date", "open", "high", "low", "close", "volume"])?;
    for r in records {
        wtr.write_record([
            &r.date.to_string(),
            &format!("{:.4}", r.open),
            &format!("{:.4}", r.high),
            &format!("{:.4}", r.low),
            &format!("{:.4}", r.close),
            &r.volume.to_string(),
        ])?;
    }

    finish_csv(wtr)
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(data).map_err(|_| ExportError::Encoding)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown summary for a single run.
pub fn generate_report(report: &PipelineReport) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Forecast Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", report.symbol));
    md.push_str(&format!("| Name | {} |\n", report.display_name));
    md.push_str(&format!("| Source | {:?} |\n", report.source));
    md.push_str(&format!("| History Rows | {} |\n", report.history.len()));
    if let (Some(first), Some(last)) = (report.history.first(), report.history.last()) {
        md.push_str(&format!("| Period | {} to {} |\n", first.date, last.date));
    }
    md.push_str(&format!("| Horizon | {} days |\n", report.horizon_days));
    md.push_str(&format!("| Data Hash | {} |\n", report.data_hash));
    if report.source == DataSource::Synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    match (&report.forecast, &report.forecast_error) {
        (Some(forecast), _) => {
            md.push_str("## Forecast\n\n");
            md.push_str("| Date | Forecast | Lower | Upper |\n");
            md.push_str("| --- | ---: | ---: | ---: |\n");
            for r in forecast.tail(10) {
                md.push_str(&format!(
                    "| {} | {:.2} | {:.2} | {:.2} |\n",
                    r.timestamp, r.point_estimate, r.lower_bound, r.upper_bound
                ));
            }
            md.push('\n');
        }
        (None, Some(err)) => {
            md.push_str("## Forecast\n\n");
            md.push_str(&format!("Forecast unavailable: {err}\n\n"));
        }
        (None, None) => {}
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{symbol}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json` — the full `RunManifest`
/// - `history.csv` — the raw OHLCV training data
/// - `forecast.csv` — the forecast table (only when a forecast exists)
/// - `report.md` — human-readable summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &PipelineReport, output_dir: &Path) -> Result<PathBuf, ExportError> {
    let dirname = format!(
        "{}_{}",
        report.symbol.replace('/', "_"),
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)?;

    let manifest = RunManifest::from_report(report);
    std::fs::write(run_dir.join("manifest.json"), export_json(&manifest)?)?;

    std::fs::write(
        run_dir.join("history.csv"),
        export_history_csv(&report.history)?,
    )?;

    if let Some(forecast) = &report.forecast {
        std::fs::write(
            run_dir.join("forecast.csv"),
            export_forecast_csv(forecast.rows())?,
        )?;
    }

    std::fs::write(run_dir.join("report.md"), generate_report(report))?;

    Ok(run_dir)
}

/// Load a run manifest from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<RunManifest, ExportError> {
    let json = std::fs::read_to_string(dir.join("manifest.json"))?;
    import_json(&json)
}
