//! Property tests for the data-preparation and forecast pipeline.
//!
//! Uses proptest to verify:
//! 1. Training frame projection is a pure 1:1 projection
//! 2. Forecast axis always ends exactly horizon_days after the last observation
//! 3. Confidence bounds always bracket the point estimate

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use tickercast_core::data::provider::PriceRecord;
use tickercast_core::forecast::{
    run_forecast, ForecastRequest, ModelOptions, SeasonalTrendModel,
};
use tickercast_core::{NullProgress, TrainingFrame};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_close() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

/// A sorted, deduplicated daily price history with occasional gaps.
fn arb_history() -> impl Strategy<Value = Vec<PriceRecord>> {
    (
        prop::collection::vec((arb_close(), 1u8..4), 2..120),
        0u32..2000,
    )
        .prop_map(|(rows, start_offset)| {
            let base = NaiveDate::from_ymd_opt(2018, 1, 2).unwrap()
                + Duration::days(i64::from(start_offset));
            let mut date = base;
            rows.into_iter()
                .map(|(close, gap)| {
                    let record = PriceRecord {
                        date,
                        open: close - 0.5,
                        high: close + 1.0,
                        low: close - 1.0,
                        close,
                        volume: 10_000,
                    };
                    date += Duration::days(i64::from(gap));
                    record
                })
                .collect()
        })
}

// ── 1. Projection purity ─────────────────────────────────────────────

proptest! {
    /// For all non-empty sorted, deduplicated histories:
    /// len(output) == len(input), output[i] == (input[i].date, input[i].close).
    #[test]
    fn projection_is_pure(history in arb_history()) {
        let frame = TrainingFrame::from_history(&history).unwrap();

        prop_assert_eq!(frame.len(), history.len());
        for (point, record) in frame.points().iter().zip(&history) {
            prop_assert_eq!(point.timestamp, record.date);
            prop_assert_eq!(point.value, record.close);
        }
    }

    /// Reversing a multi-row history always breaks the ordering contract.
    #[test]
    fn reversed_history_is_rejected(history in arb_history()) {
        let reversed: Vec<PriceRecord> = history.iter().rev().copied().collect();
        prop_assert!(TrainingFrame::from_history(&reversed).is_err());
    }
}

// ── 2/3. Forecast axis and bounds ────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn forecast_axis_and_bounds(history in arb_history(), horizon in 1u32..200) {
        let frame = TrainingFrame::from_history(&history).unwrap();
        let request = ForecastRequest::new(horizon, ModelOptions::default());

        let forecast =
            run_forecast(&SeasonalTrendModel, &frame, &request, &NullProgress).unwrap();

        prop_assert_eq!(forecast.len(), frame.len() + horizon as usize);
        prop_assert_eq!(
            forecast.last_timestamp(),
            Some(frame.last_timestamp() + Duration::days(i64::from(horizon)))
        );

        for row in forecast.rows() {
            prop_assert!(row.point_estimate.is_finite());
            prop_assert!(row.lower_bound <= row.point_estimate);
            prop_assert!(row.point_estimate <= row.upper_bound);
        }
    }
}
