//! Training frame — the (timestamp, value) series fed to the forecast model.
//!
//! Built by projecting (date, close) out of a price history. The projection
//! is strictly 1:1: no reordering, no deduplication. Delivering sorted,
//! deduplicated data is the price source's responsibility; if it cannot,
//! the builder fails rather than silently producing bad training data.

use crate::data::provider::PriceRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One training observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingPoint {
    pub timestamp: NaiveDate,
    pub value: f64,
}

/// Structured error types for training frame construction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot build a training frame from an empty price history")]
    EmptyInput,

    #[error("price history is not sorted ascending at row {position}")]
    UnsortedInput { position: usize },

    #[error("price history contains duplicate date {date}")]
    DuplicateTimestamp { date: NaiveDate },
}

/// Validated, strictly date-ascending training series.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingFrame {
    points: Vec<TrainingPoint>,
}

impl TrainingFrame {
    /// Project (date, close) out of a price history.
    ///
    /// Same cardinality and ordering as the input. Errors: `EmptyInput` for
    /// zero records, `DuplicateTimestamp`/`UnsortedInput` when the source
    /// violated its ordering contract.
    pub fn from_history(records: &[PriceRecord]) -> Result<Self, BuildError> {
        let points = records
            .iter()
            .map(|r| TrainingPoint {
                timestamp: r.date,
                value: r.close,
            })
            .collect();
        Self::from_points(points)
    }

    /// Wrap a raw point sequence, validating strict date ordering.
    pub fn from_points(points: Vec<TrainingPoint>) -> Result<Self, BuildError> {
        if points.is_empty() {
            return Err(BuildError::EmptyInput);
        }
        for (i, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp == pair[0].timestamp {
                return Err(BuildError::DuplicateTimestamp {
                    date: pair[1].timestamp,
                });
            }
            if pair[1].timestamp < pair[0].timestamp {
                return Err(BuildError::UnsortedInput { position: i + 1 });
            }
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[TrainingPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First observation date. Frames are never empty, so this is total.
    pub fn first_timestamp(&self) -> NaiveDate {
        self.points[0].timestamp
    }

    /// Last observation date.
    pub fn last_timestamp(&self) -> NaiveDate {
        self.points[self.points.len() - 1].timestamp
    }

    /// Calendar days between first and last observation.
    pub fn span_days(&self) -> i64 {
        (self.last_timestamp() - self.first_timestamp()).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(y: i32, m: u32, d: u32, close: f64) -> PriceRecord {
        PriceRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn projection_is_one_to_one() {
        let records = vec![
            record(2024, 1, 2, 101.0),
            record(2024, 1, 3, 102.5),
            record(2024, 1, 4, 99.75),
        ];
        let frame = TrainingFrame::from_history(&records).unwrap();

        assert_eq!(frame.len(), records.len());
        for (point, rec) in frame.points().iter().zip(&records) {
            assert_eq!(point.timestamp, rec.date);
            assert_eq!(point.value, rec.close);
        }
    }

    #[test]
    fn empty_input_fails() {
        let err = TrainingFrame::from_history(&[]).unwrap_err();
        assert!(matches!(err, BuildError::EmptyInput));
    }

    #[test]
    fn unsorted_input_fails() {
        let records = vec![record(2024, 1, 4, 100.0), record(2024, 1, 2, 101.0)];
        let err = TrainingFrame::from_history(&records).unwrap_err();
        assert!(matches!(err, BuildError::UnsortedInput { position: 1 }));
    }

    #[test]
    fn duplicate_date_fails() {
        let records = vec![
            record(2024, 1, 2, 100.0),
            record(2024, 1, 2, 101.0),
            record(2024, 1, 3, 102.0),
        ];
        let err = TrainingFrame::from_history(&records).unwrap_err();
        match err {
            BuildError::DuplicateTimestamp { date } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
            }
            other => panic!("expected DuplicateTimestamp, got {other:?}"),
        }
    }

    #[test]
    fn span_days_counts_calendar_days() {
        let records = vec![record(2024, 1, 2, 100.0), record(2024, 1, 12, 105.0)];
        let frame = TrainingFrame::from_history(&records).unwrap();
        assert_eq!(frame.span_days(), 10);
        assert_eq!(
            frame.first_timestamp(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(
            frame.last_timestamp(),
            NaiveDate::from_ymd_opt(2024, 1, 12).unwrap()
        );
    }

    #[test]
    fn single_point_is_a_valid_frame() {
        // Building succeeds; the model layer decides whether one point is enough.
        let frame = TrainingFrame::from_history(&[record(2024, 1, 2, 100.0)]).unwrap();
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.span_days(), 0);
    }
}
