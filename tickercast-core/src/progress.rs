//! Progress reporting for long-running pipeline steps.
//!
//! Fetching history and fitting the model both block for seconds. The
//! pipeline reports milestones through an explicit `ProgressSink` so the
//! presentation layer decides how to display them (status line, progress
//! bar, nothing at all).

use std::fmt;

/// Pipeline milestones, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchStarted,
    FetchComplete,
    FittingStarted,
    FittingComplete,
    ForecastComplete,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::FetchStarted => "loading price history",
            Stage::FetchComplete => "price history loaded",
            Stage::FittingStarted => "fitting forecast model",
            Stage::FittingComplete => "model fit complete, generating forecast",
            Stage::ForecastComplete => "forecast complete",
        };
        f.write_str(text)
    }
}

/// Sink for progress milestones.
pub trait ProgressSink: Send + Sync {
    /// Report a milestone with overall completion in percent (0–100).
    fn report(&self, stage: Stage, percent: u8);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl ProgressSink for StdoutProgress {
    fn report(&self, stage: Stage, percent: u8) {
        println!("[{percent:>3}%] {stage}");
    }
}

/// Sink that discards all reports (tests, quiet mode).
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _stage: Stage, _percent: u8) {}
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Records every report for assertions on ordering and percentages.
    #[derive(Default)]
    pub struct RecordingProgress {
        pub events: Mutex<Vec<(Stage, u8)>>,
    }

    impl ProgressSink for RecordingProgress {
        fn report(&self, stage: Stage, percent: u8) {
            self.events.lock().unwrap().push((stage, percent));
        }
    }
}
