//! Timing of script runs.

use std::{sync::Mutex, time::Duration};

use serde::Serialize;

use crate::param::ParameterName;

/// Which of a parameter's scripts was run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScriptStage {
    Primary,
    Fallback,
}

/// Outcome of a single script run.
#[derive(Clone, Copy, Debug)]
pub struct EvaluationRecord<'a> {
    pub parameter: &'a ParameterName,
    pub stage: ScriptStage,
    pub elapsed: Duration,
    /// Whether the run produced a usable result.
    pub succeeded: bool,
}

/// Receives a record of every script run.
pub trait EvaluationSink {
    fn record(&self, record: &EvaluationRecord);
}

/// Discards records.
pub struct NoopSink;

impl EvaluationSink for NoopSink {
    fn record(&self, _record: &EvaluationRecord) {}
}

/// Aggregated timings for one [ScriptStage].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct StageStats {
    pub count: u64,
    pub failures: u64,
    pub total: Duration,
    pub max: Duration,
}

impl StageStats {
    fn add(&mut self, record: &EvaluationRecord) {
        self.count += 1;
        if !record.succeeded {
            self.failures += 1;
        }
        self.total += record.elapsed;
        self.max = self.max.max(record.elapsed);
    }

    pub fn mean(&self) -> Option<Duration> {
        u32::try_from(self.count)
            .ok()
            .filter(|count| *count > 0)
            .map(|count| self.total / count)
    }
}

/// Snapshot of an [EvaluationTimer].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TimingSummary {
    pub primary: StageStats,
    pub fallback: StageStats,
}

/// [EvaluationSink] that aggregates timings per [ScriptStage].
#[derive(Debug, Default)]
pub struct EvaluationTimer {
    summary: Mutex<TimingSummary>,
}

impl EvaluationTimer {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn snapshot(&self) -> TimingSummary {
        *self
            .summary
            .lock()
            .expect("failed to lock evaluation timer")
    }
}

impl EvaluationSink for EvaluationTimer {
    fn record(&self, record: &EvaluationRecord) {
        log::trace!(
            "{} script for {:?} took {:?} (succeeded: {}).",
            record.stage,
            record.parameter,
            record.elapsed,
            record.succeeded,
        );
        let mut summary = self
            .summary
            .lock()
            .expect("failed to lock evaluation timer");
        match record.stage {
            ScriptStage::Primary => summary.primary.add(record),
            ScriptStage::Fallback => summary.fallback.add(record),
        }
    }
}
