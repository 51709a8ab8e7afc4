pub mod deadline;
pub mod record;
pub mod stage;
pub mod store;

use std::str::FromStr as _;

use chrono_tz::Tz;
use thiserror::Error;
use tracing::{debug, info};

use crate::{clock::Clock, metrics::Metrics};

use self::{
    deadline::{CompletionCheck, Deadline},
    record::{BatchRecord, BatchStatus},
    stage::Stage,
    store::{BatchStore, StoreError},
};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Records the lifecycle of the current batch.
///
/// The store is the only source of truth: every operation reads the record
/// fresh and every mutation rewrites it in full.
#[derive(Debug, Clone)]
pub struct BatchTracker {
    store: BatchStore,
    clock: Clock,
    metrics: Metrics,
}

impl BatchTracker {
    #[must_use]
    pub const fn new(store: BatchStore, clock: Clock, metrics: Metrics) -> Self {
        Self {
            store,
            clock,
            metrics,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &BatchStore {
        &self.store
    }

    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Open a new batch, replacing whatever record was stored before.
    pub fn record_batch_start(&self) -> Result<BatchRecord, TrackerError> {
        if let Ok(Some(previous)) = self.store.load() {
            if previous.is_open() {
                debug!(
                    "Batch {} was still open and is superseded by a new batch",
                    previous.batch_id
                );
            }
        }

        let record = BatchRecord::new(self.clock.now());
        self.store.save(&record)?;

        info!("🚀 Batch {} started at {}", record.batch_id, record.start_time);
        Ok(record)
    }

    /// Raise the completion percentage of a stage in the open batch.
    ///
    /// Returns the percentage stored for the stage afterwards, which is higher
    /// than `percentage` when an earlier call recorded more progress.
    pub fn record_batch_stage_completion(
        &self,
        stage: &str,
        percentage: i64,
    ) -> Result<u8, TrackerError> {
        let stage = Stage::from_str(stage).map_err(|_| {
            TrackerError::InvalidArgument(format!(
                "unknown stage '{stage}', expected one of: {}",
                Stage::names()
            ))
        })?;

        let percentage = u8::try_from(percentage)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| {
                TrackerError::InvalidArgument(format!(
                    "percentage must be between 0 and 100, got {percentage}"
                ))
            })?;

        let mut record = self.open_record("record stage completion")?;

        if record.record_progress(stage, percentage) {
            self.store.save(&record)?;
            debug!(
                "Batch {} stage '{}' at {}%",
                record.batch_id, stage, percentage
            );
        }

        let stored = record.stage_progress.get(&stage).copied().unwrap_or(percentage);
        self.metrics
            .gauge(&format!("batch.stage_progress.{stage}"), f64::from(stored));

        Ok(stored)
    }

    /// Close the open batch. Closing an already closed batch changes nothing.
    pub fn record_batch_end(&self) -> Result<BatchRecord, TrackerError> {
        let Some(mut record) = self.store.load()? else {
            return Err(TrackerError::PreconditionFailed(
                "cannot end a batch: no batch has been started".to_string(),
            ));
        };

        if !record.finish(self.clock.now()) {
            debug!(
                "Batch {} already ended at {:?}, ignoring",
                record.batch_id, record.end_time
            );
            return Ok(record);
        }

        self.store.save(&record)?;

        if let Some(end) = record.end_time {
            let duration = end - record.start_time;
            #[allow(clippy::cast_precision_loss)]
            let seconds = duration.num_seconds() as f64;
            self.metrics.histogram("batch.duration_seconds", seconds);
            info!(
                "✅ Batch {} ended after {}s",
                record.batch_id,
                duration.num_seconds()
            );
        }

        Ok(record)
    }

    /// Check the stored batch against the most recently passed occurrence
    /// of `deadline_hour` in `timezone`.
    pub fn check_batch_completion(
        &self,
        deadline_hour: u32,
        timezone: Tz,
    ) -> Result<CompletionCheck, TrackerError> {
        let deadline = Deadline::new(deadline_hour, timezone)?;
        self.check_against(&deadline)
    }

    pub fn check_against(&self, deadline: &Deadline) -> Result<CompletionCheck, TrackerError> {
        let record = self.store.load()?;
        Ok(deadline::evaluate(
            record.as_ref(),
            deadline,
            self.clock.now(),
        ))
    }

    pub fn get_batch_status(&self) -> Result<BatchStatus, TrackerError> {
        let record = self.store.load()?;
        Ok(BatchStatus::from_record(record.as_ref()))
    }

    fn open_record(&self, action: &str) -> Result<BatchRecord, TrackerError> {
        match self.store.load()? {
            Some(record) if record.is_open() => Ok(record),
            Some(record) => Err(TrackerError::PreconditionFailed(format!(
                "cannot {action}: batch {} has already ended",
                record.batch_id
            ))),
            None => Err(TrackerError::PreconditionFailed(format!(
                "cannot {action}: no batch has been started"
            ))),
        }
    }
}
