use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use super::{deadline::Deadline, stage::Stage};

/// Persisted lifecycle of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub batch_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stage_progress: BTreeMap<Stage, u8>,
}

impl BatchRecord {
    #[must_use]
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            start_time,
            end_time: None,
            stage_progress: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Raise the progress of a stage, never lowering it.
    ///
    /// Returns `true` when the stored value changed.
    pub fn record_progress(&mut self, stage: Stage, percentage: u8) -> bool {
        match self.stage_progress.get(&stage) {
            Some(&current) if current >= percentage => false,
            _ => {
                self.stage_progress.insert(stage, percentage);
                true
            }
        }
    }

    /// Set `end_time` unless it is already set.
    ///
    /// Returns `true` when this call closed the batch.
    pub fn finish(&mut self, at: DateTime<Utc>) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(at);
        true
    }
}

/// Point-in-time view of the current batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStatus {
    pub batch_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub stage_progress: BTreeMap<Stage, u8>,
    /// Mean of the recorded stage percentages, 0 when none are recorded
    pub overall_percentage: f64,
}

impl BatchStatus {
    #[must_use]
    pub fn from_record(record: Option<&BatchRecord>) -> Self {
        let Some(record) = record else {
            return Self {
                batch_id: None,
                start_time: None,
                end_time: None,
                stage_progress: BTreeMap::new(),
                overall_percentage: 0.0,
            };
        };

        Self {
            batch_id: Some(record.batch_id.clone()),
            start_time: Some(record.start_time),
            end_time: record.end_time,
            stage_progress: record.stage_progress.clone(),
            overall_percentage: overall_percentage(&record.stage_progress),
        }
    }

    /// Run time so far, or total run time once the batch ended.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let start = self.start_time?;
        Some(self.end_time.unwrap_or(now) - start)
    }

    #[must_use]
    pub fn lifecycle(&self, now: DateTime<Utc>, deadline: &Deadline) -> Lifecycle {
        let Some(start) = self.start_time else {
            return Lifecycle::NotStarted;
        };

        if self.end_time.is_some() {
            return Lifecycle::Completed;
        }

        if start <= deadline.most_recent(now) {
            Lifecycle::Overdue
        } else {
            Lifecycle::Running
        }
    }
}

/// Derived lifecycle of the current batch, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Lifecycle {
    NotStarted,
    Running,
    Completed,
    Overdue,
}

#[allow(clippy::cast_precision_loss)]
fn overall_percentage(stage_progress: &BTreeMap<Stage, u8>) -> f64 {
    if stage_progress.is_empty() {
        return 0.0;
    }
    let total: u32 = stage_progress.values().map(|&p| u32::from(p)).sum();
    f64::from(total) / stage_progress.len() as f64
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Tz;

    use super::*;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, mi, 0).unwrap()
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut record = BatchRecord::new(utc(0, 0));

        assert!(record.record_progress(Stage::Scrape, 40));
        assert!(!record.record_progress(Stage::Scrape, 20));
        assert!(!record.record_progress(Stage::Scrape, 40));
        assert!(record.record_progress(Stage::Scrape, 90));

        assert_eq!(record.stage_progress[&Stage::Scrape], 90);
    }

    #[test]
    fn test_zero_progress_registers_the_stage() {
        let mut record = BatchRecord::new(utc(0, 0));
        record.record_progress(Stage::Enrich, 0);
        assert_eq!(record.stage_progress.get(&Stage::Enrich), Some(&0));
    }

    #[test]
    fn test_finish_only_sets_end_time_once() {
        let mut record = BatchRecord::new(utc(0, 0));

        assert!(record.finish(utc(3, 0)));
        assert!(!record.finish(utc(4, 0)));
        assert_eq!(record.end_time, Some(utc(3, 0)));
    }

    #[test]
    fn test_overall_is_mean_of_recorded_stages() {
        let mut record = BatchRecord::new(utc(0, 0));
        record.record_progress(Stage::Scrape, 40);
        record.record_progress(Stage::Email, 100);

        let status = BatchStatus::from_record(Some(&record));
        assert!((status.overall_percentage - 70.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_status() {
        let status = BatchStatus::from_record(None);
        let deadline = Deadline::new(5, Tz::UTC).unwrap();

        assert_eq!(status.overall_percentage, 0.0);
        assert_eq!(status.elapsed(utc(6, 0)), None);
        assert_eq!(status.lifecycle(utc(6, 0), &deadline), Lifecycle::NotStarted);
    }

    #[test]
    fn test_lifecycle_transitions() {
        let deadline = Deadline::new(5, Tz::UTC).unwrap();
        let mut record = BatchRecord::new(utc(0, 0));

        let status = BatchStatus::from_record(Some(&record));
        assert_eq!(status.lifecycle(utc(2, 0), &deadline), Lifecycle::Running);
        assert_eq!(status.lifecycle(utc(6, 0), &deadline), Lifecycle::Overdue);
        assert_eq!(status.elapsed(utc(6, 0)), Some(Duration::hours(6)));

        record.finish(utc(4, 0));
        let status = BatchStatus::from_record(Some(&record));
        assert_eq!(status.lifecycle(utc(6, 0), &deadline), Lifecycle::Completed);
        assert_eq!(status.elapsed(utc(6, 0)), Some(Duration::hours(4)));
    }

    #[test]
    fn test_lifecycle_labels() {
        assert_eq!(Lifecycle::NotStarted.to_string(), "not-started");
        assert_eq!(Lifecycle::Overdue.to_string(), "overdue");
    }

    #[test]
    fn test_end_time_is_omitted_while_open() {
        let record = BatchRecord::new(utc(0, 0));
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("end_time").is_none());
        assert_eq!(json["start_time"], "2024-06-10T00:00:00Z");
    }
}
