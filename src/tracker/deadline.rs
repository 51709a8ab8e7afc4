use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::{record::BatchRecord, TrackerError};

/// Step used to walk forward out of a DST gap
const GAP_PROBE_STEP_MINUTES: i64 = 15;
/// Longest gap we are willing to walk across (one day of probes)
const GAP_PROBE_LIMIT: i64 = 24 * 60 / GAP_PROBE_STEP_MINUTES;

/// Daily completion deadline: a wall-clock hour in a timezone.
///
/// All instants are computed by localizing `hour:00:00` on a calendar date of
/// the timezone and converting the result to UTC. During a DST fall-back the
/// earlier of the two instants wins; during a spring-forward gap the first
/// valid local time after the gap is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    hour: u32,
    timezone: Tz,
}

impl Deadline {
    pub fn new(hour: u32, timezone: Tz) -> Result<Self, TrackerError> {
        if hour > 23 {
            return Err(TrackerError::InvalidArgument(format!(
                "deadline hour must be between 0 and 23, got {hour}"
            )));
        }
        Ok(Self { hour, timezone })
    }

    #[must_use]
    pub const fn hour(&self) -> u32 {
        self.hour
    }

    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The deadline instant on a given local calendar date.
    #[must_use]
    pub fn on_date(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(chrono::NaiveTime::MIN) + Duration::hours(i64::from(self.hour));
        self.localize(naive)
    }

    /// The most recently passed deadline instant, `now` included.
    #[must_use]
    pub fn most_recent(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let candidate = self.on_date(today);
        if candidate <= now {
            return candidate;
        }

        match today.pred_opt() {
            Some(yesterday) => self.on_date(yesterday),
            None => candidate,
        }
    }

    /// The deadline one local calendar day before `deadline`.
    #[must_use]
    pub fn previous(&self, deadline: DateTime<Utc>) -> DateTime<Utc> {
        let date = deadline.with_timezone(&self.timezone).date_naive();
        date.pred_opt()
            .map_or(deadline - Duration::days(1), |d| self.on_date(d))
    }

    fn localize(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let mut probe = naive;
        for _ in 0..=GAP_PROBE_LIMIT {
            match self.timezone.from_local_datetime(&probe) {
                LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => {
                    return instant.with_timezone(&Utc);
                }
                LocalResult::None => probe += Duration::minutes(GAP_PROBE_STEP_MINUTES),
            }
        }

        // No valid local time within a day; fall back to reading it as UTC
        Utc.from_utc_datetime(&naive)
    }
}

/// How the current record relates to the most recently passed deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Finished at or before the deadline
    OnTime { end_time: DateTime<Utc> },
    /// Started after the deadline; it belongs to the next one
    NotYetDue,
    /// Finished, but after the deadline
    Late { end_time: DateTime<Utc> },
    /// Started for this deadline and still running
    Incomplete,
    /// The only record predates the previous deadline; nothing ran for this one
    Stale { start_time: DateTime<Utc> },
    /// No batch record exists at all
    NoBatch,
}

impl CompletionOutcome {
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        matches!(self, Self::OnTime { .. } | Self::NotYetDue)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OnTime { .. } => "completed on time",
            Self::NotYetDue => "not yet due",
            Self::Late { .. } => "completed after the deadline",
            Self::Incomplete => "not completed by the deadline",
            Self::Stale { .. } => "no batch ran since the previous deadline",
            Self::NoBatch => "no batch data",
        }
    }
}

/// Result of checking the current record against a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCheck {
    pub deadline: DateTime<Utc>,
    pub batch_id: Option<String>,
    pub outcome: CompletionOutcome,
}

impl CompletionCheck {
    #[must_use]
    pub const fn is_compliant(&self) -> bool {
        self.outcome.is_compliant()
    }
}

/// Evaluate a record against the deadline that most recently passed at `now`.
#[must_use]
pub fn evaluate(
    record: Option<&BatchRecord>,
    deadline: &Deadline,
    now: DateTime<Utc>,
) -> CompletionCheck {
    let closes = deadline.most_recent(now);
    let opens = deadline.previous(closes);

    let Some(record) = record else {
        return CompletionCheck {
            deadline: closes,
            batch_id: None,
            outcome: CompletionOutcome::NoBatch,
        };
    };

    let outcome = if record.start_time > closes {
        CompletionOutcome::NotYetDue
    } else if record.start_time <= opens {
        CompletionOutcome::Stale {
            start_time: record.start_time,
        }
    } else {
        match record.end_time {
            Some(end_time) if end_time <= closes => CompletionOutcome::OnTime { end_time },
            Some(end_time) => CompletionOutcome::Late { end_time },
            None => CompletionOutcome::Incomplete,
        }
    };

    CompletionCheck {
        deadline: closes,
        batch_id: Some(record.batch_id.clone()),
        outcome,
    }
}
