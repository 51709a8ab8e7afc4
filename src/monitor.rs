use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    alerts::{Alert, AlertNotifier},
    metrics::Metrics,
    tracker::{
        deadline::{CompletionCheck, CompletionOutcome, Deadline},
        BatchTracker,
    },
};

/// Identity of a violation episode: one batch (or the lack of one) against
/// one deadline instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertKey {
    pub batch_id: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    /// No open violation
    Ok,
    /// A violation was detected and its alert delivered
    Alerted(AlertKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Compliant(CompletionCheck),
    AlertSent(AlertKey),
    AlreadyAlerted(AlertKey),
    AlertFailed(AlertKey),
}

impl PollOutcome {
    #[must_use]
    pub const fn is_violation(&self) -> bool {
        !matches!(self, Self::Compliant(_))
    }
}

/// Polls the tracker and alerts at most once per violation episode.
///
/// The only state kept between polls is the current [`MonitorState`] and the
/// key and time of the last delivered alert.
#[derive(Debug)]
pub struct CompletionMonitor {
    tracker: BatchTracker,
    deadline: Deadline,
    notifier: AlertNotifier,
    metrics: Metrics,
    poll_interval: Duration,
    state: MonitorState,
    last_alert: Option<(AlertKey, DateTime<Utc>)>,
}

impl CompletionMonitor {
    #[must_use]
    pub const fn new(
        tracker: BatchTracker,
        deadline: Deadline,
        notifier: AlertNotifier,
        metrics: Metrics,
        poll_interval: Duration,
    ) -> Self {
        Self {
            tracker,
            deadline,
            notifier,
            metrics,
            poll_interval,
            state: MonitorState::Ok,
            last_alert: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &MonitorState {
        &self.state
    }

    #[must_use]
    pub const fn last_alert(&self) -> Option<&(AlertKey, DateTime<Utc>)> {
        self.last_alert.as_ref()
    }

    /// Run one check and send an alert if a new violation is found.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let now = self.tracker.clock().now();

        let (key, alert, completed) = match self.tracker.check_against(&self.deadline) {
            Ok(check) if check.is_compliant() => {
                if let MonitorState::Alerted(key) = &self.state {
                    info!("🔁 Violation for batch {:?} cleared, monitor re-armed", key.batch_id);
                }
                debug!("Batch check passed: {}", check.outcome.label());
                self.state = MonitorState::Ok;
                self.metrics.gauge("monitor.violation", 0.0);
                return PollOutcome::Compliant(check);
            }
            Ok(check) => {
                let status = self.tracker.get_batch_status().ok();
                if let Some(status) = &status {
                    self.metrics
                        .gauge("monitor.overall_percentage", status.overall_percentage);
                }
                let key = AlertKey {
                    batch_id: check.batch_id.clone(),
                    deadline: check.deadline,
                };
                let completed = matches!(check.outcome, CompletionOutcome::Late { .. });
                let alert = Alert::missed_deadline(&check, status.as_ref(), now);
                (key, alert, completed)
            }
            Err(e) => {
                // Unknown status is treated as a missed deadline
                warn!("⚠️ Could not read batch record, assuming violation: {}", e);
                let deadline = self.deadline.most_recent(now);
                let key = AlertKey {
                    batch_id: None,
                    deadline,
                };
                (key, Alert::status_unknown(deadline, &e.to_string()), false)
            }
        };

        self.metrics.gauge("monitor.violation", 1.0);

        if self.last_alert.as_ref().is_some_and(|(last, _)| *last == key) {
            debug!("Alert for batch {:?} already sent, skipping", key.batch_id);
            self.state = if completed {
                MonitorState::Ok
            } else {
                MonitorState::Alerted(key.clone())
            };
            return PollOutcome::AlreadyAlerted(key);
        }

        match self.notifier.send(&alert).await {
            Ok(()) => {
                warn!(
                    "🚨 Alert sent for batch {:?} (deadline {})",
                    key.batch_id, key.deadline
                );
                self.last_alert = Some((key.clone(), now));
                self.state = MonitorState::Alerted(key.clone());
                PollOutcome::AlertSent(key)
            }
            Err(e) => {
                error!(
                    "❌ Failed to send alert for batch {:?}, retrying next poll: {}",
                    key.batch_id, e
                );
                self.state = MonitorState::Ok;
                PollOutcome::AlertFailed(key)
            }
        }
    }

    /// Poll on a fixed interval until `shutdown` flips to `true` or its
    /// sender is dropped. The first poll happens immediately.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "👀 Monitor started: deadline {:02}:00 {}, polling every {:?}",
            self.deadline.hour(),
            self.deadline.timezone(),
            self.poll_interval
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        info!("🛑 Monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::{Duration as ChronoDuration, TimeZone};
    use chrono_tz::Tz;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::{
        clock::Clock,
        mailer::Mailer,
        tracker::store::BatchStore,
    };

    struct Harness {
        _dir: TempDir,
        tracker: BatchTracker,
        clock: Clock,
        mailer: Mailer,
        monitor: CompletionMonitor,
    }

    fn utc(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, h, mi, 0).unwrap()
    }

    fn harness(now: DateTime<Utc>) -> Harness {
        let dir = tempdir().unwrap();
        let clock = Clock::manual(now);
        let metrics = Metrics::mock();
        let tracker = BatchTracker::new(
            BatchStore::new(dir.path().join("batch.json")),
            clock.clone(),
            metrics.clone(),
        );
        let mailer = Mailer::mock();
        let notifier = AlertNotifier::new(
            mailer.clone(),
            "batchwatch@example.com".parse().unwrap(),
            "ops@example.com".parse().unwrap(),
            Duration::from_secs(5),
        );
        let monitor = CompletionMonitor::new(
            tracker.clone(),
            Deadline::new(5, Tz::UTC).unwrap(),
            notifier,
            metrics,
            Duration::from_secs(300),
        );

        Harness {
            _dir: dir,
            tracker,
            clock,
            mailer,
            monitor,
        }
    }

    fn sent(h: &Harness) -> usize {
        h.mailer.messages().unwrap().len()
    }

    #[tokio::test]
    async fn test_compliant_batch_sends_nothing() {
        let mut h = harness(utc(10, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(10, 4, 0));
        h.tracker.record_batch_end().unwrap();
        h.clock.set(utc(10, 6, 0));

        let outcome = h.monitor.poll_once().await;

        assert!(!outcome.is_violation());
        assert_eq!(h.monitor.state(), &MonitorState::Ok);
        assert_eq!(sent(&h), 0);
    }

    #[tokio::test]
    async fn test_partial_batch_alerts_exactly_once() {
        let mut h = harness(utc(10, 0, 0));
        let record = h.tracker.record_batch_start().unwrap();
        h.tracker.record_batch_stage_completion("scrape", 40).unwrap();
        h.tracker.record_batch_stage_completion("email", 100).unwrap();
        h.clock.set(utc(10, 6, 0));

        let first = h.monitor.poll_once().await;
        let key = AlertKey {
            batch_id: Some(record.batch_id.clone()),
            deadline: utc(10, 5, 0),
        };
        assert_eq!(first, PollOutcome::AlertSent(key.clone()));
        assert_eq!(h.monitor.state(), &MonitorState::Alerted(key.clone()));

        for _ in 0..10 {
            h.clock.advance(ChronoDuration::minutes(5));
            assert_eq!(
                h.monitor.poll_once().await,
                PollOutcome::AlreadyAlerted(key.clone())
            );
        }

        assert_eq!(sent(&h), 1);
        let message = String::from_utf8(h.mailer.messages().unwrap()[0].formatted()).unwrap();
        assert!(message.contains("Overall: 70.0%"));
        assert_eq!(h.monitor.last_alert().map(|(_, at)| *at), Some(utc(10, 6, 0)));
    }

    #[tokio::test]
    async fn test_new_batch_rearms_the_monitor() {
        let mut h = harness(utc(10, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(10, 6, 0));
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));

        // Next night's batch starts and is still running before its deadline
        h.clock.set(utc(11, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(11, 2, 0));
        assert!(!h.monitor.poll_once().await.is_violation());
        assert_eq!(h.monitor.state(), &MonitorState::Ok);

        // ...and misses it
        h.clock.set(utc(11, 5, 30));
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));
        assert!(matches!(
            h.monitor.poll_once().await,
            PollOutcome::AlreadyAlerted(_)
        ));

        assert_eq!(sent(&h), 2);
    }

    #[tokio::test]
    async fn test_late_completion_clears_state_without_realerting() {
        let mut h = harness(utc(10, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(10, 6, 0));
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));

        h.clock.set(utc(10, 7, 0));
        h.tracker.record_batch_end().unwrap();

        assert!(matches!(
            h.monitor.poll_once().await,
            PollOutcome::AlreadyAlerted(_)
        ));
        assert_eq!(h.monitor.state(), &MonitorState::Ok);
        assert_eq!(sent(&h), 1);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried_next_poll() {
        let mut h = harness(utc(10, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(10, 6, 0));
        let transport = h.mailer.mock_transport().unwrap().clone();

        transport.set_failing(true);
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertFailed(_)));
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertFailed(_)));
        assert_eq!(h.monitor.state(), &MonitorState::Ok);
        assert!(h.monitor.last_alert().is_none());

        transport.set_failing(false);
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));
        assert_eq!(sent(&h), 1);
    }

    #[tokio::test]
    async fn test_missing_batch_alerts_once_per_deadline() {
        let mut h = harness(utc(10, 6, 0));

        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));
        assert!(matches!(
            h.monitor.poll_once().await,
            PollOutcome::AlreadyAlerted(_)
        ));

        h.clock.set(utc(11, 6, 0));
        assert!(matches!(h.monitor.poll_once().await, PollOutcome::AlertSent(_)));

        assert_eq!(sent(&h), 2);
    }

    #[tokio::test]
    async fn test_unreadable_record_is_treated_as_violation() {
        let mut h = harness(utc(10, 6, 0));
        fs::write(h.tracker.store().path(), "not json").unwrap();

        let outcome = h.monitor.poll_once().await;

        assert_eq!(
            outcome,
            PollOutcome::AlertSent(AlertKey {
                batch_id: None,
                deadline: utc(10, 5, 0),
            })
        );
        let message = String::from_utf8(h.mailer.messages().unwrap()[0].formatted()).unwrap();
        assert!(message.contains("could not be read"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_polls_until_shutdown() {
        let h = harness(utc(10, 0, 0));
        h.tracker.record_batch_start().unwrap();
        h.clock.set(utc(10, 6, 0));
        let mailer = h.mailer.clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(h.monitor.run(shutdown_rx));
        tokio::time::sleep(Duration::from_secs(3 * 300 + 1)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(mailer.messages().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_sender_is_dropped() {
        let h = harness(utc(10, 0, 0));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(h.monitor.run(shutdown_rx));
        drop(shutdown_tx);

        handle.await.unwrap();
    }
}
