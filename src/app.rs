use lettre::message::Mailbox;
use thiserror::Error;

use crate::{
    alerts::{AlertNotifier, NotifyError},
    clock::Clock,
    config::{Config, ConfigError, EmailConfig},
    environment::Environment,
    mailer::Mailer,
    metrics::Metrics,
    monitor::CompletionMonitor,
    tracker::{deadline::Deadline, store::BatchStore, BatchTracker, TrackerError},
};

/// Sender used when the mock mailer is configured
const MOCK_SENDER: &str = "batchwatch@localhost";

#[derive(Clone, Debug)]
pub struct App {
    pub config: Config,
    pub environment: Environment,
    pub tracker: BatchTracker,
    pub notifier: AlertNotifier,
    pub metrics: Metrics,
    pub clock: Clock,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

impl App {
    pub fn new(
        config: Config,
        environment: Environment,
        mailer: Mailer,
        clock: Clock,
        metrics: Metrics,
    ) -> Result<Self, AppError> {
        let sender = alert_sender(&config.email)?;

        let tracker = BatchTracker::new(
            BatchStore::new(config.tracker.path.clone()),
            clock.clone(),
            metrics.clone(),
        );

        let notifier = AlertNotifier::new(
            mailer,
            sender,
            config.monitor.alert_recipient.clone(),
            config.monitor.alert_timeout(),
        );

        Ok(Self {
            config,
            environment,
            tracker,
            notifier,
            metrics,
            clock,
        })
    }

    /// Build the app for production use: real mailer, system clock
    pub fn from_config(config: Config, environment: Environment) -> Result<Self, AppError> {
        let mailer = Mailer::from_config(&config.email)?;
        Self::new(config, environment, mailer, Clock::System, Metrics::Tracing)
    }

    pub fn deadline(&self) -> Result<Deadline, TrackerError> {
        Deadline::new(self.config.monitor.deadline_hour, self.config.monitor.timezone)
    }

    pub fn monitor(&self) -> Result<CompletionMonitor, AppError> {
        Ok(CompletionMonitor::new(
            self.tracker.clone(),
            self.deadline()?,
            self.notifier.clone(),
            self.metrics.clone(),
            self.config.monitor.poll_interval(),
        ))
    }
}

fn alert_sender(email: &EmailConfig) -> Result<Mailbox, ConfigError> {
    match email {
        EmailConfig::Smtp { sender, .. } => Ok(sender.clone()),
        EmailConfig::Mock => MOCK_SENDER
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("invalid mock sender: {e}"))),
    }
}
