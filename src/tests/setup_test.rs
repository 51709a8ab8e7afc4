use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tempfile::TempDir;
use tracing::debug;

use crate::{
    app::App,
    clock::Clock,
    config::{Config, EmailConfig, MonitorConfig, TracingConfig, TrackerConfig},
    environment::Environment,
    mailer::Mailer,
    metrics::Metrics,
    tracker::BatchTracker,
};

static TRACING_INITIALIZED: std::sync::Once = std::sync::Once::new();

/// Initialize tracing for tests
fn init_tracing() {
    TRACING_INITIALIZED.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let _ = tracing_subscriber::registry()
            .with(EnvFilter::from_default_env())
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// Configuration used by tests: deadline 05:00 UTC, mock mailer.
#[must_use]
pub fn test_config(dir: &TempDir) -> Config {
    Config {
        tracing: TracingConfig::default(),
        tracker: TrackerConfig {
            path: dir.path().join("batch.json"),
        },
        monitor: MonitorConfig {
            deadline_hour: 5,
            timezone: Tz::UTC,
            poll_interval_seconds: 300,
            alert_timeout_seconds: 5,
            alert_recipient: "ops@example.com"
                .parse()
                .expect("valid test recipient"),
        },
        email: EmailConfig::Mock,
    }
}

/// Creates an app wired for testing.
///
/// The batch record lives in a fresh temporary directory, time is a manual
/// clock frozen at `now`, and email and metrics are captured in memory.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn setup_test(now: DateTime<Utc>) -> TestUtils {
    init_tracing();

    debug!("Setting up test at {}", now);

    let dir = TempDir::new().expect("Failed to create temporary directory");
    let config = test_config(&dir);
    let clock = Clock::manual(now);
    let mailer = Mailer::mock();
    let metrics = Metrics::mock();

    let app = App::new(
        config,
        Environment::Test,
        mailer.clone(),
        clock.clone(),
        metrics.clone(),
    )
    .expect("Failed to build test app");

    TestUtils {
        dir,
        app,
        clock,
        mailer,
        metrics,
    }
}

/// Test app plus handles on its mock collaborators.
///
/// The temporary directory is removed when this is dropped.
pub struct TestUtils {
    pub dir: TempDir,
    pub app: App,
    pub clock: Clock,
    pub mailer: Mailer,
    pub metrics: Metrics,
}

impl TestUtils {
    #[must_use]
    pub const fn tracker(&self) -> &BatchTracker {
        &self.app.tracker
    }

    /// Get sent emails from the mock mailer.
    ///
    /// Panics if called with a real SMTP mailer (should only happen in tests).
    #[must_use]
    pub fn sent_emails(&self) -> Vec<lettre::Message> {
        self.mailer
            .messages()
            .expect("Mock mailer should be used in tests")
    }

    /// Clear all sent emails from the mock mailer.
    pub fn clear_sent_emails(&self) {
        self.mailer.clear_messages();
    }
}
