use std::{path::PathBuf, time::Duration};

use chrono_tz::Tz;
use lettre::message::Mailbox;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config_rs::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    pub monitor: MonitorConfig,
    pub email: EmailConfig,
}

impl Config {
    /// Checks the values serde cannot express on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.deadline_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "monitor.deadline_hour must be between 0 and 23, got {}",
                self.monitor.deadline_hour
            )));
        }

        if self.monitor.poll_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "monitor.poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.alert_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "monitor.alert_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmailConfig {
    /// Mock mailer that captures emails for testing
    Mock,
    /// Real SMTP configuration for sending emails
    Smtp {
        host: String,
        port: u16,
        #[serde(deserialize_with = "deserialize_mailbox")]
        sender: Mailbox,
        username: Option<String>,
        password: Option<String>,
        #[serde(default = "default_use_tls")]
        use_tls: bool,
    },
}

fn deserialize_mailbox<'de, D>(deserializer: D) -> Result<Mailbox, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn deserialize_timezone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse::<Tz>().map_err(serde::de::Error::custom)
}

fn default_use_tls() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub log_level: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Location of the persisted batch record
    #[serde(default = "default_tracker_path")]
    pub path: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            path: default_tracker_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Wall-clock hour (0-23) by which the batch must have completed
    #[serde(default = "default_deadline_hour")]
    pub deadline_hour: u32,
    /// IANA timezone the deadline hour is interpreted in
    #[serde(
        default = "default_timezone",
        deserialize_with = "deserialize_timezone"
    )]
    pub timezone: Tz,
    /// Seconds between two completion checks (default: 300)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Upper bound for a single alert delivery in seconds (default: 30)
    #[serde(default = "default_alert_timeout")]
    pub alert_timeout_seconds: u64,
    #[serde(deserialize_with = "deserialize_mailbox")]
    pub alert_recipient: Mailbox,
}

impl MonitorConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    #[must_use]
    pub const fn alert_timeout(&self) -> Duration {
        Duration::from_secs(self.alert_timeout_seconds)
    }
}

fn default_tracker_path() -> PathBuf {
    PathBuf::from("data/batch.json")
}

const fn default_deadline_hour() -> u32 {
    5
}

const fn default_timezone() -> Tz {
    Tz::UTC
}

const fn default_poll_interval() -> u64 {
    300 // 5 minutes
}

const fn default_alert_timeout() -> u64 {
    30
}
