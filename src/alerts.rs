use std::{fmt::Write as _, time::Duration};

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    Message,
};
use thiserror::Error;
use tokio::time::timeout;

use crate::{
    mailer::Mailer,
    tracker::{deadline::CompletionCheck, record::BatchStatus},
};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Failed to build alert email: {0}")]
    Builder(#[from] lettre::error::Error),
    #[error("Failed to send alert email: {0}")]
    Transport(String),
    #[error("Alert delivery timed out after {0:?}")]
    TimedOut(Duration),
}

/// A composed alert, ready to be handed to the notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl Alert {
    /// Describe a missed deadline using the current status snapshot.
    ///
    /// `status` is `None` when the batch record could not be read at all.
    #[must_use]
    pub fn missed_deadline(
        check: &CompletionCheck,
        status: Option<&BatchStatus>,
        now: DateTime<Utc>,
    ) -> Self {
        let subject = format!(
            "[batchwatch] Batch missed the {} deadline: {}",
            check.deadline.format("%Y-%m-%d %H:%M UTC"),
            check.outcome.label()
        );

        let rows = summary_rows(check, status, now);

        let mut text_body = String::new();
        for (label, value) in &rows {
            let _ = writeln!(text_body, "{label}: {value}");
        }

        let mut html_body = String::from("<h2>Batch deadline missed</h2>\n<table>\n");
        for (label, value) in &rows {
            let _ = writeln!(
                html_body,
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
                escape_html(label),
                escape_html(value)
            );
        }
        html_body.push_str("</table>\n");

        Self {
            subject,
            text_body,
            html_body,
        }
    }

    /// Describe a check that could not read the batch record.
    #[must_use]
    pub fn status_unknown(deadline: DateTime<Utc>, reason: &str) -> Self {
        let subject = format!(
            "[batchwatch] Batch status unknown at the {} deadline",
            deadline.format("%Y-%m-%d %H:%M UTC")
        );
        let text_body = format!(
            "Deadline: {}\nThe batch record could not be read: {reason}\n",
            deadline.to_rfc3339()
        );
        let html_body = format!(
            "<h2>Batch status unknown</h2>\n<p>Deadline: {}</p>\n<p>The batch record could not be read: {}</p>\n",
            deadline.to_rfc3339(),
            escape_html(reason)
        );

        Self {
            subject,
            text_body,
            html_body,
        }
    }
}

fn summary_rows(
    check: &CompletionCheck,
    status: Option<&BatchStatus>,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let mut rows = vec![
        ("Deadline".to_string(), check.deadline.to_rfc3339()),
        ("Result".to_string(), check.outcome.label().to_string()),
        (
            "Batch".to_string(),
            check.batch_id.clone().unwrap_or_else(|| "none".to_string()),
        ),
    ];

    let Some(status) = status else {
        return rows;
    };

    rows.push((
        "Started".to_string(),
        status
            .start_time
            .map_or_else(|| "never".to_string(), |t| t.to_rfc3339()),
    ));
    rows.push((
        "Ended".to_string(),
        status
            .end_time
            .map_or_else(|| "not yet".to_string(), |t| t.to_rfc3339()),
    ));
    if let Some(elapsed) = status.elapsed(now) {
        rows.push(("Elapsed".to_string(), format_elapsed(elapsed)));
    }
    for (stage, percentage) in &status.stage_progress {
        rows.push((format!("Stage {stage}"), format!("{percentage}%")));
    }
    rows.push((
        "Overall".to_string(),
        format!("{:.1}%", status.overall_percentage),
    ));

    rows
}

/// Render a duration as `XhYYm`
#[must_use]
pub fn format_elapsed(elapsed: chrono::Duration) -> String {
    let minutes = elapsed.num_minutes().max(0);
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Delivers alerts by email to the configured recipient.
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    mailer: Mailer,
    sender: Mailbox,
    recipient: Mailbox,
    timeout: Duration,
}

impl AlertNotifier {
    #[must_use]
    pub const fn new(mailer: Mailer, sender: Mailbox, recipient: Mailbox, timeout: Duration) -> Self {
        Self {
            mailer,
            sender,
            recipient,
            timeout,
        }
    }

    #[must_use]
    pub const fn mailer(&self) -> &Mailer {
        &self.mailer
    }

    /// Send a multipart (plain text + HTML) alert, bounded by the timeout.
    pub async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.sender.clone())
            .to(self.recipient.clone())
            .subject(alert.subject.clone())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(alert.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(alert.html_body.clone()),
                    ),
            )?;

        timeout(self.timeout, self.mailer.send(email))
            .await
            .map_err(|_| NotifyError::TimedOut(self.timeout))?
    }
}
