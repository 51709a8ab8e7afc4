use std::process::ExitCode;

use tokio::sync::watch;
use tracing::{error, info};

use crate::{
    app::App,
    commands::{EXIT_ERROR, EXIT_VIOLATION},
    monitor::PollOutcome,
};

/// Run one monitor cycle, alerting if a new violation is found.
pub async fn handle_monitor_once_command(app: &App) -> ExitCode {
    let mut monitor = match app.monitor() {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("❌ {e}");
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let outcome = monitor.poll_once().await;
    println!("{}", outcome_line(&outcome));

    if outcome.is_violation() {
        ExitCode::from(EXIT_VIOLATION)
    } else {
        ExitCode::SUCCESS
    }
}

/// Run the monitor until Ctrl-C or SIGTERM.
pub async fn handle_monitor_command(app: &App) -> ExitCode {
    let monitor = match app.monitor() {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("❌ Failed to start monitor: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    monitor.run(shutdown_rx).await;
    ExitCode::SUCCESS
}

#[must_use]
pub fn outcome_line(outcome: &PollOutcome) -> String {
    match outcome {
        PollOutcome::Compliant(check) => format!("✅ OK: {}", check.outcome.label()),
        PollOutcome::AlertSent(key) => format!(
            "🚨 VIOLATION: alert sent for batch {} (deadline {})",
            key.batch_id.as_deref().unwrap_or("none"),
            key.deadline.to_rfc3339()
        ),
        PollOutcome::AlreadyAlerted(key) => format!(
            "❌ VIOLATION: already alerted for batch {} (deadline {})",
            key.batch_id.as_deref().unwrap_or("none"),
            key.deadline.to_rfc3339()
        ),
        PollOutcome::AlertFailed(key) => format!(
            "❌ VIOLATION: alert delivery failed for batch {} (deadline {})",
            key.batch_id.as_deref().unwrap_or("none"),
            key.deadline.to_rfc3339()
        ),
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
