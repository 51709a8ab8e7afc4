use std::process::ExitCode;

use crate::{
    app::App,
    commands::{tracker_failure, EXIT_VIOLATION},
    tracker::deadline::CompletionCheck,
};

/// Single compliance check: exit 0 when compliant, 1 on a violation or
/// missing batch data.
pub fn handle_check_command(app: &App) -> ExitCode {
    let deadline = match app.deadline() {
        Ok(deadline) => deadline,
        Err(e) => return tracker_failure(&e),
    };

    match app.tracker.check_against(&deadline) {
        Ok(check) => {
            println!("{}", status_line(&check));
            check_exit_code(&check)
        }
        Err(e) => tracker_failure(&e),
    }
}

#[must_use]
pub fn status_line(check: &CompletionCheck) -> String {
    let marker = if check.is_compliant() {
        "✅ OK"
    } else {
        "❌ VIOLATION"
    };
    let batch = check.batch_id.as_deref().unwrap_or("none");

    format!(
        "{marker}: {} (batch {batch}, deadline {})",
        check.outcome.label(),
        check.deadline.to_rfc3339()
    )
}

pub(crate) fn check_exit_code(check: &CompletionCheck) -> ExitCode {
    if check.is_compliant() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_VIOLATION)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;
    use crate::tests::setup_test;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, mi, 0).unwrap()
    }

    #[test]
    fn test_no_batch_data_fails_the_check() {
        let test = setup_test(utc(6, 0));

        assert_eq!(
            handle_check_command(&test.app),
            ExitCode::from(EXIT_VIOLATION)
        );
    }

    #[test]
    fn test_completed_batch_passes_the_check() {
        let test = setup_test(utc(0, 0));
        test.tracker().record_batch_start().unwrap();
        test.clock.set(utc(4, 30));
        test.tracker().record_batch_end().unwrap();
        test.clock.set(utc(6, 0));

        assert_eq!(handle_check_command(&test.app), ExitCode::SUCCESS);
    }

    #[test]
    fn test_check_does_not_send_alerts() {
        let test = setup_test(utc(6, 0));
        handle_check_command(&test.app);
        assert!(test.sent_emails().is_empty());
    }

    #[test]
    fn test_status_line() {
        let test = setup_test(utc(6, 0));
        let check = test
            .tracker()
            .check_against(&test.app.deadline().unwrap())
            .unwrap();

        assert_eq!(
            status_line(&check),
            "❌ VIOLATION: no batch data (batch none, deadline 2024-06-10T05:00:00+00:00)"
        );
    }
}
