use std::{fmt::Write as _, process::ExitCode};

use chrono::{DateTime, Utc};

use crate::{
    alerts::format_elapsed,
    app::App,
    commands::tracker_failure,
    tracker::{deadline::Deadline, record::BatchStatus},
};

pub fn handle_status_command(app: &App) -> ExitCode {
    let deadline = match app.deadline() {
        Ok(deadline) => deadline,
        Err(e) => return tracker_failure(&e),
    };

    match app.tracker.get_batch_status() {
        Ok(status) => {
            print!("{}", render_status(&status, &deadline, app.clock.now()));
            ExitCode::SUCCESS
        }
        Err(e) => tracker_failure(&e),
    }
}

#[must_use]
pub fn render_status(status: &BatchStatus, deadline: &Deadline, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let Some(batch_id) = &status.batch_id else {
        out.push_str("📭 No batch has been recorded\n");
        return out;
    };

    let _ = writeln!(out, "📦 Batch {batch_id}");
    let _ = writeln!(out, "  Status:  {}", status.lifecycle(now, deadline));
    if let Some(start) = status.start_time {
        let _ = writeln!(out, "  Started: {}", start.to_rfc3339());
    }
    match status.end_time {
        Some(end) => {
            let _ = writeln!(out, "  Ended:   {}", end.to_rfc3339());
        }
        None => out.push_str("  Ended:   not yet\n"),
    }
    if let Some(elapsed) = status.elapsed(now) {
        let _ = writeln!(out, "  Elapsed: {}", format_elapsed(elapsed));
    }

    if !status.stage_progress.is_empty() {
        out.push_str("  Stages:\n");
        for (stage, percentage) in &status.stage_progress {
            let _ = writeln!(out, "    {:<12} {percentage:>3}%", stage.to_string());
        }
    }
    let _ = writeln!(out, "  Overall: {:.1}%", status.overall_percentage);

    out
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::tests::setup_test;

    fn utc(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, mi, 0).unwrap()
    }

    #[test]
    fn test_renders_empty_store() {
        let test = setup_test(utc(6, 0));
        let status = test.tracker().get_batch_status().unwrap();
        let deadline = test.app.deadline().unwrap();

        assert_eq!(
            render_status(&status, &deadline, utc(6, 0)),
            "📭 No batch has been recorded\n"
        );
    }

    #[test]
    fn test_renders_overdue_batch() {
        let test = setup_test(utc(0, 0));
        let record = test.tracker().record_batch_start().unwrap();
        test.tracker()
            .record_batch_stage_completion("scrape", 40)
            .unwrap();
        test.tracker()
            .record_batch_stage_completion("email", 100)
            .unwrap();
        test.clock.set(utc(6, 0));

        let status = test.tracker().get_batch_status().unwrap();
        let rendered = render_status(&status, &test.app.deadline().unwrap(), utc(6, 0));

        assert!(rendered.contains(&record.batch_id));
        assert!(rendered.contains("Status:  overdue"));
        assert!(rendered.contains("Ended:   not yet"));
        assert!(rendered.contains("Elapsed: 6h00m"));
        assert!(rendered.contains("scrape        40%"));
        assert!(rendered.contains("Overall: 70.0%"));
    }

    #[test]
    fn test_status_command_succeeds_without_batch() {
        let test = setup_test(utc(6, 0));
        assert_eq!(handle_status_command(&test.app), ExitCode::SUCCESS);
    }
}
