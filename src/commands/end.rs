use std::process::ExitCode;

use crate::{app::App, commands::tracker_failure};

pub fn handle_end_command(app: &App) -> ExitCode {
    match app.tracker.record_batch_end() {
        Ok(record) => {
            if let Some(end_time) = record.end_time {
                println!("{} ended at {}", record.batch_id, end_time.to_rfc3339());
            }
            ExitCode::SUCCESS
        }
        Err(e) => tracker_failure(&e),
    }
}
