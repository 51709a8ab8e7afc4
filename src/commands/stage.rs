use std::process::ExitCode;

use crate::{app::App, commands::tracker_failure};

pub fn handle_stage_command(app: &App, stage: &str, percentage: i64) -> ExitCode {
    match app.tracker.record_batch_stage_completion(stage, percentage) {
        Ok(stored) => {
            println!("{stage}: {stored}%");
            ExitCode::SUCCESS
        }
        Err(e) => tracker_failure(&e),
    }
}
