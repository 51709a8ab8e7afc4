use std::process::ExitCode;

use crate::{app::App, commands::tracker_failure};

pub fn handle_start_command(app: &App) -> ExitCode {
    match app.tracker.record_batch_start() {
        Ok(record) => {
            println!("{}", record.batch_id);
            ExitCode::SUCCESS
        }
        Err(e) => tracker_failure(&e),
    }
}
