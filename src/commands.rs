pub mod check;
pub mod end;
pub mod monitor;
pub mod stage;
pub mod start;
pub mod status;
pub mod version;

use std::process::ExitCode;

use crate::tracker::TrackerError;

/// Exit code for a missed deadline or missing batch data
pub const EXIT_VIOLATION: u8 = 1;
/// Exit code for configuration, storage and argument errors
pub const EXIT_ERROR: u8 = 2;

/// Report a tracker failure on stderr and map it to an exit code.
pub(crate) fn tracker_failure(error: &TrackerError) -> ExitCode {
    eprintln!("❌ {error}");
    ExitCode::from(EXIT_ERROR)
}
