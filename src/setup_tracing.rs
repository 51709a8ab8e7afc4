use time::format_description::parse;
use tracing_subscriber::fmt::time::OffsetTime;

use crate::cli::Commands;

const TIMESTAMP_FORMAT: &str = "[hour]:[minute]:[second].[subsecond digits:2]";

/// Default filter for a command when `RUST_LOG` is not set.
///
/// One-shot commands stay quiet so their output is just the result line; the
/// long-running monitor uses the configured level.
#[must_use]
pub fn default_level<'a>(command: &Option<Commands>, service_log_level: &'a str) -> &'a str {
    match command {
        Some(
            Commands::Start
            | Commands::Stage { .. }
            | Commands::End
            | Commands::Status
            | Commands::Check
            | Commands::Monitor { once: true },
        ) => "warn",
        Some(Commands::Version) => "error",
        Some(Commands::Monitor { once: false }) | None => service_log_level,
    }
}

pub fn setup_tracing_for_command(command: &Option<Commands>, service_log_level: &str) {
    let default_level = default_level(command, service_log_level);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    let timer_format = parse(TIMESTAMP_FORMAT).unwrap_or_default();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr) // Keep stdout for command output
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .with_timer(OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
            timer_format,
        ))
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_shot_commands_are_quiet() {
        assert_eq!(default_level(&Some(Commands::Check), "debug"), "warn");
        assert_eq!(
            default_level(&Some(Commands::Monitor { once: true }), "debug"),
            "warn"
        );
        assert_eq!(default_level(&Some(Commands::Version), "debug"), "error");
    }

    #[test]
    fn test_service_mode_uses_configured_level() {
        assert_eq!(
            default_level(&Some(Commands::Monitor { once: false }), "debug"),
            "debug"
        );
        assert_eq!(default_level(&None, "info"), "info");
    }
}
