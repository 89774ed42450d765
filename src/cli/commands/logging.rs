//! `-v` / `MARKETPLACE_LOG_LEVEL` handling.
//!
//! Both forms resolve to the same count: `0` is `error`, `4` is `trace`.

use clap::{builder::ValueParser, Arg, ArgAction, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ENV_LOG_LEVEL: &str = "MARKETPLACE_LOG_LEVEL";

/// Level names in verbosity order.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Resolves a level name (case-insensitive) or a numeric count to a verbosity count.
fn parse_log_level(level: &str) -> Result<u8, String> {
    let level = level.trim();
    if let Ok(count) = level.parse::<u8>() {
        return if usize::from(count) < LEVELS.len() {
            Ok(count)
        } else {
            Err(format!("log level count must be below {}", LEVELS.len()))
        };
    }
    LEVELS
        .iter()
        .position(|name| name.eq_ignore_ascii_case(level))
        .and_then(|index| u8::try_from(index).ok())
        .ok_or_else(|| format!("unknown log level '{level}', expected one of {}", LEVELS.join(", ")))
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(parse_log_level)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat for more (-v warn .. -vvvv trace); default is errors only")
            .long_help(
                "Log verbosity. Each -v raises the level by one step: warn, info, debug, trace. \
                 MARKETPLACE_LOG_LEVEL accepts the level name or its count (0-4). \
                 RUST_LOG, when set, takes precedence.",
            )
            .env(ENV_LOG_LEVEL)
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
