//! Tracing setup shared by the binary and the tests.

use std::str::FromStr;

use tracing::Level;

/// Map a configured level name onto a tracing level. Unknown names mean `INFO`.
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "warning" => Level::WARN,
        other => Level::from_str(other).unwrap_or(Level::INFO),
    }
}

/// Install the global `fmt` subscriber and return the level it was asked for.
///
/// Logs go to stderr; stdout carries routed messages. Only the first call
/// installs anything, later calls are no-ops.
pub fn init(level: &str) -> Level {
    let level = parse_level(level);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .try_init();
    level
}
