//! User-facing messages on stderr
//!
//! Short, colored messages for warnings, notices and errors without logging
//! noise (timestamps, log levels, crate names). stdout stays reserved for
//! rendered results.

use crossterm::tty::IsTty;
use owo_colors::OwoColorize;
use std::io;

/// Whether stderr should get colors
///
/// Off when stderr is not a terminal or `NO_COLOR` is set.
pub fn stderr_supports_color() -> bool {
    io::stderr().is_tty() && std::env::var_os("NO_COLOR").is_none()
}

/// Display a warning in yellow
///
/// # Example
/// ```ignore
/// output::warn("tool gh not found - install it to enable this check", true);
/// ```
pub fn warn(message: &str, color: bool) {
    if color {
        eprintln!("{}", message.yellow());
    } else {
        eprintln!("{}", message);
    }
}

/// Display an error in red with padding
///
/// Format: blank line + red message + blank line
pub fn error(message: &str, color: bool) {
    if color {
        eprintln!("\n{}\n", message.red());
    } else {
        eprintln!("{}", message);
    }
}
