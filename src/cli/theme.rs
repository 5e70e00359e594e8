//! Terminal styling for command output. Plain text when `NO_COLOR` is set or
//! stdout is not a terminal.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::{StyledContent, Stylize};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Detect color support. Call once before printing anything styled.
pub fn init() {
    let enabled = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn paint(text: &str, style: fn(&str) -> StyledContent<&str>) -> String {
    if COLORS_ENABLED.load(Ordering::Relaxed) {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Skipped records and fatal errors.
pub fn error(text: &str) -> String {
    paint(text, |t| t.red())
}

pub fn warning(text: &str) -> String {
    paint(text, |t| t.yellow())
}

pub fn success(text: &str) -> String {
    paint(text, |t| t.green())
}

/// Transfer names.
pub fn title(text: &str) -> String {
    paint(text, |t| t.white())
}

/// Content types.
pub fn label(text: &str) -> String {
    paint(text, |t| t.yellow())
}

/// Counts and relation names.
pub fn meta(text: &str) -> String {
    paint(text, |t| t.cyan())
}

pub fn prompt(text: &str) -> String {
    paint(text, |t| t.blue().bold())
}

/// Paths and captions.
pub fn dim(text: &str) -> String {
    paint(text, |t| t.dark_grey())
}

pub fn header(text: &str) -> String {
    paint(text, |t| t.bold())
}
