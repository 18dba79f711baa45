//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Style};
use std::fmt::Display;

/// Check mark used for completed steps
pub const CHECK: &str = "✓";

/// Warning marker
pub const WARN: &str = "!";

/// Semantic styles for CLI output
pub trait Stylize: Display + Sized {
    /// Bold
    fn emphasis(&self) -> String {
        self.style(Style::new().bold()).to_string()
    }

    /// Names the user cares about (repos, branches, PR numbers)
    fn accent(&self) -> String {
        self.style(Style::new().cyan()).to_string()
    }

    /// Secondary detail
    fn muted(&self) -> String {
        self.style(Style::new().dimmed()).to_string()
    }

    /// Successful outcome
    fn success(&self) -> String {
        self.style(Style::new().green()).to_string()
    }

    /// Non-fatal problem
    fn warn(&self) -> String {
        self.style(Style::new().yellow()).to_string()
    }
}

impl<T: Display> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Dimmed arrow for list items
pub fn arrow() -> String {
    "→".muted()
}

/// Spinner style for remote waits
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
