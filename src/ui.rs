//! UI utilities for consistent terminal output formatting.
//!
//! Provides shared formatting functions for error messages and the
//! verification progress indicator. Everything here writes to stderr.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Width of error box separators.
const ERROR_BOX_WIDTH: usize = 60;

/// Print an error box with a title and optional detail text.
///
/// Outputs:
/// ```text
/// ============================================================
/// Verification Failed
/// ============================================================
///
/// <details>
/// ```
pub fn print_error_box(title: &str, details: Option<&str>) {
    eprintln!("\n{}", "=".repeat(ERROR_BOX_WIDTH));
    eprintln!("{title}");
    eprintln!("{}", "=".repeat(ERROR_BOX_WIDTH));

    if let Some(details) = details
        && !details.is_empty()
    {
        eprintln!("\n{details}");
    }
}

/// Print an error box with troubleshooting hints.
pub fn print_error_box_with_hints(title: &str, details: Option<&str>, hints: &[&str]) {
    print_error_box(title, details);

    if !hints.is_empty() {
        eprintln!("\n{}", "=".repeat(ERROR_BOX_WIDTH));
        eprintln!("Common Issues:");
        eprintln!("{}", "=".repeat(ERROR_BOX_WIDTH));

        for (i, hint) in hints.iter().enumerate() {
            eprintln!("\n{}. {hint}", i + 1);
        }
        eprintln!();
    }
}

/// Spinner shown while a long gateway operation runs.
///
/// Draws to stderr and stays hidden when stderr is not a terminal.
pub fn spinner(message: impl Into<String>) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    let style = ProgressStyle::with_template("{spinner} {msg} [{elapsed}] {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
