//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use std::time::Duration;

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::store::paths::SECRET_SUFFIX;
use crate::sync::StatusEntry;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print the recovery phrase inside a warning banner.
pub fn recovery_phrase(phrase: &str) {
    println!();
    println!("{}", style("RECOVERY PHRASE (shown only once)").yellow().bold());
    println!();
    for (i, word) in phrase.split_whitespace().enumerate() {
        println!("  {:>2}. {}", i + 1, word);
    }
    println!();
    println!(
        "{}",
        style("Write it down and keep it offline. Without it, a cloned store cannot be opened.").yellow()
    );
    println!();
}

/// Print uncommitted store changes as a table.
pub fn print_changes(changes: &[StatusEntry]) {
    if changes.is_empty() {
        info("Working tree clean, nothing to commit.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Change", "Path"]);

    for change in changes {
        let display = change.path.strip_suffix(SECRET_SUFFIX).unwrap_or(&change.path);
        table.add_row(vec![change.kind.to_string(), display.to_string()]);
    }

    println!("{table}");
}

/// Format a duration as `4m 59s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match (secs / 60, secs % 60) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}
