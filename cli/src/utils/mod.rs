//! Terminal output for the `editbridge` commands.
//!
//! Status lines go to stdout except errors, which go to stderr so that
//! `editbridge call` output stays pipeable.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;

const SPINNER_TICKS: &str = "◐◓◑◒ ";
const SPINNER_TEMPLATE: &str = "{spinner:.cyan} {msg} {elapsed:.dim}";

/// Spinner shown while waiting on the bridge.
pub fn create_spinner(message: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_TICKS);

    let pb = ProgressBar::new_spinner();
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "→".cyan(), message);
}

/// Print a bridge result as indented JSON; strings are printed bare.
pub fn print_result(result: &Value) {
    match result {
        Value::String(text) => println!("{text}"),
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

/// Round-trip latency, in milliseconds below ten seconds.
pub fn format_latency(latency: Duration) -> String {
    if latency < Duration::from_secs(10) {
        format!("{:.1} ms", latency.as_secs_f64() * 1000.0)
    } else {
        format!("{:.2} s", latency.as_secs_f64())
    }
}
