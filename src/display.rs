//! Colored CLI display utilities for scenario output.
//!
//! This module provides functions for printing colored, formatted
//! pass/fail feedback to the terminal while scenarios run.

use std::io::{self, Write};

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::scenario::{ScenarioReport, Step, StepReport, StepStatus};
use crate::session::SessionStats;
use crate::tools::{ToolDescriptor, ToolsetListing};

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Maximum length for truncated display strings.
const DEFAULT_MAX_LEN: usize = 120;

/// Truncate a string to a maximum number of characters, adding ellipsis if truncated.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

/// One-line description of a failed or passed step status.
#[must_use]
pub fn describe_status(status: &StepStatus) -> String {
    match status {
        StepStatus::Passed { detail: Some(detail) } => detail.clone(),
        StepStatus::Passed { detail: None } => "ok".to_string(),
        StepStatus::Timeout { timeout_ms } => format!("no response within {timeout_ms}ms"),
        StepStatus::ParseError { line, reason } => {
            format!("malformed response ({reason}): {}", truncate(line, DEFAULT_MAX_LEN))
        }
        StepStatus::RemoteError(err) => format!("server error: {err}"),
        StepStatus::Unexpected(reason) => format!("unexpected result: {reason}"),
        StepStatus::TransportFailure(reason) => format!("server lost: {reason}"),
    }
}

/// Print the scenario header.
pub fn print_scenario_start(name: &str, description: &str, steps: usize) {
    println!(
        "{} {} {} ({} steps) {}",
        timestamp().dimmed(),
        "[SCENARIO]".blue().bold(),
        name.cyan(),
        steps,
        description.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a step about to run.
pub fn print_step_start(index: usize, step: &Step) {
    println!(
        "{} {} {}. {}",
        timestamp().dimmed(),
        "[STEP]".blue().bold(),
        index + 1,
        step.label
    );
    let _ = io::stdout().flush();
}

/// Print the outcome of a step.
pub fn print_step_result(report: &StepReport) {
    let ts = timestamp();
    let elapsed = format!("{}ms", report.elapsed.as_millis());
    let message = describe_status(&report.status);
    let tag = match &report.status {
        StepStatus::Passed { .. } => "[PASS]".green().bold().to_string(),
        StepStatus::Timeout { .. } => "[TIMEOUT]".yellow().bold().to_string(),
        StepStatus::TransportFailure(_) => "[SERVER]".red().bold().to_string(),
        _ => "[FAIL]".red().bold().to_string(),
    };
    println!(
        "{} {} {} - {} {}",
        ts.dimmed(),
        tag,
        report.label,
        message,
        elapsed.dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print the scenario summary.
pub fn print_scenario_summary(report: &ScenarioReport) {
    let ts = timestamp();
    let counts = format!(
        "{} passed, {} failed, {} skipped",
        report.passed(),
        report.failed(),
        report.skipped
    );
    if report.is_success() {
        println!(
            "{} {} {} {}",
            ts.dimmed(),
            "[SCENARIO]".green().bold(),
            report.name.cyan(),
            counts
        );
    } else {
        println!(
            "{} {} {} {}",
            ts.dimmed(),
            "[SCENARIO]".red().bold(),
            report.name.cyan(),
            counts.red()
        );
    }
    let _ = io::stdout().flush();
}

/// Print session exchange statistics.
pub fn print_session_stats(stats: &SessionStats) {
    println!(
        "{} {} {} exchanges: {} ok, {} server errors, {} timeouts, {} malformed",
        timestamp().dimmed(),
        "[SESSION]".blue().bold(),
        stats.total(),
        stats.successes,
        stats.remote_errors,
        stats.timeouts,
        stats.parse_errors
    );
    let _ = io::stdout().flush();
}

/// Print a tool listing.
pub fn print_tools(tools: &[ToolDescriptor]) {
    println!("{} {} tools", "[TOOLS]".cyan().bold(), tools.len());
    for tool in tools {
        println!(
            "  - {}: {}",
            tool.name.bold(),
            truncate(tool.description.as_deref().unwrap_or("No description"), DEFAULT_MAX_LEN)
                .dimmed()
        );
    }
    let _ = io::stdout().flush();
}

/// Print each toolset with its status and tools.
pub fn print_toolsets(listings: &[ToolsetListing]) {
    println!("{} {} toolsets", "[TOOLSETS]".cyan().bold(), listings.len());
    for listing in listings {
        let toolset = &listing.toolset;
        let status = if toolset.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".dimmed().to_string()
        };
        println!(
            "  - {} [{}]: {}",
            toolset.name.bold(),
            status,
            toolset.description.as_deref().unwrap_or("No description").dimmed()
        );
        match &listing.tools {
            Ok(tools) => {
                for tool in tools {
                    println!(
                        "      - {}: {}",
                        tool.name,
                        truncate(
                            tool.description.as_deref().unwrap_or("No description"),
                            DEFAULT_MAX_LEN
                        )
                        .dimmed()
                    );
                }
            }
            Err(reason) => println!("      {} {}", "[FAIL]".red().bold(), reason),
        }
    }
    let _ = io::stdout().flush();
}

/// Print a decoded tool payload.
pub fn print_payload(payload: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    println!("{} {}", "[RESULT]".green().bold(), pretty);
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}
