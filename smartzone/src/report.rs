use colored::Colorize;

use crate::validate::{render_validation_text, RunFailure, ValidationReport};

/// Render a validation report for terminal output.
pub fn render_report(report: &ValidationReport) -> String {
    let raw = render_validation_text(report);
    let mut out = Vec::new();
    let mut section = "";

    for line in raw.lines() {
        if !line.starts_with("- ") {
            section = line.split_whitespace().next().unwrap_or("");
        }
        let colored = match section {
            "check" => line.bold().to_string(),
            "result" if report.is_clean() && report.complete => line.green().to_string(),
            "result" => line.red().to_string(),
            "violations" if line.starts_with("- ") && line != "- none" => line.red().to_string(),
            "warnings" => line.yellow().to_string(),
            _ => line.to_string(),
        };
        out.push(colored);
    }

    out.join("\n")
}

/// One-line summary of an aborted run.
pub fn render_failure(failure: &RunFailure) -> String {
    format!(
        "incomplete stage={} error={}",
        failure.stage, failure.error
    )
    .magenta()
    .to_string()
}

/// Render apply-mode commands, one per line.
pub fn render_commands(commands: &[String]) -> String {
    let mut out = String::new();
    for command in commands {
        out.push_str(command);
        out.push('\n');
        if command == "exit" || command == "device-alias commit" {
            out.push('\n');
        }
    }
    out
}
