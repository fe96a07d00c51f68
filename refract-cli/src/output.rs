// ============================================================================
// refract-cli/src/output.rs
// ============================================================================
//
// OUTPUT: Human and JSON presentation of command results
//
// Every subcommand produces a `CommandReport`. With `--json` the report (or
// the error) is printed to stdout as a single object carrying `success`, a
// stable `code` and the human message; otherwise it is printed as styled
// text, with errors on stderr.

use console::style;
use refract_core::CoreError;
use serde::Serialize;
use serde_json::Value;

use crate::logging::get_timestamp;

/// Diagnostic lines shown under a failed tool in human output.
const HUMAN_DIAGNOSTIC_LINES: usize = 10;

/// Outcome of one subcommand, before presentation.
#[derive(Debug, Clone)]
pub struct CommandReport {
    pub success: bool,
    /// Stable machine-readable code ("ok" on success)
    pub code: String,
    pub message: String,
    /// Label/value pairs printed under the message in human output
    pub details: Vec<(String, String)>,
    pub data: Value,
}

impl CommandReport {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "ok".to_string(),
            message: message.into(),
            details: Vec::new(),
            data: Value::Null,
        }
    }

    /// A completed run in which some items failed.
    pub fn partial(message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: "partial_failure".to_string(),
            ..Self::ok(message)
        }
    }

    #[must_use]
    pub fn detail(mut self, label: impl Into<String>, value: impl ToString) -> Self {
        self.details.push((label.into(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Structured result printed for `--json`.
#[derive(Debug, Serialize)]
pub struct JsonResult<'a> {
    pub success: bool,
    pub code: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    pub timestamp: String,
}

impl<'a> JsonResult<'a> {
    pub fn from_report(report: &'a CommandReport) -> Self {
        Self {
            success: report.success,
            code: &report.code,
            message: &report.message,
            stage: None,
            data: report.data.clone(),
            timestamp: get_timestamp(),
        }
    }

    pub fn from_error(err: &'a CoreError, message: &'a str) -> Self {
        let stage = match err {
            CoreError::Stage { stage, .. } => Some(stage.to_string()),
            _ => None,
        };
        let data = match err.root() {
            CoreError::CommandFailed {
                tool,
                exit_code,
                diagnostics,
            } => serde_json::json!({
                "tool": tool,
                "exit_code": exit_code,
                "diagnostics": diagnostics,
            }),
            _ => Value::Null,
        };
        Self {
            success: false,
            code: err.code(),
            message,
            stage,
            data,
            timestamp: get_timestamp(),
        }
    }
}

fn print_json(result: &JsonResult<'_>) {
    match serde_json::to_string_pretty(result) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to serialize result: {e}"),
    }
}

/// Prints a finished command's report.
pub fn print_report(report: &CommandReport, json: bool) {
    if json {
        print_json(&JsonResult::from_report(report));
        return;
    }

    let marker = if report.success {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };
    println!("{marker} {}", report.message);

    let width = report
        .details
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    for (label, value) in &report.details {
        println!("  {}  {value}", style(format!("{label:<width$}")).bold());
    }
}

/// Prints an error that ended the command.
pub fn print_error(err: &CoreError, json: bool) {
    let message = err.to_string();
    if json {
        print_json(&JsonResult::from_error(err, &message));
        return;
    }

    eprintln!("{} {message}", style("error:").red().bold());
    if let CoreError::CommandFailed { diagnostics, .. } = err.root() {
        let skip = diagnostics.len().saturating_sub(HUMAN_DIAGNOSTIC_LINES);
        for line in &diagnostics[skip..] {
            eprintln!("  {}", style(line).dim());
        }
    }
}
