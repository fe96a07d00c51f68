//! `tools`: availability and resolved location of each external tool.

use refract_core::{CommandRunner, MediaEngine};
use serde_json::json;

use crate::output::CommandReport;

/// Always succeeds; a missing tool is reported, not treated as an error.
pub fn run_tools<R: CommandRunner>(engine: &MediaEngine<R>) -> CommandReport {
    let tools = engine.tool_report();
    let available = tools.iter().filter(|t| t.available).count();

    let mut report = CommandReport::ok(format!("{available} of {} tools available", tools.len()));
    for tool in &tools {
        let status = if tool.available { "ok" } else { "unavailable" };
        let location = tool
            .path
            .as_ref()
            .map_or_else(|| tool.configured.display().to_string(), |p| p.display().to_string());
        report = report.detail(tool.name.clone(), format!("{status:<12}{location}"));
    }
    report.with_data(json!({ "tools": tools }))
}
