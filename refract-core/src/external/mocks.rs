// refract-core/src/external/mocks.rs

// --- Mocking Infrastructure (for testing) ---

// Compiled for unit tests and when the "test-mocks" feature is enabled.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log;

use super::command::ToolCommand;
use super::runner::{CommandRunner, ProcessOutput, RunOptions};
use crate::error::{CoreError, CoreResult};

/// Filesystem effect a matched expectation performs before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEffect {
    None,
    /// Writes a placeholder at the command's output location: the value of
    /// `-o` if present, otherwise the last argument. A `%08d` pattern becomes
    /// frame 1; an existing directory receives `00000001.png`.
    TouchOutput,
}

/// Represents an expected command call and its mock result.
pub struct MockExpectation {
    pub arg_pattern: String,
    pub result: CoreResult<ProcessOutput>,
    pub effect: MockEffect,
}

/// Mock implementation of CommandRunner supporting multiple expectations.
///
/// Each expectation matches the first call whose program or any argument
/// contains its pattern and is consumed by that call. A call with no
/// matching expectation fails as if the tool were not installed.
#[derive(Clone, Default)]
pub struct MockRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    received_calls: Arc<Mutex<Vec<ToolCommand>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockRunner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_expectation(
        &self,
        arg_pattern: &str,
        result: CoreResult<ProcessOutput>,
        effect: MockEffect,
    ) {
        lock(&self.expectations).push(MockExpectation {
            arg_pattern: arg_pattern.to_string(),
            result,
            effect,
        });
    }

    pub fn add_success(&self, arg_pattern: &str, lines: &[&str]) {
        self.add_expectation(arg_pattern, Ok(output(true, 0, lines)), MockEffect::None);
    }

    /// Succeeds and writes a placeholder output (see `MockEffect::TouchOutput`).
    pub fn add_success_with_output(&self, arg_pattern: &str, lines: &[&str]) {
        self.add_expectation(
            arg_pattern,
            Ok(output(true, 0, lines)),
            MockEffect::TouchOutput,
        );
    }

    pub fn add_exit_failure(&self, arg_pattern: &str, exit_code: i32, lines: &[&str]) {
        self.add_expectation(
            arg_pattern,
            Ok(output(false, exit_code, lines)),
            MockEffect::None,
        );
    }

    pub fn add_error(&self, arg_pattern: &str, error: CoreError) {
        self.add_expectation(arg_pattern, Err(error), MockEffect::None);
    }

    /// Arguments of every call received, in order.
    pub fn received_calls(&self) -> Vec<Vec<String>> {
        lock(&self.received_calls)
            .iter()
            .map(ToolCommand::args_lossy)
            .collect()
    }

    /// Every command received, in order.
    pub fn received_commands(&self) -> Vec<ToolCommand> {
        lock(&self.received_calls).clone()
    }

    /// Expectations that were never matched.
    pub fn pending_patterns(&self) -> Vec<String> {
        lock(&self.expectations)
            .iter()
            .map(|exp| exp.arg_pattern.clone())
            .collect()
    }
}

fn output(success: bool, exit_code: i32, lines: &[&str]) -> ProcessOutput {
    ProcessOutput {
        success,
        exit_code,
        diagnostic_lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

impl CommandRunner for MockRunner {
    fn run_with_observer(
        &self,
        command: &ToolCommand,
        _options: &RunOptions,
        observer: &mut dyn FnMut(&str),
    ) -> CoreResult<ProcessOutput> {
        let args = command.args_lossy();
        let program = command.program.to_string_lossy().into_owned();
        lock(&self.received_calls).push(command.clone());

        let expectation = {
            let mut expectations = lock(&self.expectations);
            let found_index = expectations.iter().position(|exp| {
                program.contains(&exp.arg_pattern)
                    || args.iter().any(|arg| arg.contains(&exp.arg_pattern))
            });
            found_index.map(|index| expectations.remove(index))
        };

        let Some(expectation) = expectation else {
            log::warn!("MockRunner: no expectation matched {command}");
            return Err(CoreError::DependencyNotFound(command.name()));
        };
        log::info!(
            "MockRunner: Matched expectation with pattern '{}'",
            expectation.arg_pattern
        );

        let result = expectation.result?;
        if expectation.effect == MockEffect::TouchOutput {
            touch_output(&args);
        }
        for line in &result.diagnostic_lines {
            observer(line);
        }
        Ok(result)
    }
}

fn touch_output(args: &[String]) {
    let target = args
        .iter()
        .position(|a| a == "-o")
        .and_then(|i| args.get(i + 1))
        .or_else(|| args.last());
    let Some(target) = target else {
        log::warn!("MockRunner couldn't find an output path in args");
        return;
    };

    let target = PathBuf::from(target.replace("%08d", "00000001"));
    let path = if target.is_dir() {
        target.join("00000001.png")
    } else {
        target
    };
    if let Err(e) = write_placeholder(&path) {
        log::error!("MockRunner failed to create {}: {e}", path.display());
    }
}

fn write_placeholder(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"mock output")
}
