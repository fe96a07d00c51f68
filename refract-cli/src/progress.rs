// ============================================================================
// refract-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Spinner shown while external tools run
//
// The engine runs tools synchronously and reports nothing until they finish,
// so the CLI shows an elapsed-time spinner on stderr. It stays hidden for
// `--json`, verbose runs (tool output is logged instead) and non-terminals.

use std::time::Duration;

use console::Term;
use indicatif::{ProgressBar, ProgressStyle};

const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Elapsed-time spinner for one long-running step.
#[derive(Debug)]
pub struct Spinner {
    bar: Option<ProgressBar>,
}

impl Spinner {
    /// Starts a spinner labelled `message`, or a no-op one when `enabled` is
    /// false or stderr is not a terminal.
    pub fn start(message: impl Into<String>, enabled: bool) -> Self {
        if !enabled || !Term::stderr().is_term() {
            return Self { bar: None };
        }

        let style = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let bar = ProgressBar::new_spinner()
            .with_style(style)
            .with_message(message.into());
        bar.enable_steady_tick(TICK_INTERVAL);
        Self { bar: Some(bar) }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    /// Removes the spinner from the terminal.
    pub fn finish(mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// Runs `f` while a spinner labelled `message` is shown.
pub fn with_spinner<T>(message: &str, enabled: bool, f: impl FnOnce() -> T) -> T {
    let spinner = Spinner::start(message, enabled);
    let result = f();
    spinner.finish();
    result
}
