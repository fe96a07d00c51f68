// ============================================================================
// refract-core/src/external/runner.rs
// ============================================================================
//
// PROCESS RUNNER: Executing One External Command
//
// This module spawns a single external process, merges its stdout and stderr
// into one line stream, waits for it to exit and reduces the outcome to a
// `ProcessOutput`. A non-zero exit is reported in the value, not as an error;
// errors are reserved for "the process could not be run to completion"
// (spawn failure, timeout, cancellation).
//
// KEY COMPONENTS:
// - CommandRunner: injection seam used by every component that runs a tool
// - SystemRunner: the real implementation backed by std::process
// - RunOptions: verbosity, log tag, timeout and cancellation flag
// - ProcessOutput: success flag, exit code and the captured output tail
//
// Output draining happens on one reader thread per pipe feeding a channel;
// the calling thread consumes the channel, polls for exit and enforces the
// deadline. When the deadline passes or the cancel flag is raised the whole
// process group is killed (Unix) so grandchildren cannot hold pipes open.
// After a normal exit the group is killed as well, and draining the pipes is
// bounded by `DRAIN_GRACE` so a helper that escaped the group cannot stall
// the caller.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use super::command::ToolCommand;
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};

/// Number of trailing output lines kept for diagnostics.
pub const MAX_DIAGNOSTIC_LINES: usize = 500;

/// How often the runner checks for exit, cancellation and the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long to keep reading output after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Log target for forwarded tool output.
const TOOL_LOG_TARGET: &str = "refract::tool";

/// Outcome of a process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub success: bool,
    /// Exit code, or -1 when the process was terminated by a signal
    pub exit_code: i32,
    /// Merged stdout/stderr lines in arrival order (most recent tail only)
    pub diagnostic_lines: Vec<String>,
}

impl ProcessOutput {
    /// Converts a failed run into `CoreError::CommandFailed` for `tool`.
    pub fn into_result(self, tool: impl Into<String>) -> CoreResult<ProcessOutput> {
        if self.success {
            Ok(self)
        } else {
            Err(command_failed_error(tool, self.exit_code, self.diagnostic_lines))
        }
    }

    /// First non-empty output line, trimmed.
    #[must_use]
    pub fn first_line(&self) -> Option<&str> {
        self.diagnostic_lines
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
    }
}

/// Per-invocation execution options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Forward every output line to the log at info level
    pub verbose: bool,
    /// Prefix for forwarded log lines
    pub tag: String,
    pub timeout: Option<Duration>,
    /// Raised by another thread to abort the run
    pub cancel: Option<Arc<AtomicBool>>,
}

impl RunOptions {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Options carrying the engine's command timeout.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            timeout: config.command_timeout,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Abstraction over running an external command.
pub trait CommandRunner {
    /// Runs `command`, calling `observer` with every output line as it arrives.
    fn run_with_observer(
        &self,
        command: &ToolCommand,
        options: &RunOptions,
        observer: &mut dyn FnMut(&str),
    ) -> CoreResult<ProcessOutput>;

    /// Runs `command` to completion.
    fn run(&self, command: &ToolCommand, options: &RunOptions) -> CoreResult<ProcessOutput> {
        self.run_with_observer(command, options, &mut |_| {})
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run_with_observer(
        &self,
        command: &ToolCommand,
        options: &RunOptions,
        observer: &mut dyn FnMut(&str),
    ) -> CoreResult<ProcessOutput> {
        (**self).run_with_observer(command, options, observer)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run_with_observer(
        &self,
        command: &ToolCommand,
        options: &RunOptions,
        observer: &mut dyn FnMut(&str),
    ) -> CoreResult<ProcessOutput> {
        let tool = command.name();
        debug!("Running: {command}");

        let mut cmd = command.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error(tool.clone(), e))?;

        let (tx, rx) = mpsc::channel::<String>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        let mut collector = LineCollector::new(&tool, options);
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        let status = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => collector.push(line, observer),
                Err(RecvTimeoutError::Timeout) => {}
                // Both pipes closed; keep polling for exit without spinning
                Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    terminate(&mut child);
                    join_readers(readers);
                    return Err(CoreError::CommandWait(tool.clone(), e));
                }
            }

            if options.is_cancelled() {
                warn!("Cancelling '{tool}'");
                terminate(&mut child);
                join_readers(readers);
                return Err(CoreError::Interrupted(tool.clone()));
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let timeout = options.timeout.unwrap_or_default();
                warn!("'{tool}' exceeded its {timeout:?} timeout; killing it");
                terminate(&mut child);
                join_readers(readers);
                return Err(CoreError::CommandTimeout(tool.clone(), timeout));
            }
        };

        // Leftover group members would hold the pipes open past the exit
        kill_group(&child);
        let drain_deadline = Instant::now() + DRAIN_GRACE;
        let drained = loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => collector.push(line, observer),
                Err(RecvTimeoutError::Disconnected) => break true,
                Err(RecvTimeoutError::Timeout) => {
                    if Instant::now() >= drain_deadline {
                        break false;
                    }
                }
            }
        };
        if drained {
            join_readers(readers);
        } else {
            warn!("'{tool}' exited but its output is still held open; not waiting for it");
        }

        let exit_code = status.code().unwrap_or(-1);
        let output = ProcessOutput {
            success: status.success(),
            exit_code,
            diagnostic_lines: collector.into_lines(),
        };
        if output.success {
            debug!("'{tool}' finished successfully");
        } else {
            debug!("'{tool}' exited with code {exit_code}");
        }
        Ok(output)
    }
}

/// Keeps the most recent output lines and forwards each to log and observer.
struct LineCollector<'a> {
    tool: &'a str,
    options: &'a RunOptions,
    lines: VecDeque<String>,
}

impl<'a> LineCollector<'a> {
    fn new(tool: &'a str, options: &'a RunOptions) -> Self {
        Self {
            tool,
            options,
            lines: VecDeque::new(),
        }
    }

    fn push(&mut self, line: String, observer: &mut dyn FnMut(&str)) {
        let tag = if self.options.tag.is_empty() {
            self.tool
        } else {
            self.options.tag.as_str()
        };
        if self.options.verbose {
            info!(target: TOOL_LOG_TARGET, "[{tag}] {line}");
        } else {
            trace!(target: TOOL_LOG_TARGET, "[{tag}] {line}");
        }

        observer(&line);

        if self.lines.len() == MAX_DIAGNOSTIC_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

/// Reads `pipe` to EOF, sending each line (split on `\n` or `\r`) to `tx`.
fn spawn_reader<T: Read + Send + 'static>(pipe: T, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    // ffmpeg rewrites its status line with bare carriage returns
                    for segment in text.split(['\r', '\n']).filter(|s| !s.is_empty()) {
                        if tx.send(segment.to_string()).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    })
}

fn join_readers(readers: Vec<JoinHandle<()>>) {
    for handle in readers {
        if handle.join().is_err() {
            warn!("Output reader thread panicked");
        }
    }
}

/// Sends SIGKILL to the child's process group (Unix only).
fn kill_group(child: &Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: killpg only sends a signal; the group was created for this child
            unsafe {
                libc::killpg(pgid, libc::SIGKILL);
            }
        }
    }
    #[cfg(not(unix))]
    let _ = child;
}

/// Kills the child (and on Unix its whole process group) and reaps it.
fn terminate(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}
