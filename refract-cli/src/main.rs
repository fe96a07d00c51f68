// refract-cli/src/main.rs
//
// Entry point for the `refract` binary.
//
// Responsibilities include:
// - Parsing command-line arguments with clap.
// - Initialising env_logger according to --verbose / RUST_LOG.
// - Building the engine configuration from --config, flags and REFRACT_* variables.
// - Dispatching the subcommand to the refract-core engine.
// - Turning Ctrl-C/SIGTERM into engine cancellation so running tools are
//   killed and temp directories are cleaned up before exiting.
// - Printing the result as text or JSON and mapping it onto the exit status.

use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use console::Term;
use log::{debug, warn};
use refract_core::{CoreResult, MediaEngine};

use refract_cli::error::{EXIT_FAILURE, EXIT_INTERRUPTED, EXIT_OK, exit_code};
use refract_cli::output::{print_error, print_report};
use refract_cli::{Cli, CommandContext, CommandReport, build_engine_config, dispatch};

fn run(cli: Cli) -> CoreResult<CommandReport> {
    let config = build_engine_config(&cli.global)?;
    let engine = MediaEngine::new(config)?;
    install_interrupt_handler(engine.cancel_flag());
    let ctx = CommandContext {
        verbose: cli.global.verbose,
        show_progress: !cli.global.json && Term::stderr().is_term(),
    };
    dispatch(&engine, cli.command, ctx)
}

/// The first signal raises the engine's cancel flag; a second one exits at once.
fn install_interrupt_handler(cancel: Arc<AtomicBool>) {
    let result = ctrlc::set_handler(move || {
        if cancel.swap(true, Ordering::SeqCst) {
            process::exit(EXIT_INTERRUPTED);
        }
        warn!("Interrupted; stopping the running tool and cleaning up (press Ctrl-C again to force)");
    });
    if let Err(e) = result {
        warn!("Could not install the Ctrl-C handler: {e}");
    }
}

fn main() {
    let cli = Cli::parse();
    refract_cli::logging::init_logging(cli.global.verbose);
    debug!("Parsed arguments: {cli:?}");

    let json = cli.global.json;
    let status = match run(cli) {
        Ok(report) => {
            print_report(&report, json);
            if report.success { EXIT_OK } else { EXIT_FAILURE }
        }
        Err(e) => {
            print_error(&e, json);
            exit_code(&e)
        }
    };
    process::exit(status);
}
