// ============================================================================
// refract-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: env_logger setup for the CLI
//
// The core library logs through the `log` facade; the binary installs
// `env_logger` as the backend. `RUST_LOG` always wins over the defaults
// chosen here.
//
// USAGE:
// - default: warnings and errors only, so human output stays readable
// - --verbose: debug logs plus the external tools' own output
// - RUST_LOG=refract::tool=trace: every tool line, even without --verbose

use std::io::Write;

use env_logger::{Builder, Env};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Default filter for the given verbosity.
fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "warn" }
}

/// Installs the global logger. Log lines go to stderr so `--json` output on
/// stdout stays machine-readable.
pub fn init_logging(verbose: bool) {
    Builder::from_env(Env::default().default_filter_or(default_filter(verbose)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
