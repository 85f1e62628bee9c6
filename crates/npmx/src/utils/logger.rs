use std::io::Write;

use env_logger::{Builder, Env};
use log::{Level, LevelFilter};

/// Environment variable forcing debug-level logging, regardless of `-v`.
pub const DEBUG_ENV: &str = "NPMX_DEBUG";

/// Initializes the global logger. `RUST_LOG` wins when set; otherwise the
/// level comes from the `-q`/`-v` flags, with [`DEBUG_ENV`] raising it to
/// at least debug.
///
/// Everything goes to stderr, so stdout stays clean for JSON output and
/// the stdio MCP transport.
pub fn init_logger(quiet: bool, verbose: u8) {
    let mut level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    if !quiet && level < LevelFilter::Debug && debug_forced() {
        level = LevelFilter::Debug;
    }

    let env = Env::default().default_filter_or(level.as_str());
    let mut builder = Builder::from_env(env);
    builder.format(|buf, record| match record.level() {
        // Info lines are user-facing output, not diagnostics.
        Level::Info => writeln!(buf, "{}", record.args()),
        level => writeln!(buf, "{level}: {}", record.args()),
    });
    // Tests may initialize more than once.
    let _ = builder.try_init();
}

fn debug_forced() -> bool {
    std::env::var(DEBUG_ENV)
        .is_ok_and(|value| !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false"))
}
