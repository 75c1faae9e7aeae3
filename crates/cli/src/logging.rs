//! tracing subscriber setup: stderr always, plus an optional log file.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::exit_codes::EXIT_DEDUP_OUTPUT;
use crate::CliError;

/// Default directive for a given `-v` count. `RUST_LOG` takes precedence.
fn default_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbose: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)))
}

/// Install the global subscriber. Keep the returned guard alive until exit,
/// otherwise buffered file lines are lost.
pub fn init(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>, CliError> {
    let stderr_log = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(verbose));

    let Some(path) = log_file else {
        tracing_subscriber::registry().with(stderr_log).init();
        return Ok(None);
    };

    let file_name = path.file_name().ok_or_else(|| CliError {
        code: EXIT_DEDUP_OUTPUT,
        message: format!("--log-file {} has no file name", path.display()),
        hint: None,
    })?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| CliError {
        code: EXIT_DEDUP_OUTPUT,
        message: format!("cannot create {}: {e}", dir.display()),
        hint: None,
    })?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    let file_log = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(env_filter(verbose.max(1)));

    tracing_subscriber::registry().with(stderr_log).with(file_log).init();
    Ok(Some(guard))
}
