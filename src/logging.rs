//! Tracing subscriber setup for the binary
//!
//! The library only emits events; nothing is printed until a subscriber is
//! installed here.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for the crate at the requested verbosity
fn filter_directive(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "nodeflow=debug"
    } else if quiet {
        "nodeflow=error"
    } else {
        "nodeflow=info"
    }
}

/// Initialize logging to stderr, plus JSON lines to `log_file` when given
///
/// Keep the returned guard alive for the life of the program; dropping it
/// flushes and stops the file writer.
pub fn init_logging(
    debug: bool,
    quiet: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::new(filter_directive(debug, quiet));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_line_number(debug)
        .with_file(debug)
        .with_writer(std::io::stderr);

    let Some(log_path) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
        return Ok(None);
    };

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let file_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_target(true)
        .with_current_span(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()?;

    Ok(Some(guard))
}

/// Default log file for a run of the named workflow
pub fn default_log_path(workflow_name: &str) -> anyhow::Result<PathBuf> {
    let log_dir = dirs::data_local_dir()
        .or_else(dirs::config_dir)
        .ok_or_else(|| anyhow::anyhow!("could not determine a data directory"))?
        .join("nodeflow")
        .join("logs");

    let slug: String = workflow_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");

    Ok(log_dir.join(format!("{}-{}.log", slug, timestamp)))
}
