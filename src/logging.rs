use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::data_dir;
use crate::constants::constants;

/// File logging under the data dir. The terminal belongs to the TUI, so nothing goes to stderr.
/// Keep the returned guard alive for as long as the process should keep flushing.
pub fn init() -> Result<WorkerGuard> {
  let dir = data_dir().ok_or_else(|| anyhow!("no data directory for this platform"))?;
  init_in(&dir)
}

fn init_in(dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir).with_context(|| format!("Failed to create log dir {}", dir.display()))?;

  let file_name = format!("{}.log", constants().binary_name);
  let file_appender = tracing_appender::rolling::never(dir, file_name);
  let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

  let default_filter = format!("info,{}=debug", env!("CARGO_CRATE_NAME"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

  let subscriber = tracing_subscriber::fmt()
    .with_writer(file_writer)
    .with_target(true)
    .with_ansi(false)
    .with_env_filter(filter)
    .finish();
  tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;

  Ok(guard)
}
