//! Application constants loaded from `constants.ron` at compile time.
//!
//! The RON file is embedded via `include_str!` so there is no runtime file I/O.
//! Parsed once on first access via `LazyLock`.

use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

/// All tuneable application constants.
#[derive(Debug, Deserialize)]
pub struct Constants {
  pub binary_name: String,
  pub mpv_binary: String,
  pub ytdlp_binary: String,

  // mpv JSON IPC
  pub ipc_connect_attempts: u32,
  pub ipc_connect_delay_ms: u64,
  pub ipc_request_timeout_ms: u64,
  pub engine_event_capacity: usize,
  pub mpv_cache_secs: u32,

  // UI
  pub input_poll_ms: u64,
  pub notice_ttl_secs: u64,
  pub transition_log_capacity: usize,

  // Config defaults
  pub default_volume: i64,
  pub default_autoplay: bool,
  pub default_max_search_results: usize,
  pub default_cache_size: usize,
  pub default_quality: String,
  pub default_refresh_interval_ms: u64,
  pub default_seek_step_secs: f64,
  pub default_volume_step: i64,
}

impl Constants {
  pub fn ipc_connect_delay(&self) -> Duration {
    Duration::from_millis(self.ipc_connect_delay_ms)
  }

  pub fn ipc_request_timeout(&self) -> Duration {
    Duration::from_millis(self.ipc_request_timeout_ms)
  }

  pub fn input_poll(&self) -> Duration {
    Duration::from_millis(self.input_poll_ms)
  }

  pub fn notice_ttl(&self) -> Duration {
    Duration::from_secs(self.notice_ttl_secs)
  }
}

static CONSTANTS: LazyLock<Constants> = LazyLock::new(|| {
  // Safety: the RON file is embedded at compile time; if it's malformed this is a build-time error.
  ron::from_str(include_str!("../constants.ron")).expect("constants.ron must be valid RON (embedded at compile time)")
});

/// Returns a reference to the parsed application constants.
pub fn constants() -> &'static Constants {
  &CONSTANTS
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedded_constants_parse() {
    let c = constants();
    assert_eq!(c.mpv_binary, "mpv");
    assert!(c.ipc_connect_attempts > 0);
    assert!(c.transition_log_capacity > 0);
    assert!((0..=100).contains(&c.default_volume));
  }
}
