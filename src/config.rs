use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::constants::constants;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
  pub volume: i64,
  pub autoplay: bool,
  pub max_search_results: usize,
  pub cache_size: usize,
  pub default_quality: String,
  /// Minimum interval between position-driven redraws.
  pub refresh_interval_ms: u64,
  pub seek_step_secs: f64,
  pub volume_step: i64,
}

impl Default for Config {
  fn default() -> Self {
    let c = constants();
    Self {
      volume: c.default_volume,
      autoplay: c.default_autoplay,
      max_search_results: c.default_max_search_results,
      cache_size: c.default_cache_size,
      default_quality: c.default_quality.clone(),
      refresh_interval_ms: c.default_refresh_interval_ms,
      seek_step_secs: c.default_seek_step_secs,
      volume_step: c.default_volume_step,
    }
  }
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", &constants().binary_name)
}

/// `<config_dir>/prefs.toml`, if the platform has a config dir at all.
pub fn config_path() -> Option<PathBuf> {
  project_dirs().map(|d| d.config_dir().join("prefs.toml"))
}

/// Directory for the log file.
pub fn data_dir() -> Option<PathBuf> {
  project_dirs().map(|d| d.data_dir().to_path_buf())
}

impl Config {
  pub fn load() -> Self {
    match config_path() {
      Some(path) => Self::load_from(&path),
      None => Self::default(),
    }
  }

  /// Missing file means defaults; an unreadable or malformed one also means defaults, with a warning.
  pub fn load_from(path: &Path) -> Self {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: read failed, using defaults");
        return Self::default();
      }
    };
    match toml::from_str::<Config>(&content) {
      Ok(mut config) => {
        config.volume = config.volume.clamp(0, 100);
        config
      }
      Err(e) => {
        warn!(path = %path.display(), err = %e, "config: parse failed, using defaults");
        Self::default()
      }
    }
  }

  pub fn save(&self) {
    if let Some(path) = config_path() {
      self.save_to(&path);
    }
  }

  pub fn save_to(&self, path: &Path) {
    if let Some(dir) = path.parent()
      && let Err(e) = std::fs::create_dir_all(dir)
    {
      error!(dir = %dir.display(), err = %e, "config: failed to create config dir");
      return;
    }
    match toml::to_string(self) {
      Ok(content) => {
        if let Err(e) = std::fs::write(path, content) {
          error!(path = %path.display(), err = %e, "config: failed to save");
        }
      }
      Err(e) => error!(err = %e, "config: failed to serialize"),
    }
  }

  pub fn refresh_interval(&self) -> std::time::Duration {
    std::time::Duration::from_millis(self.refresh_interval_ms)
  }
}
