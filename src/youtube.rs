use std::future::Future;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use tokio::process::Command;
use tracing::{debug, info};

use crate::constants::constants;
use crate::video::VideoInfo;

/// The catalog search collaborator.
pub trait SearchService: Send + Sync + 'static {
  fn search(&self, query: &str) -> impl Future<Output = Result<Vec<VideoInfo>>> + Send;
}

/// The yt-dlp print template used for flat search listings.
const PRINT_FORMAT: &str = "%(id)s\t%(title)s\t%(uploader)s\t%(duration)s";

/// Parse a single tab-separated yt-dlp output line.
/// Expected format: `id\ttitle\tuploader\tduration`. Entries without an id or a
/// known duration (live streams, unavailable items) are skipped.
fn parse_search_line(line: &str) -> Option<VideoInfo> {
  let parts: Vec<&str> = line.split('\t').collect();
  if parts.len() < 4 {
    return None;
  }
  let opt = |idx: usize| parts.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty() && *s != "NA");
  let id = opt(0)?;
  let duration = opt(3)?.parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)?;
  Some(VideoInfo::new(id, opt(1).unwrap_or("N/A"), opt(2).unwrap_or("N/A"), Some(duration.round() as u64)))
}

/// Parse yt-dlp stdout lines into VideoInfo vec.
fn parse_search_output(stdout: &str) -> Vec<VideoInfo> {
  stdout.lines().map(str::trim).filter(|l| !l.is_empty()).filter_map(parse_search_line).collect()
}

pub struct YtDlpSearch {
  max_results: usize,
}

impl YtDlpSearch {
  pub fn new(max_results: usize) -> Self {
    Self { max_results: max_results.max(1) }
  }
}

impl SearchService for YtDlpSearch {
  async fn search(&self, query: &str) -> Result<Vec<VideoInfo>> {
    info!(query = %query, max = self.max_results, "search: running yt-dlp");
    let default_search = format!("ytsearch{}:", self.max_results);
    let output = Command::new(&constants().ytdlp_binary)
      .args([
        "--flat-playlist",
        "--print",
        PRINT_FORMAT,
        "--default-search",
        &default_search,
        "--skip-download",
        "--ignore-errors",
        "--no-warnings",
        "--",
        query,
      ])
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .output()
      .await
      .map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
          anyhow!("yt-dlp not found. Install it with: brew install yt-dlp (macOS) or pip install yt-dlp")
        } else {
          anyhow!(e).context("Failed to execute yt-dlp search command")
        }
      })?;

    if !output.status.success() {
      return Err(anyhow!("yt-dlp search failed: {}", String::from_utf8_lossy(&output.stderr).trim()));
    }

    let stdout_str = String::from_utf8(output.stdout).context("yt-dlp output non-UTF8")?;
    let results = parse_search_output(&stdout_str);
    debug!(query = %query, count = results.len(), "search: parsed results");
    Ok(results)
  }
}
