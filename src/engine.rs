//! Playback engine seam and the mpv JSON-IPC adapter behind it.
//!
//! mpv runs as a long-lived `--idle` child process. Commands go out through a
//! writer task; property-change notifications come back on a reader task and are
//! forwarded as [`EngineEvent`]s over a bounded channel. Nothing on the reader
//! task touches application state; the UI loop drains the channel.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::constants::constants;

/// What the engine reports back, already reduced to the values we care about.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
  PositionChanged(f64),
  DurationChanged(f64),
  PauseFlagChanged(bool),
  EndOfStreamReached(bool),
  /// Loading or decoding the current item failed.
  PlaybackFailed(String),
}

/// Commands the orchestrator can issue. Everything except `play` is fire-and-forget
/// and must be a safe no-op when nothing is loaded or the engine is gone.
pub trait PlaybackEngine: Send + Sync + 'static {
  /// Load `url` and start it. May block on process I/O, so callers run it off the UI loop.
  fn play(&self, url: &str) -> impl Future<Output = Result<()>> + Send;
  fn set_pause(&self, paused: bool);
  fn set_volume(&self, volume: u8);
  /// Relative seek in seconds; the engine clamps at media boundaries.
  fn seek(&self, seconds: f64);
  fn stop(&self);
}

/// Search `PATH` for an executable named `name`.
pub fn find_executable(name: &str) -> Option<PathBuf> {
  let path = std::env::var_os("PATH")?;
  std::env::split_paths(&path).map(|dir| dir.join(name)).find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
  use std::os::unix::fs::PermissionsExt;
  path.metadata().is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
  path.is_file()
}

// --- IPC protocol ---

/// Properties we observe, in registration order.
const OBSERVED_PROPERTIES: [&str; 4] = ["time-pos", "duration", "pause", "eof-reached"];

#[derive(Debug, PartialEq)]
enum IpcMessage {
  Reply { request_id: u64, error: String },
  Event(EngineEvent),
}

/// Decode one line from the mpv socket. Lines we don't care about yield `None`,
/// as do property changes whose value is null.
fn parse_ipc_line(line: &str) -> Option<IpcMessage> {
  let val: Value = serde_json::from_str(line).ok()?;

  if let Some(event) = val.get("event").and_then(Value::as_str) {
    return match event {
      "property-change" => {
        let name = val.get("name").and_then(Value::as_str)?;
        let data = val.get("data")?;
        let event = match name {
          "time-pos" => EngineEvent::PositionChanged(data.as_f64()?),
          "duration" => EngineEvent::DurationChanged(data.as_f64()?),
          "pause" => EngineEvent::PauseFlagChanged(data.as_bool()?),
          "eof-reached" => EngineEvent::EndOfStreamReached(data.as_bool()?),
          _ => return None,
        };
        Some(IpcMessage::Event(event))
      }
      "end-file" if val.get("reason").and_then(Value::as_str) == Some("error") => {
        let reason = val.get("file_error").and_then(Value::as_str).unwrap_or("unknown error");
        Some(IpcMessage::Event(EngineEvent::PlaybackFailed(reason.to_string())))
      }
      _ => None,
    };
  }

  let error = val.get("error").and_then(Value::as_str)?;
  let request_id = val.get("request_id").and_then(Value::as_u64)?;
  Some(IpcMessage::Reply { request_id, error: error.to_string() })
}

type Pending = Arc<StdMutex<HashMap<u64, oneshot::Sender<String>>>>;

fn pending_lock(pending: &Pending) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<String>>> {
  pending.lock().unwrap_or_else(PoisonError::into_inner)
}

// --- mpv adapter ---

pub struct MpvEngine {
  /// `None` when mpv never came up; every command then no-ops.
  writer_tx: Option<mpsc::UnboundedSender<String>>,
  pending: Pending,
  next_request: AtomicU64,
  child: StdMutex<Option<Child>>,
  tasks: StdMutex<Vec<JoinHandle<()>>>,
  socket_path: Option<PathBuf>,
  terminated: AtomicBool,
}

pub struct MpvOptions {
  pub ytdl_format: String,
  pub volume: u8,
}

impl MpvEngine {
  /// Launch mpv in idle mode, connect to its IPC socket, and register property observers.
  pub async fn spawn(options: MpvOptions, events: mpsc::Sender<EngineEvent>) -> Result<Self> {
    let c = constants();
    let socket_path = std::env::temp_dir().join(format!("{}-mpv-{}.sock", c.binary_name, std::process::id()));
    // Remove stale socket if it exists from a previous crash.
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new(&c.mpv_binary);
    cmd.args([
      "--idle=yes".to_string(),
      "--keep-open=yes".to_string(),
      "--no-terminal".to_string(),
      "--cache=yes".to_string(),
      format!("--cache-secs={}", c.mpv_cache_secs),
      format!("--ytdl-format={}", options.ytdl_format),
      format!("--volume={}", options.volume),
      format!("--input-ipc-server={}", socket_path.display()),
    ]);
    cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null()).kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let mut stream = None;
    for attempt in 0..c.ipc_connect_attempts {
      tokio::time::sleep(c.ipc_connect_delay()).await;
      match UnixStream::connect(&socket_path).await {
        Ok(s) => {
          stream = Some(s);
          break;
        }
        Err(e) => {
          if let Ok(Some(status)) = child.try_wait() {
            bail!("mpv exited before IPC connected (status={})", status);
          }
          debug!(attempt, err = %e, "engine: IPC not ready yet");
        }
      }
    }
    let Some(stream) = stream else {
      let _ = child.start_kill();
      bail!("Timed out connecting to mpv IPC socket at {}", socket_path.display());
    };
    info!(socket = %socket_path.display(), "engine: mpv IPC connected");

    let (read_half, mut write_half) = stream.into_split();
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<String>();
    let pending: Pending = Arc::new(StdMutex::new(HashMap::new()));

    let writer = tokio::spawn(async move {
      while let Some(mut line) = writer_rx.recv().await {
        debug!(line = %line, "engine: ->");
        line.push('\n');
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
          warn!(err = %e, "engine: IPC write failed");
          break;
        }
      }
    });

    let reader_pending = Arc::clone(&pending);
    let reader = tokio::spawn(async move {
      let mut lines = BufReader::new(read_half).lines();
      loop {
        let line = match lines.next_line().await {
          Ok(Some(line)) => line,
          Ok(None) => {
            info!("engine: IPC socket closed");
            break;
          }
          Err(e) => {
            warn!(err = %e, "engine: IPC read failed");
            break;
          }
        };
        match parse_ipc_line(&line) {
          Some(IpcMessage::Reply { request_id, error }) => {
            if let Some(reply) = pending_lock(&reader_pending).remove(&request_id) {
              let _ = reply.send(error);
            }
          }
          Some(IpcMessage::Event(event)) => {
            if events.send(event).await.is_err() {
              break;
            }
          }
          None => {}
        }
      }
      // Wake anyone still waiting on a reply.
      pending_lock(&reader_pending).clear();
    });

    let engine = Self {
      writer_tx: Some(writer_tx),
      pending,
      next_request: AtomicU64::new(1),
      child: StdMutex::new(Some(child)),
      tasks: StdMutex::new(vec![writer, reader]),
      socket_path: Some(socket_path),
      terminated: AtomicBool::new(false),
    };

    for (id, name) in OBSERVED_PROPERTIES.iter().enumerate() {
      engine.command(json!(["observe_property", id + 1, name]));
    }
    Ok(engine)
  }

  /// An engine whose process never started. Commands are no-ops and `play` fails.
  pub fn unavailable() -> Self {
    Self {
      writer_tx: None,
      pending: Arc::new(StdMutex::new(HashMap::new())),
      next_request: AtomicU64::new(1),
      child: StdMutex::new(None),
      tasks: StdMutex::new(Vec::new()),
      socket_path: None,
      terminated: AtomicBool::new(false),
    }
  }

  fn command(&self, command: Value) {
    let Some(tx) = &self.writer_tx else { return };
    let _ = tx.send(json!({ "command": command }).to_string());
  }

  /// Send a command and wait for mpv to acknowledge it.
  async fn request(&self, command: Value) -> Result<()> {
    let tx = self.writer_tx.as_ref().ok_or_else(|| anyhow!("mpv is not running"))?;
    let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
    let (reply_tx, reply_rx) = oneshot::channel();
    pending_lock(&self.pending).insert(request_id, reply_tx);

    let line = json!({ "command": command, "request_id": request_id }).to_string();
    if tx.send(line).is_err() {
      pending_lock(&self.pending).remove(&request_id);
      bail!("mpv IPC writer is closed");
    }

    match tokio::time::timeout(constants().ipc_request_timeout(), reply_rx).await {
      Ok(Ok(error)) if error == "success" => Ok(()),
      Ok(Ok(error)) => Err(anyhow!("mpv rejected command: {}", error)),
      Ok(Err(_)) => Err(anyhow!("mpv IPC closed before replying")),
      Err(_) => {
        pending_lock(&self.pending).remove(&request_id);
        Err(anyhow!("Timed out waiting for mpv reply"))
      }
    }
  }

  /// Shut mpv down. Safe to call more than once; only the first call acts.
  ///
  /// The child is killed rather than asked to quit, since the writer task is
  /// aborted here too. If it has not exited by the time we check, dropping the
  /// handle leaves the wait to tokio's orphan reaper.
  pub fn terminate(&self) {
    if self.terminated.swap(true, Ordering::SeqCst) {
      return;
    }
    for handle in self.tasks.lock().unwrap_or_else(PoisonError::into_inner).drain(..) {
      handle.abort();
    }
    if let Some(mut child) = self.child.lock().unwrap_or_else(PoisonError::into_inner).take() {
      if let Err(e) = child.start_kill() {
        error!(err = %e, "engine: failed to kill mpv");
      }
      match child.try_wait() {
        Ok(Some(status)) => debug!(%status, "engine: mpv exited"),
        Ok(None) => debug!("engine: mpv still exiting, handing it to the reaper"),
        Err(e) => warn!(err = %e, "engine: could not wait on mpv"),
      }
    }
    if let Some(path) = &self.socket_path {
      let _ = std::fs::remove_file(path);
    }
    info!("engine: terminated");
  }
}

impl PlaybackEngine for MpvEngine {
  async fn play(&self, url: &str) -> Result<()> {
    self.request(json!(["loadfile", url, "replace"])).await.with_context(|| format!("Failed to load {}", url))?;
    self.command(json!(["set_property", "pause", false]));
    Ok(())
  }

  fn set_pause(&self, paused: bool) {
    self.command(json!(["set_property", "pause", paused]));
  }

  fn set_volume(&self, volume: u8) {
    self.command(json!(["set_property", "volume", volume]));
  }

  fn seek(&self, seconds: f64) {
    self.command(json!(["seek", seconds, "relative"]));
  }

  fn stop(&self) {
    self.command(json!(["stop"]));
  }
}

impl Drop for MpvEngine {
  fn drop(&mut self) {
    self.terminate();
  }
}
