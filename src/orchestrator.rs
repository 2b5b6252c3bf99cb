//! Playback state machine.
//!
//! Every method here runs on the UI loop. Work that may block (engine loads,
//! catalog searches) is spawned onto the runtime and reports back as an
//! [`AppEvent`]; engine notifications arrive as [`EngineEvent`]s drained from the
//! engine channel. Handlers return `true` when the screen should be redrawn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::constants::constants;
use crate::engine::{EngineEvent, PlaybackEngine};
use crate::state::{FocusMode, PlaybackState, SharedState};
use crate::video::VideoInfo;
use crate::youtube::SearchService;

#[derive(Debug)]
pub enum SearchOutcome {
  Found(Vec<VideoInfo>),
  Failed(String),
}

/// Completions of work spawned off the UI loop.
#[derive(Debug)]
pub enum AppEvent {
  PlayFinished { generation: u64, outcome: Result<(), String> },
  SearchFinished { query: String, outcome: SearchOutcome },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Warning,
  Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone)]
pub struct Notice {
  pub level: NoticeLevel,
  pub text: String,
  at: Instant,
}

pub struct Orchestrator<E, S> {
  state: Arc<SharedState>,
  engine: Arc<E>,
  search: Arc<S>,
  events_tx: mpsc::UnboundedSender<AppEvent>,
  refresh_interval: Duration,
  last_position_refresh: Option<Instant>,
  /// The query whose results should land in the list; older arrivals are only cached.
  pending_query: Option<String>,
  notice: Option<Notice>,
}

impl<E: PlaybackEngine, S: SearchService> Orchestrator<E, S> {
  pub fn new(
    state: Arc<SharedState>,
    engine: Arc<E>,
    search: Arc<S>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
  ) -> Self {
    let refresh_interval = state.config().refresh_interval();
    Self {
      state,
      engine,
      search,
      events_tx,
      refresh_interval,
      last_position_refresh: None,
      pending_query: None,
      notice: None,
    }
  }

  pub fn state(&self) -> &Arc<SharedState> {
    &self.state
  }

  // --- Notices ---

  pub fn notice(&self) -> Option<&Notice> {
    self.notice.as_ref()
  }

  fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
    self.notice = Some(Notice { level, text: text.into(), at: Instant::now() });
  }

  /// Drop the current notice once it has been visible long enough.
  pub fn expire_notice(&mut self) -> bool {
    if self.notice.as_ref().is_some_and(|n| n.at.elapsed() >= constants().notice_ttl()) {
      self.notice = None;
      return true;
    }
    false
  }

  // --- Dispatch ---

  pub fn handle_app_event(&mut self, event: AppEvent) -> bool {
    match event {
      AppEvent::PlayFinished { generation, outcome } => self.handle_play_finished(generation, outcome),
      AppEvent::SearchFinished { query, outcome } => self.handle_search_finished(query, outcome),
    }
  }

  pub fn handle_engine_event(&mut self, event: EngineEvent) -> bool {
    match event {
      EngineEvent::PositionChanged(position) => {
        self.state.set_position(position);
        self.position_refresh_due(Instant::now())
      }
      EngineEvent::DurationChanged(duration) => self.state.set_duration(duration),
      EngineEvent::PauseFlagChanged(paused) => self.sync_pause_from_engine(paused),
      EngineEvent::EndOfStreamReached(true) if self.state.autoplay_enabled() => {
        info!("playback: end of stream with autoplay on, advancing");
        self.advance_to_next()
      }
      EngineEvent::EndOfStreamReached(_) => false,
      EngineEvent::PlaybackFailed(reason) => {
        let generation = self.state.generation();
        self.fail_playback(generation, reason)
      }
    }
  }

  /// Position ticks update state every time but only ask for a redraw once per interval.
  fn position_refresh_due(&mut self, now: Instant) -> bool {
    let due = self.last_position_refresh.is_none_or(|last| now.duration_since(last) >= self.refresh_interval);
    if due {
      self.last_position_refresh = Some(now);
    }
    due
  }

  /// Apply an engine-reported pause flag only when it moves us somewhere new.
  /// Echoes of a transition we already made locally fall through untouched.
  fn sync_pause_from_engine(&mut self, paused: bool) -> bool {
    if paused {
      self.state.transition_if(PlaybackState::Playing, PlaybackState::Paused)
    } else {
      self.state.transition_if(PlaybackState::Paused, PlaybackState::Playing)
    }
  }

  // --- Playback ---

  pub fn play_video(&mut self, index: usize) -> bool {
    let Some((video, generation)) = self.state.begin_playback(index) else {
      debug!(index, "playback: index out of range");
      return false;
    };
    info!(index, generation, id = %video.id, "playback: loading");
    self.notify(NoticeLevel::Info, format!("Loading: {}", video.title));

    let engine = Arc::clone(&self.engine);
    let tx = self.events_tx.clone();
    let url = video.url();
    tokio::spawn(async move {
      let outcome = engine.play(&url).await.map_err(|e| format!("{:#}", e));
      let _ = tx.send(AppEvent::PlayFinished { generation, outcome });
    });
    true
  }

  fn handle_play_finished(&mut self, generation: u64, outcome: Result<(), String>) -> bool {
    match outcome {
      Ok(()) => {
        let started = self.state.finish_playback(generation);
        if !started {
          debug!(generation, "playback: load acknowledged for superseded request");
        }
        started
      }
      Err(reason) => self.fail_playback(generation, reason),
    }
  }

  fn fail_playback(&mut self, generation: u64, reason: String) -> bool {
    if !self.state.fail_playback(generation) {
      debug!(generation, reason = %reason, "playback: ignoring failure of superseded request");
      return false;
    }
    error!(generation, reason = %reason, "playback: failed");
    self.notify(NoticeLevel::Error, "Failed to play video.");
    true
  }

  pub fn toggle_pause(&mut self) -> bool {
    if self.state.transition_if(PlaybackState::Playing, PlaybackState::Paused) {
      self.engine.set_pause(true);
      true
    } else if self.state.transition_if(PlaybackState::Paused, PlaybackState::Playing) {
      self.engine.set_pause(false);
      true
    } else {
      false
    }
  }

  pub fn stop(&mut self) -> bool {
    self.engine.stop();
    self.state.stop_playback()
  }

  /// Next item: the play queue first (skipping entries no longer in the list),
  /// then a linear step through the list. A lone item never advances into itself.
  pub fn advance_to_next(&mut self) -> bool {
    while let Some(queued) = self.state.pop_next_from_queue() {
      match self.state.index_of(&queued.id) {
        Some(index) => {
          info!(index, id = %queued.id, "playback: next from queue");
          return self.play_video(index);
        }
        None => debug!(id = %queued.id, "playback: queued video not in current results, dropping"),
      }
    }

    let (current, count) = self.state.cursor();
    let Some(current) = current else { return false };
    if count == 0 {
      return false;
    }
    let next = (current + 1) % count;
    if next == current {
      return false;
    }
    info!(index = next, "playback: next in list");
    self.play_video(next)
  }

  pub fn advance_to_previous(&mut self) -> bool {
    let (current, count) = self.state.cursor();
    let Some(current) = current else { return false };
    if count == 0 {
      return false;
    }
    self.play_video((current + count - 1) % count)
  }

  // --- Volume / seek / autoplay / queue ---

  /// Adjust volume by `delta`; the engine only hears about it when the clamped value moved.
  pub fn change_volume(&mut self, delta: i64) -> bool {
    if !self.state.set_volume(i64::from(self.state.volume()).saturating_add(delta)) {
      return false;
    }
    self.engine.set_volume(self.state.volume());
    true
  }

  pub fn volume_up(&mut self, delta: i64) -> bool {
    self.change_volume(delta)
  }

  pub fn volume_down(&mut self, delta: i64) -> bool {
    self.change_volume(delta.saturating_neg())
  }

  pub fn seek(&mut self, seconds: f64) {
    self.engine.seek(seconds);
  }

  pub fn toggle_autoplay(&mut self) -> bool {
    let enabled = self.state.toggle_autoplay();
    info!(enabled, "autoplay toggled");
    self.notify(NoticeLevel::Info, if enabled { "Autoplay enabled." } else { "Autoplay disabled." });
    true
  }

  pub fn queue_video(&mut self, index: usize) -> bool {
    let Some(video) = self.state.video(index) else { return false };
    self.notify(NoticeLevel::Info, format!("Queued: {}", video.title));
    self.state.add_to_queue(video);
    true
  }

  pub fn toggle_focus(&mut self) -> bool {
    let next = match self.state.focus() {
      FocusMode::Search => FocusMode::Results,
      FocusMode::Results => FocusMode::Search,
    };
    self.state.set_focus(next)
  }

  // --- Search ---

  /// Whether a spawned search is still expected to land in the list.
  pub fn search_pending(&self) -> bool {
    self.pending_query.is_some()
  }

  pub fn search(&mut self, query: &str) -> bool {
    let query = query.trim().to_string();
    if query.is_empty() {
      self.notify(NoticeLevel::Warning, "Enter a search term.");
      return true;
    }
    self.pending_query = Some(query.clone());

    if let Some(results) = self.state.cached_search(&query) {
      debug!(query = %query, "search: cache hit");
      self.pending_query = None;
      return self.apply_results(results);
    }

    info!(query = %query, "search triggered");
    self.notify(NoticeLevel::Info, format!("Searching '{}'…", query));
    let search = Arc::clone(&self.search);
    let tx = self.events_tx.clone();
    tokio::spawn(async move {
      let outcome = match search.search(&query).await {
        Ok(results) => SearchOutcome::Found(results),
        Err(e) => {
          let reason = format!("{:#}", e);
          warn!(query = %query, err = %reason, "search: failed");
          SearchOutcome::Failed(reason)
        }
      };
      let _ = tx.send(AppEvent::SearchFinished { query, outcome });
    });
    true
  }

  fn handle_search_finished(&mut self, query: String, outcome: SearchOutcome) -> bool {
    let current = self.pending_query.as_deref() == Some(query.as_str());
    match outcome {
      SearchOutcome::Found(results) => {
        self.state.cache_search(query.clone(), results.clone());
        if !current {
          debug!(query = %query, "search: superseded results cached only");
          return false;
        }
        self.pending_query = None;
        self.apply_results(results)
      }
      SearchOutcome::Failed(_) if !current => false,
      SearchOutcome::Failed(reason) => {
        self.pending_query = None;
        self.state.replace_videos(Vec::new());
        self.notify(NoticeLevel::Warning, format!("Search failed: {}", reason));
        true
      }
    }
  }

  fn apply_results(&mut self, results: Vec<VideoInfo>) -> bool {
    let count = results.len();
    self.state.replace_videos(results);
    if count == 0 {
      self.notify(NoticeLevel::Warning, "No videos found.");
    } else {
      self.notify(NoticeLevel::Info, format!("Found {} videos.", count));
      self.state.set_focus(FocusMode::Results);
    }
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::state::Transition;
  use anyhow::{Result, anyhow};
  use std::collections::HashMap;
  use std::sync::Mutex as StdMutex;
  use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

  #[derive(Debug, Clone, PartialEq)]
  enum Cmd {
    Play(String),
    Pause(bool),
    Volume(u8),
    Seek(f64),
    Stop,
  }

  #[derive(Default)]
  struct RecordingEngine {
    commands: StdMutex<Vec<Cmd>>,
    fail_play: AtomicBool,
  }

  impl RecordingEngine {
    fn record(&self, cmd: Cmd) {
      self.commands.lock().unwrap().push(cmd);
    }

    fn commands(&self) -> Vec<Cmd> {
      self.commands.lock().unwrap().clone()
    }

    fn plays(&self) -> Vec<String> {
      self
        .commands()
        .into_iter()
        .filter_map(|c| match c {
          Cmd::Play(url) => Some(url),
          _ => None,
        })
        .collect()
    }
  }

  impl PlaybackEngine for RecordingEngine {
    async fn play(&self, url: &str) -> Result<()> {
      self.record(Cmd::Play(url.to_string()));
      if self.fail_play.load(Ordering::SeqCst) { Err(anyhow!("engine refused")) } else { Ok(()) }
    }

    fn set_pause(&self, paused: bool) {
      self.record(Cmd::Pause(paused));
    }

    fn set_volume(&self, volume: u8) {
      self.record(Cmd::Volume(volume));
    }

    fn seek(&self, seconds: f64) {
      self.record(Cmd::Seek(seconds));
    }

    fn stop(&self) {
      self.record(Cmd::Stop);
    }
  }

  #[derive(Default)]
  struct FixedSearch {
    results: HashMap<String, Vec<VideoInfo>>,
    calls: AtomicUsize,
  }

  impl FixedSearch {
    fn with(query: &str, ids: &[&str]) -> Self {
      let mut s = Self::default();
      s.results.insert(query.to_string(), videos(ids));
      s
    }
  }

  impl SearchService for FixedSearch {
    async fn search(&self, query: &str) -> Result<Vec<VideoInfo>> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.results.get(query).cloned().ok_or_else(|| anyhow!("no results configured for {query}"))
    }
  }

  fn videos(ids: &[&str]) -> Vec<VideoInfo> {
    ids.iter().map(|id| VideoInfo::new(*id, format!("title {id}"), "uploader", Some(180))).collect()
  }

  struct Harness {
    orch: Orchestrator<RecordingEngine, FixedSearch>,
    engine: Arc<RecordingEngine>,
    search: Arc<FixedSearch>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
  }

  impl Harness {
    fn new(search: FixedSearch) -> Self {
      Self::with_config(search, Config::default())
    }

    fn with_config(search: FixedSearch, config: Config) -> Self {
      let (tx, rx) = mpsc::unbounded_channel();
      let engine = Arc::new(RecordingEngine::default());
      let search = Arc::new(search);
      let state = Arc::new(SharedState::new(config));
      let orch = Orchestrator::new(state, Arc::clone(&engine), Arc::clone(&search), tx);
      Self { orch, engine, search, rx }
    }

    fn state(&self) -> &SharedState {
      self.orch.state()
    }

    /// Deliver the next spawned completion back into the orchestrator.
    async fn pump(&mut self) -> bool {
      let event = self.rx.recv().await.expect("completion event");
      self.orch.handle_app_event(event)
    }

    /// Play `index` and let the engine acknowledge it.
    async fn play_and_settle(&mut self, index: usize) {
      assert!(self.orch.play_video(index));
      self.pump().await;
    }
  }

  #[tokio::test]
  async fn end_to_end_search_play_pause_autoplay() {
    let mut h = Harness::new(FixedSearch::with("x", &["v0", "v1", "v2"]));

    assert!(h.orch.search("x"));
    assert!(h.pump().await);
    assert_eq!(h.state().video_count(), 3);
    assert_eq!(h.state().focus(), FocusMode::Results);

    assert!(h.orch.play_video(0));
    assert_eq!(h.state().playback_state(), PlaybackState::Buffering);
    assert!(h.pump().await);
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);
    assert_eq!(
      h.state().transitions(),
      vec![
        Transition { from: PlaybackState::Stopped, to: PlaybackState::Buffering },
        Transition { from: PlaybackState::Buffering, to: PlaybackState::Playing },
      ]
    );

    assert!(h.orch.toggle_pause());
    assert_eq!(h.state().playback_state(), PlaybackState::Paused);
    assert!(h.orch.toggle_pause());
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);

    assert!(h.orch.handle_engine_event(EngineEvent::EndOfStreamReached(true)));
    assert_eq!(h.state().current_index(), Some(1));
    h.pump().await;
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);

    let expected_plays: Vec<String> = videos(&["v0", "v1"]).iter().map(VideoInfo::url).collect();
    assert_eq!(h.engine.plays(), expected_plays);
    assert!(h.engine.commands().contains(&Cmd::Pause(true)));
    assert!(h.engine.commands().contains(&Cmd::Pause(false)));
  }

  #[tokio::test]
  async fn eof_without_autoplay_stays_put() {
    let config = Config { autoplay: false, ..Config::default() };
    let mut h = Harness::with_config(FixedSearch::default(), config);
    h.state().replace_videos(videos(&["a", "b"]));
    h.play_and_settle(0).await;
    let generation = h.state().generation();

    assert!(!h.orch.handle_engine_event(EngineEvent::EndOfStreamReached(true)));
    assert_eq!(h.state().current_index(), Some(0));
    assert_eq!(h.state().generation(), generation);
  }

  #[tokio::test]
  async fn eof_false_is_ignored() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b"]));
    h.play_and_settle(0).await;
    assert!(!h.orch.handle_engine_event(EngineEvent::EndOfStreamReached(false)));
    assert_eq!(h.state().current_index(), Some(0));
  }

  #[tokio::test]
  async fn pause_echo_is_suppressed() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    h.play_and_settle(0).await;
    let before = h.state().transitions().len();

    assert!(!h.orch.handle_engine_event(EngineEvent::PauseFlagChanged(false)));
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);
    assert_eq!(h.state().transitions().len(), before);

    // Local pause, then the engine echoes it back.
    assert!(h.orch.toggle_pause());
    assert!(!h.orch.handle_engine_event(EngineEvent::PauseFlagChanged(true)));
    assert_eq!(h.state().playback_state(), PlaybackState::Paused);
  }

  #[tokio::test]
  async fn engine_initiated_pause_and_resume_apply() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    h.play_and_settle(0).await;

    assert!(h.orch.handle_engine_event(EngineEvent::PauseFlagChanged(true)));
    assert_eq!(h.state().playback_state(), PlaybackState::Paused);
    assert!(h.orch.handle_engine_event(EngineEvent::PauseFlagChanged(false)));
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);
    // Engine-driven moves never echo a command back.
    assert!(!h.engine.commands().iter().any(|c| matches!(c, Cmd::Pause(_))));
  }

  #[tokio::test]
  async fn pause_flag_while_buffering_is_ignored() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    assert!(h.orch.play_video(0));
    assert!(!h.orch.handle_engine_event(EngineEvent::PauseFlagChanged(true)));
    assert!(!h.orch.toggle_pause());
    assert_eq!(h.state().playback_state(), PlaybackState::Buffering);
    h.pump().await;
  }

  #[tokio::test]
  async fn single_item_without_queue_does_not_advance() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["only"]));
    h.play_and_settle(0).await;
    let generation = h.state().generation();

    assert!(!h.orch.advance_to_next());
    tokio::task::yield_now().await;
    assert_eq!(h.state().current_index(), Some(0));
    assert_eq!(h.state().generation(), generation);
    assert_eq!(h.engine.plays().len(), 1);
  }

  #[tokio::test]
  async fn linear_advance_wraps_around() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b", "c"]));
    h.play_and_settle(2).await;
    assert!(h.orch.advance_to_next());
    assert_eq!(h.state().current_index(), Some(0));
    h.pump().await;
  }

  #[tokio::test]
  async fn previous_wraps_and_replays_single_item() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b", "c"]));
    h.play_and_settle(0).await;
    assert!(h.orch.advance_to_previous());
    assert_eq!(h.state().current_index(), Some(2));
    h.pump().await;

    h.state().replace_videos(videos(&["c"]));
    assert_eq!(h.state().current_index(), Some(0));
    assert!(h.orch.advance_to_previous());
    assert_eq!(h.state().current_index(), Some(0));
    h.pump().await;
  }

  #[tokio::test]
  async fn advance_without_current_index_is_noop() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b"]));
    assert!(!h.orch.advance_to_next());
    assert!(!h.orch.advance_to_previous());
    assert_eq!(h.state().playback_state(), PlaybackState::Stopped);
  }

  #[tokio::test]
  async fn queue_takes_priority_over_linear_order() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b", "c", "d"]));
    h.play_and_settle(0).await;
    assert!(h.orch.queue_video(3));
    assert!(h.orch.queue_video(2));

    // Last queued plays first.
    assert!(h.orch.advance_to_next());
    assert_eq!(h.state().current_index(), Some(2));
    h.pump().await;
    assert!(h.orch.advance_to_next());
    assert_eq!(h.state().current_index(), Some(3));
    h.pump().await;
    assert_eq!(h.state().queue_len(), 0);
  }

  #[tokio::test]
  async fn stale_queue_entry_is_dropped_then_no_current_index_is_noop() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["x", "y"]));
    assert!(h.orch.queue_video(0));
    h.state().replace_videos(videos(&["a", "b"]));

    assert!(!h.orch.advance_to_next());
    assert_eq!(h.state().queue_len(), 0);
    assert_eq!(h.state().playback_state(), PlaybackState::Stopped);
  }

  #[tokio::test]
  async fn stale_queue_entry_falls_through_to_linear_advance() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "x"]));
    h.play_and_settle(0).await;
    assert!(h.orch.queue_video(1));
    h.state().replace_videos(videos(&["a", "b", "c"]));

    assert!(h.orch.advance_to_next());
    assert_eq!(h.state().queue_len(), 0);
    assert_eq!(h.state().current_index(), Some(1));
    h.pump().await;
  }

  #[tokio::test]
  async fn stale_entry_is_skipped_in_favor_of_older_valid_one() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b", "c"]));
    h.play_and_settle(0).await;
    assert!(h.orch.queue_video(2));
    h.state().add_to_queue(VideoInfo::new("gone", "gone", "u", Some(1)));

    assert!(h.orch.advance_to_next());
    assert_eq!(h.state().current_index(), Some(2));
    h.pump().await;
  }

  #[tokio::test]
  async fn playback_failure_enters_error_and_recovers_on_new_play() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b"]));
    h.engine.fail_play.store(true, Ordering::SeqCst);

    assert!(h.orch.play_video(0));
    assert!(h.pump().await);
    assert_eq!(h.state().playback_state(), PlaybackState::Error);
    assert_eq!(h.orch.notice().map(|n| n.level), Some(NoticeLevel::Error));
    assert!(!h.orch.toggle_pause());

    h.engine.fail_play.store(false, Ordering::SeqCst);
    h.play_and_settle(1).await;
    assert_eq!(h.state().playback_state(), PlaybackState::Playing);
  }

  #[tokio::test]
  async fn engine_reported_failure_enters_error() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    h.play_and_settle(0).await;
    assert!(h.orch.handle_engine_event(EngineEvent::PlaybackFailed("loading failed".into())));
    assert_eq!(h.state().playback_state(), PlaybackState::Error);
  }

  #[tokio::test]
  async fn superseded_load_cannot_override_newer_selection() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a", "b"]));
    h.engine.fail_play.store(true, Ordering::SeqCst);
    assert!(h.orch.play_video(0));
    assert!(h.orch.play_video(1));

    // The first failure belongs to a superseded request.
    assert!(!h.pump().await);
    assert_eq!(h.state().playback_state(), PlaybackState::Buffering);
    assert!(h.pump().await);
    assert_eq!(h.state().playback_state(), PlaybackState::Error);
    assert_eq!(h.state().current_index(), Some(1));
  }

  #[tokio::test]
  async fn stop_returns_to_stopped_and_discards_pending_load() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    assert!(h.orch.play_video(0));
    assert!(h.orch.stop());
    assert!(!h.pump().await);
    assert_eq!(h.state().playback_state(), PlaybackState::Stopped);
    assert!(h.engine.commands().contains(&Cmd::Stop));
  }

  #[tokio::test]
  async fn volume_commands_only_sent_on_change() {
    let mut h = Harness::new(FixedSearch::default());
    assert_eq!(h.state().volume(), 100);
    assert!(!h.orch.volume_up(5));
    assert!(h.orch.volume_down(5));
    assert!(h.orch.volume_down(200));
    assert!(!h.orch.volume_down(5));
    assert_eq!(h.engine.commands(), vec![Cmd::Volume(95), Cmd::Volume(0)]);
  }

  #[tokio::test]
  async fn extreme_volume_steps_saturate() {
    let mut h = Harness::new(FixedSearch::default());
    assert!(h.orch.volume_down(i64::MAX));
    assert_eq!(h.state().volume(), 0);
    assert!(h.orch.volume_up(i64::MAX));
    assert_eq!(h.state().volume(), 100);
    // Stepping "down" by the most negative amount is a huge step up: already at the top.
    assert!(!h.orch.volume_down(i64::MIN));
    assert!(h.orch.volume_up(i64::MIN));
    assert_eq!(h.state().volume(), 0);
    assert_eq!(h.engine.commands(), vec![Cmd::Volume(0), Cmd::Volume(100), Cmd::Volume(0)]);
  }

  #[tokio::test]
  async fn seek_is_forwarded_verbatim() {
    let mut h = Harness::new(FixedSearch::default());
    h.orch.seek(-10.0);
    h.orch.seek(3600.0);
    assert_eq!(h.engine.commands(), vec![Cmd::Seek(-10.0), Cmd::Seek(3600.0)]);
  }

  #[tokio::test]
  async fn duration_redraws_only_on_change() {
    let mut h = Harness::new(FixedSearch::default());
    assert!(h.orch.handle_engine_event(EngineEvent::DurationChanged(200.0)));
    assert!(!h.orch.handle_engine_event(EngineEvent::DurationChanged(200.0)));
    assert_eq!(h.state().duration(), 200.0);
  }

  #[tokio::test]
  async fn position_updates_state_but_throttles_redraw() {
    let mut h = Harness::new(FixedSearch::default());
    assert!(h.orch.handle_engine_event(EngineEvent::PositionChanged(1.0)));
    assert!(!h.orch.handle_engine_event(EngineEvent::PositionChanged(1.01)));
    assert_eq!(h.state().position(), 1.01);

    let start = Instant::now();
    let mut orch = h.orch;
    orch.last_position_refresh = Some(start);
    assert!(!orch.position_refresh_due(start + Duration::from_millis(50)));
    assert!(orch.position_refresh_due(start + Duration::from_millis(100)));
    assert!(!orch.position_refresh_due(start + Duration::from_millis(150)));
  }

  #[tokio::test]
  async fn cached_query_skips_search_service() {
    let mut h = Harness::new(FixedSearch::with("x", &["a", "b"]));
    assert!(h.orch.search("x"));
    h.pump().await;
    assert!(h.orch.search("  x  "));
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.state().video_count(), 2);
  }

  #[tokio::test]
  async fn superseded_search_is_cached_but_not_shown() {
    let mut search = FixedSearch::with("old", &["o1"]);
    search.results.insert("new".into(), videos(&["n1", "n2"]));
    let mut h = Harness::new(search);

    assert!(h.orch.search("old"));
    assert!(h.orch.search("new"));
    assert!(!h.pump().await);
    assert!(h.pump().await);
    assert_eq!(h.state().videos().iter().map(|v| v.id.as_str()).collect::<Vec<_>>(), vec!["n1", "n2"]);
    assert!(h.state().cached_search("old").is_some());
  }

  #[tokio::test]
  async fn failed_search_clears_list_and_warns() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    assert!(h.orch.search("nothing"));
    assert!(h.pump().await);
    assert_eq!(h.state().video_count(), 0);
    assert!(h.state().cached_search("nothing").is_none());
    assert_eq!(h.orch.notice().map(|n| n.level), Some(NoticeLevel::Warning));
    let text = h.orch.notice().map(|n| n.text.clone()).unwrap_or_default();
    assert_eq!(text, "Search failed: no results configured for nothing");
  }

  #[tokio::test]
  async fn empty_query_is_rejected() {
    let mut h = Harness::new(FixedSearch::default());
    assert!(h.orch.search("   "));
    assert_eq!(h.search.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.orch.notice().map(|n| n.text.as_str()), Some("Enter a search term."));
  }

  #[tokio::test]
  async fn autoplay_toggle_flips_state() {
    let mut h = Harness::new(FixedSearch::default());
    assert!(h.state().autoplay_enabled());
    h.orch.toggle_autoplay();
    assert!(!h.state().autoplay_enabled());
    h.orch.toggle_autoplay();
    assert!(h.state().autoplay_enabled());
  }

  #[tokio::test]
  async fn queue_rejects_out_of_range_index() {
    let mut h = Harness::new(FixedSearch::default());
    h.state().replace_videos(videos(&["a"]));
    assert!(!h.orch.queue_video(5));
    assert_eq!(h.state().queue_len(), 0);
  }
}
