//! The single thread-safe source of truth.
//!
//! Everything except the playback position lives behind one mutex, and every
//! mutator holds it for its whole effect, so observers never see a half-applied
//! combination (say, a new current index with the previous playback state).
//! Position changes on every engine tick and is kept in an atomic so the render
//! path can read it without contending for the lock.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::cache::SearchCache;
use crate::config::Config;
use crate::constants::constants;
use crate::video::VideoInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
  #[default]
  Stopped,
  Playing,
  Paused,
  Buffering,
  Error,
}

impl PlaybackState {
  pub fn label(self) -> &'static str {
    match self {
      PlaybackState::Stopped => "Stopped",
      PlaybackState::Playing => "Playing",
      PlaybackState::Paused => "Paused",
      PlaybackState::Buffering => "Buffering",
      PlaybackState::Error => "Error",
    }
  }
}

impl fmt::Display for PlaybackState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Which pane receives keystrokes. UI-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
  #[default]
  Search,
  Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
  pub from: PlaybackState,
  pub to: PlaybackState,
}

/// Point-in-time copy of everything the renderer needs.
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
  pub videos: Vec<VideoInfo>,
  pub current_index: Option<usize>,
  pub now_playing: Option<VideoInfo>,
  pub playback_state: PlaybackState,
  pub position: f64,
  pub duration: f64,
  pub queue: Vec<VideoInfo>,
  pub volume: u8,
  pub autoplay: bool,
  pub focus: FocusMode,
}

struct Inner {
  videos: Vec<VideoInfo>,
  current_index: Option<usize>,
  now_playing: Option<VideoInfo>,
  playback_state: PlaybackState,
  duration: f64,
  search_cache: SearchCache,
  play_queue: VecDeque<VideoInfo>,
  volume: u8,
  autoplay: bool,
  focus: FocusMode,
  /// Bumped by every begin/stop so stale engine completions can be recognized.
  generation: u64,
  transitions: VecDeque<Transition>,
  config: Config,
}

impl Inner {
  fn transition(&mut self, to: PlaybackState) -> bool {
    let from = self.playback_state;
    if from == to {
      return false;
    }
    info!(from = %from, to = %to, "state transition");
    self.playback_state = to;
    if self.transitions.len() >= constants().transition_log_capacity {
      self.transitions.pop_front();
    }
    self.transitions.push_back(Transition { from, to });
    true
  }
}

pub struct SharedState {
  inner: Mutex<Inner>,
  position_bits: AtomicU64,
}

impl SharedState {
  /// Seed volume and autoplay from the persisted config.
  pub fn new(config: Config) -> Self {
    let inner = Inner {
      videos: Vec::new(),
      current_index: None,
      now_playing: None,
      playback_state: PlaybackState::Stopped,
      duration: 0.0,
      search_cache: SearchCache::new(config.cache_size),
      play_queue: VecDeque::new(),
      volume: config.volume.clamp(0, 100) as u8,
      autoplay: config.autoplay,
      focus: FocusMode::default(),
      generation: 0,
      transitions: VecDeque::new(),
      config,
    };
    Self { inner: Mutex::new(inner), position_bits: AtomicU64::new(0f64.to_bits()) }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // A panic elsewhere shouldn't take the whole state down with it.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn snapshot(&self) -> StateSnapshot {
    let inner = self.lock();
    StateSnapshot {
      videos: inner.videos.clone(),
      current_index: inner.current_index,
      now_playing: inner.now_playing.clone(),
      playback_state: inner.playback_state,
      position: self.position(),
      duration: inner.duration,
      queue: inner.play_queue.iter().cloned().collect(),
      volume: inner.volume,
      autoplay: inner.autoplay,
      focus: inner.focus,
    }
  }

  /// The startup config with live volume/autoplay applied, ready for saving.
  pub fn persisted_config(&self) -> Config {
    let inner = self.lock();
    Config { volume: i64::from(inner.volume), autoplay: inner.autoplay, ..inner.config.clone() }
  }

  pub fn config(&self) -> Config {
    self.lock().config.clone()
  }

  // --- Playback state ---

  pub fn playback_state(&self) -> PlaybackState {
    self.lock().playback_state
  }

  #[cfg(test)]
  pub fn set_playback_state(&self, state: PlaybackState) -> bool {
    self.lock().transition(state)
  }

  /// Only moves `from` -> `to` when the current state is still `from`.
  /// Returns whether the move happened.
  pub fn transition_if(&self, from: PlaybackState, to: PlaybackState) -> bool {
    let mut inner = self.lock();
    inner.playback_state == from && inner.transition(to)
  }

  pub fn transitions(&self) -> Vec<Transition> {
    self.lock().transitions.iter().copied().collect()
  }

  pub fn generation(&self) -> u64 {
    self.lock().generation
  }

  /// Select `index` and enter `Buffering` in one step. Position and duration reset
  /// for the new item. Returns the video to load and its playback generation, or
  /// `None` for an out-of-range index.
  pub fn begin_playback(&self, index: usize) -> Option<(VideoInfo, u64)> {
    let mut inner = self.lock();
    let video = inner.videos.get(index)?.clone();
    inner.current_index = Some(index);
    inner.now_playing = Some(video.clone());
    inner.duration = 0.0;
    self.position_bits.store(0f64.to_bits(), Ordering::Relaxed);
    inner.generation += 1;
    inner.transition(PlaybackState::Buffering);
    Some((video, inner.generation))
  }

  /// `Buffering -> Playing`, if `generation` is still the latest playback.
  pub fn finish_playback(&self, generation: u64) -> bool {
    let mut inner = self.lock();
    inner.generation == generation
      && inner.playback_state == PlaybackState::Buffering
      && inner.transition(PlaybackState::Playing)
  }

  /// `-> Error`, if `generation` is still the latest playback.
  pub fn fail_playback(&self, generation: u64) -> bool {
    let mut inner = self.lock();
    inner.generation == generation && inner.transition(PlaybackState::Error)
  }

  /// Back to `Stopped`. Any in-flight load becomes stale.
  pub fn stop_playback(&self) -> bool {
    let mut inner = self.lock();
    inner.generation += 1;
    inner.now_playing = None;
    inner.duration = 0.0;
    self.position_bits.store(0f64.to_bits(), Ordering::Relaxed);
    inner.transition(PlaybackState::Stopped)
  }

  // --- Volume / autoplay ---

  pub fn volume(&self) -> u8 {
    self.lock().volume
  }

  /// Clamp to 0..=100, then store. Returns whether the stored value changed.
  pub fn set_volume(&self, volume: i64) -> bool {
    let clamped = volume.clamp(0, 100) as u8;
    let mut inner = self.lock();
    if inner.volume == clamped {
      return false;
    }
    inner.volume = clamped;
    true
  }

  pub fn autoplay_enabled(&self) -> bool {
    self.lock().autoplay
  }

  /// Flip autoplay and return the new value.
  pub fn toggle_autoplay(&self) -> bool {
    let mut inner = self.lock();
    inner.autoplay = !inner.autoplay;
    inner.autoplay
  }

  // --- Position / duration ---

  pub fn position(&self) -> f64 {
    f64::from_bits(self.position_bits.load(Ordering::Relaxed))
  }

  /// Not change-gated; this moves every tick.
  pub fn set_position(&self, position: f64) {
    let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
    self.position_bits.store(position.to_bits(), Ordering::Relaxed);
  }

  #[cfg(test)]
  pub fn duration(&self) -> f64 {
    self.lock().duration
  }

  pub fn set_duration(&self, duration: f64) -> bool {
    let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
    let mut inner = self.lock();
    if inner.duration == duration {
      return false;
    }
    inner.duration = duration;
    true
  }

  // --- Videos ---

  #[cfg(test)]
  pub fn videos(&self) -> Vec<VideoInfo> {
    self.lock().videos.clone()
  }

  pub fn video_count(&self) -> usize {
    self.lock().videos.len()
  }

  pub fn video(&self, index: usize) -> Option<VideoInfo> {
    self.lock().videos.get(index).cloned()
  }

  pub fn index_of(&self, id: &str) -> Option<usize> {
    self.lock().videos.iter().position(|v| v.id == id)
  }

  #[cfg(test)]
  pub fn current_index(&self) -> Option<usize> {
    self.lock().current_index
  }

  /// Current index and list length, read together.
  pub fn cursor(&self) -> (Option<usize>, usize) {
    let inner = self.lock();
    (inner.current_index, inner.videos.len())
  }

  /// Replace the browsed list wholesale. The current index follows the
  /// now-playing video into the new list, or clears if it isn't there.
  pub fn replace_videos(&self, videos: Vec<VideoInfo>) {
    let mut inner = self.lock();
    let remapped = inner.now_playing.as_ref().and_then(|playing| videos.iter().position(|v| v == playing));
    inner.videos = videos;
    inner.current_index = remapped;
  }

  // --- Queue ---

  /// Queue at the front: the most recently queued item plays next.
  pub fn add_to_queue(&self, video: VideoInfo) {
    self.lock().play_queue.push_front(video);
  }

  pub fn pop_next_from_queue(&self) -> Option<VideoInfo> {
    self.lock().play_queue.pop_front()
  }

  pub fn queue_len(&self) -> usize {
    self.lock().play_queue.len()
  }

  // --- Search cache ---

  pub fn cached_search(&self, query: &str) -> Option<Vec<VideoInfo>> {
    self.lock().search_cache.get(query).cloned()
  }

  pub fn cache_search(&self, query: String, results: Vec<VideoInfo>) {
    self.lock().search_cache.put(query, results);
  }

  // --- Focus ---

  pub fn focus(&self) -> FocusMode {
    self.lock().focus
  }

  pub fn set_focus(&self, focus: FocusMode) -> bool {
    let mut inner = self.lock();
    if inner.focus == focus {
      return false;
    }
    inner.focus = focus;
    true
  }
}
