//! Pure projection of a [`StateSnapshot`] into display strings.
//! The ratatui layer in `ui.rs` only lays these out.

use crate::state::{FocusMode, PlaybackState, StateSnapshot};
use crate::video::format_clock;

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
  pub title: String,
  pub uploader: String,
  pub duration: String,
  pub is_current: bool,
  pub queued: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingView {
  pub title: Option<String>,
  pub uploader: Option<String>,
  pub state: PlaybackState,
  pub status: String,
  pub timer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
  pub rows: Vec<RowView>,
  pub now_playing: NowPlayingView,
  /// Playback progress in `0.0..=1.0`.
  pub progress: f64,
  pub volume_label: String,
  pub autoplay_label: String,
  pub queue_label: String,
  pub focus: FocusMode,
}

fn queue_label(len: usize) -> String {
  match len {
    0 => "Queue: Empty".to_string(),
    1 => "Queue: 1 item".to_string(),
    n => format!("Queue: {} items", n),
  }
}

pub fn render_from(s: &StateSnapshot) -> ViewModel {
  let rows = s
    .videos
    .iter()
    .enumerate()
    .map(|(i, v)| RowView {
      title: v.title.clone(),
      uploader: v.uploader.clone(),
      duration: v.formatted_duration(),
      is_current: s.current_index == Some(i),
      queued: s.queue.contains(v),
    })
    .collect();

  let ratio = s.position / s.duration;
  let progress = if s.duration > 0.0 && ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };

  ViewModel {
    rows,
    now_playing: NowPlayingView {
      title: s.now_playing.as_ref().map(|v| v.title.clone()),
      uploader: s.now_playing.as_ref().map(|v| v.uploader.clone()),
      state: s.playback_state,
      status: format!("Status: {}", s.playback_state),
      timer: format!("{} / {}", format_clock(s.position), format_clock(s.duration)),
    },
    progress,
    volume_label: format!("Volume: {}%", s.volume),
    autoplay_label: format!("Autoplay [{}]", if s.autoplay { "ON" } else { "OFF" }),
    queue_label: queue_label(s.queue.len()),
    focus: s.focus,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::video::VideoInfo;

  fn snapshot() -> StateSnapshot {
    let videos = vec![VideoInfo::new("a", "Alpha", "Chan A", Some(65)), VideoInfo::new("b", "Beta", "Chan B", None)];
    StateSnapshot {
      now_playing: Some(videos[0].clone()),
      current_index: Some(0),
      queue: vec![videos[1].clone()],
      videos,
      playback_state: PlaybackState::Playing,
      position: 30.0,
      duration: 120.0,
      volume: 70,
      autoplay: true,
      focus: FocusMode::Results,
    }
  }

  #[test]
  fn rows_mark_current_and_queued() {
    let vm = render_from(&snapshot());
    assert_eq!(vm.rows.len(), 2);
    assert!(vm.rows[0].is_current && !vm.rows[0].queued);
    assert!(!vm.rows[1].is_current && vm.rows[1].queued);
    assert_eq!(vm.rows[0].duration, "01:05");
    assert_eq!(vm.rows[1].duration, "N/A");
  }

  #[test]
  fn now_playing_labels() {
    let vm = render_from(&snapshot());
    assert_eq!(vm.now_playing.title.as_deref(), Some("Alpha"));
    assert_eq!(vm.now_playing.status, "Status: Playing");
    assert_eq!(vm.now_playing.timer, "00:30 / 02:00");
    assert_eq!(vm.volume_label, "Volume: 70%");
    assert_eq!(vm.autoplay_label, "Autoplay [ON]");
    assert_eq!(vm.queue_label, "Queue: 1 item");
    assert!((vm.progress - 0.25).abs() < f64::EPSILON);
  }

  #[test]
  fn empty_state_renders_placeholders() {
    let vm = render_from(&StateSnapshot::default());
    assert!(vm.rows.is_empty());
    assert!(vm.now_playing.title.is_none());
    assert_eq!(vm.now_playing.status, "Status: Stopped");
    assert_eq!(vm.now_playing.timer, "00:00 / 00:00");
    assert_eq!(vm.queue_label, "Queue: Empty");
    assert_eq!(vm.autoplay_label, "Autoplay [OFF]");
    assert_eq!(vm.progress, 0.0);
  }

  #[test]
  fn progress_is_clamped_past_eof() {
    let mut s = snapshot();
    s.position = 130.0;
    assert_eq!(render_from(&s).progress, 1.0);
  }

  #[test]
  fn queue_label_pluralizes() {
    assert_eq!(queue_label(3), "Queue: 3 items");
  }
}
