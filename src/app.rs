use ratatui::widgets::ListState;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::engine::{EngineEvent, PlaybackEngine};
use crate::orchestrator::{AppEvent, Orchestrator};
use crate::view::{ViewModel, render_from};
use crate::youtube::SearchService;

pub struct App<E, S> {
  pub input: String,
  pub cursor_position: usize,
  pub input_scroll: usize,
  pub list_state: ListState,
  pub orchestrator: Orchestrator<E, S>,
  pub should_quit: bool,
  /// Set by anything that changes what is on screen; cleared after each draw.
  pub needs_redraw: bool,
  engine_rx: mpsc::Receiver<EngineEvent>,
  app_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl<E: PlaybackEngine, S: SearchService> App<E, S> {
  pub fn new(
    orchestrator: Orchestrator<E, S>,
    engine_rx: mpsc::Receiver<EngineEvent>,
    app_rx: mpsc::UnboundedReceiver<AppEvent>,
  ) -> Self {
    Self {
      input: String::new(),
      cursor_position: 0,
      input_scroll: 0,
      list_state: ListState::default(),
      orchestrator,
      should_quit: false,
      needs_redraw: true,
      engine_rx,
      app_rx,
    }
  }

  pub fn view(&self) -> ViewModel {
    render_from(&self.orchestrator.state().snapshot())
  }

  /// Drain background completions and engine notifications without blocking.
  pub fn check_pending(&mut self) {
    while let Ok(event) = self.app_rx.try_recv() {
      let is_search = matches!(event, AppEvent::SearchFinished { .. });
      if self.orchestrator.handle_app_event(event) {
        self.needs_redraw = true;
        if is_search {
          self.reset_selection();
        }
      }
    }

    while let Ok(event) = self.engine_rx.try_recv() {
      if self.orchestrator.handle_engine_event(event) {
        self.needs_redraw = true;
      }
    }

    if self.orchestrator.expire_notice() {
      self.needs_redraw = true;
    }
    self.clamp_selection();
  }

  pub fn trigger_search(&mut self) {
    self.needs_redraw |= self.orchestrator.search(&self.input);
    // A cache hit has already replaced the list.
    if !self.orchestrator.search_pending() {
      self.reset_selection();
    }
  }

  pub fn play_selected(&mut self) {
    let Some(index) = self.list_state.selected() else { return };
    self.needs_redraw |= self.orchestrator.play_video(index);
  }

  pub fn queue_selected(&mut self) {
    let Some(index) = self.list_state.selected() else { return };
    self.needs_redraw |= self.orchestrator.queue_video(index);
  }

  pub fn select_next(&mut self) {
    let count = self.orchestrator.state().video_count();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| (i + 1) % count);
      self.list_state.select(Some(i));
    }
  }

  pub fn select_previous(&mut self) {
    let count = self.orchestrator.state().video_count();
    if count > 0 {
      let i = self.list_state.selected().map_or(0, |i| if i == 0 { count - 1 } else { i - 1 });
      self.list_state.select(Some(i));
    }
  }

  fn reset_selection(&mut self) {
    let count = self.orchestrator.state().video_count();
    self.list_state.select(if count > 0 { Some(0) } else { None });
  }

  fn clamp_selection(&mut self) {
    let count = self.orchestrator.state().video_count();
    match self.list_state.selected() {
      _ if count == 0 => self.list_state.select(None),
      Some(i) if i >= count => self.list_state.select(Some(count - 1)),
      None => self.list_state.select(Some(0)),
      Some(_) => {}
    }
  }

  /// Persist volume and autoplay along with the rest of the preferences.
  pub fn save_config(&self) {
    let config = self.orchestrator.state().persisted_config();
    debug!(volume = config.volume, autoplay = config.autoplay, "config: saving on shutdown");
    config.save();
    info!("config saved");
  }
}
