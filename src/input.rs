use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};

use crate::app::App;
use crate::engine::PlaybackEngine;
use crate::state::FocusMode;
use crate::youtube::SearchService;

// --- Helpers ---

/// Convert a char index to a byte offset within the string.
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
  s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// --- Event Handling ---

pub fn handle_key_event<E: PlaybackEngine, S: SearchService>(app: &mut App<E, S>, key: event::KeyEvent) {
  app.needs_redraw = true;

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
    app.orchestrator.stop();
    return;
  }

  if key.code == KeyCode::Tab {
    app.orchestrator.toggle_focus();
    return;
  }

  match app.orchestrator.state().focus() {
    FocusMode::Search => handle_search_key(app, key),
    FocusMode::Results => handle_results_key(app, key),
  }
}

fn handle_search_key<E: PlaybackEngine, S: SearchService>(app: &mut App<E, S>, key: event::KeyEvent) {
  match key.code {
    KeyCode::Enter => {
      app.trigger_search();
    }
    KeyCode::Char(c) => {
      let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
      app.input.insert(byte_idx, c);
      app.cursor_position += 1;
    }
    KeyCode::Backspace => {
      if app.cursor_position > 0 {
        app.cursor_position -= 1;
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Delete => {
      if app.cursor_position < app.input.chars().count() {
        let byte_idx = char_to_byte_index(&app.input, app.cursor_position);
        app.input.remove(byte_idx);
      }
    }
    KeyCode::Left => {
      app.cursor_position = app.cursor_position.saturating_sub(1);
    }
    KeyCode::Right => {
      if app.cursor_position < app.input.chars().count() {
        app.cursor_position += 1;
      }
    }
    KeyCode::Home => {
      app.cursor_position = 0;
    }
    KeyCode::End => {
      app.cursor_position = app.input.chars().count();
    }
    KeyCode::Esc => {
      if !app.input.is_empty() {
        app.input.clear();
        app.cursor_position = 0;
        app.input_scroll = 0;
      } else if app.orchestrator.state().video_count() > 0 {
        app.orchestrator.state().set_focus(FocusMode::Results);
      } else {
        app.should_quit = true;
      }
    }
    KeyCode::Down => {
      if app.orchestrator.state().video_count() > 0 {
        app.orchestrator.state().set_focus(FocusMode::Results);
      }
    }
    _ => {}
  }
}

fn handle_results_key<E: PlaybackEngine, S: SearchService>(app: &mut App<E, S>, key: event::KeyEvent) {
  let config = app.orchestrator.state().config();
  match key.code {
    KeyCode::Enter => app.play_selected(),
    KeyCode::Char(' ') => {
      app.orchestrator.toggle_pause();
    }
    KeyCode::Char('n') => {
      app.orchestrator.advance_to_next();
    }
    KeyCode::Char('p') => {
      app.orchestrator.advance_to_previous();
    }
    KeyCode::Char('a') => {
      app.orchestrator.toggle_autoplay();
    }
    KeyCode::Char('l') => app.queue_selected(),
    KeyCode::Char('+') | KeyCode::Char('=') => {
      app.orchestrator.volume_up(config.volume_step);
    }
    KeyCode::Char('-') => {
      app.orchestrator.volume_down(config.volume_step);
    }
    KeyCode::Right => app.orchestrator.seek(config.seek_step_secs),
    KeyCode::Left => app.orchestrator.seek(-config.seek_step_secs),
    KeyCode::Down | KeyCode::Char('j') => app.select_next(),
    KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
    KeyCode::Char('q') => {
      app.should_quit = true;
    }
    KeyCode::Esc => {
      app.orchestrator.state().set_focus(FocusMode::Search);
    }
    _ => {}
  }
}
