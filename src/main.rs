mod app;
mod cache;
mod config;
mod constants;
mod engine;
mod input;
mod logging;
mod orchestrator;
mod state;
mod theme;
mod ui;
mod video;
mod view;
mod youtube;

use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::Parser;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use tokio::sync::mpsc;
use tracing::{error, info};

use app::App;
use config::Config;
use constants::constants;
use engine::{MpvEngine, MpvOptions, find_executable};
use orchestrator::Orchestrator;
use state::SharedState;
use ui::InputView;
use youtube::YtDlpSearch;

// --- CLI ---

/// Search YouTube and play results through mpv, from the terminal.
#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let _args = Args::parse();

  let _log_guard = match logging::init() {
    Ok(guard) => Some(guard),
    Err(e) => {
      eprintln!("warning: file logging disabled: {:#}", e);
      None
    }
  };
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let c = constants();
  if find_executable(&c.mpv_binary).is_none() {
    error!(binary = %c.mpv_binary, "mpv not found on PATH");
    return Err(anyhow!("mpv not found on PATH. Install it with: brew install mpv (macOS) or apt install mpv (Linux)"));
  }

  let config = Config::load();
  let state = Arc::new(SharedState::new(config.clone()));

  let (engine_tx, engine_rx) = mpsc::channel(c.engine_event_capacity);
  let options = MpvOptions { ytdl_format: config.default_quality.clone(), volume: state.volume() };
  let engine = match MpvEngine::spawn(options, engine_tx).await {
    Ok(engine) => Arc::new(engine),
    Err(e) => {
      let reason = format!("{:#}", e);
      error!(err = %reason, "engine: mpv failed to start, playback disabled");
      Arc::new(MpvEngine::unavailable())
    }
  };

  let search = Arc::new(YtDlpSearch::new(config.max_search_results));
  let (app_tx, app_rx) = mpsc::unbounded_channel();
  let orchestrator = Orchestrator::new(Arc::clone(&state), Arc::clone(&engine), search, app_tx);
  let mut app = App::new(orchestrator, engine_rx, app_rx);

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, &mut app);
  ratatui::restore();

  engine.terminate();
  app.save_config();
  info!(
    transitions = ?state.transitions(),
    queued = state.queue_len(),
    state = %state.playback_state(),
    "final playback state"
  );
  if let Err(e) = &result {
    let reason = format!("{:#}", e);
    error!(err = %reason, "exiting with error");
  }
  info!("shutdown complete");
  result
}

fn run(terminal: &mut DefaultTerminal, app: &mut App<MpvEngine, YtDlpSearch>) -> Result<()> {
  let poll = constants().input_poll();

  while !app.should_quit {
    app.check_pending();

    if app.needs_redraw {
      let view = app.view();
      let notice = app.orchestrator.notice();
      let input =
        InputView { text: &app.input, cursor_position: app.cursor_position, scroll: &mut app.input_scroll };
      let list = &mut app.list_state;
      terminal.draw(|frame| ui::ui(frame, &view, notice, input, list))?;
      app.needs_redraw = false;
    }

    if event::poll(poll)? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(app, key),
        Event::Resize(..) => app.needs_redraw = true,
        _ => {}
      }
    }
  }
  Ok(())
}
