use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Gauge, List, ListItem, ListState, Padding, Paragraph},
};

use crate::orchestrator::{Notice, NoticeLevel};
use crate::state::{FocusMode, PlaybackState};
use crate::theme::{THEME, Theme};
use crate::view::{NowPlayingView, ViewModel};

// --- Helpers ---

/// Compute the display width of the first `n` chars (accounting for double-width CJK).
pub fn display_width(s: &str, n: usize) -> usize {
  use unicode_width::UnicodeWidthChar;
  s.chars().take(n).map(|c| c.width().unwrap_or(0)).sum()
}

/// Truncate a string to `max_width` characters, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if s.chars().count() <= max_width {
    s.to_string()
  } else {
    let truncated: String = s.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
  }
}

fn bordered(theme: &Theme, focused: bool) -> Block<'static> {
  let color = if focused { theme.accent } else { theme.border };
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(color))
}

/// Everything the renderer reads besides the view model.
pub struct InputView<'a> {
  pub text: &'a str,
  pub cursor_position: usize,
  pub scroll: &'a mut usize,
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, view: &ViewModel, notice: Option<&Notice>, input: InputView<'_>, list: &mut ListState) {
  let theme = &THEME;

  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, main_area, status_area, input_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(6),
    Constraint::Length(1),
    Constraint::Length(3),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  let [results_area, sidebar_area] =
    Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)]).areas(main_area);

  render_header(frame, theme, header_area);
  render_results(frame, theme, view, results_area, list);
  render_sidebar(frame, theme, view, sidebar_area);
  render_status(frame, theme, notice, status_area);
  render_input(frame, theme, view.focus, input, input_area);
  render_footer(frame, theme, view, footer_area);
}

fn render_header(frame: &mut Frame, theme: &Theme, area: Rect) {
  let left = Line::from(Span::styled(" ▶ ytq ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let version = format!("v{} ", env!("CARGO_PKG_VERSION"));
  let right = Line::from(Span::styled(&version, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(version.len() as u16), width: version.len() as u16, ..area };
  frame.render_widget(right, right_area);
}

fn render_results(frame: &mut Frame, theme: &Theme, view: &ViewModel, area: Rect, list: &mut ListState) {
  let block = bordered(theme, view.focus == FocusMode::Results)
    .title(" Results ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD));

  if view.rows.is_empty() {
    let text = vec![
      Line::from(""),
      Line::from(Span::styled("No videos yet.", Style::default().fg(theme.fg))),
      Line::from(""),
      Line::from(Span::styled("Type a query below and press Enter.", Style::default().fg(theme.muted))),
    ];
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).block(block), area);
    return;
  }

  // Inner width: area minus 2 borders minus 2 chars for highlight symbol ("▶ ")
  let inner_w = area.width.saturating_sub(4) as usize;

  let items: Vec<ListItem> = view
    .rows
    .iter()
    .enumerate()
    .map(|(i, row)| {
      let bg = if i % 2 == 1 { theme.stripe_bg } else { theme.bg };
      let marker = if row.is_current {
        "♪ "
      } else if row.queued {
        "+ "
      } else {
        "  "
      };
      let right = format!("{}  {}", row.uploader, row.duration);
      let right_w = right.chars().count();
      let title_max = inner_w.saturating_sub(right_w + 4);
      let title = truncate_str(&row.title, title_max);
      let gap = inner_w.saturating_sub(title.chars().count() + right_w + 2);
      let title_style = if row.is_current {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
      } else {
        Style::default().fg(theme.fg)
      };
      let line = Line::from(vec![
        Span::styled(marker, Style::default().fg(theme.accent)),
        Span::styled(title, title_style),
        Span::raw(" ".repeat(gap)),
        Span::styled(right, Style::default().fg(theme.muted)),
      ]);
      ListItem::new(line).bg(bg)
    })
    .collect();

  let list_widget = List::new(items)
    .block(block)
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list_widget, area, list);
}

fn state_color(theme: &Theme, state: PlaybackState) -> ratatui::style::Color {
  match state {
    PlaybackState::Playing => theme.status,
    PlaybackState::Buffering | PlaybackState::Paused => theme.warning,
    PlaybackState::Error => theme.error,
    PlaybackState::Stopped => theme.muted,
  }
}

fn now_playing_lines<'a>(theme: &Theme, np: &'a NowPlayingView, inner_w: usize) -> Vec<Line<'a>> {
  let mut lines = vec![Line::from("")];
  match (&np.title, &np.uploader) {
    (Some(title), uploader) => {
      lines.push(Line::from(Span::styled(
        truncate_str(title, inner_w),
        Style::default().fg(theme.fg).add_modifier(Modifier::BOLD),
      )));
      if let Some(uploader) = uploader {
        let label = "Uploader  ";
        lines.push(Line::from(vec![
          Span::styled(label, Style::default().fg(theme.muted)),
          Span::styled(truncate_str(uploader, inner_w.saturating_sub(label.len())), Style::default().fg(theme.fg)),
        ]));
      }
    }
    (None, _) => lines.push(Line::from(Span::styled("Nothing playing", Style::default().fg(theme.muted)))),
  }
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(np.status.as_str(), Style::default().fg(state_color(theme, np.state)))));
  lines.push(Line::from(Span::styled(np.timer.as_str(), Style::default().fg(theme.fg))));
  lines
}

fn render_sidebar(frame: &mut Frame, theme: &Theme, view: &ViewModel, area: Rect) {
  let [info_area, gauge_area, settings_area] =
    Layout::vertical([Constraint::Min(7), Constraint::Length(3), Constraint::Length(5)]).areas(area);

  let info_block = bordered(theme, false)
    .title(Span::styled(" Now Playing ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .padding(Padding::horizontal(1));
  let inner_w = info_area.width.saturating_sub(4) as usize;
  let lines = now_playing_lines(theme, &view.now_playing, inner_w);
  frame.render_widget(Paragraph::new(lines).block(info_block), info_area);

  let gauge = Gauge::default()
    .block(bordered(theme, false))
    .gauge_style(Style::default().fg(theme.accent).bg(theme.stripe_bg))
    .ratio(view.progress)
    .label(Span::styled(view.now_playing.timer.as_str(), Style::default().fg(theme.fg)));
  frame.render_widget(gauge, gauge_area);

  let settings = vec![
    Line::from(Span::styled(view.volume_label.as_str(), Style::default().fg(theme.fg))),
    Line::from(Span::styled(view.autoplay_label.as_str(), Style::default().fg(theme.fg))),
    Line::from(Span::styled(view.queue_label.as_str(), Style::default().fg(theme.muted))),
  ];
  frame.render_widget(Paragraph::new(settings).block(bordered(theme, false).padding(Padding::horizontal(1))), settings_area);
}

fn render_status(frame: &mut Frame, theme: &Theme, notice: Option<&Notice>, area: Rect) {
  let (text, style) = match notice {
    Some(n) if n.level == NoticeLevel::Error => (format!(" ⚠  {}", n.text), Style::default().fg(theme.error)),
    Some(n) if n.level == NoticeLevel::Warning => (format!(" ⚠  {}", n.text), Style::default().fg(theme.warning)),
    Some(n) => (format!(" ♪ {}", n.text), Style::default().fg(theme.status)),
    None => (" Ready".to_string(), Style::default().fg(theme.muted)),
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_input(frame: &mut Frame, theme: &Theme, focus: FocusMode, input: InputView<'_>, area: Rect) {
  let focused = focus == FocusMode::Search;
  let border_color = if focused { theme.accent } else { theme.border };
  let input_block = bordered(theme, focused)
    .title(" Search YouTube ")
    .title_style(Style::default().fg(border_color))
    .padding(Padding::horizontal(1));

  let inner_w = area.width.saturating_sub(4) as usize;
  let cursor_col = display_width(input.text, input.cursor_position);
  let scroll = input.scroll;
  *scroll = scroll_for_cursor(cursor_col, *scroll, inner_w);

  let visible: String = input
    .text
    .chars()
    .scan(0usize, |col, c| {
      let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
      let start = *col;
      *col += w;
      Some((start, *col, c))
    })
    .skip_while(|(_, end, _)| *end <= *scroll)
    .take_while(|(start, _, _)| *start < *scroll + inner_w)
    .map(|(_, _, c)| c)
    .collect();

  let paragraph = Paragraph::new(visible).style(Style::default().fg(theme.fg)).block(input_block);
  frame.render_widget(paragraph, area);

  if focused && inner_w > 0 {
    let cursor_x = area.x + 2 + cursor_col.saturating_sub(*scroll) as u16;
    frame.set_cursor_position((cursor_x, area.y + 1));
  }
}

/// Horizontal scroll that keeps `cursor_col` inside a field `inner_w` columns wide.
/// With no room at all the scroll is left alone.
fn scroll_for_cursor(cursor_col: usize, scroll: usize, inner_w: usize) -> usize {
  if inner_w == 0 {
    scroll
  } else if cursor_col < scroll {
    cursor_col
  } else if cursor_col >= scroll + inner_w {
    cursor_col + 1 - inner_w
  } else {
    scroll
  }
}

fn render_footer(frame: &mut Frame, theme: &Theme, view: &ViewModel, area: Rect) {
  let active = matches!(view.now_playing.state, PlaybackState::Playing | PlaybackState::Paused);
  let keys: Vec<(&str, &str)> = match view.focus {
    FocusMode::Search => {
      let mut k = vec![("Enter", "Search"), ("Tab", "Results")];
      if active {
        k.push(("^s", "Stop"));
      }
      k.push(("^c", "Quit"));
      k
    }
    FocusMode::Results => {
      let mut k = vec![("Enter", "Play"), ("j/k", "Navigate"), ("l", "Queue"), ("n/p", "Next/Prev")];
      if active {
        let pause_label = if view.now_playing.state == PlaybackState::Paused { "Resume" } else { "Pause" };
        k.push(("Space", pause_label));
        k.push(("←/→", "Seek"));
        k.push(("^s", "Stop"));
      }
      k.push(("+/-", "Volume"));
      k.push(("a", "Autoplay"));
      k.push(("Tab", "Search"));
      k.push(("q", "Quit"));
      k
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);
}
