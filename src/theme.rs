use ratatui::style::Color;

pub struct Theme {
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub warning: Color,
  pub error: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub const THEME: Theme = Theme {
  bg: Color::Rgb(24, 24, 32),
  fg: Color::Rgb(220, 220, 228),
  muted: Color::Rgb(128, 128, 148),
  accent: Color::Rgb(255, 92, 92),
  border: Color::Rgb(70, 70, 90),
  highlight_fg: Color::Rgb(24, 24, 32),
  highlight_bg: Color::Rgb(255, 140, 120),
  stripe_bg: Color::Rgb(30, 30, 40),
  status: Color::Rgb(130, 200, 160),
  warning: Color::Rgb(240, 200, 100),
  error: Color::Rgb(250, 100, 100),
  key_fg: Color::Rgb(24, 24, 32),
  key_bg: Color::Rgb(160, 160, 180),
};
