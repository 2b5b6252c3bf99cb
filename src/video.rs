/// A playable catalog item. Identity is the catalog id.
#[derive(Debug, Clone)]
pub struct VideoInfo {
  pub id: String,
  pub title: String,
  pub uploader: String,
  /// Length in whole seconds, `None` when the catalog doesn't report one.
  pub duration: Option<u64>,
}

impl VideoInfo {
  pub fn new(id: impl Into<String>, title: impl Into<String>, uploader: impl Into<String>, duration: Option<u64>) -> Self {
    Self { id: id.into(), title: title.into(), uploader: uploader.into(), duration }
  }

  pub fn url(&self) -> String {
    format!("https://www.youtube.com/watch?v={}", self.id)
  }

  pub fn formatted_duration(&self) -> String {
    match self.duration {
      Some(secs) => format_hms(secs),
      None => "N/A".to_string(),
    }
  }
}

impl PartialEq for VideoInfo {
  fn eq(&self, other: &Self) -> bool {
    self.id == other.id
  }
}

impl Eq for VideoInfo {}

/// `MM:SS`, or `HH:MM:SS` once past the hour.
pub fn format_hms(total: u64) -> String {
  let (h, rem) = (total / 3600, total % 3600);
  let (m, s) = (rem / 60, rem % 60);
  if h > 0 { format!("{:02}:{:02}:{:02}", h, m, s) } else { format!("{:02}:{:02}", m, s) }
}

/// Format a playback clock value. Non-positive and non-finite values show as `00:00`.
pub fn format_clock(seconds: f64) -> String {
  if !seconds.is_finite() || seconds <= 0.0 {
    return "00:00".to_string();
  }
  format_hms(seconds as u64)
}
