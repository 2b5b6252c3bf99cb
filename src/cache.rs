use indexmap::IndexMap;

use crate::video::VideoInfo;

/// Bounded query -> results memo. Eviction is by insertion order, not recency of use.
#[derive(Debug, Default)]
pub struct SearchCache {
  capacity: usize,
  entries: IndexMap<String, Vec<VideoInfo>>,
}

impl SearchCache {
  pub fn new(capacity: usize) -> Self {
    Self { capacity, entries: IndexMap::with_capacity(capacity) }
  }

  pub fn get(&self, query: &str) -> Option<&Vec<VideoInfo>> {
    self.entries.get(query)
  }

  /// Insert results for `query`. Re-inserting an existing query replaces its value
  /// in place and keeps its original eviction slot.
  pub fn put(&mut self, query: String, results: Vec<VideoInfo>) {
    if self.capacity == 0 {
      return;
    }
    if let Some(slot) = self.entries.get_mut(&query) {
      *slot = results;
      return;
    }
    if self.entries.len() >= self.capacity {
      // Front of the map = first inserted = oldest.
      self.entries.shift_remove_index(0);
    }
    self.entries.insert(query, results);
  }

  #[cfg(test)]
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  #[cfg(test)]
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
