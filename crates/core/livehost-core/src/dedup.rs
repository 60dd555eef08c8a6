//! Spam dedup filter for incoming chat

use crate::events::ChatEvent;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Time-bounded filter dropping repeats of the same (user, message) pair.
///
/// Events arrive sequentially from one ingestion stream, so the filter is
/// plain mutable state with no interior locking. Expired entries are purged
/// lazily on each check.
pub struct DedupFilter {
    cooldown: Duration,
    recent: HashMap<(String, String), Instant>,
}

impl DedupFilter {
    /// Create a filter with the given cooldown window
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            recent: HashMap::new(),
        }
    }

    /// Returns true when the event should be forwarded downstream. A repeat
    /// of the same (user, message) pair inside the cooldown window is
    /// dropped silently.
    pub fn check(&mut self, event: &ChatEvent) -> bool {
        let now = Instant::now();
        self.recent.retain(|_, seen| now.duration_since(*seen) < self.cooldown);

        let key = (event.user_id.clone(), event.message.clone());
        if self.recent.contains_key(&key) {
            return false;
        }
        self.recent.insert(key, now);
        true
    }

    /// Number of live entries, after purging
    pub fn len(&mut self) -> usize {
        let now = Instant::now();
        self.recent.retain(|_, seen| now.duration_since(*seen) < self.cooldown);
        self.recent.len()
    }

    /// Whether the window is currently empty
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }
}

impl Default for DedupFilter {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
