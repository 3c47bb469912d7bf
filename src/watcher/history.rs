use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use super::ChangeEvent;

/// Default number of change events retained in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// A bounded ring buffer of change events, oldest evicted first.
pub struct ChangeHistory {
    events: Mutex<VecDeque<ChangeEvent>>,
    capacity: usize,
}

impl ChangeHistory {
    /// Creates a history bounded at `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Appends an event, evicting the oldest when full.
    pub fn push(&self, event: ChangeEvent) {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);

        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ChangeEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = events.len().saturating_sub(limit);
        events.iter().skip(skip).cloned().collect()
    }

    /// Every retained event, oldest first.
    pub fn snapshot(&self) -> Vec<ChangeEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().cloned().collect()
    }

    /// How many events are currently retained.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the history holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ChangeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;

    use crate::loader::Category;
    use crate::watcher::ChangeKind;

    use super::*;

    fn event(index: usize) -> ChangeEvent {
        ChangeEvent {
            category: Category::Network,
            path: PathBuf::from(format!("/cfg/network-{index}.toml")),
            kind: ChangeKind::Modified,
            timestamp: Utc::now(),
            before: None,
            after: None,
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let history = ChangeHistory::new(3);
        for i in 0..5 {
            history.push(event(i));
        }

        assert_eq!(history.len(), 3);
        let retained = history.snapshot();
        assert_eq!(retained[0].path, PathBuf::from("/cfg/network-2.toml"));
        assert_eq!(retained[2].path, PathBuf::from("/cfg/network-4.toml"));
    }

    #[test]
    fn recent_returns_newest_slice_oldest_first() {
        let history = ChangeHistory::new(10);
        for i in 0..4 {
            history.push(event(i));
        }

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].path, PathBuf::from("/cfg/network-2.toml"));
        assert_eq!(recent[1].path, PathBuf::from("/cfg/network-3.toml"));
    }

    #[test]
    fn recent_with_large_limit_returns_everything() {
        let history = ChangeHistory::new(10);
        history.push(event(0));

        assert_eq!(history.recent(50).len(), 1);
        assert!(!history.is_empty());
    }
}
