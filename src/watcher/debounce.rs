use std::{
    collections::HashMap,
    path::PathBuf,
    time::{Duration, Instant},
};

use super::ChangeKind;

/// Collapses repeated events for the same file into one logical change.
///
/// Trailing-edge: every event for a path refreshes its timer, and the
/// path is released only after a full quiet window. Reloads therefore
/// never observe a file mid-write.
pub(crate) struct Debouncer {
    window: Duration,
    pending: HashMap<PathBuf, (ChangeKind, Instant)>,
}

impl Debouncer {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    /// Records a raw event, merging it into any pending change for the
    /// same path.
    ///
    /// A modification following a pending creation stays a creation;
    /// otherwise the newest kind wins.
    pub(crate) fn record(&mut self, path: PathBuf, kind: ChangeKind, now: Instant) {
        let merged = match self.pending.get(&path) {
            Some((ChangeKind::Created, _)) if kind == ChangeKind::Modified => ChangeKind::Created,
            _ => kind,
        };
        self.pending.insert(path, (merged, now));
    }

    /// Removes and returns every pending change that has been quiet for
    /// at least the window.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Vec<(PathBuf, ChangeKind)> {
        let ready: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, last))| now.duration_since(*last) >= self.window)
            .map(|(path, _)| path.clone())
            .collect();

        ready
            .into_iter()
            .filter_map(|path| {
                self.pending
                    .remove(&path)
                    .map(|(kind, _)| (path, kind))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    const WINDOW: Duration = Duration::from_secs(1);

    fn path(name: &str) -> PathBuf {
        Path::new("/cfg").join(name)
    }

    #[test]
    fn nothing_is_ready_inside_the_window() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        debouncer.record(path("network.toml"), ChangeKind::Modified, start);
        assert!(
            debouncer
                .drain_ready(start + Duration::from_millis(500))
                .is_empty()
        );
    }

    #[test]
    fn repeats_collapse_to_the_final_event() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        debouncer.record(path("network.toml"), ChangeKind::Modified, start);
        debouncer.record(
            path("network.toml"),
            ChangeKind::Modified,
            start + Duration::from_millis(200),
        );

        // Still quiet only relative to the second event.
        assert!(
            debouncer
                .drain_ready(start + Duration::from_millis(1100))
                .is_empty()
        );

        let ready = debouncer.drain_ready(start + Duration::from_millis(1300));
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0], (path("network.toml"), ChangeKind::Modified));

        // Drained entries do not reappear.
        assert!(
            debouncer
                .drain_ready(start + Duration::from_secs(5))
                .is_empty()
        );
    }

    #[test]
    fn creation_followed_by_modification_stays_a_creation() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        debouncer.record(path("theme.toml"), ChangeKind::Created, start);
        debouncer.record(
            path("theme.toml"),
            ChangeKind::Modified,
            start + Duration::from_millis(100),
        );

        let ready = debouncer.drain_ready(start + Duration::from_secs(2));
        assert_eq!(ready, vec![(path("theme.toml"), ChangeKind::Created)]);
    }

    #[test]
    fn deletion_supersedes_a_pending_modification() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        debouncer.record(path("theme.toml"), ChangeKind::Modified, start);
        debouncer.record(
            path("theme.toml"),
            ChangeKind::Deleted,
            start + Duration::from_millis(100),
        );

        let ready = debouncer.drain_ready(start + Duration::from_secs(2));
        assert_eq!(ready, vec![(path("theme.toml"), ChangeKind::Deleted)]);
    }

    #[test]
    fn distinct_paths_do_not_interfere() {
        let mut debouncer = Debouncer::new(WINDOW);
        let start = Instant::now();

        debouncer.record(path("network.toml"), ChangeKind::Modified, start);
        debouncer.record(
            path("theme.toml"),
            ChangeKind::Modified,
            start + Duration::from_millis(600),
        );

        let ready = debouncer.drain_ready(start + Duration::from_millis(1100));
        assert_eq!(ready, vec![(path("network.toml"), ChangeKind::Modified)]);
    }
}
