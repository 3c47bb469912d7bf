use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
        mpsc,
    },
    thread,
    time::{Duration, Instant},
};

use chrono::Utc;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tracing::{debug, warn};

use crate::{
    core::{ConfmendError, Result},
    loader::{Category, ConfigLoader},
};

use super::{
    ChangeEvent, ChangeKind, ChangeHistory, ReloadEvent,
    debounce::Debouncer,
    events::{classify, is_config_file},
    subscribers::{CallbackHandle, CallbackRegistry},
};

/// Window within which repeated events for one file collapse to one.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// How long `stop_watching` waits for the watcher thread before
/// abandoning it.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(200);

struct WatchSession {
    // Held to keep the native watcher alive; dropping it stops event
    // delivery and disconnects the channel.
    _watcher: RecommendedWatcher,
    thread: thread::JoinHandle<()>,
}

/// Observes the configuration directories for document changes.
///
/// Raw notify events are filtered (extension, transient names),
/// debounced per absolute path, classified, and turned into logical
/// `ChangeEvent`s. Non-delete events trigger a category reload; every
/// event lands in the bounded history and is fanned out to subscribers
/// from a dedicated watcher thread.
pub struct ConfigWatcher {
    loader: Arc<ConfigLoader>,
    directories: Vec<PathBuf>,
    history: Arc<ChangeHistory>,
    change_callbacks: CallbackRegistry<ChangeEvent>,
    reload_callbacks: CallbackRegistry<ReloadEvent>,
    running: Arc<AtomicBool>,
    session: Mutex<Option<WatchSession>>,
}

impl ConfigWatcher {
    /// Creates a watcher over the given directories, recursively.
    pub fn new(loader: Arc<ConfigLoader>, directories: Vec<PathBuf>) -> Self {
        Self {
            loader,
            directories,
            history: Arc::new(ChangeHistory::default()),
            change_callbacks: CallbackRegistry::new(),
            reload_callbacks: CallbackRegistry::new(),
            running: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        }
    }

    /// The bounded change history shared with the watcher thread.
    pub fn history(&self) -> &Arc<ChangeHistory> {
        &self.history
    }

    /// Whether the watcher thread is currently active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribes to logical change events.
    pub fn add_change_callback(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.change_callbacks.register(callback)
    }

    /// Subscribes to completed reloads.
    pub fn add_reload_callback(
        &self,
        callback: impl Fn(&ReloadEvent) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.reload_callbacks.register(callback)
    }

    /// Total subscriber panics caught across both registries.
    pub fn callback_failures(&self) -> u64 {
        self.change_callbacks.failure_count() + self.reload_callbacks.failure_count()
    }

    /// Starts observing the configured directories.
    ///
    /// Calling this while already watching logs a warning and is a
    /// no-op.
    ///
    /// # Errors
    /// Returns `ConfmendError::Watcher` if the native watcher cannot be
    /// initialized, a directory cannot be watched, or the watcher thread
    /// cannot be spawned.
    pub fn start_watching(&self) -> Result<()> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);

        if session.is_some() {
            warn!("file watching already active; ignoring start request");
            return Ok(());
        }

        let (event_tx, event_rx) = mpsc::channel::<(PathBuf, ChangeKind)>();

        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else {
                return;
            };
            let Some(kind) = classify(&event.kind) else {
                return;
            };

            for path in event.paths {
                if is_config_file(&path) {
                    let _ = event_tx.send((path, kind));
                }
            }
        })
        .map_err(|e| ConfmendError::watcher("start", e))?;

        for directory in &self.directories {
            watcher
                .watch(directory, RecursiveMode::Recursive)
                .map_err(|e| ConfmendError::watcher("start", e))?;
        }

        self.running.store(true, Ordering::SeqCst);

        let loader = Arc::clone(&self.loader);
        let history = Arc::clone(&self.history);
        let change_callbacks = self.change_callbacks.clone();
        let reload_callbacks = self.reload_callbacks.clone();
        let running = Arc::clone(&self.running);

        let thread = thread::Builder::new()
            .name("confmend-watcher".to_string())
            .spawn(move || {
                let mut debouncer = Debouncer::new(DEBOUNCE_WINDOW);

                loop {
                    match event_rx.recv_timeout(POLL_INTERVAL) {
                        Ok((path, kind)) => {
                            if !running.load(Ordering::SeqCst) {
                                break;
                            }
                            debouncer.record(path, kind, Instant::now());
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            if !running.load(Ordering::SeqCst) {
                                break;
                            }
                        }
                        Err(mpsc::RecvTimeoutError::Disconnected) => break,
                    }

                    for (path, kind) in debouncer.drain_ready(Instant::now()) {
                        handle_change(
                            &loader,
                            &history,
                            &change_callbacks,
                            &reload_callbacks,
                            path,
                            kind,
                        );
                    }
                }

                debug!("watcher thread exiting");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                ConfmendError::watcher("start", e)
            })?;

        *session = Some(WatchSession {
            _watcher: watcher,
            thread,
        });

        debug!(directories = ?self.directories, "file watching started");
        Ok(())
    }

    /// Stops observing and joins the watcher thread with a bounded wait.
    ///
    /// If the thread does not terminate within `STOP_TIMEOUT` it is
    /// abandoned with a logged warning and the call still succeeds.
    ///
    /// # Errors
    /// Currently infallible in practice; kept fallible for parity with
    /// `start_watching`.
    pub fn stop_watching(&self) -> Result<()> {
        let taken = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            session.take()
        };

        let Some(session) = taken else {
            debug!("file watching not active; nothing to stop");
            return Ok(());
        };

        self.running.store(false, Ordering::SeqCst);
        // Dropping the native watcher disconnects the event channel,
        // which wakes the thread promptly.
        drop(session._watcher);

        let deadline = Instant::now() + STOP_TIMEOUT;
        while !session.thread.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }

        if session.thread.is_finished() {
            if session.thread.join().is_err() {
                warn!("watcher thread terminated with a panic");
            }
        } else {
            warn!(
                timeout_secs = STOP_TIMEOUT.as_secs(),
                "watcher thread did not stop within timeout; abandoning it"
            );
        }

        debug!("file watching stopped");
        Ok(())
    }
}

fn handle_change(
    loader: &Arc<ConfigLoader>,
    history: &Arc<ChangeHistory>,
    change_callbacks: &CallbackRegistry<ChangeEvent>,
    reload_callbacks: &CallbackRegistry<ReloadEvent>,
    path: PathBuf,
    kind: ChangeKind,
) {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return;
    };
    let Some(category) = Category::from_file_stem(stem) else {
        debug!(path = %path.display(), "ignoring change to non-category config file");
        return;
    };

    let event = if kind == ChangeKind::Deleted {
        // Deliberately neither clears nor reloads the in-memory
        // document; the last loaded state stays serveable.
        let before = loader.document(category);
        ChangeEvent {
            category,
            path,
            kind,
            timestamp: Utc::now(),
            before: (!before.is_empty()).then(|| before.data.clone()),
            after: None,
        }
    } else {
        let (before, after) = loader.reload(category);
        let event = ChangeEvent {
            category,
            path,
            kind,
            timestamp: Utc::now(),
            before: (!before.is_empty()).then(|| before.data.clone()),
            after: Some(after.data.clone()),
        };
        reload_callbacks.notify(&ReloadEvent {
            category,
            document: after,
        });
        event
    };

    history.push(event.clone());
    change_callbacks.notify(&event);
}
