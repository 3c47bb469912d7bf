//! Live observation of configuration files on disk.
//!
//! Bridges native directory-change notifications onto a dedicated
//! watcher thread that filters, debounces and classifies raw events,
//! reloads the affected category, and notifies subscribers while
//! maintaining a bounded change history.

mod debounce;
mod events;
mod history;
mod subscribers;
mod watch;

pub use events::{CONFIG_EXTENSIONS, ChangeEvent, ChangeKind, ReloadEvent};
pub use history::{ChangeHistory, DEFAULT_HISTORY_CAPACITY};
pub use subscribers::{CallbackHandle, CallbackRegistry};
pub use watch::{ConfigWatcher, DEBOUNCE_WINDOW, STOP_TIMEOUT};
