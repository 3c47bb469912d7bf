use std::{
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use chrono::{DateTime, Utc};
use notify::EventKind;
use regex::Regex;
use serde::Serialize;
use toml::Value;

use crate::loader::{Category, ConfigDocument};

/// Extensions recognized as configuration documents.
pub const CONFIG_EXTENSIONS: [&str; 1] = ["toml"];

static TRANSIENT_NAME: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn transient_name_pattern() -> &'static Regex {
    TRANSIENT_NAME.get_or_init(|| {
        Regex::new(r"(^\.)|(~$)|(^#.*#$)|(\.(tmp|bak|sw[a-z])$)")
            .expect("transient name pattern is valid")
    })
}

/// The type of file system change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// File content was modified.
    Modified,
    /// File was created.
    Created,
    /// File was removed.
    Deleted,
}

/// A logical configuration change, after filtering and debouncing.
///
/// Carries document snapshots from before and after the triggering
/// reload; deletions carry no `after` snapshot because they never
/// reload.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    /// Category whose document changed.
    pub category: Category,
    /// Absolute path of the changed file.
    pub path: PathBuf,
    /// How the file changed.
    pub kind: ChangeKind,
    /// When the change was processed.
    pub timestamp: DateTime<Utc>,
    /// Document payload before the change, if one was loaded.
    pub before: Option<Value>,
    /// Document payload after the reload, absent for deletions.
    pub after: Option<Value>,
}

/// A completed reload, delivered to reload subscribers.
#[derive(Debug, Clone)]
pub struct ReloadEvent {
    /// Category that was reloaded.
    pub category: Category,
    /// The freshly loaded document.
    pub document: Arc<ConfigDocument>,
}

/// Maps a raw notify event kind onto a logical change kind.
///
/// Access, metadata-only and other kinds are dropped.
pub(crate) fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}

/// Whether a path looks like a live configuration document: recognized
/// extension, and a file name that is not a transient/backup artifact.
pub(crate) fn is_config_file(path: &Path) -> bool {
    let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !CONFIG_EXTENSIONS.contains(&extension) {
        return false;
    }

    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };

    !transient_name_pattern().is_match(name)
}
