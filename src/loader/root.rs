use std::{
    env,
    path::{Path, PathBuf},
};

use tracing::debug;

/// Environment variable naming the project root explicitly.
pub const ROOT_ENV_VAR: &str = "CONFMEND_ROOT";

/// Name of the directory holding the per-category documents.
pub const CONFIG_DIR: &str = "config";

/// Locates the project root holding the `config/` directory.
///
/// Resolution order:
/// 1. an explicit path argument,
/// 2. upward search from the current directory for a directory that
///    contains a `config/` subdirectory,
/// 3. the `CONFMEND_ROOT` environment variable,
/// 4. the current directory as a last resort.
pub fn discover_project_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(root) = explicit {
        debug!(root = %root.display(), "using explicit project root");
        return root.to_path_buf();
    }

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    for candidate in cwd.ancestors() {
        if candidate.join(CONFIG_DIR).is_dir() {
            debug!(root = %candidate.display(), "found project root by marker search");
            return candidate.to_path_buf();
        }
    }

    if let Ok(root) = env::var(ROOT_ENV_VAR) {
        debug!(root = %root, "using project root from {}", ROOT_ENV_VAR);
        return PathBuf::from(root);
    }

    debug!(root = %cwd.display(), "falling back to current directory as project root");
    cwd
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn explicit_argument_wins() {
        let root = discover_project_root(Some(Path::new("/tmp/somewhere")));
        assert_eq!(root, PathBuf::from("/tmp/somewhere"));
    }
}
