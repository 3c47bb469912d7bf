use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use toml::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::{ConfmendError, Result};

use super::{
    Category, ConfigDocument,
    env_expand::expand_env_placeholders,
    legacy::{LEGACY_SETTINGS_FILE, LegacySettings},
    path_ops::{navigate_path, set_value_at_path},
    root::{CONFIG_DIR, discover_project_root},
};

/// Loads and owns the per-category configuration documents.
///
/// Documents live behind an `Arc` and are swapped atomically on reload;
/// readers holding an older `Arc` keep a consistent snapshot. The first
/// segment of every dot-separated path names the category the rest of
/// the path resolves in.
pub struct ConfigLoader {
    root: PathBuf,
    documents: RwLock<HashMap<Category, Arc<ConfigDocument>>>,
}

impl ConfigLoader {
    /// Creates a loader rooted at the given directory (or the discovered
    /// project root) and eagerly loads every category, degrading missing
    /// or malformed files to empty documents.
    pub fn new(explicit_root: Option<&Path>) -> Self {
        let root = discover_project_root(explicit_root);
        info!(root = %root.display(), "loading configuration");

        let loader = Self {
            root,
            documents: RwLock::new(HashMap::new()),
        };

        for category in Category::ALL {
            let document = loader.load_or_default(category);
            loader.store_document(document);
        }

        loader.import_legacy_settings();
        loader
    }

    /// The project root this loader resolves category files under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory watched for category document changes.
    pub fn config_dir(&self) -> PathBuf {
        self.root.join(CONFIG_DIR)
    }

    /// The conventional file path for a category's document.
    pub fn category_path(&self, category: Category) -> PathBuf {
        self.config_dir().join(category.file_name())
    }

    /// Reads and parses a category document from disk, expanding
    /// `${NAME}` environment placeholders in string leaves.
    ///
    /// This is the explicit, result-typed read: callers decide whether to
    /// degrade or propagate. `load_or_default` makes the degrade decision
    /// for the never-block-startup path.
    ///
    /// # Errors
    /// * `ConfmendError::ConfigRead` - The file is missing or unreadable
    /// * `ConfmendError::TomlParse` - The file is not valid TOML
    pub fn load_category(&self, category: Category) -> Result<ConfigDocument> {
        let path = self.category_path(category);
        let content =
            fs::read_to_string(&path).map_err(|e| ConfmendError::config_read(e, &path))?;

        let mut data: Value =
            toml::from_str(&content).map_err(|e| ConfmendError::toml_parse(e, Some(&path)))?;
        expand_env_placeholders(&mut data);

        Ok(ConfigDocument::new(category, data, path))
    }

    /// Loads a category, degrading any failure to an empty document plus
    /// a logged warning so startup is never blocked by one bad file.
    pub fn load_or_default(&self, category: Category) -> ConfigDocument {
        match self.load_category(category) {
            Ok(document) => document,
            Err(error) => {
                warn!(%category, %error, "config load degraded to empty document");
                ConfigDocument::empty(category, self.category_path(category))
            }
        }
    }

    /// Returns the current in-memory document for a category.
    pub fn document(&self, category: Category) -> Arc<ConfigDocument> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        documents.get(&category).cloned().unwrap_or_else(|| {
            Arc::new(ConfigDocument::empty(
                category,
                self.category_path(category),
            ))
        })
    }

    /// Replaces a category's in-memory document, returning the new `Arc`.
    ///
    /// Used by the orchestrator to install repaired documents; the swap is
    /// atomic with respect to concurrent readers.
    pub fn replace_document(&self, document: ConfigDocument) -> Arc<ConfigDocument> {
        self.store_document(document)
    }

    /// Re-reads one category from disk and swaps the in-memory document.
    ///
    /// Returns the document that was replaced and the freshly loaded one.
    #[instrument(skip(self))]
    pub fn reload(&self, category: Category) -> (Arc<ConfigDocument>, Arc<ConfigDocument>) {
        let before = self.document(category);
        let after = self.store_document(self.load_or_default(category));
        debug!(%category, "reloaded category document");
        (before, after)
    }

    /// Re-reads every category from disk.
    pub fn reload_all(&self) {
        for category in Category::ALL {
            self.reload(category);
        }
    }

    /// Retrieves the value at a dot-separated path, where the first
    /// segment names the category.
    ///
    /// Returns `default` on any missing segment or non-traversable value.
    pub fn get(&self, path: &str, default: Value) -> Value {
        self.try_get(path).unwrap_or(default)
    }

    /// Like `get`, but returns `None` instead of a default.
    pub fn try_get(&self, path: &str) -> Option<Value> {
        let (category, rest) = split_category_path(path)?;
        let document = self.document(category);
        navigate_path(&document.data, rest).cloned()
    }

    /// Retrieves a value, letting a set environment variable win over the
    /// document.
    ///
    /// The variable's value is coerced integer-first, then float, then
    /// kept as a raw string. When the variable is unset the behavior is
    /// identical to `get`.
    pub fn get_with_env_override(&self, path: &str, env_var: &str, default: Value) -> Value {
        match env::var(env_var) {
            Ok(raw) => coerce_env_value(&raw),
            Err(_) => self.get(path, default),
        }
    }

    /// Resolves a path-shaped string value and substitutes `{name}`
    /// template arguments.
    ///
    /// Returns `None` when the value is missing or not a string.
    pub fn get_path(&self, path: &str, args: &[(&str, &str)]) -> Option<PathBuf> {
        let value = self.try_get(path)?;
        let template = value.as_str()?;

        let mut rendered = template.to_string();
        for (name, replacement) in args {
            rendered = rendered.replace(&format!("{{{name}}}"), replacement);
        }

        Some(PathBuf::from(rendered))
    }

    fn store_document(&self, document: ConfigDocument) -> Arc<ConfigDocument> {
        let document = Arc::new(document);
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        documents.insert(document.category, Arc::clone(&document));
        Arc::clone(&document)
    }

    /// Merges values from the optional flat legacy settings file into the
    /// loaded documents, applying each one only where the target path is
    /// still absent.
    fn import_legacy_settings(&self) {
        let path = self.root.join(LEGACY_SETTINGS_FILE);
        if !path.is_file() {
            return;
        }

        let settings = match LegacySettings::from_file(&path) {
            Ok(settings) => settings,
            Err(error) => {
                warn!(%error, "skipping unreadable legacy settings file");
                return;
            }
        };

        for (category, field_path, value) in settings.overrides() {
            let document = self.document(category);
            if navigate_path(&document.data, field_path).is_some() {
                continue;
            }

            let mut data = document.data.clone();
            set_value_at_path(&mut data, field_path, value);
            self.store_document(ConfigDocument::new(
                category,
                data,
                document.source_path.clone(),
            ));
            debug!(%category, path = field_path, "imported legacy setting");
        }
    }
}

fn split_category_path(path: &str) -> Option<(Category, &str)> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, rest),
        None => (path, ""),
    };

    Category::from_file_stem(head).map(|category| (category, rest))
}

fn coerce_env_value(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Integer(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::Float(float);
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn split_category_path_handles_bare_and_nested() {
        assert_eq!(
            split_category_path("network.socket_server.port"),
            Some((Category::Network, "socket_server.port"))
        );
        assert_eq!(split_category_path("network"), Some((Category::Network, "")));
        assert_eq!(split_category_path("unknown.key"), None);
    }

    #[test]
    fn env_coercion_prefers_integer_then_float() {
        assert_eq!(coerce_env_value("42"), Value::Integer(42));
        assert_eq!(coerce_env_value("0.5"), Value::Float(0.5));
        assert_eq!(
            coerce_env_value("not-a-number"),
            Value::String("not-a-number".to_string())
        );
    }
}
