use std::path::PathBuf;

use chrono::{DateTime, Utc};
use toml::Value;

use super::{Category, path_ops::navigate_path};

/// A loaded configuration document for a single category.
///
/// Documents are owned by the loader behind an `Arc` and replaced
/// wholesale on reload; external code never mutates one in place.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    /// The category this document belongs to.
    pub category: Category,
    /// The document payload, always a TOML table at the top level.
    pub data: Value,
    /// The file the document was read from.
    pub source_path: PathBuf,
    /// When the document was loaded from disk.
    pub loaded_at: DateTime<Utc>,
}

impl ConfigDocument {
    /// Creates a document from freshly parsed data.
    pub fn new(category: Category, data: Value, source_path: PathBuf) -> Self {
        Self {
            category,
            data,
            source_path,
            loaded_at: Utc::now(),
        }
    }

    /// Creates an empty document, used when a file is missing or
    /// unreadable and the loader degrades instead of failing.
    pub fn empty(category: Category, source_path: PathBuf) -> Self {
        Self::new(category, Value::Table(toml::map::Map::new()), source_path)
    }

    /// Whether the document carries no keys at all.
    pub fn is_empty(&self) -> bool {
        self.data.as_table().is_none_or(toml::map::Map::is_empty)
    }

    /// Resolves a dot-separated path relative to the document root.
    pub fn get(&self, path: &str) -> Option<&Value> {
        navigate_path(&self.data, path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_keys() {
        let doc = ConfigDocument::empty(Category::General, PathBuf::from("general.toml"));
        assert!(doc.is_empty());
        assert!(doc.get("log_level").is_none());
    }

    #[test]
    fn get_resolves_nested_values() {
        let data: Value = toml::from_str("[socket_server]\nport = 8765\n").unwrap();
        let doc = ConfigDocument::new(Category::Network, data, PathBuf::from("network.toml"));

        assert!(!doc.is_empty());
        assert_eq!(
            doc.get("socket_server.port"),
            Some(&Value::Integer(8765))
        );
        assert!(doc.get("socket_server.bind").is_none());
    }
}
