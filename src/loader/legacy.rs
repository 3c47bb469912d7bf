use std::{fs, path::Path};

use serde::Deserialize;
use toml::Value;

use crate::core::{ConfmendError, Result};

use super::Category;

/// File name of the optional flat settings file left behind by earlier
/// releases, read from the project root.
pub const LEGACY_SETTINGS_FILE: &str = "legacy_settings.toml";

/// Settings imported from the pre-category flat configuration format.
///
/// Every field is optional and named; a missing key simply deserializes
/// to `None`, so importing never probes for attributes at runtime.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LegacySettings {
    /// Old `theme` key, maps to `theme.active`.
    pub theme_name: Option<String>,
    /// Old splitter ratio pair, maps under `layout.main_splitter`.
    pub splitter_table_ratio: Option<i64>,
    /// See `splitter_table_ratio`.
    pub splitter_detail_ratio: Option<i64>,
    /// Old `socket_port` key, maps to `network.socket_server.port`.
    pub socket_port: Option<i64>,
    /// Old `http_port` key, maps to `network.http_server.port`.
    pub http_port: Option<i64>,
    /// Old `data_dir` key, maps to `paths.data_dir`.
    pub data_dir: Option<String>,
}

impl LegacySettings {
    /// Parses a legacy settings file.
    ///
    /// # Errors
    /// Returns `ConfmendError::ConfigRead` if the file cannot be read and
    /// `ConfmendError::TomlParse` if it is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfmendError::config_read(e, path))?;
        toml::from_str(&content).map_err(|e| ConfmendError::toml_parse(e, Some(path)))
    }

    /// The category-document paths and values this import contributes.
    ///
    /// Only populated fields produce entries; the loader applies each one
    /// solely where the target path is still absent, so current
    /// configuration always wins over imported settings.
    pub fn overrides(&self) -> Vec<(Category, &'static str, Value)> {
        let mut out = Vec::new();

        if let Some(name) = &self.theme_name {
            out.push((Category::Theme, "active", Value::String(name.clone())));
        }
        if let Some(ratio) = self.splitter_table_ratio {
            out.push((
                Category::Layout,
                "main_splitter.table_ratio",
                Value::Integer(ratio),
            ));
        }
        if let Some(ratio) = self.splitter_detail_ratio {
            out.push((
                Category::Layout,
                "main_splitter.detail_ratio",
                Value::Integer(ratio),
            ));
        }
        if let Some(port) = self.socket_port {
            out.push((
                Category::Network,
                "socket_server.port",
                Value::Integer(port),
            ));
        }
        if let Some(port) = self.http_port {
            out.push((Category::Network, "http_server.port", Value::Integer(port)));
        }
        if let Some(dir) = &self.data_dir {
            out.push((Category::Paths, "data_dir", Value::String(dir.clone())));
        }

        out
    }
}
