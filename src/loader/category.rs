use std::fmt;

use serde::{Deserialize, Serialize};

/// A named configuration domain validated independently of the others.
///
/// The set of categories is closed and known at compile time; every
/// category maps to exactly one document at `config/<name>.toml` under
/// the project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Application-wide settings (log level, telemetry toggles).
    General,
    /// Color themes and font sizing.
    Theme,
    /// Window and splitter geometry.
    Layout,
    /// Server ports and host allow-lists.
    Network,
    /// Filesystem locations used by the application.
    Paths,
}

impl Category {
    /// Every known category, in validation order.
    pub const ALL: [Category; 5] = [
        Category::General,
        Category::Theme,
        Category::Layout,
        Category::Network,
        Category::Paths,
    ];

    /// The category's canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Theme => "theme",
            Category::Layout => "layout",
            Category::Network => "network",
            Category::Paths => "paths",
        }
    }

    /// The conventional document file name for this category.
    pub fn file_name(self) -> &'static str {
        match self {
            Category::General => "general.toml",
            Category::Theme => "theme.toml",
            Category::Layout => "layout.toml",
            Category::Network => "network.toml",
            Category::Paths => "paths.toml",
        }
    }

    /// Resolves a file stem (e.g. `"network"` from `network.toml`) back to
    /// its category. Returns `None` for files that are not category
    /// documents.
    pub fn from_file_stem(stem: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == stem)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stems_round_trip() {
        for category in Category::ALL {
            let stem = category.file_name().trim_end_matches(".toml");
            assert_eq!(Category::from_file_stem(stem), Some(category));
        }
    }

    #[test]
    fn unknown_stem_is_rejected() {
        assert_eq!(Category::from_file_stem("scratch"), None);
        assert_eq!(Category::from_file_stem(""), None);
    }
}
