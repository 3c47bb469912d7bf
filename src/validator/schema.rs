use std::collections::BTreeMap;

use crate::loader::Category;

/// The structural type a schema node constrains a value to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    /// A TOML table with declared properties.
    Object,
    /// A homogeneous array.
    Array,
    /// A string, optionally constrained by `enum` or `pattern`.
    String,
    /// An integer or float, optionally range-bounded.
    Number,
    /// A boolean.
    Boolean,
}

impl SchemaType {
    /// The name used in expectation messages.
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaType::Object => "object",
            SchemaType::Array => "array",
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
        }
    }
}

/// One node of a structural schema.
///
/// Supports the structural subset this subsystem validates: `type`,
/// `required`, `properties`, `enum`, `pattern`, `minimum`/`maximum`, and
/// references to shared named substructures.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub(crate) kind: SchemaType,
    pub(crate) required: Vec<&'static str>,
    pub(crate) properties: Vec<(&'static str, SchemaNode)>,
    pub(crate) items: Option<Box<SchemaNode>>,
    pub(crate) enum_values: Vec<&'static str>,
    pub(crate) pattern: Option<&'static str>,
    pub(crate) minimum: Option<f64>,
    pub(crate) maximum: Option<f64>,
    pub(crate) reference: Option<&'static str>,
}

impl SchemaNode {
    fn leaf(kind: SchemaType) -> Self {
        Self {
            kind,
            required: Vec::new(),
            properties: Vec::new(),
            items: None,
            enum_values: Vec::new(),
            pattern: None,
            minimum: None,
            maximum: None,
            reference: None,
        }
    }

    /// An object node with the given properties.
    pub fn object(properties: Vec<(&'static str, SchemaNode)>) -> Self {
        let mut node = Self::leaf(SchemaType::Object);
        node.properties = properties;
        node
    }

    /// An array node whose elements all match `items`.
    pub fn array(items: SchemaNode) -> Self {
        let mut node = Self::leaf(SchemaType::Array);
        node.items = Some(Box::new(items));
        node
    }

    /// A string node.
    pub fn string() -> Self {
        Self::leaf(SchemaType::String)
    }

    /// A number node accepting integers and floats.
    pub fn number() -> Self {
        Self::leaf(SchemaType::Number)
    }

    /// A boolean node.
    pub fn boolean() -> Self {
        Self::leaf(SchemaType::Boolean)
    }

    /// A reference to a shared named substructure.
    pub fn reference(name: &'static str) -> Self {
        let mut node = Self::leaf(SchemaType::Object);
        node.reference = Some(name);
        node
    }

    /// Marks keys of an object node as required.
    pub fn require(mut self, keys: &[&'static str]) -> Self {
        self.required = keys.to_vec();
        self
    }

    /// Constrains a string node to a closed set of values.
    pub fn one_of(mut self, values: &[&'static str]) -> Self {
        self.enum_values = values.to_vec();
        self
    }

    /// Constrains a string node to match a regex pattern.
    pub fn matching(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Sets the inclusive lower bound of a number node.
    pub fn minimum(mut self, value: f64) -> Self {
        self.minimum = Some(value);
        self
    }

    /// Sets the inclusive upper bound of a number node.
    pub fn maximum(mut self, value: f64) -> Self {
        self.maximum = Some(value);
        self
    }
}

/// The per-category schemas plus the shared substructure definitions they
/// reference.
#[derive(Debug)]
pub struct SchemaSet {
    definitions: BTreeMap<&'static str, SchemaNode>,
    categories: BTreeMap<Category, SchemaNode>,
}

impl SchemaSet {
    /// The schemas for every known category.
    pub fn builtin() -> Self {
        let mut definitions = BTreeMap::new();

        definitions.insert(
            "server_endpoint",
            SchemaNode::object(vec![
                (
                    "port",
                    SchemaNode::number().minimum(1.0).maximum(65535.0),
                ),
                ("bind", SchemaNode::string().matching(r"^[A-Za-z0-9_.:-]+$")),
            ])
            .require(&["port"]),
        );

        definitions.insert(
            "color_palette",
            SchemaNode::object(vec![
                ("background", SchemaNode::string()),
                ("foreground", SchemaNode::string()),
                ("accent", SchemaNode::string()),
            ]),
        );

        definitions.insert(
            "theme_spec",
            SchemaNode::object(vec![
                ("colors", SchemaNode::reference("color_palette")),
                ("font_size", SchemaNode::number().minimum(6.0).maximum(72.0)),
            ]),
        );

        let mut categories = BTreeMap::new();

        categories.insert(
            Category::General,
            SchemaNode::object(vec![
                (
                    "log_level",
                    SchemaNode::string().one_of(&["trace", "debug", "info", "warn", "error"]),
                ),
                ("app_name", SchemaNode::string()),
                (
                    "telemetry",
                    SchemaNode::object(vec![
                        ("enabled", SchemaNode::boolean()),
                        (
                            "interval_secs",
                            SchemaNode::number().minimum(1.0).maximum(3600.0),
                        ),
                    ]),
                ),
            ])
            .require(&["log_level"]),
        );

        categories.insert(
            Category::Theme,
            SchemaNode::object(vec![
                ("active", SchemaNode::string().one_of(&["light", "dark"])),
                (
                    "themes",
                    SchemaNode::object(vec![
                        ("light", SchemaNode::reference("theme_spec")),
                        ("dark", SchemaNode::reference("theme_spec")),
                    ]),
                ),
            ]),
        );

        categories.insert(
            Category::Layout,
            SchemaNode::object(vec![
                (
                    "main_splitter",
                    SchemaNode::object(vec![
                        (
                            "table_ratio",
                            SchemaNode::number().minimum(0.0).maximum(100.0),
                        ),
                        (
                            "detail_ratio",
                            SchemaNode::number().minimum(0.0).maximum(100.0),
                        ),
                    ])
                    .require(&["table_ratio", "detail_ratio"]),
                ),
                (
                    "sidebar",
                    SchemaNode::object(vec![
                        ("visible", SchemaNode::boolean()),
                        (
                            "width",
                            SchemaNode::number().minimum(100.0).maximum(1000.0),
                        ),
                    ]),
                ),
            ]),
        );

        categories.insert(
            Category::Network,
            SchemaNode::object(vec![
                ("socket_server", SchemaNode::reference("server_endpoint")),
                ("http_server", SchemaNode::reference("server_endpoint")),
                ("allowed_hosts", SchemaNode::array(SchemaNode::string())),
            ])
            .require(&["socket_server", "http_server"]),
        );

        categories.insert(
            Category::Paths,
            SchemaNode::object(vec![
                ("data_dir", SchemaNode::string()),
                ("log_dir", SchemaNode::string()),
                ("export_dir", SchemaNode::string()),
            ])
            .require(&["data_dir"]),
        );

        Self {
            definitions,
            categories,
        }
    }

    /// The schema for one category.
    pub fn category(&self, category: Category) -> Option<&SchemaNode> {
        self.categories.get(&category)
    }

    /// Resolves a shared substructure by name.
    pub fn definition(&self, name: &str) -> Option<&SchemaNode> {
        self.definitions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_schema() {
        let set = SchemaSet::builtin();
        for category in Category::ALL {
            assert!(set.category(category).is_some(), "missing {category}");
        }
    }

    #[test]
    fn shared_definitions_resolve() {
        let set = SchemaSet::builtin();
        assert!(set.definition("server_endpoint").is_some());
        assert!(set.definition("color_palette").is_some());
        assert!(set.definition("theme_spec").is_some());
        assert!(set.definition("nope").is_none());
    }
}
