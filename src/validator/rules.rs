use std::sync::OnceLock;

use regex::Regex;
use toml::Value;

use crate::loader::{Category, navigate_path};

use super::report::{IssueKind, Severity};

static HEX_COLOR: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn hex_color_pattern() -> &'static Regex {
    HEX_COLOR
        .get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("hex color pattern is valid"))
}

/// The loopback entry every host allow-list must carry.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// A violation produced by a category-specific rule.
#[derive(Debug)]
pub struct RuleViolation {
    /// Dot path relative to the document root.
    pub path: String,
    /// The constraint kind the finding is reported under.
    pub kind: IssueKind,
    /// What the rule expected.
    pub expected: String,
    /// The offending value, when one exists.
    pub actual: Option<Value>,
}

/// A rule over the whole document, with an author-chosen severity.
///
/// Rules are pure functions; they read the document and report, never
/// mutate.
pub struct CrossFieldRule {
    /// Stable rule name used in logs.
    pub name: &'static str,
    /// Severity applied to every violation this rule produces.
    pub severity: Severity,
    /// The check itself.
    pub check: fn(&Value) -> Vec<RuleViolation>,
}

/// A declarative (path, predicate, default) repair triple.
///
/// If the value at `path` is absent or fails `predicate`, repair replaces
/// it with `default()`, creating intermediate tables as needed.
pub struct FallbackRule {
    /// Dot path relative to the document root.
    pub path: &'static str,
    /// Accepts the current value; returning `false` triggers repair.
    pub predicate: fn(&Value) -> bool,
    /// Produces the replacement value.
    pub default: fn() -> Value,
}

/// The cross-field rules declared for a category.
pub fn cross_field_rules(category: Category) -> Vec<CrossFieldRule> {
    match category {
        Category::Layout => vec![CrossFieldRule {
            name: "splitter_ratios_sum",
            severity: Severity::Critical,
            check: check_splitter_ratios,
        }],
        Category::Network => vec![
            CrossFieldRule {
                name: "distinct_ports",
                severity: Severity::Critical,
                check: check_distinct_ports,
            },
            CrossFieldRule {
                name: "loopback_allowed",
                severity: Severity::High,
                check: check_loopback_allowed,
            },
        ],
        Category::Theme => vec![CrossFieldRule {
            name: "valid_theme_colors",
            severity: Severity::High,
            check: check_theme_colors,
        }],
        Category::General | Category::Paths => Vec::new(),
    }
}

/// The fallback repair rules declared for a category.
pub fn fallback_rules(category: Category) -> Vec<FallbackRule> {
    match category {
        Category::General => vec![FallbackRule {
            path: "log_level",
            predicate: is_log_level,
            default: || Value::String("info".to_string()),
        }],
        Category::Theme => vec![
            FallbackRule {
                path: "active",
                predicate: is_theme_name,
                default: || Value::String("light".to_string()),
            },
            FallbackRule {
                path: "themes.light.colors.background",
                predicate: is_hex_color,
                default: || Value::String("#FFFFFF".to_string()),
            },
            FallbackRule {
                path: "themes.light.colors.foreground",
                predicate: is_hex_color,
                default: || Value::String("#1F1F1F".to_string()),
            },
            FallbackRule {
                path: "themes.light.colors.accent",
                predicate: is_hex_color,
                default: || Value::String("#3B82F6".to_string()),
            },
            FallbackRule {
                path: "themes.dark.colors.background",
                predicate: is_hex_color,
                default: || Value::String("#1E1E1E".to_string()),
            },
            FallbackRule {
                path: "themes.dark.colors.foreground",
                predicate: is_hex_color,
                default: || Value::String("#E0E0E0".to_string()),
            },
            FallbackRule {
                path: "themes.dark.colors.accent",
                predicate: is_hex_color,
                default: || Value::String("#3B82F6".to_string()),
            },
        ],
        Category::Layout => vec![
            FallbackRule {
                path: "main_splitter.table_ratio",
                predicate: is_ratio,
                default: || Value::Integer(70),
            },
            FallbackRule {
                path: "main_splitter.detail_ratio",
                predicate: is_ratio,
                default: || Value::Integer(30),
            },
            FallbackRule {
                path: "sidebar.width",
                predicate: is_sidebar_width,
                default: || Value::Integer(280),
            },
        ],
        Category::Network => vec![
            FallbackRule {
                path: "socket_server.port",
                predicate: is_port,
                default: || Value::Integer(8765),
            },
            FallbackRule {
                path: "http_server.port",
                predicate: is_port,
                default: || Value::Integer(8080),
            },
            FallbackRule {
                path: "allowed_hosts",
                predicate: is_host_list_with_loopback,
                default: || Value::Array(vec![Value::String(LOOPBACK_HOST.to_string())]),
            },
        ],
        Category::Paths => vec![
            FallbackRule {
                path: "data_dir",
                predicate: is_nonempty_string,
                default: || Value::String("data".to_string()),
            },
            FallbackRule {
                path: "log_dir",
                predicate: is_nonempty_string,
                default: || Value::String("logs".to_string()),
            },
            FallbackRule {
                path: "export_dir",
                predicate: is_nonempty_string,
                default: || Value::String("exports".to_string()),
            },
        ],
    }
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

fn check_splitter_ratios(document: &Value) -> Vec<RuleViolation> {
    let table = navigate_path(document, "main_splitter.table_ratio").and_then(as_number);
    let detail = navigate_path(document, "main_splitter.detail_ratio").and_then(as_number);

    let (Some(table), Some(detail)) = (table, detail) else {
        return Vec::new();
    };

    let sum = table + detail;
    if (sum - 100.0).abs() < f64::EPSILON {
        return Vec::new();
    }

    vec![RuleViolation {
        path: "main_splitter".to_string(),
        kind: IssueKind::CrossFieldViolation,
        expected: "table_ratio + detail_ratio == 100".to_string(),
        actual: Some(Value::Float(sum)),
    }]
}

fn check_distinct_ports(document: &Value) -> Vec<RuleViolation> {
    let socket = navigate_path(document, "socket_server.port").and_then(Value::as_integer);
    let http = navigate_path(document, "http_server.port").and_then(Value::as_integer);

    match (socket, http) {
        (Some(socket), Some(http)) if socket == http => vec![RuleViolation {
            path: "http_server.port".to_string(),
            kind: IssueKind::CrossFieldViolation,
            expected: "a port distinct from socket_server.port".to_string(),
            actual: Some(Value::Integer(http)),
        }],
        _ => Vec::new(),
    }
}

fn check_loopback_allowed(document: &Value) -> Vec<RuleViolation> {
    let Some(hosts) = navigate_path(document, "allowed_hosts").and_then(Value::as_array) else {
        return Vec::new();
    };

    let has_loopback = hosts
        .iter()
        .any(|host| host.as_str() == Some(LOOPBACK_HOST));

    if has_loopback {
        return Vec::new();
    }

    vec![RuleViolation {
        path: "allowed_hosts".to_string(),
        kind: IssueKind::CrossFieldViolation,
        expected: format!("a list containing \"{LOOPBACK_HOST}\""),
        actual: Some(Value::Array(hosts.clone())),
    }]
}

fn check_theme_colors(document: &Value) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    for theme in ["light", "dark"] {
        for color in ["background", "foreground", "accent"] {
            let path = format!("themes.{theme}.colors.{color}");
            let Some(value) = navigate_path(document, &path) else {
                continue;
            };
            let Some(text) = value.as_str() else {
                continue;
            };

            if !hex_color_pattern().is_match(text) {
                violations.push(RuleViolation {
                    path,
                    kind: IssueKind::PatternViolation,
                    expected: "a #RRGGBB hex color".to_string(),
                    actual: Some(value.clone()),
                });
            }
        }
    }

    violations
}

fn is_hex_color(value: &Value) -> bool {
    value.as_str().is_some_and(|s| hex_color_pattern().is_match(s))
}

fn is_theme_name(value: &Value) -> bool {
    matches!(value.as_str(), Some("light" | "dark"))
}

fn is_log_level(value: &Value) -> bool {
    matches!(
        value.as_str(),
        Some("trace" | "debug" | "info" | "warn" | "error")
    )
}

fn is_ratio(value: &Value) -> bool {
    as_number(value).is_some_and(|n| (0.0..=100.0).contains(&n))
}

fn is_sidebar_width(value: &Value) -> bool {
    as_number(value).is_some_and(|n| (100.0..=1000.0).contains(&n))
}

fn is_port(value: &Value) -> bool {
    value.as_integer().is_some_and(|p| (1..=65535).contains(&p))
}

fn is_nonempty_string(value: &Value) -> bool {
    value.as_str().is_some_and(|s| !s.is_empty())
}

fn is_host_list_with_loopback(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|hosts| hosts.iter().any(|h| h.as_str() == Some(LOOPBACK_HOST)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(clippy::unwrap_used)]
    fn doc(text: &str) -> Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn splitter_rule_flags_bad_sum_once() {
        let document = doc("[main_splitter]\ntable_ratio = 60\ndetail_ratio = 30\n");
        let violations = check_splitter_ratios(&document);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "main_splitter");
    }

    #[test]
    fn splitter_rule_accepts_exact_sum() {
        let document = doc("[main_splitter]\ntable_ratio = 70\ndetail_ratio = 30\n");
        assert!(check_splitter_ratios(&document).is_empty());
    }

    #[test]
    fn splitter_rule_skips_partial_documents() {
        let document = doc("[main_splitter]\ntable_ratio = 60\n");
        assert!(check_splitter_ratios(&document).is_empty());
    }

    #[test]
    fn duplicate_ports_flagged_once() {
        let document = doc("[socket_server]\nport = 8888\n[http_server]\nport = 8888\n");
        let violations = check_distinct_ports(&document);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "http_server.port");
    }

    #[test]
    fn distinct_ports_pass() {
        let document = doc("[socket_server]\nport = 8765\n[http_server]\nport = 8080\n");
        assert!(check_distinct_ports(&document).is_empty());
    }

    #[test]
    fn loopback_rule_only_fires_on_present_lists() {
        assert!(check_loopback_allowed(&doc("")).is_empty());

        let missing = doc("allowed_hosts = [\"10.0.0.5\"]\n");
        assert_eq!(check_loopback_allowed(&missing).len(), 1);

        let present = doc("allowed_hosts = [\"127.0.0.1\", \"10.0.0.5\"]\n");
        assert!(check_loopback_allowed(&present).is_empty());
    }

    #[test]
    fn theme_color_rule_reports_each_bad_leaf() {
        let document = doc(
            r##"
[themes.light.colors]
background = "not-a-color"
foreground = "#1F1F1F"

[themes.dark.colors]
accent = "blue"
"##,
        );

        let violations = check_theme_colors(&document);
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.kind == IssueKind::PatternViolation));
    }

    #[test]
    fn predicates_accept_their_defaults() {
        for category in Category::ALL {
            for rule in fallback_rules(category) {
                assert!(
                    (rule.predicate)(&(rule.default)()),
                    "default for {category}.{} fails its own predicate",
                    rule.path
                );
            }
        }
    }
}
