use toml::Value;

use crate::loader::{Category, navigate_path, set_value_at_path};

use super::{Validator, rules::fallback_rules};

impl Validator {
    /// Returns a repaired copy of a document plus the category-qualified
    /// paths that were replaced.
    ///
    /// For each declared fallback rule, a value that is absent or fails
    /// the rule's predicate is replaced with the rule's default,
    /// creating intermediate tables as needed. Only individual leaves
    /// named by rules are touched; cross-field relationships are never
    /// repaired. Applying fallbacks twice yields the same document, and
    /// a leaf that already satisfies its own predicate is never altered.
    pub fn apply_fallbacks(&self, category: Category, document: &Value) -> (Value, Vec<String>) {
        let mut repaired = document.clone();
        let mut applied = Vec::new();

        for rule in fallback_rules(category) {
            let passes = navigate_path(&repaired, rule.path)
                .is_some_and(|value| (rule.predicate)(value));

            if !passes {
                set_value_at_path(&mut repaired, rule.path, (rule.default)());
                applied.push(format!("{category}.{}", rule.path));
            }
        }

        (repaired, applied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn repairs_invalid_leaf_to_default() {
        let validator = Validator::new();
        let document = doc("[themes.light.colors]\nbackground = \"not-a-color\"\n");

        let (repaired, applied) = validator.apply_fallbacks(Category::Theme, &document);

        assert_eq!(
            navigate_path(&repaired, "themes.light.colors.background"),
            Some(&Value::String("#FFFFFF".to_string()))
        );
        assert!(applied.contains(&"theme.themes.light.colors.background".to_string()));
    }

    #[test]
    fn never_regresses_a_passing_leaf() {
        let validator = Validator::new();
        let document = doc("[themes.light.colors]\nbackground = \"#ABCDEF\"\n");

        let (repaired, _) = validator.apply_fallbacks(Category::Theme, &document);

        assert_eq!(
            navigate_path(&repaired, "themes.light.colors.background"),
            Some(&Value::String("#ABCDEF".to_string()))
        );
    }

    #[test]
    fn is_idempotent() {
        let validator = Validator::new();
        let document = doc("[socket_server]\nport = 70000\n");

        let (once, _) = validator.apply_fallbacks(Category::Network, &document);
        let (twice, applied) = validator.apply_fallbacks(Category::Network, &once);

        assert_eq!(once, twice);
        assert!(applied.is_empty());
    }

    #[test]
    fn cross_field_relationships_are_left_alone() {
        let validator = Validator::new();
        let document = doc("[main_splitter]\ntable_ratio = 60\ndetail_ratio = 30\n");

        let (repaired, _) = validator.apply_fallbacks(Category::Layout, &document);

        assert_eq!(
            navigate_path(&repaired, "main_splitter.table_ratio"),
            Some(&Value::Integer(60))
        );
        assert_eq!(
            navigate_path(&repaired, "main_splitter.detail_ratio"),
            Some(&Value::Integer(30))
        );
    }
}
