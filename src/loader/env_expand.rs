use std::{env, sync::OnceLock};

use regex::Regex;
use toml::Value;

static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

#[allow(clippy::expect_used)]
fn placeholder_pattern() -> &'static Regex {
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Recursively expands `${NAME}` placeholders in every string leaf of a
/// document using the process environment.
///
/// Placeholders whose variable is unset are left verbatim, so a document
/// round-trips unchanged on machines that do not define them.
pub(crate) fn expand_env_placeholders(value: &mut Value) {
    match value {
        Value::String(s) => {
            if s.contains("${") {
                *s = expand_str(s);
            }
        }
        Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                expand_env_placeholders(v);
            }
        }
        Value::Array(array) => {
            for v in array.iter_mut() {
                expand_env_placeholders(v);
            }
        }
        _ => {}
    }
}

fn expand_str(input: &str) -> String {
    placeholder_pattern()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            match env::var(&caps[1]) {
                Ok(resolved) => resolved,
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn expands_set_variables_in_nested_strings() {
        unsafe {
            env::set_var("CONFMEND_TEST_DATA", "/srv/data");
        }

        let mut value: Value =
            toml::from_str("[paths]\ndata_dir = \"${CONFMEND_TEST_DATA}/store\"\n").unwrap();
        expand_env_placeholders(&mut value);

        assert_eq!(
            value
                .get("paths")
                .and_then(|p| p.get("data_dir"))
                .and_then(Value::as_str),
            Some("/srv/data/store")
        );
    }

    #[test]
    fn unset_variables_stay_verbatim() {
        let mut value: Value =
            toml::from_str("name = \"${CONFMEND_TEST_DEFINITELY_UNSET}\"\n").unwrap();
        expand_env_placeholders(&mut value);

        assert_eq!(
            value.get("name").and_then(Value::as_str),
            Some("${CONFMEND_TEST_DEFINITELY_UNSET}")
        );
    }

    #[test]
    fn non_string_leaves_are_untouched() {
        let mut value: Value = toml::from_str("port = 8080\nenabled = true\n").unwrap();
        let before = value.clone();
        expand_env_placeholders(&mut value);
        assert_eq!(value, before);
    }
}
