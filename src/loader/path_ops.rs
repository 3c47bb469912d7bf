use toml::Value;

/// Navigates through a TOML value structure following a dot-separated path.
///
/// Returns `None` on any missing segment, out-of-bounds array index, or
/// attempt to descend into a scalar. The read API builds its
/// default-on-miss behavior on top of this.
///
/// # Arguments
/// * `value` - The root TOML value to navigate from
/// * `path` - Dot-separated path (e.g., "socket_server.port" or "hosts.0")
pub(crate) fn navigate_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;

    for part in path.split('.') {
        current = match current {
            Value::Table(table) => table.get(part)?,
            Value::Array(array) => {
                let index = part.parse::<usize>().ok()?;
                array.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Sets a value at the specified path, creating intermediate tables as
/// needed.
///
/// Scalar values standing where a table is required are replaced by a
/// fresh table so the write always lands; fallback repair relies on this
/// to install defaults under paths the document never declared.
///
/// # Arguments
/// * `value` - The root TOML value to modify, must be a table
/// * `path` - Dot-separated path to the target location
/// * `new_value` - The value to insert at the path
pub(crate) fn set_value_at_path(value: &mut Value, path: &str, new_value: Value) {
    let parts: Vec<&str> = path.split('.').collect();
    let Some((last_key, parents)) = parts.split_last() else {
        return;
    };

    let mut current = value;

    for part in parents {
        if !current.is_table() {
            *current = Value::Table(toml::map::Map::new());
        }

        if let Value::Table(table) = current {
            current = table
                .entry((*part).to_string())
                .or_insert_with(|| Value::Table(toml::map::Map::new()));
        }
    }

    if !current.is_table() {
        *current = Value::Table(toml::map::Map::new());
    }

    if let Value::Table(table) = current {
        table.insert((*last_key).to_string(), new_value);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Value {
        toml::from_str(
            r#"
[socket_server]
port = 8765

[main_splitter]
table_ratio = 70

hosts = ["127.0.0.1", "10.0.0.5"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn navigates_nested_tables() {
        let value = sample();
        assert_eq!(
            navigate_path(&value, "socket_server.port"),
            Some(&Value::Integer(8765))
        );
    }

    #[test]
    fn navigates_array_indices() {
        let value = sample();
        assert_eq!(
            navigate_path(&value, "hosts.1"),
            Some(&Value::String("10.0.0.5".to_string()))
        );
        assert_eq!(navigate_path(&value, "hosts.7"), None);
        assert_eq!(navigate_path(&value, "hosts.one"), None);
    }

    #[test]
    fn missing_segments_return_none() {
        let value = sample();
        assert_eq!(navigate_path(&value, "socket_server.bind"), None);
        assert_eq!(navigate_path(&value, "socket_server.port.inner"), None);
        assert_eq!(navigate_path(&value, "nowhere"), None);
    }

    #[test]
    fn empty_path_returns_root() {
        let value = sample();
        assert_eq!(navigate_path(&value, ""), Some(&value));
    }

    #[test]
    fn set_overwrites_existing_leaf() {
        let mut value = sample();
        set_value_at_path(&mut value, "socket_server.port", Value::Integer(9000));
        assert_eq!(
            navigate_path(&value, "socket_server.port"),
            Some(&Value::Integer(9000))
        );
    }

    #[test]
    fn set_creates_intermediate_tables() {
        let mut value = Value::Table(toml::map::Map::new());
        set_value_at_path(
            &mut value,
            "themes.light.colors.background",
            Value::String("#FFFFFF".to_string()),
        );
        assert_eq!(
            navigate_path(&value, "themes.light.colors.background"),
            Some(&Value::String("#FFFFFF".to_string()))
        );
    }

    #[test]
    fn set_replaces_scalar_in_the_way() {
        let mut value = sample();
        set_value_at_path(
            &mut value,
            "main_splitter.table_ratio.nested",
            Value::Integer(1),
        );
        assert_eq!(
            navigate_path(&value, "main_splitter.table_ratio.nested"),
            Some(&Value::Integer(1))
        );
    }
}
