//! Integration tests for configuration loading and dot-path reads.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::{fs, path::Path};

use confmend::loader::{Category, ConfigLoader};
use tempfile::TempDir;
use toml::Value;

fn write_config(root: &Path, file_name: &str, content: &str) {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join(file_name), content).unwrap();
}

mod basic_reads {
    use super::*;

    #[test]
    fn loads_categories_with_all_field_types() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "general.toml",
            r#"
log_level = "debug"
app_name = "statusboard"

[telemetry]
enabled = true
interval_secs = 60
"#,
        );
        write_config(
            temp.path(),
            "network.toml",
            r#"
allowed_hosts = ["127.0.0.1"]

[socket_server]
port = 8765

[http_server]
port = 8080
"#,
        );

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get("general.log_level", Value::String("info".into())),
            Value::String("debug".into())
        );
        assert_eq!(
            loader.get("general.telemetry.enabled", Value::Boolean(false)),
            Value::Boolean(true)
        );
        assert_eq!(
            loader.get("network.socket_server.port", Value::Integer(0)),
            Value::Integer(8765)
        );
        assert_eq!(
            loader.get("network.allowed_hosts.0", Value::String(String::new())),
            Value::String("127.0.0.1".into())
        );
    }

    #[test]
    fn missing_segments_yield_the_default() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "general.toml", "log_level = \"info\"\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get("general.nope", Value::Integer(7)),
            Value::Integer(7)
        );
        assert_eq!(
            loader.get("general.log_level.deeper", Value::Integer(7)),
            Value::Integer(7)
        );
        assert_eq!(
            loader.get("not_a_category.x", Value::Integer(7)),
            Value::Integer(7)
        );
    }
}

mod degradation {
    use super::*;

    #[test]
    fn missing_file_degrades_to_empty_document() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("config")).unwrap();

        let loader = ConfigLoader::new(Some(temp.path()));

        assert!(loader.load_category(Category::Network).is_err());
        assert!(loader.document(Category::Network).is_empty());
        assert_eq!(
            loader.get("network.socket_server.port", Value::Integer(8080)),
            Value::Integer(8080)
        );
    }

    #[test]
    fn malformed_file_degrades_to_empty_document() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "layout.toml", "main_splitter = [not toml\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert!(loader.load_category(Category::Layout).is_err());
        assert!(loader.document(Category::Layout).is_empty());
    }
}

mod environment {
    use super::*;

    #[test]
    fn expands_placeholders_at_load_time() {
        unsafe {
            std::env::set_var("CONFMEND_IT_EXPORT_BASE", "/srv/exports");
        }

        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "paths.toml",
            "data_dir = \"data\"\nexport_dir = \"${CONFMEND_IT_EXPORT_BASE}/daily\"\n",
        );

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get("paths.export_dir", Value::String(String::new())),
            Value::String("/srv/exports/daily".into())
        );
    }

    #[test]
    fn env_override_coerces_integer_first() {
        unsafe {
            std::env::set_var("CONFMEND_IT_PORT_OVERRIDE", "42");
        }

        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "network.toml", "[socket_server]\nport = 8765\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get_with_env_override(
                "network.socket_server.port",
                "CONFMEND_IT_PORT_OVERRIDE",
                Value::Integer(0),
            ),
            Value::Integer(42)
        );
    }

    #[test]
    fn unset_override_falls_back_to_document_then_default() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "network.toml", "[socket_server]\nport = 8765\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get_with_env_override(
                "network.socket_server.port",
                "CONFMEND_IT_DEFINITELY_UNSET",
                Value::Integer(0),
            ),
            Value::Integer(8765)
        );
        assert_eq!(
            loader.get_with_env_override(
                "network.http_server.port",
                "CONFMEND_IT_DEFINITELY_UNSET",
                Value::Integer(8080),
            ),
            Value::Integer(8080)
        );
    }

    #[test]
    fn non_numeric_override_stays_a_string() {
        unsafe {
            std::env::set_var("CONFMEND_IT_LEVEL_OVERRIDE", "warn");
        }

        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "general.toml", "log_level = \"info\"\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert_eq!(
            loader.get_with_env_override(
                "general.log_level",
                "CONFMEND_IT_LEVEL_OVERRIDE",
                Value::String("info".into()),
            ),
            Value::String("warn".into())
        );
    }
}

mod templated_paths {
    use super::*;

    #[test]
    fn substitutes_template_arguments() {
        let temp = TempDir::new().unwrap();
        write_config(
            temp.path(),
            "paths.toml",
            "data_dir = \"data\"\nexport_dir = \"exports/{year}/{channel}\"\n",
        );

        let loader = ConfigLoader::new(Some(temp.path()));

        let resolved = loader
            .get_path("paths.export_dir", &[("year", "2026"), ("channel", "ops")])
            .unwrap();
        assert_eq!(resolved, Path::new("exports/2026/ops"));
    }

    #[test]
    fn non_string_values_resolve_to_none() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "network.toml", "[socket_server]\nport = 1\n");

        let loader = ConfigLoader::new(Some(temp.path()));

        assert!(loader.get_path("network.socket_server.port", &[]).is_none());
        assert!(loader.get_path("paths.missing", &[]).is_none());
    }
}

mod reloading {
    use super::*;

    #[test]
    fn reload_swaps_the_document() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "general.toml", "log_level = \"info\"\n");

        let loader = ConfigLoader::new(Some(temp.path()));
        assert_eq!(
            loader.get("general.log_level", Value::String(String::new())),
            Value::String("info".into())
        );

        write_config(temp.path(), "general.toml", "log_level = \"debug\"\n");
        let (before, after) = loader.reload(Category::General);

        assert_eq!(
            before.get("log_level"),
            Some(&Value::String("info".into()))
        );
        assert_eq!(
            after.get("log_level"),
            Some(&Value::String("debug".into()))
        );
        assert_eq!(
            loader.get("general.log_level", Value::String(String::new())),
            Value::String("debug".into())
        );
    }
}

mod legacy_import {
    use super::*;

    #[test]
    fn fills_only_absent_paths() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "network.toml", "[socket_server]\nport = 9999\n");
        fs::write(
            temp.path().join("legacy_settings.toml"),
            "socket_port = 7000\nhttp_port = 7100\ntheme_name = \"dark\"\n",
        )
        .unwrap();

        let loader = ConfigLoader::new(Some(temp.path()));

        // Present in the current document: the import must not clobber it.
        assert_eq!(
            loader.get("network.socket_server.port", Value::Integer(0)),
            Value::Integer(9999)
        );
        // Absent: imported values land.
        assert_eq!(
            loader.get("network.http_server.port", Value::Integer(0)),
            Value::Integer(7100)
        );
        assert_eq!(
            loader.get("theme.active", Value::String(String::new())),
            Value::String("dark".into())
        );
    }
}
