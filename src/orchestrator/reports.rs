use std::{
    collections::BTreeMap,
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::{
    core::{ConfmendError, Result},
    loader::Category,
    validator::ValidationReport,
    watcher::ChangeEvent,
};

use super::HealthStatus;

/// Directory under the project root receiving exported reports.
pub const REPORT_DIR: &str = "reports";

pub(crate) fn default_export_path(root: &Path, prefix: &str, extension: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    root.join(REPORT_DIR)
        .join(format!("{prefix}-{stamp}.{extension}"))
}

/// Writes a report through a temp file and rename so readers never see a
/// partial file.
pub(crate) fn write_atomic(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfmendError::Export {
            path: path.to_path_buf(),
            details: format!("failed to create report directory: {e}"),
        })?;
    }

    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content).map_err(|e| ConfmendError::Export {
        path: temp_path.clone(),
        details: e.to_string(),
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfmendError::Export {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

pub(crate) fn render_system_report(
    health: &HealthStatus,
    reports: &BTreeMap<Category, ValidationReport>,
    recent_changes: &[ChangeEvent],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "confmend system report");
    let _ = writeln!(out, "generated: {}", health.generated_at.to_rfc3339());
    let _ = writeln!(out);

    let _ = writeln!(out, "[health]");
    let _ = writeln!(
        out,
        "overall: {}",
        if health.healthy { "healthy" } else { "degraded" }
    );
    let _ = writeln!(
        out,
        "categories: {}/{} valid",
        health.valid_categories, health.total_categories
    );
    let _ = writeln!(
        out,
        "monitoring: {}",
        if health.monitoring_active {
            "active"
        } else {
            "inactive"
        }
    );
    let _ = writeln!(
        out,
        "validation: {}, auto-repair: {}",
        on_off(health.validation_enabled),
        on_off(health.auto_repair_enabled)
    );
    let counters = &health.counters;
    let _ = writeln!(
        out,
        "counters: validations={} repairs={} reloads={} change_events={} callback_failures={}",
        counters.validations,
        counters.repairs,
        counters.reloads,
        counters.change_events,
        counters.callback_failures
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "[categories]");
    for (category, report) in reports {
        let _ = writeln!(
            out,
            "{category}: {} ({} issues, {} warnings, {} repaired)",
            if report.is_valid { "valid" } else { "INVALID" },
            report.issues.len(),
            report.warnings.len(),
            report.fallback_applied.len()
        );
        for issue in &report.issues {
            let _ = writeln!(out, "  - {:?} {}", issue.severity, issue.message);
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "[recent changes]");
    if recent_changes.is_empty() {
        let _ = writeln!(out, "none");
    }
    for event in recent_changes {
        let _ = writeln!(
            out,
            "{} {:?} {} ({})",
            event.timestamp.to_rfc3339(),
            event.kind,
            event.category,
            event.path.display()
        );
    }

    out
}

fn on_off(flag: bool) -> &'static str {
    if flag { "enabled" } else { "disabled" }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::orchestrator::OperationalCounters;

    use super::*;

    #[test]
    fn report_renders_health_and_sections() {
        let health = HealthStatus {
            healthy: false,
            categories: BTreeMap::new(),
            total_categories: 5,
            valid_categories: 4,
            invalid_categories: 1,
            monitoring_active: true,
            validation_enabled: true,
            auto_repair_enabled: false,
            counters: OperationalCounters {
                validations: 12,
                repairs: 2,
                reloads: 3,
                change_events: 4,
                callback_failures: 0,
            },
            generated_at: Utc::now(),
        };

        let rendered = render_system_report(&health, &BTreeMap::new(), &[]);

        assert!(rendered.contains("overall: degraded"));
        assert!(rendered.contains("categories: 4/5 valid"));
        assert!(rendered.contains("monitoring: active"));
        assert!(rendered.contains("auto-repair: disabled"));
        assert!(rendered.contains("[recent changes]"));
    }

    #[test]
    fn default_path_is_timestamped_under_reports() {
        let path = default_export_path(Path::new("/srv/app"), "system-report", "txt");
        assert!(path.starts_with("/srv/app/reports"));
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("system-report-"));
        assert!(name.ends_with(".txt"));
    }
}
