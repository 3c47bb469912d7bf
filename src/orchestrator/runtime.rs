use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use serde_json::json;
use toml::Value;
use tracing::{info, instrument, warn};

use crate::{
    core::Result,
    loader::{Category, ConfigDocument, ConfigLoader},
    validator::{ValidationReport, Validator},
    watcher::{CallbackHandle, CallbackRegistry, ChangeEvent, ChangeKind, ConfigWatcher, ReloadEvent},
};

use super::{
    HealthStatus,
    health::CounterCells,
    reports::{default_export_path, render_system_report, write_atomic},
};

/// Lifecycle of the orchestrator's monitoring loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Constructed, monitoring never started.
    Uninitialized,
    /// Watcher attached and live validation active.
    Monitoring,
    /// Monitoring stopped; may be re-entered.
    Stopped,
}

/// A repair applied by the orchestrator, delivered to repair
/// subscribers.
#[derive(Debug, Clone)]
pub struct RepairEvent {
    /// Category that was repaired.
    pub category: Category,
    /// The repaired document now installed in the loader.
    pub document: Arc<ConfigDocument>,
    /// Category-qualified paths the repair replaced.
    pub repaired_paths: Vec<String>,
}

struct OrchestratorCore {
    loader: Arc<ConfigLoader>,
    validator: Validator,
    watcher: ConfigWatcher,
    state: Mutex<MonitorState>,
    reports: Mutex<BTreeMap<Category, ValidationReport>>,
    // Categories validated since their last observed change; bounds the
    // on-demand pass in the read API.
    clean: Mutex<HashSet<Category>>,
    counters: CounterCells,
    validation_enabled: AtomicBool,
    auto_repair_enabled: AtomicBool,
    validation_callbacks: CallbackRegistry<ValidationReport>,
    repair_callbacks: CallbackRegistry<RepairEvent>,
    watch_handles: Mutex<Vec<CallbackHandle>>,
}

/// Composes loader, validator and watcher into the self-healing
/// configuration context.
///
/// Constructed once by the process entry point and passed by reference
/// to every collaborator; there is no global instance. Cloning is cheap
/// and shares the same underlying state.
#[derive(Clone)]
pub struct ConfigOrchestrator {
    core: Arc<OrchestratorCore>,
}

impl ConfigOrchestrator {
    /// Creates an orchestrator rooted at the given directory (or the
    /// discovered project root), with validation and auto-repair
    /// enabled.
    pub fn new(root: Option<&Path>) -> Self {
        let loader = Arc::new(ConfigLoader::new(root));
        let directories = vec![loader.config_dir()];
        let watcher = ConfigWatcher::new(Arc::clone(&loader), directories);

        Self {
            core: Arc::new(OrchestratorCore {
                loader,
                validator: Validator::new(),
                watcher,
                state: Mutex::new(MonitorState::Uninitialized),
                reports: Mutex::new(BTreeMap::new()),
                clean: Mutex::new(HashSet::new()),
                counters: CounterCells::default(),
                validation_enabled: AtomicBool::new(true),
                auto_repair_enabled: AtomicBool::new(true),
                validation_callbacks: CallbackRegistry::new(),
                repair_callbacks: CallbackRegistry::new(),
                watch_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The loader owning the per-category documents.
    pub fn loader(&self) -> &Arc<ConfigLoader> {
        &self.core.loader
    }

    /// The current lifecycle state.
    pub fn state(&self) -> MonitorState {
        *self.core.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enables or disables automatic validation.
    pub fn set_validation_enabled(&self, enabled: bool) {
        self.core.validation_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Enables or disables automatic repair.
    pub fn set_auto_repair_enabled(&self, enabled: bool) {
        self.core.auto_repair_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Starts live monitoring: runs a full validation (and conditional
    /// repair) pass, then attaches the file watcher.
    ///
    /// A second call while monitoring logs a warning and is a no-op.
    ///
    /// # Errors
    /// Returns `ConfmendError::Watcher` if the watcher cannot start.
    #[instrument(skip(self))]
    pub fn start_monitoring(&self) -> Result<()> {
        if self.state() == MonitorState::Monitoring {
            warn!("monitoring already active; ignoring start request");
            return Ok(());
        }

        self.validate_all_configs();
        self.attach_watcher_callbacks();
        self.core.watcher.start_watching()?;

        *self.core.state.lock().unwrap_or_else(PoisonError::into_inner) =
            MonitorState::Monitoring;
        info!("configuration monitoring started");
        Ok(())
    }

    /// Stops live monitoring; the orchestrator keeps serving reads from
    /// the last loaded documents and may be restarted.
    ///
    /// # Errors
    /// Returns `ConfmendError::Watcher` if the watcher cannot stop.
    pub fn stop_monitoring(&self) -> Result<()> {
        self.core.watcher.stop_watching()?;
        *self.core.state.lock().unwrap_or_else(PoisonError::into_inner) = MonitorState::Stopped;
        info!("configuration monitoring stopped");
        Ok(())
    }

    /// Retrieves the value at a dot-separated path, running a bounded
    /// validate-and-repair pass for the category first.
    ///
    /// Returns `default` on any missing segment.
    pub fn get(&self, path: &str, default: Value) -> Value {
        self.ensure_validated_for_path(path);
        self.core.loader.get(path, default)
    }

    /// Like `get`, but a set environment variable wins over the
    /// document.
    pub fn get_with_env_override(&self, path: &str, env_var: &str, default: Value) -> Value {
        self.ensure_validated_for_path(path);
        self.core.loader.get_with_env_override(path, env_var, default)
    }

    /// Resolves a path-shaped string value with `{name}` template
    /// substitution.
    pub fn get_path(&self, path: &str, args: &[(&str, &str)]) -> Option<PathBuf> {
        self.ensure_validated_for_path(path);
        self.core.loader.get_path(path, args)
    }

    /// Re-reads one category (or all of them) from disk.
    pub fn reload_config(&self, category: Option<Category>) {
        match category {
            Some(category) => {
                self.core.loader.reload(category);
                self.core.counters.reloads.fetch_add(1, Ordering::Relaxed);
                self.mark_dirty(category);
            }
            None => {
                for category in Category::ALL {
                    self.core.loader.reload(category);
                    self.core.counters.reloads.fetch_add(1, Ordering::Relaxed);
                    self.mark_dirty(category);
                }
            }
        }
    }

    /// Runs validation (and conditional repair) across every category.
    pub fn validate_all_configs(&self) -> BTreeMap<Category, ValidationReport> {
        let mut reports = BTreeMap::new();
        for category in Category::ALL {
            reports.insert(category, self.core.run_validation(category));
        }
        reports
    }

    /// A point-in-time health summary across all categories.
    pub fn get_health_status(&self) -> HealthStatus {
        for category in Category::ALL {
            let missing = {
                let reports = self
                    .core
                    .reports
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                !reports.contains_key(&category)
            };
            if missing {
                self.core.run_validation(category);
            }
        }

        self.core.health_snapshot()
    }

    /// Serializes health, per-category validation summaries and recent
    /// changes to a text report file.
    ///
    /// Defaults to a timestamped filename under `<root>/reports/`.
    /// Returns the resolved path.
    ///
    /// # Errors
    /// Returns `ConfmendError::Export` if the file cannot be written.
    pub fn export_system_report(&self, path: Option<&Path>) -> Result<PathBuf> {
        let health = self.get_health_status();
        let reports = self.reports_snapshot();
        let recent = self.core.watcher.history().recent(20);

        let destination = path.map_or_else(
            || default_export_path(self.core.loader.root(), "system-report", "txt"),
            Path::to_path_buf,
        );

        write_atomic(&destination, &render_system_report(&health, &reports, &recent))?;
        info!(path = %destination.display(), "system report exported");
        Ok(destination)
    }

    /// Exports every category's validation report as JSON.
    ///
    /// # Errors
    /// Returns `ConfmendError::Export` if the file cannot be written.
    pub fn export_validation_report(&self, path: Option<&Path>) -> Result<PathBuf> {
        self.get_health_status();
        let reports = self.reports_snapshot();

        let by_name: BTreeMap<&str, &ValidationReport> = reports
            .iter()
            .map(|(category, report)| (category.as_str(), report))
            .collect();
        let payload = json!({
            "generated_at": chrono::Utc::now(),
            "reports": by_name,
        });

        let destination = path.map_or_else(
            || default_export_path(self.core.loader.root(), "validation-report", "json"),
            Path::to_path_buf,
        );

        write_atomic(&destination, &pretty_json(&payload))?;
        info!(path = %destination.display(), "validation report exported");
        Ok(destination)
    }

    /// Exports the retained change history as JSON.
    ///
    /// # Errors
    /// Returns `ConfmendError::Export` if the file cannot be written.
    pub fn export_change_history(&self, path: Option<&Path>) -> Result<PathBuf> {
        let events = self.core.watcher.history().snapshot();
        let payload = json!({
            "generated_at": chrono::Utc::now(),
            "events": events,
        });

        let destination = path.map_or_else(
            || default_export_path(self.core.loader.root(), "change-history", "json"),
            Path::to_path_buf,
        );

        write_atomic(&destination, &pretty_json(&payload))?;
        info!(path = %destination.display(), "change history exported");
        Ok(destination)
    }

    /// The retained change events, oldest first.
    pub fn change_history(&self) -> Vec<ChangeEvent> {
        self.core.watcher.history().snapshot()
    }

    /// Subscribes to logical change events.
    pub fn add_change_callback(
        &self,
        callback: impl Fn(&ChangeEvent) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.core.watcher.add_change_callback(callback)
    }

    /// Subscribes to completed reloads.
    pub fn add_reload_callback(
        &self,
        callback: impl Fn(&ReloadEvent) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.core.watcher.add_reload_callback(callback)
    }

    /// Subscribes to validation reports as they are produced.
    pub fn add_validation_callback(
        &self,
        callback: impl Fn(&ValidationReport) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.core.validation_callbacks.register(callback)
    }

    /// Subscribes to applied repairs.
    pub fn add_repair_callback(
        &self,
        callback: impl Fn(&RepairEvent) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.core.repair_callbacks.register(callback)
    }

    fn ensure_validated_for_path(&self, path: &str) {
        if !self.core.validation_enabled.load(Ordering::SeqCst) {
            return;
        }

        let head = path.split('.').next().unwrap_or(path);
        let Some(category) = Category::from_file_stem(head) else {
            return;
        };

        let already_clean = {
            let clean = self.core.clean.lock().unwrap_or_else(PoisonError::into_inner);
            clean.contains(&category)
        };

        if !already_clean {
            self.core.run_validation(category);
        }
    }

    fn mark_dirty(&self, category: Category) {
        self.core
            .clean
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&category);
    }

    fn reports_snapshot(&self) -> BTreeMap<Category, ValidationReport> {
        self.core
            .reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Registers the orchestrator's own watcher subscriptions; safe to
    /// call repeatedly, only the first call attaches.
    fn attach_watcher_callbacks(&self) {
        let mut handles = self
            .core
            .watch_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !handles.is_empty() {
            return;
        }

        let weak = Arc::downgrade(&self.core);
        handles.push(self.core.watcher.add_change_callback(move |event| {
            let Some(core) = weak.upgrade() else {
                return;
            };
            core.counters.change_events.fetch_add(1, Ordering::Relaxed);
            core.clean
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&event.category);

            if event.kind != ChangeKind::Deleted
                && core.validation_enabled.load(Ordering::SeqCst)
            {
                core.run_validation(event.category);
            }
        }));

        let weak = Arc::downgrade(&self.core);
        handles.push(self.core.watcher.add_reload_callback(move |_event| {
            if let Some(core) = weak.upgrade() {
                core.counters.reloads.fetch_add(1, Ordering::Relaxed);
            }
        }));
    }
}

impl OrchestratorCore {
    /// Validates one category, applying fallback repair when the report
    /// carries a critical issue and auto-repair is enabled.
    ///
    /// Callback fan-out happens strictly after every lock is released.
    fn run_validation(&self, category: Category) -> ValidationReport {
        let document = self.loader.document(category);
        let mut report = self.validator.validate_config(category, &document.data);
        self.counters.validations.fetch_add(1, Ordering::Relaxed);

        let mut repair_event = None;
        if report.has_critical() && self.auto_repair_enabled.load(Ordering::SeqCst) {
            let (repaired, applied) = self.validator.apply_fallbacks(category, &document.data);

            if applied.is_empty() {
                warn!(%category, "critical issues present but no fallback rule applies");
            } else {
                let new_document = self.loader.replace_document(ConfigDocument::new(
                    category,
                    repaired,
                    document.source_path.clone(),
                ));
                self.counters.repairs.fetch_add(1, Ordering::Relaxed);
                info!(%category, repaired = applied.len(), "applied fallback repair");

                // Re-validate so the stored report reflects the
                // document consumers will now read.
                report = self.validator.validate_config(category, &new_document.data);
                self.counters.validations.fetch_add(1, Ordering::Relaxed);
                report.fallback_applied.clone_from(&applied);

                repair_event = Some(RepairEvent {
                    category,
                    document: new_document,
                    repaired_paths: applied,
                });
            }
        }

        {
            let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
            reports.insert(category, report.clone());
        }
        {
            let mut clean = self.clean.lock().unwrap_or_else(PoisonError::into_inner);
            clean.insert(category);
        }

        if let Some(event) = &repair_event {
            self.repair_callbacks.notify(event);
        }
        self.validation_callbacks.notify(&report);

        report
    }

    fn health_snapshot(&self) -> HealthStatus {
        let reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);

        let categories: BTreeMap<String, bool> = reports
            .iter()
            .map(|(category, report)| (category.as_str().to_string(), report.is_valid))
            .collect();
        let valid = categories.values().filter(|v| **v).count();
        let total = categories.len();

        let callback_failures = self.watcher.callback_failures()
            + self.validation_callbacks.failure_count()
            + self.repair_callbacks.failure_count();

        HealthStatus {
            healthy: valid == total,
            categories,
            total_categories: total,
            valid_categories: valid,
            invalid_categories: total - valid,
            monitoring_active: self.watcher.is_running(),
            validation_enabled: self.validation_enabled.load(Ordering::SeqCst),
            auto_repair_enabled: self.auto_repair_enabled.load(Ordering::SeqCst),
            counters: self.counters.snapshot(callback_failures),
            generated_at: chrono::Utc::now(),
        }
    }
}

fn pretty_json(payload: &serde_json::Value) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string())
}
