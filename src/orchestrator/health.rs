use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A snapshot of the orchestrator's operational counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OperationalCounters {
    /// Validation passes run, including post-repair re-validation.
    pub validations: u64,
    /// Repairs applied (document swaps with at least one fallback).
    pub repairs: u64,
    /// Category reloads, watcher-driven and explicit.
    pub reloads: u64,
    /// Logical change events observed.
    pub change_events: u64,
    /// Subscriber callback panics caught across all registries.
    pub callback_failures: u64,
}

/// The live counter cells, bumped lock-free from any thread.
#[derive(Debug, Default)]
pub(crate) struct CounterCells {
    pub(crate) validations: AtomicU64,
    pub(crate) repairs: AtomicU64,
    pub(crate) reloads: AtomicU64,
    pub(crate) change_events: AtomicU64,
}

impl CounterCells {
    pub(crate) fn snapshot(&self, callback_failures: u64) -> OperationalCounters {
        OperationalCounters {
            validations: self.validations.load(Ordering::Relaxed),
            repairs: self.repairs.load(Ordering::Relaxed),
            reloads: self.reloads.load(Ordering::Relaxed),
            change_events: self.change_events.load(Ordering::Relaxed),
            callback_failures,
        }
    }
}

/// A point-in-time summary of configuration health.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// True iff every category currently passes validation.
    pub healthy: bool,
    /// Per-category validity.
    pub categories: BTreeMap<String, bool>,
    /// Number of known categories.
    pub total_categories: usize,
    /// Categories currently valid.
    pub valid_categories: usize,
    /// Categories currently invalid.
    pub invalid_categories: usize,
    /// Whether live monitoring is active.
    pub monitoring_active: bool,
    /// Whether automatic validation is enabled.
    pub validation_enabled: bool,
    /// Whether automatic repair is enabled.
    pub auto_repair_enabled: bool,
    /// Operational counters at snapshot time.
    pub counters: OperationalCounters,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
}
