//! Confmend - self-healing configuration subsystem.
//!
//! Confmend loads per-category TOML documents, validates them against
//! structural schemas and cross-field rules, repairs invalid values from
//! declared fallbacks, and keeps re-validating as the files change on
//! disk. The main features include:
//!
//! - Dot-path reads with environment-variable override
//! - Schema-driven validation with severity-ranked findings
//! - Declarative fallback repair that never regresses valid values
//! - Debounced live file watching with a bounded change history
//! - A consolidated health and report API
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use confmend::orchestrator::ConfigOrchestrator;
//!
//! # fn main() -> confmend::Result<()> {
//! // Construct the configuration context once, at process startup
//! let orchestrator = ConfigOrchestrator::new(None);
//! orchestrator.start_monitoring()?;
//!
//! let port = orchestrator.get_with_env_override(
//!     "network.http_server.port",
//!     "APP_HTTP_PORT",
//!     toml::Value::Integer(8080),
//! );
//! println!("serving on port {port}");
//! # Ok(())
//! # }
//! ```

/// Core error types and result aliases.
pub mod core;

/// Configuration loading and dot-path reads.
pub mod loader;

/// Schema-driven validation and fallback repair.
pub mod validator;

/// Live file watching with debouncing and change history.
pub mod watcher;

/// Composition, auto-repair and the health/report API.
pub mod orchestrator;

/// Tracing initialization helpers.
pub mod tracing_config;

/// Re-exported core types for convenience.
pub use core::{ConfmendError, Result};
