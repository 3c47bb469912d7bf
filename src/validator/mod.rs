//! Schema-driven validation and declarative fallback repair.
//!
//! Each category declares a structural schema (types, required keys,
//! enums, patterns, ranges, shared substructures), a set of cross-field
//! rules with author-chosen severities, and fallback rules used to
//! repair invalid or missing leaf values. Validation always produces a
//! report and never raises.

mod repair;
mod report;
mod rules;
mod schema;
mod validate;

pub use report::{IssueKind, Severity, ValidationIssue, ValidationReport};
pub use rules::{CrossFieldRule, FallbackRule, LOOPBACK_HOST, RuleViolation};
pub use schema::{SchemaNode, SchemaSet, SchemaType};
pub use validate::Validator;
