use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError},
};

use regex::Regex;
use toml::Value;
use tracing::error;

use crate::loader::Category;

use super::{
    report::{IssueKind, ValidationIssue, ValidationReport},
    rules::{as_number, cross_field_rules},
    schema::{SchemaNode, SchemaSet, SchemaType},
};

/// Validates category documents against their structural schema and
/// category-specific cross-field rules.
///
/// Validation never fails: any internal error is folded into the report
/// as a single critical `ValidationError` finding.
pub struct Validator {
    schemas: SchemaSet,
    pattern_cache: Mutex<HashMap<&'static str, Regex>>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Creates a validator with the built-in category schemas.
    pub fn new() -> Self {
        Self {
            schemas: SchemaSet::builtin(),
            pattern_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Validates one category document and returns the report.
    ///
    /// Structural violations carry severities derived from the violated
    /// constraint kind; cross-field violations carry the severity their
    /// rule declares.
    pub fn validate_config(&self, category: Category, document: &Value) -> ValidationReport {
        let findings =
            panic::catch_unwind(AssertUnwindSafe(|| self.collect_findings(category, document)));

        let findings = match findings {
            Ok(findings) => findings,
            Err(_) => {
                error!(%category, "validation pass panicked; reporting as validation-error");
                vec![ValidationIssue::new(
                    category,
                    category.as_str().to_string(),
                    IssueKind::ValidationError,
                    "validation to complete".to_string(),
                    None,
                )]
            }
        };

        ValidationReport::from_findings(category, findings)
    }

    fn collect_findings(&self, category: Category, document: &Value) -> Vec<ValidationIssue> {
        let mut findings = Vec::new();

        if let Some(schema) = self.schemas.category(category) {
            self.check_node(category, schema, document, category.as_str(), &mut findings);
        }

        for rule in cross_field_rules(category) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (rule.check)(document)));

            match outcome {
                Ok(violations) => {
                    for violation in violations {
                        findings.push(
                            ValidationIssue::new(
                                category,
                                format!("{category}.{}", violation.path),
                                violation.kind,
                                violation.expected,
                                violation.actual,
                            )
                            .with_severity(rule.severity),
                        );
                    }
                }
                Err(_) => {
                    error!(%category, rule = rule.name, "cross-field rule panicked");
                    findings.push(ValidationIssue::new(
                        category,
                        category.as_str().to_string(),
                        IssueKind::ValidationError,
                        format!("rule '{}' to complete", rule.name),
                        None,
                    ));
                }
            }
        }

        findings
    }

    fn check_node(
        &self,
        category: Category,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        findings: &mut Vec<ValidationIssue>,
    ) {
        let node = match node.reference {
            Some(name) => match self.schemas.definition(name) {
                Some(resolved) => resolved,
                None => {
                    findings.push(ValidationIssue::new(
                        category,
                        path.to_string(),
                        IssueKind::ValidationError,
                        format!("schema definition '{name}' to exist"),
                        None,
                    ));
                    return;
                }
            },
            None => node,
        };

        match node.kind {
            SchemaType::Object => self.check_object(category, node, value, path, findings),
            SchemaType::Array => self.check_array(category, node, value, path, findings),
            SchemaType::String => self.check_string(category, node, value, path, findings),
            SchemaType::Number => check_number(category, node, value, path, findings),
            SchemaType::Boolean => {
                if !value.is_bool() {
                    findings.push(type_mismatch(category, path, "boolean", value));
                }
            }
        }
    }

    fn check_object(
        &self,
        category: Category,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        findings: &mut Vec<ValidationIssue>,
    ) {
        let Some(table) = value.as_table() else {
            findings.push(type_mismatch(category, path, "object", value));
            return;
        };

        for key in &node.required {
            if !table.contains_key(*key) {
                findings.push(ValidationIssue::new(
                    category,
                    format!("{path}.{key}"),
                    IssueKind::MissingField,
                    format!("required key '{key}'"),
                    None,
                ));
            }
        }

        for (key, child) in &node.properties {
            if let Some(child_value) = table.get(*key) {
                self.check_node(
                    category,
                    child,
                    child_value,
                    &format!("{path}.{key}"),
                    findings,
                );
            }
        }

        for key in table.keys() {
            if !node.properties.iter().any(|(name, _)| *name == key.as_str()) {
                findings.push(ValidationIssue::new(
                    category,
                    format!("{path}.{key}"),
                    IssueKind::UnknownField,
                    format!("a key declared by the {category} schema"),
                    None,
                ));
            }
        }
    }

    fn check_array(
        &self,
        category: Category,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        findings: &mut Vec<ValidationIssue>,
    ) {
        let Some(array) = value.as_array() else {
            findings.push(type_mismatch(category, path, "array", value));
            return;
        };

        if let Some(items) = &node.items {
            for (index, element) in array.iter().enumerate() {
                self.check_node(category, items, element, &format!("{path}.{index}"), findings);
            }
        }
    }

    fn check_string(
        &self,
        category: Category,
        node: &SchemaNode,
        value: &Value,
        path: &str,
        findings: &mut Vec<ValidationIssue>,
    ) {
        let Some(text) = value.as_str() else {
            findings.push(type_mismatch(category, path, "string", value));
            return;
        };

        if !node.enum_values.is_empty() && !node.enum_values.contains(&text) {
            findings.push(ValidationIssue::new(
                category,
                path.to_string(),
                IssueKind::EnumViolation,
                format!("one of {:?}", node.enum_values),
                Some(value.clone()),
            ));
            return;
        }

        if let Some(pattern) = node.pattern {
            match self.compiled_pattern(pattern) {
                Ok(matched) if matched.is_match(text) => {}
                Ok(_) => {
                    findings.push(ValidationIssue::new(
                        category,
                        path.to_string(),
                        IssueKind::PatternViolation,
                        format!("a string matching '{pattern}'"),
                        Some(value.clone()),
                    ));
                }
                Err(details) => {
                    findings.push(ValidationIssue::new(
                        category,
                        path.to_string(),
                        IssueKind::ValidationError,
                        format!("pattern '{pattern}' to compile: {details}"),
                        None,
                    ));
                }
            }
        }
    }

    fn compiled_pattern(&self, pattern: &'static str) -> Result<Regex, String> {
        let mut cache = self
            .pattern_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(compiled) = cache.get(pattern) {
            return Ok(compiled.clone());
        }

        let compiled = Regex::new(pattern).map_err(|e| e.to_string())?;
        cache.insert(pattern, compiled.clone());
        Ok(compiled)
    }
}

fn check_number(
    category: Category,
    node: &SchemaNode,
    value: &Value,
    path: &str,
    findings: &mut Vec<ValidationIssue>,
) {
    let Some(number) = as_number(value) else {
        findings.push(type_mismatch(category, path, "number", value));
        return;
    };

    let below = node.minimum.is_some_and(|min| number < min);
    let above = node.maximum.is_some_and(|max| number > max);

    if below || above {
        let expected = match (node.minimum, node.maximum) {
            (Some(min), Some(max)) => format!("a number in [{min}, {max}]"),
            (Some(min), None) => format!("a number >= {min}"),
            (None, Some(max)) => format!("a number <= {max}"),
            (None, None) => "a number".to_string(),
        };

        findings.push(ValidationIssue::new(
            category,
            path.to_string(),
            IssueKind::RangeViolation,
            expected,
            Some(value.clone()),
        ));
    }
}

fn type_mismatch(
    category: Category,
    path: &str,
    expected: &str,
    actual: &Value,
) -> ValidationIssue {
    ValidationIssue::new(
        category,
        path.to_string(),
        IssueKind::TypeMismatch,
        expected.to_string(),
        Some(actual.clone()),
    )
}
