//! Conditional field-mapping configuration.
//!
//! A [`MappingConfig`] holds base mappings that always apply, plus
//! [`ConditionalRule`]s whose mappings apply only when every condition
//! holds for the query's [`MappingContext`]. Configs are plain serde data,
//! so they load straight from the JSON documents callers already keep:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "mappings": [{ "source": "src_ip", "target": "source_ip" }],
//!   "rules": [{
//!     "id": "web",
//!     "conditions": [{ "type": "sourcetype", "operator": "equals", "value": "access_combined" }],
//!     "mappings": [{ "source": "clientip", "target": "source_address" }],
//!     "priority": 1,
//!     "enabled": true
//!   }]
//! }
//! ```
//!
//! Rules are evaluated in declaration order. `priority` is carried through
//! serialization but plays no part in evaluation.

use crate::value::{ContextValue, MappingContext};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, path::Path};
use thiserror::Error;
use tracing::{debug, trace, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse mapping config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read mapping config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid mapping config: {}", .errors.join("; "))]
    Invalid { errors: Vec<String> },
}

/// One field rename, `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub target: String,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        FieldMapping {
            source: source.into(),
            target: target.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<ConditionalRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datamodels: Vec<DataModelMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub mappings: Vec<FieldMapping>,
    /// Not consulted during evaluation
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub enabled: bool,
}

/// A test against the mapping context.
///
/// `type` and `operator` are kept as the raw strings from the document so
/// that an unknown name is reported by [`MappingConfig::validate`] instead
/// of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Operands of a `combination`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Condition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionKind {
    FieldValue,
    FieldExists,
    SourceType,
    Source,
    Combination,
}

impl ConditionKind {
    pub fn from_name(name: &str) -> Option<ConditionKind> {
        match name {
            "field_value" => Some(ConditionKind::FieldValue),
            "field_exists" => Some(ConditionKind::FieldExists),
            "sourcetype" => Some(ConditionKind::SourceType),
            "source" => Some(ConditionKind::Source),
            "combination" => Some(ConditionKind::Combination),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionKind::FieldValue => "field_value",
            ConditionKind::FieldExists => "field_exists",
            ConditionKind::SourceType => "sourcetype",
            ConditionKind::Source => "source",
            ConditionKind::Combination => "combination",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equals,
    Contains,
    Regex,
    Exists,
    NotExists,
    And,
    Or,
}

impl ConditionOperator {
    pub fn from_name(name: &str) -> Option<ConditionOperator> {
        match name {
            "equals" => Some(ConditionOperator::Equals),
            "contains" => Some(ConditionOperator::Contains),
            "regex" => Some(ConditionOperator::Regex),
            "exists" => Some(ConditionOperator::Exists),
            "not_exists" => Some(ConditionOperator::NotExists),
            "and" => Some(ConditionOperator::And),
            "or" => Some(ConditionOperator::Or),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::Regex => "regex",
            ConditionOperator::Exists => "exists",
            ConditionOperator::NotExists => "not_exists",
            ConditionOperator::And => "and",
            ConditionOperator::Or => "or",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping between two data models, e.g. `Web` to `Network_Web`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModelMapping {
    #[serde(default)]
    pub source_datamodel: String,
    #[serde(default)]
    pub target_datamodel: String,
    #[serde(default)]
    pub field_mappings: Vec<DataModelFieldMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_mappings: Vec<ConditionalRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataModelFieldMapping {
    #[serde(default)]
    pub source_field: String,
    #[serde(default)]
    pub target_field: String,
    /// Nested data model path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<String>) -> Self {
        ValidationResult {
            valid: errors.is_empty(),
            errors,
        }
    }
}

// ============================================================================
// Construction
// ============================================================================

impl Condition {
    fn new(kind: ConditionKind, operator: ConditionOperator) -> Self {
        Condition {
            kind: kind.as_str().to_string(),
            operator: operator.as_str().to_string(),
            ..Condition::default()
        }
    }

    pub fn field_value(
        field: impl Into<String>,
        operator: ConditionOperator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Condition {
            field: field.into(),
            value: Some(value.into()),
            ..Condition::new(ConditionKind::FieldValue, operator)
        }
    }

    /// `exists` when `present`, `not_exists` otherwise.
    pub fn field_exists(field: impl Into<String>, present: bool) -> Self {
        let operator = if present {
            ConditionOperator::Exists
        } else {
            ConditionOperator::NotExists
        };
        Condition {
            field: field.into(),
            ..Condition::new(ConditionKind::FieldExists, operator)
        }
    }

    pub fn sourcetype(operator: ConditionOperator, value: impl Into<String>) -> Self {
        Condition {
            value: Some(serde_json::Value::String(value.into())),
            ..Condition::new(ConditionKind::SourceType, operator)
        }
    }

    pub fn source(operator: ConditionOperator, value: impl Into<String>) -> Self {
        Condition {
            value: Some(serde_json::Value::String(value.into())),
            ..Condition::new(ConditionKind::Source, operator)
        }
    }

    pub fn combination(operator: ConditionOperator, children: Vec<Condition>) -> Self {
        Condition {
            children,
            ..Condition::new(ConditionKind::Combination, operator)
        }
    }

    pub fn condition_kind(&self) -> Option<ConditionKind> {
        ConditionKind::from_name(&self.kind)
    }

    pub fn condition_operator(&self) -> Option<ConditionOperator> {
        ConditionOperator::from_name(&self.operator)
    }

    fn value_str(&self) -> Option<&str> {
        self.value.as_ref().and_then(|v| v.as_str())
    }
}

impl MappingConfig {
    pub fn new(version: impl Into<String>) -> Self {
        MappingConfig {
            version: version.into(),
            ..MappingConfig::default()
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MappingConfig = serde_json::from_str(json)?;
        let result = config.validate();
        if !result.valid {
            return Err(ConfigError::Invalid {
                errors: result.errors,
            });
        }
        debug!(
            target: "spl_toolkit::config",
            mappings = config.mappings.len(),
            rules = config.rules.len(),
            "loaded mapping config"
        );
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Parse a JSON array of `{source, target}` objects.
pub fn load_mappings_json(json: &str) -> Result<Vec<FieldMapping>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

// ============================================================================
// Validation
// ============================================================================

impl MappingConfig {
    /// Check the whole config, collecting every violation.
    pub fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.version.is_empty() {
            errors.push("version is required".to_string());
        }

        validate_mappings(&self.mappings, "", &mut errors);
        validate_rules(&self.rules, "", &mut errors);

        for (i, dm) in self.datamodels.iter().enumerate() {
            if dm.source_datamodel.is_empty() {
                errors.push(format!("datamodel[{}]: source_datamodel is required", i));
            }
            if dm.target_datamodel.is_empty() {
                errors.push(format!("datamodel[{}]: target_datamodel is required", i));
            }
            for (j, fm) in dm.field_mappings.iter().enumerate() {
                if fm.source_field.is_empty() {
                    errors.push(format!(
                        "datamodel[{}].field_mapping[{}]: source_field is required",
                        i, j
                    ));
                }
                if fm.target_field.is_empty() {
                    errors.push(format!(
                        "datamodel[{}].field_mapping[{}]: target_field is required",
                        i, j
                    ));
                }
            }
            validate_rules(
                &dm.conditional_mappings,
                &format!("datamodel[{}].", i),
                &mut errors,
            );
        }

        ValidationResult::from_errors(errors)
    }
}

fn validate_mappings(mappings: &[FieldMapping], prefix: &str, errors: &mut Vec<String>) {
    for (i, mapping) in mappings.iter().enumerate() {
        if mapping.source.is_empty() {
            errors.push(format!("{}mapping[{}]: source field is required", prefix, i));
        }
        if mapping.target.is_empty() {
            errors.push(format!("{}mapping[{}]: target field is required", prefix, i));
        }
    }
}

fn validate_rules(rules: &[ConditionalRule], prefix: &str, errors: &mut Vec<String>) {
    for (i, rule) in rules.iter().enumerate() {
        if rule.id.is_empty() {
            errors.push(format!("{}rule[{}]: id is required", prefix, i));
        }
        if rule.conditions.is_empty() {
            errors.push(format!(
                "{}rule[{}]: at least one condition is required",
                prefix, i
            ));
        }
        if rule.mappings.is_empty() {
            errors.push(format!("{}rule[{}]: at least one mapping is required", prefix, i));
        }
        validate_mappings(&rule.mappings, &format!("{}rule[{}].", prefix, i), errors);

        for (j, condition) in rule.conditions.iter().enumerate() {
            if let Err(e) = validate_condition(condition) {
                errors.push(format!("{}rule[{}].condition[{}]: {}", prefix, i, j, e));
            }
        }
    }
}

/// First problem found in `condition`, children included.
fn validate_condition(condition: &Condition) -> Result<(), String> {
    let Some(kind) = condition.condition_kind() else {
        return Err(format!("invalid condition type: {}", condition.kind));
    };

    if !condition.operator.is_empty() && condition.condition_operator().is_none() {
        return Err(format!("invalid operator: {}", condition.operator));
    }

    if condition.condition_operator() == Some(ConditionOperator::Regex) {
        if let Some(pattern) = condition.value_str() {
            if let Err(e) = Regex::new(pattern) {
                return Err(format!("invalid regex pattern: {}", e));
            }
        }
    }

    match kind {
        ConditionKind::FieldValue | ConditionKind::FieldExists => {
            if condition.field.is_empty() {
                return Err(format!("field is required for type {}", kind));
            }
        }
        ConditionKind::Combination => {
            if condition.children.len() < 2 {
                return Err("combination conditions require at least 2 children".to_string());
            }
            if !matches!(
                condition.condition_operator(),
                Some(ConditionOperator::And | ConditionOperator::Or)
            ) {
                return Err("combination conditions require 'and' or 'or' operator".to_string());
            }
            for (i, child) in condition.children.iter().enumerate() {
                validate_condition(child).map_err(|e| format!("child[{}]: {}", i, e))?;
            }
        }
        ConditionKind::SourceType | ConditionKind::Source => {}
    }

    Ok(())
}

// ============================================================================
// Evaluation
// ============================================================================

impl MappingConfig {
    /// Base mappings followed by the mappings of every enabled rule whose
    /// conditions all hold, in declaration order.
    pub fn evaluate(&self, context: &MappingContext) -> Vec<FieldMapping> {
        let mut result = self.mappings.clone();

        for rule in &self.rules {
            if !rule.enabled {
                continue;
            }
            if rule.conditions.iter().all(|c| evaluate_condition(c, context)) {
                trace!(target: "spl_toolkit::config", rule = %rule.id, "rule matched");
                result.extend(rule.mappings.iter().cloned());
            }
        }

        result
    }
}

fn evaluate_condition(condition: &Condition, context: &MappingContext) -> bool {
    let (Some(kind), operator) = (condition.condition_kind(), condition.condition_operator())
    else {
        return false;
    };

    match kind {
        ConditionKind::FieldExists => {
            let present = context.contains_key(&condition.field);
            match operator {
                Some(ConditionOperator::Exists) => present,
                Some(ConditionOperator::NotExists) => !present,
                _ => false,
            }
        }
        ConditionKind::FieldValue => {
            let Some(value) = context.get(&condition.field) else {
                return false;
            };
            match operator {
                Some(ConditionOperator::Equals) => {
                    condition.value.as_ref() == Some(&value.to_json())
                }
                Some(ConditionOperator::Contains) => match (value, condition.value_str()) {
                    (ContextValue::Single(s), Some(needle)) => s.contains(needle),
                    _ => false,
                },
                Some(ConditionOperator::Regex) => matches_pattern(condition, value),
                _ => false,
            }
        }
        ConditionKind::SourceType | ConditionKind::Source => {
            let Some(value) = context.get(kind.as_str()) else {
                return false;
            };
            let Some(expected) = condition.value_str() else {
                return false;
            };
            match operator {
                Some(ConditionOperator::Equals) => value.any(|v| v == expected),
                Some(ConditionOperator::Contains) => value.any(|v| v.contains(expected)),
                Some(ConditionOperator::Regex) => matches_pattern(condition, value),
                _ => false,
            }
        }
        ConditionKind::Combination => match operator {
            Some(ConditionOperator::And) => condition
                .children
                .iter()
                .all(|c| evaluate_condition(c, context)),
            Some(ConditionOperator::Or) => condition
                .children
                .iter()
                .any(|c| evaluate_condition(c, context)),
            _ => false,
        },
    }
}

fn matches_pattern(condition: &Condition, value: &ContextValue) -> bool {
    let Some(pattern) = condition.value_str() else {
        return false;
    };
    match Regex::new(pattern) {
        Ok(re) => value.any(|v| re.is_match(v)),
        Err(e) => {
            warn!(target: "spl_toolkit::config", %pattern, error = %e, "uncompilable regex condition");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, ContextValue)]) -> MappingContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_field_exists_operators() {
        let ctx = context(&[("host", "web01".into())]);
        assert!(evaluate_condition(&Condition::field_exists("host", true), &ctx));
        assert!(!evaluate_condition(&Condition::field_exists("host", false), &ctx));
        assert!(evaluate_condition(&Condition::field_exists("user", false), &ctx));
    }

    #[test]
    fn test_field_value_contains_requires_strings() {
        let ctx = context(&[
            ("host", "web01.example.com".into()),
            ("tags", ContextValue::Multiple(vec!["a".into()])),
        ]);
        let hit = Condition::field_value("host", ConditionOperator::Contains, "example");
        let miss = Condition::field_value("tags", ConditionOperator::Contains, "a");
        assert!(evaluate_condition(&hit, &ctx));
        assert!(!evaluate_condition(&miss, &ctx));
    }

    #[test]
    fn test_regex_against_any_sourcetype() {
        let ctx = context(&[(
            "sourcetype",
            ContextValue::Multiple(vec!["syslog".into(), "access_combined".into()]),
        )]);
        let cond = Condition::sourcetype(ConditionOperator::Regex, "^access_");
        assert!(evaluate_condition(&cond, &ctx));
    }

    #[test]
    fn test_invalid_regex_is_reported_and_false() {
        let cond = Condition::sourcetype(ConditionOperator::Regex, "(unclosed");
        let err = validate_condition(&cond).unwrap_err();
        assert!(err.starts_with("invalid regex pattern"));

        let ctx = context(&[("sourcetype", "x".into())]);
        assert!(!evaluate_condition(&cond, &ctx));
    }

    #[test]
    fn test_nested_combination_error_path() {
        let cond = Condition::combination(
            ConditionOperator::And,
            vec![
                Condition::sourcetype(ConditionOperator::Equals, "a"),
                Condition::combination(
                    ConditionOperator::Or,
                    vec![Condition::field_exists("", true), Condition::field_exists("b", true)],
                ),
            ],
        );
        assert_eq!(
            validate_condition(&cond).unwrap_err(),
            "child[1]: child[0]: field is required for type field_exists"
        );
    }
}
