use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A known attribute of a query, as seen by conditional mapping rules.
///
/// Discovery may find several source types in one query, so a context
/// entry is either one string or a list of them. In JSON both forms load
/// directly:
///
/// ```
/// use spl_toolkit::value::ContextValue;
///
/// let one: ContextValue = serde_json::from_str(r#""access_combined""#).unwrap();
/// let many: ContextValue = serde_json::from_str(r#"["syslog", "access_combined"]"#).unwrap();
///
/// assert_eq!(one, ContextValue::from("access_combined"));
/// assert!(many.any(|v| v == "access_combined"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Single(String),
    Multiple(Vec<String>),
}

/// Attribute name to value, e.g. `sourcetype` to `access_combined`.
pub type MappingContext = HashMap<String, ContextValue>;

impl ContextValue {
    /// One value stays `Single`; anything else becomes `Multiple`.
    pub fn from_values(mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            ContextValue::Single(values.remove(0))
        } else {
            ContextValue::Multiple(values)
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            ContextValue::Single(s) => Some(s),
            ContextValue::Multiple(_) => None,
        }
    }

    /// Every string held, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            ContextValue::Single(s) => vec![s.as_str()],
            ContextValue::Multiple(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Any-of test across the held strings.
    pub fn any(&self, mut predicate: impl FnMut(&str) -> bool) -> bool {
        match self {
            ContextValue::Single(s) => predicate(s),
            ContextValue::Multiple(items) => items.iter().any(|s| predicate(s)),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ContextValue::Single(s) => serde_json::Value::String(s.clone()),
            ContextValue::Multiple(items) => serde_json::Value::Array(
                items
                    .iter()
                    .map(|s| serde_json::Value::String(s.clone()))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Single(s.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Single(s)
    }
}

impl From<Vec<String>> for ContextValue {
    fn from(items: Vec<String>) -> Self {
        ContextValue::Multiple(items)
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Single(s) => write!(f, "{}", s),
            ContextValue::Multiple(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}
