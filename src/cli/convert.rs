//! Argument and file conversion helpers

use super::CliError;
use crate::{ContextValue, FieldMapping, MappingContext, config::load_mappings_json};
use std::{fs, path::Path};

/// Build a context from `key=value` arguments.
///
/// A comma-separated value becomes a list (`sourcetype=syslog,access_combined`).
/// Repeating a key appends to its list.
pub fn parse_context(pairs: &[String]) -> Result<MappingContext, CliError> {
    let mut context = MappingContext::new();

    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(CliError::InvalidContext(pair.clone()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::InvalidContext(pair.clone()));
        }

        let mut values: Vec<String> = value
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if let Some(existing) = context.remove(key) {
            let mut merged: Vec<String> = existing.values().into_iter().map(String::from).collect();
            merged.append(&mut values);
            values = merged;
        }
        context.insert(key.to_string(), ContextValue::from_values(values));
    }

    Ok(context)
}

/// Load a JSON array of `{source, target}` objects.
pub fn load_mapping_file(path: &Path) -> Result<Vec<FieldMapping>, CliError> {
    let text = fs::read_to_string(path)?;
    Ok(load_mappings_json(&text)?)
}
