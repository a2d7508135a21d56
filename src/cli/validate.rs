//! Syntax and config validation

use super::{CliError, check_query_len};
use crate::{MappingConfig, ParseError, ValidationResult, parse};
use std::{fs, path::Path};

/// Result of a query validation
#[derive(Debug)]
pub enum ValidateResult {
    Valid,
    /// One entry per error, `line L:C message`
    Invalid(Vec<String>),
}

/// Check query syntax. Parse errors are a result, not a failure.
pub fn execute_validate(query: &str) -> Result<ValidateResult, CliError> {
    check_query_len(query)?;
    match parse(query) {
        Ok(_) => Ok(ValidateResult::Valid),
        Err(errors) => Ok(ValidateResult::Invalid(
            errors.iter().map(ParseError::to_string).collect(),
        )),
    }
}

/// Validate a config file without failing on an invalid config, so every
/// violation is reported.
pub fn execute_check_config(path: &Path) -> Result<ValidationResult, CliError> {
    let text = fs::read_to_string(path)?;
    let config: MappingConfig = serde_json::from_str(&text)?;
    Ok(config.validate())
}
