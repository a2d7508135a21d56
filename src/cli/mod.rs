//! CLI support for spl-toolkit
//!
//! Each command is an options struct plus an `execute_*` function, so the
//! commands can be driven from other tools as well as from the binary.

mod convert;
mod discover;
mod map;
mod validate;

pub use convert::{load_mapping_file, parse_context};
pub use discover::{DiscoverOptions, execute_discover, execute_parse};
pub use map::{MapOptions, execute_map};
pub use validate::{ValidateResult, execute_check_config, execute_validate};

use crate::{ConfigError, MAX_QUERY_LEN, ParseErrors};
use std::io;

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Query failed to lex or parse
    Parse(ParseErrors),
    /// Mapping config failed to load or validate
    Config(ConfigError),
    /// JSON rendering error
    Json(serde_json::Error),
    /// IO error
    Io(io::Error),
    /// No query given and nothing piped on stdin
    NoInput,
    /// Query longer than [`MAX_QUERY_LEN`]
    QueryTooLong(usize),
    /// A `--context` argument that is not `key=value`
    InvalidContext(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Parse(e) => write!(f, "Parse error: {}", e),
            CliError::Config(e) => write!(f, "Config error: {}", e),
            CliError::Json(e) => write!(f, "JSON error: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoInput => write!(f, "No query provided. Pass it as an argument or pipe it to stdin."),
            CliError::QueryTooLong(len) => write!(
                f,
                "Query is {} bytes; the limit is {} bytes",
                len, MAX_QUERY_LEN
            ),
            CliError::InvalidContext(arg) => {
                write!(f, "Invalid context '{}': expected key=value", arg)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Parse(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Json(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseErrors> for CliError {
    fn from(e: ParseErrors) -> Self {
        CliError::Parse(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Reject queries over [`MAX_QUERY_LEN`] before they reach the parser.
pub fn check_query_len(query: &str) -> Result<(), CliError> {
    if query.len() > MAX_QUERY_LEN {
        return Err(CliError::QueryTooLong(query.len()));
    }
    Ok(())
}
