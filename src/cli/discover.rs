//! Inspect a query: discovery results and the parse tree

use super::{CliError, check_query_len};
use crate::{discover, info_to_json, parse, tree_to_json};

/// Options for the discover and parse commands
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    pub query: String,
    /// Pretty-print the output
    pub pretty: bool,
}

/// Discovery results as JSON
pub fn execute_discover(options: &DiscoverOptions) -> Result<String, CliError> {
    check_query_len(&options.query)?;
    let info = discover(&options.query)?;
    Ok(info_to_json(&info, options.pretty)?)
}

/// Parse tree as JSON
pub fn execute_parse(options: &DiscoverOptions) -> Result<String, CliError> {
    check_query_len(&options.query)?;
    let tree = parse(&options.query)?;
    Ok(tree_to_json(&tree, options.pretty)?)
}
