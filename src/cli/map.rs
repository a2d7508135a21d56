//! Rewrite a query under a mapping table

use super::{CliError, check_query_len, load_mapping_file, parse_context};
use crate::{MappingConfig, mapper::Mapper};
use std::path::PathBuf;
use tracing::debug;

/// Options for the map command
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// The query to rewrite
    pub query: String,
    /// JSON array of `{source, target}` mappings
    pub mappings: Option<PathBuf>,
    /// Conditional mapping config
    pub config: Option<PathBuf>,
    /// `key=value` context entries; empty means detect from the query
    pub context: Vec<String>,
}

/// Execute a map operation, returning the rewritten query
pub fn execute_map(options: &MapOptions) -> Result<String, CliError> {
    check_query_len(&options.query)?;

    let mapper = match &options.config {
        Some(path) => Mapper::with_config(MappingConfig::from_json_file(path)?)?,
        None => Mapper::new(),
    };
    if let Some(path) = &options.mappings {
        mapper.load_mappings(load_mapping_file(path)?);
    }
    debug!(target: "spl_toolkit::cli", mappings = mapper.mapping_count(), "mapper ready");

    let mapped = if options.context.is_empty() {
        mapper.map_query(&options.query)?
    } else {
        let context = parse_context(&options.context)?;
        mapper.map_query_with_context(&options.query, &context)?
    };
    Ok(mapped)
}
