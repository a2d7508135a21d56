//! Query engine facade.
//!
//! The free functions are stateless: each call parses afresh and shares
//! nothing with later calls. [`Mapper`] adds a reloadable mapping table.
//! Reloading builds a new immutable snapshot and swaps it in, so a query
//! being mapped keeps the table it started with.

use crate::{
    ast::SyntaxTree,
    config::{ConfigError, FieldMapping, MappingConfig, ValidationResult, load_mappings_json},
    discovery::{QueryInfo, discover_tree},
    macros::scan_macros,
    parser::{ParseErrors, parse},
    rewriter::rewrite_tokens,
    transform::plan_renames,
    value::{ContextValue, MappingContext},
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Longest query callers should pass in. Parsing has no internal timeout,
/// so front ends reject anything longer before calling in.
pub const MAX_QUERY_LEN: usize = 64 * 1024;

/// Rename the field-position identifiers of `query` under `mappings`.
///
/// ```
/// use std::collections::HashMap;
///
/// let mappings = HashMap::from([("src_ip".to_string(), "source_ip".to_string())]);
/// let out = spl_toolkit::rewrite("search src_ip=10.0.0.1  | stats count by src_ip", &mappings).unwrap();
/// assert_eq!(out, "search source_ip=10.0.0.1  | stats count by source_ip");
/// ```
pub fn rewrite(query: &str, mappings: &HashMap<String, String>) -> Result<String, ParseErrors> {
    let tree = parse(query)?;
    Ok(rewrite_tree(&tree, mappings))
}

fn rewrite_tree(tree: &SyntaxTree<'_>, mappings: &HashMap<String, String>) -> String {
    let renames = plan_renames(&tree.query, mappings);
    debug!(target: "spl_toolkit::mapper", renamed = renames.len(), "rewriting query");
    rewrite_tokens(&tree.tokens, renames.into_iter().map(|r| (r.span, r.to)))
}

/// Discover what `query` reads.
///
/// Macros are found by a text scan before parsing. If parsing fails and the
/// scan found any, the result holds only those macros instead of an error.
pub fn discover(query: &str) -> Result<QueryInfo, ParseErrors> {
    let macros = scan_macros(query);

    match parse(query) {
        Ok(tree) => {
            let mut info = discover_tree(&tree);
            info.macros = macros;
            Ok(info)
        }
        Err(errors) if !macros.is_empty() => {
            debug!(
                target: "spl_toolkit::mapper",
                macros = macros.len(),
                errors = errors.len(),
                "parse failed, returning macros only"
            );
            Ok(QueryInfo::with_macros(macros))
        }
        Err(errors) => Err(errors),
    }
}

pub fn validate_config(config: &MappingConfig) -> ValidationResult {
    config.validate()
}

pub fn evaluate_mappings(config: &MappingConfig, context: &MappingContext) -> Vec<FieldMapping> {
    config.evaluate(context)
}

/// Context entries derived from discovered metadata: `sourcetype`,
/// `source` and `datamodel`, each one value or a list.
pub fn context_from_info(info: &QueryInfo) -> MappingContext {
    let mut context = MappingContext::new();
    for (key, values) in [
        ("sourcetype", &info.sourcetypes),
        ("source", &info.sources),
        ("datamodel", &info.datamodels),
    ] {
        if !values.is_empty() {
            context.insert(key.to_string(), ContextValue::from_values(values.clone()));
        }
    }
    context
}

// ============================================================================
// Mapper
// ============================================================================

#[derive(Debug, Default)]
struct MappingSnapshot {
    mappings: HashMap<String, String>,
    config: Option<MappingConfig>,
}

impl MappingSnapshot {
    fn with_mappings<'m>(&self, extra: impl IntoIterator<Item = &'m FieldMapping>) -> Self {
        let mut mappings = self.mappings.clone();
        for m in extra {
            mappings.insert(m.source.clone(), m.target.clone());
        }
        MappingSnapshot {
            mappings,
            config: self.config.clone(),
        }
    }
}

/// Field mapper with a reloadable mapping table and optional conditional
/// config. Share it behind an `Arc`; every method takes `&self`.
#[derive(Debug, Default)]
pub struct Mapper {
    snapshot: RwLock<Arc<MappingSnapshot>>,
}

impl Mapper {
    pub fn new() -> Self {
        Mapper::default()
    }

    /// Validate `config` and seed the base table from its `mappings`.
    pub fn with_config(config: MappingConfig) -> Result<Self, ConfigError> {
        let mapper = Mapper::new();
        mapper.set_config(config)?;
        Ok(mapper)
    }

    fn current(&self) -> Arc<MappingSnapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Build the next snapshot from the current one under the write lock.
    fn update(&self, build: impl FnOnce(&MappingSnapshot) -> MappingSnapshot) {
        let mut guard = self.snapshot.write();
        let next = build(&guard);
        debug!(
            target: "spl_toolkit::mapper",
            mappings = next.mappings.len(),
            has_config = next.config.is_some(),
            "installing mapping snapshot"
        );
        *guard = Arc::new(next);
    }

    /// Add `mappings` to the table; a source already present is retargeted.
    pub fn load_mappings(&self, mappings: Vec<FieldMapping>) {
        self.update(|current| current.with_mappings(&mappings));
    }

    /// [`load_mappings`](Self::load_mappings) from a JSON array of
    /// `{source, target}` objects.
    pub fn load_mappings_json(&self, json: &str) -> Result<(), ConfigError> {
        let mappings = load_mappings_json(json)?;
        self.load_mappings(mappings);
        Ok(())
    }

    /// Replace the conditional config. Its base mappings are added to the
    /// table.
    pub fn set_config(&self, config: MappingConfig) -> Result<(), ConfigError> {
        let result = config.validate();
        if !result.valid {
            return Err(ConfigError::Invalid {
                errors: result.errors,
            });
        }

        self.update(|current| {
            let mut next = current.with_mappings(&config.mappings);
            next.config = Some(config);
            next
        });
        Ok(())
    }

    /// Base table, overlaid with the config's mappings for `context`.
    /// Later entries win for the same source.
    pub fn effective_mappings(&self, context: &MappingContext) -> HashMap<String, String> {
        effective_for(&self.current(), context)
    }

    /// Rewrite with the context discovered from the query itself.
    pub fn map_query(&self, query: &str) -> Result<String, ParseErrors> {
        let snapshot = self.current();
        let tree = parse(query)?;
        let context = context_from_info(&discover_tree(&tree));
        let mappings = effective_for(&snapshot, &context);
        Ok(rewrite_tree(&tree, &mappings))
    }

    pub fn map_query_with_context(
        &self,
        query: &str,
        context: &MappingContext,
    ) -> Result<String, ParseErrors> {
        let snapshot = self.current();
        let tree = parse(query)?;
        let mappings = effective_for(&snapshot, context);
        Ok(rewrite_tree(&tree, &mappings))
    }

    pub fn discover_query(&self, query: &str) -> Result<QueryInfo, ParseErrors> {
        discover(query)
    }

    pub fn input_fields(&self, query: &str) -> Result<Vec<String>, ParseErrors> {
        Ok(discover(query)?.input_fields)
    }

    pub fn validate_query(&self, query: &str) -> Result<(), ParseErrors> {
        parse(query).map(|_| ())
    }

    pub fn mapping_count(&self) -> usize {
        self.current().mappings.len()
    }
}

fn effective_for(snapshot: &MappingSnapshot, context: &MappingContext) -> HashMap<String, String> {
    let mut result = snapshot.mappings.clone();
    if let Some(config) = &snapshot.config {
        for m in config.evaluate(context) {
            result.insert(m.source, m.target);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_info_single_and_multiple() {
        let info = QueryInfo {
            sourcetypes: vec!["a".into(), "b".into()],
            sources: vec!["/var/log/x".into()],
            ..QueryInfo::default()
        };
        let context = context_from_info(&info);
        assert_eq!(
            context.get("sourcetype"),
            Some(&ContextValue::Multiple(vec!["a".into(), "b".into()]))
        );
        assert_eq!(context.get("source"), Some(&ContextValue::from("/var/log/x")));
        assert!(!context.contains_key("datamodel"));
    }

    #[test]
    fn test_snapshot_held_by_reader_survives_reload() {
        let mapper = Mapper::new();
        mapper.load_mappings(vec![FieldMapping::new("a", "b")]);
        let before = mapper.current();
        mapper.load_mappings(vec![FieldMapping::new("a", "c")]);
        assert_eq!(before.mappings.get("a").map(String::as_str), Some("b"));
        assert_eq!(mapper.current().mappings.get("a").map(String::as_str), Some("c"));
    }
}
