//! Semantic discovery over a parsed query.
//!
//! The walker classifies identifiers as input fields (read from source
//! data), derived fields (created by the query through `eval`, `AS` or
//! lookup `OUTPUT`), or metadata: source types, sources, data models,
//! datasets and lookups.
//!
//! Derived fields are tracked on a scope stack. Subqueries and the
//! `append`/`join`/`multisearch` commands get a fresh scope that is
//! discarded on exit, so a field derived inside a branch never hides an
//! input field of the enclosing pipeline.

use crate::ast::{
    Expr, Id, IdKind, InitCommand, NextCommand, Operation, OperationKind, Subquery, SyntaxTree,
    TokenSpan, Value, lookup_table_span,
};
use crate::lexer::classify_word;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, trace};

/// Everything discovery found in one query. Each list is deduplicated
/// and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub datamodels: Vec<String>,
    /// `Model.Dataset`
    pub datasets: Vec<String>,
    pub lookups: Vec<String>,
    pub macros: Vec<String>,
    pub sources: Vec<String>,
    pub sourcetypes: Vec<String>,
    pub input_fields: Vec<String>,
}

impl QueryInfo {
    /// Result for a query that failed to parse but contained macros.
    pub fn with_macros(macros: Vec<String>) -> Self {
        QueryInfo {
            macros,
            ..QueryInfo::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.datamodels.is_empty()
            && self.datasets.is_empty()
            && self.lookups.is_empty()
            && self.macros.is_empty()
            && self.sources.is_empty()
            && self.sourcetypes.is_empty()
            && self.input_fields.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

// ============================================================================
// Field-likeness heuristics
// ============================================================================

const KEYWORD_PREFIXES: &[&str] = &["by", "from", "where", "select", "as", "into", "with"];

const NON_FIELD_CHARS: &[char] = &[
    '+', '-', '*', '/', '=', '!', '<', '>', '(', ')', '[', ']', '{', '}', ',', ';', ':', ' ',
    '\t', '\n',
];

/// Whether `text` reads like a field name rather than a literal or a
/// keyword glued to a field (`byWeb.src_ip`).
pub fn is_likely_field_reference(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }

    let lower = text.to_ascii_lowercase();
    for prefix in KEYWORD_PREFIXES {
        if lower.starts_with(prefix) && text.len() > prefix.len() {
            let Some(remainder) = text.get(prefix.len()..) else {
                continue;
            };
            if remainder.contains('.') || remainder.starts_with(|c: char| c.is_ascii_uppercase()) {
                return false;
            }
        }
    }

    // numbers and IP addresses
    let has_digit = text.contains(|c: char| c.is_ascii_digit());
    let has_letter = text.contains(|c: char| c.is_ascii_alphabetic() || c == '_');
    if has_digit && !has_letter {
        return false;
    }

    // partial IP fragments such as ".1.1"
    if text.starts_with('.') && has_digit {
        return false;
    }

    if lower.ends_with(".csv") || lower.ends_with(".txt") || lower.ends_with(".log") {
        return false;
    }

    if text.contains(NON_FIELD_CHARS) {
        return false;
    }

    text.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// `Object.field` or `Model.Object.field` where every part is field-like.
pub fn is_datamodel_field_reference(text: &str) -> bool {
    if !text.contains('.') {
        return false;
    }
    let parts: Vec<&str> = text.split('.').collect();
    (parts.len() == 2 || parts.len() == 3) && parts.iter().all(|p| is_likely_field_reference(p))
}

/// Strip one pair of surrounding double quotes.
fn unquote(name: &str) -> &str {
    let name = name.trim();
    if name.len() >= 2 && name.starts_with('"') && name.ends_with('"') {
        &name[1..name.len() - 1]
    } else {
        name
    }
}

/// First token of the text after `key=`, honoring a leading quoted string.
fn value_after(text: &str, key: &str) -> Option<String> {
    let at = text.to_ascii_lowercase().find(key)?;
    let value = text.get(at + key.len()..)?.trim();

    if let Some(quoted) = value.strip_prefix('"') {
        if let Some(end) = quoted.find('"') {
            return Some(quoted[..end].to_string());
        }
    }

    let end = value
        .find(|c: char| c == ' ' || c == '|' || c == '\t' || c == '\n')
        .unwrap_or(value.len());
    Some(value[..end].to_string()).filter(|v| !v.is_empty())
}

// ============================================================================
// Walker
// ============================================================================

/// Walk `tree` and collect its [`QueryInfo`]. Macros are not part of the
/// grammar; see [`crate::macros`].
pub fn discover_tree(tree: &SyntaxTree<'_>) -> QueryInfo {
    let mut walker = DiscoveryWalker {
        tree,
        info: QueryInfo::default(),
        scopes: vec![HashSet::new()],
        lookup_table: None,
    };

    walker.visit_init(&tree.query.init);
    for command in &tree.query.commands {
        walker.visit_next(command);
    }

    debug!(
        target: "spl_toolkit::discovery",
        input_fields = walker.info.input_fields.len(),
        sourcetypes = walker.info.sourcetypes.len(),
        datamodels = walker.info.datamodels.len(),
        lookups = walker.info.lookups.len(),
        "discovery finished"
    );
    walker.info
}

fn opens_scope(command: &str) -> bool {
    matches!(command, "append" | "join" | "multisearch")
}

struct DiscoveryWalker<'t, 'a> {
    tree: &'t SyntaxTree<'a>,
    info: QueryInfo,
    /// Derived fields per scope; the last entry is the active one.
    scopes: Vec<HashSet<String>>,
    /// Table operand of the `lookup` being visited
    lookup_table: Option<TokenSpan>,
}

impl DiscoveryWalker<'_, '_> {
    // ------------------------------------------------------------------------
    // Scope and result bookkeeping
    // ------------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn mark_derived(&mut self, field: &str) {
        trace!(target: "spl_toolkit::discovery", field, "derived field");
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(field.to_string());
        }
    }

    fn is_derived(&self, field: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains(field))
    }

    fn add_input_field(&mut self, field: &str) {
        if field.is_empty()
            || self.is_derived(field)
            || !is_likely_field_reference(field)
            || classify_word(field).is_command()
        {
            return;
        }
        trace!(target: "spl_toolkit::discovery", field, "input field");
        push_unique(&mut self.info.input_fields, field);
    }

    fn add_datamodel(&mut self, name: &str) {
        push_unique(&mut self.info.datamodels, name);
    }

    fn add_dataset(&mut self, model: &str, object: &str) {
        if !model.is_empty() && !object.is_empty() {
            push_unique(&mut self.info.datasets, &format!("{}.{}", model, object));
        }
    }

    /// `Model` registers a model; `Model.Object` also registers the dataset.
    fn add_datamodel_reference(&mut self, reference: &str) {
        match reference.split_once('.') {
            Some((model, object)) => {
                self.add_datamodel(model);
                self.add_dataset(model, object);
            }
            None => self.add_datamodel(reference),
        }
    }

    fn text(&self, span: TokenSpan) -> String {
        self.tree.compact_text(span)
    }

    // ------------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------------

    fn visit_init(&mut self, init: &InitCommand) {
        let command = init.command_name().map(str::to_ascii_lowercase);
        let command = command.as_deref();
        let scoped = command.is_some_and(opens_scope);
        if scoped {
            self.push_scope();
        }

        if let Some(name) = command {
            self.handle_command(name, &init.operations);
        }
        for op in &init.operations {
            self.visit_operation(op, command);
        }
        if let Some(subquery) = &init.subquery {
            self.visit_subquery(subquery);
        }

        if scoped {
            self.pop_scope();
        }
    }

    fn visit_next(&mut self, next: &NextCommand) {
        let command = next.command.name.to_ascii_lowercase();
        let command = command.as_str();
        let scoped = opens_scope(command);
        if scoped {
            self.push_scope();
        }

        self.handle_command(command, &next.operations);
        for op in &next.operations {
            self.visit_operation(op, Some(command));
        }
        self.lookup_table = None;
        if let Some(subquery) = &next.subquery {
            self.visit_subquery(subquery);
        }

        if scoped {
            self.pop_scope();
        }
    }

    fn visit_subquery(&mut self, subquery: &Subquery) {
        self.push_scope();
        self.visit_init(&subquery.init);
        for command in &subquery.commands {
            self.visit_next(command);
        }
        self.pop_scope();
    }

    // ------------------------------------------------------------------------
    // Command-specific operand handling
    // ------------------------------------------------------------------------

    /// `command` is already lower case.
    fn handle_command(&mut self, command: &str, operations: &[Operation]) {
        match command {
            "lookup" => self.handle_lookup(operations),
            "fields" => {
                for op in operations {
                    let text = self.text(op.span);
                    self.add_input_field(&text);
                }
            }
            "inputlookup" => self.handle_inputlookup(operations),
            "datamodel" => self.handle_datamodel(operations),
            "tstats" => self.handle_tstats(operations),
            "from" => self.handle_from(operations),
            "pivot" => self.handle_pivot(operations),
            _ => {}
        }
    }

    /// `lookup table key... OUTPUT out, ...`
    fn handle_lookup(&mut self, operations: &[Operation]) {
        if operations.is_empty() {
            return;
        }

        if let Some(span) = lookup_table_span(operations) {
            let name = self.text(span);
            push_unique(&mut self.info.lookups, &name);
            self.lookup_table = Some(span);
        }

        for op in &operations[1..] {
            if op.as_bare_expression().is_some() {
                let text = self.text(op.span);
                self.add_input_field(&text);
            }
        }
    }

    /// `inputlookup [options] file.csv`
    fn handle_inputlookup(&mut self, operations: &[Operation]) {
        let file = operations
            .iter()
            .find(|op| op.as_bare_expression().is_some())
            .or_else(|| operations.first());
        if let Some(op) = file {
            let text = self.text(op.span);
            let name = text.strip_suffix(".csv").unwrap_or(&text);
            push_unique(&mut self.info.lookups, name);
        }
    }

    /// `datamodel Model Dataset [search]`
    fn handle_datamodel(&mut self, operations: &[Operation]) {
        let [model, dataset, rest @ ..] = operations else {
            return;
        };
        let model = self.text(model.span);
        let dataset = self.text(dataset.span);
        self.add_datamodel(&model);
        self.add_dataset(&model, &dataset);

        for op in rest {
            let text = self.text(op.span);
            if !text.eq_ignore_ascii_case("search") {
                self.add_input_field(&text);
            }
        }
    }

    fn handle_tstats(&mut self, operations: &[Operation]) {
        for op in operations {
            let text = self.text(op.span);
            let lower = text.to_lowercase();

            if lower.contains("datamodel=") {
                if let Some(reference) = value_after(&text, "datamodel=") {
                    self.add_datamodel_reference(&reference);
                }
            }

            if lower.contains("nodename=") {
                if let Some(node) = value_after(&text, "nodename=") {
                    trace!(target: "spl_toolkit::discovery", node = %node, "tstats node");
                }
            }

            if lower.contains("datamodel:") {
                self.add_dataset_reference(&text);
            }

            if is_datamodel_field_reference(&text) {
                self.add_input_field(&text);
            }

            self.add_call_argument(&text);
        }
    }

    fn handle_from(&mut self, operations: &[Operation]) {
        for op in operations {
            let text = self.text(op.span);
            if text.to_lowercase().contains("datamodel:") {
                self.add_dataset_reference(&text);
            }
        }
    }

    /// `pivot Model Object ...`, names optionally quoted
    fn handle_pivot(&mut self, operations: &[Operation]) {
        let [model, object, ..] = operations else {
            return;
        };
        let model = self.text(model.span);
        let object = self.text(object.span);
        let model = unquote(&model).to_string();
        let object = unquote(&object).to_string();
        self.add_datamodel(&model);
        self.add_dataset(&model, &object);
    }

    /// `datamodel:Model.Object` or `datamodel:"Model"."Object"`
    fn add_dataset_reference(&mut self, text: &str) {
        let Some(at) = text.to_ascii_lowercase().find("datamodel:") else {
            return;
        };
        let Some(reference) = text.get(at + "datamodel:".len()..) else {
            return;
        };

        let (model, object) = if let Some((model, object)) = reference.split_once("\".\"") {
            (unquote(model), unquote(object))
        } else if let Some((model, object)) = reference.split_once('.') {
            (unquote(model.trim()), unquote(object.trim()))
        } else {
            return;
        };

        let model = model.trim_matches('"').to_string();
        let object = object.trim_matches('"').to_string();
        if !model.is_empty() && !object.is_empty() {
            self.add_datamodel(&model);
            self.add_dataset(&model, &object);
        }
    }

    /// Field inside `fn(...)` text, e.g. `sum(Web.bytes)`.
    fn add_call_argument(&mut self, text: &str) {
        let (Some(open), Some(close)) = (text.find('('), text.rfind(')')) else {
            return;
        };
        if close <= open {
            return;
        }
        let content = &text[open + 1..close];
        if is_datamodel_field_reference(content) || is_likely_field_reference(content) {
            self.add_input_field(content);
        }
    }

    // ------------------------------------------------------------------------
    // Operations and expressions
    // ------------------------------------------------------------------------

    fn visit_operation(&mut self, op: &Operation, command: Option<&str>) {
        match &op.kind {
            OperationKind::KeyValue { field, value, .. } => {
                if command == Some("eval") {
                    self.mark_derived(&field.name);
                    self.collect_references(value);
                } else {
                    self.visit_key_value(field, value);
                }
            }
            OperationKind::By(ids) => {
                for id in ids {
                    self.add_input_field(&id.name);
                }
            }
            OperationKind::Rename { expr, alias } => {
                if let Some(id) = expr.as_id() {
                    self.add_input_field(&id.name);
                }
                self.mark_derived(&alias.name);
            }
            OperationKind::OutputSingle { .. }
            | OperationKind::OutputMulti { .. }
            | OperationKind::OutputMultiIn { .. } => {
                if let Some((inputs, outputs)) = op.output_parts() {
                    for input in inputs {
                        if Some(input.span) == self.lookup_table {
                            continue;
                        }
                        if let Some(id) = input.as_id() {
                            self.add_input_field(&id.name);
                        }
                    }
                    for output in outputs {
                        self.mark_derived(&output.name);
                    }
                }
            }
            OperationKind::Not(_)
            | OperationKind::Paren(_)
            | OperationKind::And(..)
            | OperationKind::Or(..) => {
                for child in op.children() {
                    self.visit_operation(child, command);
                }
            }
            OperationKind::Like { .. } | OperationKind::In { .. } | OperationKind::BareExpression(_) => {}
        }

        for expr in op.expressions() {
            self.visit_expression(expr);
        }
    }

    /// `field=value` outside `eval`. The metadata keys record their value
    /// in place of an input field.
    fn visit_key_value(&mut self, field: &Id, value: &Expr) {
        let metadata = value.as_value().map(|v| v.text().trim_matches('"').to_string());

        match field.name.to_lowercase().as_str() {
            "sourcetype" => {
                if let Some(v) = metadata {
                    push_unique(&mut self.info.sourcetypes, &v);
                }
            }
            "source" => {
                if let Some(v) = metadata {
                    push_unique(&mut self.info.sources, &v);
                }
            }
            "datamodel" => {
                if let Some(v) = metadata {
                    self.add_datamodel_reference(&v);
                }
            }
            _ => self.add_input_field(&field.name),
        }
    }

    /// Function calls anywhere in an expression read their arguments.
    fn visit_expression(&mut self, expr: &Expr) {
        if expr.is_call() {
            for arg in expr.children() {
                self.collect_references(arg);
            }
        }
        for child in expr.children() {
            self.visit_expression(child);
        }
    }

    /// Unquoted identifiers anywhere inside `expr` are input fields.
    fn collect_references(&mut self, expr: &Expr) {
        if let Some(Value::Id(id)) = expr.as_value() {
            if id.kind != IdKind::CommandUse {
                self.add_input_field(&id.name);
            }
        }
        for child in expr.children() {
            self.collect_references(child);
        }
    }
}
