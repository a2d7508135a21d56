use crate::ast::{
    Id, InitCommand, NextCommand, Operation, OperationKind, Query, Subquery, TokenSpan,
    lookup_table_span,
};
use std::collections::HashMap;
use tracing::trace;

/// Where a renamed identifier was found.
///
/// Only these positions are considered field references; identifiers in
/// value positions (`host=web01`, `eval x=a+b`) are never renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPosition {
    /// Left side of a comparison outside `eval`
    ///
    /// # Examples
    /// - `src_ip=10.0.0.1`
    /// - `bytes>1024`
    KeyValue,

    /// Identifier of a `by` clause
    By,

    /// Left side of `expr AS id`
    Rename,

    /// Expression before `OUTPUT`/`OUTPUTNEW`
    LookupInput,

    /// Bare identifier operand of the `fields` command
    Fields,
}

/// A planned substitution of one identifier token.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRename {
    pub span: TokenSpan,
    pub from: String,
    pub to: String,
    pub position: FieldPosition,
}

/// Collect the identifier replacements `mappings` implies for `query`.
///
/// The tree is only read. Each identifier token is scheduled at most once,
/// so the result can be fed straight into a
/// [`TokenRewriter`](crate::rewriter::TokenRewriter).
pub fn plan_renames(query: &Query, mappings: &HashMap<String, String>) -> Vec<FieldRename> {
    let mut planner = RenamePlanner {
        mappings,
        renames: Vec::new(),
        lookup_table: None,
    };
    planner.visit_init(&query.init);
    for command in &query.commands {
        planner.visit_next(command);
    }
    planner.renames
}

struct RenamePlanner<'m> {
    mappings: &'m HashMap<String, String>,
    renames: Vec<FieldRename>,
    /// Table operand of the `lookup` being visited; never a field
    lookup_table: Option<TokenSpan>,
}

impl RenamePlanner<'_> {
    fn visit_init(&mut self, init: &InitCommand) {
        let command = init.command_name().map(str::to_ascii_lowercase);
        self.visit_operations(&init.operations, command.as_deref());
        if let Some(subquery) = &init.subquery {
            self.visit_subquery(subquery);
        }
    }

    fn visit_next(&mut self, command: &NextCommand) {
        let name = command.command.name.to_ascii_lowercase();
        self.visit_operations(&command.operations, Some(name.as_str()));
        if let Some(subquery) = &command.subquery {
            self.visit_subquery(subquery);
        }
    }

    fn visit_subquery(&mut self, subquery: &Subquery) {
        self.visit_init(&subquery.init);
        for command in &subquery.commands {
            self.visit_next(command);
        }
    }

    fn visit_operations(&mut self, operations: &[Operation], command: Option<&str>) {
        self.lookup_table = match command {
            Some("lookup") => lookup_table_span(operations),
            _ => None,
        };
        for op in operations {
            self.visit_operation(op, command);
        }
        self.lookup_table = None;
    }

    fn visit_operation(&mut self, op: &Operation, command: Option<&str>) {
        match &op.kind {
            // `eval lhs=...` defines lhs rather than reading it
            OperationKind::KeyValue { field, .. } => {
                if command != Some("eval") {
                    self.schedule(field, FieldPosition::KeyValue);
                }
            }
            OperationKind::By(ids) => {
                for id in ids {
                    self.schedule(id, FieldPosition::By);
                }
            }
            OperationKind::Rename { expr, .. } => {
                if let Some(id) = expr.as_id() {
                    self.schedule(id, FieldPosition::Rename);
                }
            }
            OperationKind::OutputSingle { .. }
            | OperationKind::OutputMulti { .. }
            | OperationKind::OutputMultiIn { .. } => {
                if let Some((inputs, _)) = op.output_parts() {
                    for input in inputs {
                        if Some(input.span) == self.lookup_table {
                            continue;
                        }
                        if let Some(id) = input.as_id() {
                            self.schedule(id, FieldPosition::LookupInput);
                        }
                    }
                }
            }
            OperationKind::BareExpression(expr) => {
                if command == Some("fields") {
                    if let Some(id) = expr.as_id().filter(|id| id.is_field_use()) {
                        self.schedule(id, FieldPosition::Fields);
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
            OperationKind::Like { .. } | OperationKind::In { .. } => {}
        }
    }

    fn schedule(&mut self, id: &Id, position: FieldPosition) {
        let Some(target) = self.mappings.get(&id.name) else {
            return;
        };
        if self.renames.iter().any(|r| r.span == id.span) {
            return;
        }
        trace!(
            target: "spl_toolkit::transform",
            from = %id.name,
            to = %target,
            ?position,
            "renaming field"
        );
        self.renames.push(FieldRename {
            span: id.span,
            from: id.name.clone(),
            to: target.clone(),
            position,
        });
    }
}
