//! JSON rendering of parse trees and discovery results.
//!
//! A tree becomes nested [`AstNode`]s: `type` names the rule (`query`,
//! `next_command`, `key_value`, `call`, `field`, ...), `text` is the
//! source text the node covers with whitespace and comments dropped, and
//! `children` lists sub-nodes in source order. Empty `text` or `children`
//! are omitted.
//!
//! ```
//! use spl_toolkit::output::tree_to_json;
//!
//! let tree = spl_toolkit::parse("search a=1").unwrap();
//! let json = tree_to_json(&tree, false).unwrap();
//! assert!(json.starts_with(r#"{"type":"query","text":"searcha=1""#));
//! ```

use crate::{
    ast::{
        Command, Expr, ExprKind, Id, IdKind, InitCommand, NextCommand, Operation, OperationKind,
        Subquery, SyntaxTree, TokenSpan, Value,
    },
    discovery::QueryInfo,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AstNode {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AstNode>,
}

/// Build the [`AstNode`] view of `tree`.
pub fn tree_to_ast(tree: &SyntaxTree<'_>) -> AstNode {
    let builder = AstBuilder { tree };
    let mut children = vec![builder.init(&tree.query.init)];
    children.extend(tree.query.commands.iter().map(|c| builder.next(c)));
    builder.node("query", tree.query.span, children)
}

pub fn tree_to_json(tree: &SyntaxTree<'_>, pretty: bool) -> Result<String, serde_json::Error> {
    render(&tree_to_ast(tree), pretty)
}

pub fn info_to_json(info: &QueryInfo, pretty: bool) -> Result<String, serde_json::Error> {
    render(info, pretty)
}

fn render<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String, serde_json::Error> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

struct AstBuilder<'t, 'a> {
    tree: &'t SyntaxTree<'a>,
}

impl AstBuilder<'_, '_> {
    fn node(&self, kind: &'static str, span: TokenSpan, children: Vec<AstNode>) -> AstNode {
        AstNode {
            kind,
            text: self.tree.compact_text(span),
            children,
        }
    }

    fn init(&self, init: &InitCommand) -> AstNode {
        let mut children: Vec<AstNode> = init.command.iter().map(|c| self.command(c)).collect();
        children.extend(init.operations.iter().map(|op| self.operation(op)));
        children.extend(init.subquery.iter().map(|s| self.subquery(s)));
        self.node("init_command", init.span, children)
    }

    fn next(&self, next: &NextCommand) -> AstNode {
        let mut children = vec![self.command(&next.command)];
        children.extend(next.operations.iter().map(|op| self.operation(op)));
        children.extend(next.subquery.iter().map(|s| self.subquery(s)));
        self.node("next_command", next.span, children)
    }

    fn subquery(&self, subquery: &Subquery) -> AstNode {
        let mut children = vec![self.init(&subquery.init)];
        children.extend(subquery.commands.iter().map(|c| self.next(c)));
        self.node("subquery", subquery.span, children)
    }

    fn command(&self, command: &Command) -> AstNode {
        self.node("command", command.span, Vec::new())
    }

    fn operation(&self, op: &Operation) -> AstNode {
        let kind = match &op.kind {
            OperationKind::Like { .. } => "like",
            OperationKind::In { .. } => "in",
            OperationKind::Not(_) => "not",
            OperationKind::OutputSingle { .. } => "output_single",
            OperationKind::OutputMulti { .. } => "output_multi",
            OperationKind::OutputMultiIn { .. } => "output_multi_in",
            OperationKind::By(_) => "by",
            OperationKind::Rename { .. } => "rename",
            OperationKind::KeyValue { .. } => "key_value",
            OperationKind::BareExpression(_) => "bare_expression",
            OperationKind::Paren(_) => "paren",
            OperationKind::And(..) => "and",
            OperationKind::Or(..) => "or",
        };

        let children = match &op.kind {
            OperationKind::Like { expr, pattern } => vec![self.expr(expr), self.value(pattern)],
            OperationKind::By(ids) => ids.iter().map(|id| self.id(id)).collect(),
            OperationKind::Rename { expr, alias } => vec![self.expr(expr), self.id(alias)],
            OperationKind::KeyValue { field, value, .. } => vec![self.id(field), self.expr(value)],
            OperationKind::OutputSingle { .. }
            | OperationKind::OutputMulti { .. }
            | OperationKind::OutputMultiIn { .. } => match op.output_parts() {
                Some((inputs, outputs)) => inputs
                    .iter()
                    .map(|e| self.expr(e))
                    .chain(outputs.iter().map(|id| self.id(id)))
                    .collect(),
                None => Vec::new(),
            },
            _ => op
                .children()
                .into_iter()
                .map(|child| self.operation(child))
                .chain(op.expressions().into_iter().map(|e| self.expr(e)))
                .collect(),
        };

        self.node(kind, op.span, children)
    }

    fn expr(&self, expr: &Expr) -> AstNode {
        let kind = match &expr.kind {
            ExprKind::Value(v) => return self.value(v),
            ExprKind::Call { .. } => "call",
            ExprKind::Paren(_) => "paren_expression",
            ExprKind::Contains(_) => "contains",
            ExprKind::EndsWith(_) => "ends_with",
            ExprKind::StartsWith(_) => "starts_with",
            ExprKind::Wildcard => "wildcard",
            ExprKind::Path(_) => "path",
            ExprKind::Binary { .. } => "binary",
        };

        let mut children = Vec::new();
        match &expr.kind {
            ExprKind::Call { function, .. } => {
                children.push(self.node("function", function.span, Vec::new()));
            }
            ExprKind::Path(ids) => children.extend(ids.iter().map(|id| self.id(id))),
            _ => {}
        }
        children.extend(expr.children().into_iter().map(|e| self.expr(e)));

        self.node(kind, expr.span, children)
    }

    fn value(&self, value: &Value) -> AstNode {
        match value {
            Value::Id(id) => self.id(id),
            Value::Date(d) => self.node("date", d.span, Vec::new()),
            Value::String { span, .. } => self.node("string", *span, Vec::new()),
            Value::Number { span, .. } => self.node("number", *span, Vec::new()),
        }
    }

    fn id(&self, id: &Id) -> AstNode {
        let kind = match id.kind {
            IdKind::FieldUse => "field",
            IdKind::CommandUse => "command_use",
            IdKind::FunctionUse => "function_use",
        };
        self.node(kind, id.span, Vec::new())
    }
}
