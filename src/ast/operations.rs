use crate::ast::{CompareOp, Expr, Id, OutputMode, TokenSpan, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub kind: OperationKind,
    pub span: TokenSpan,
}

/// One operand of a command.
///
/// Variants are listed in the order the parser tries them; `And`/`Or`
/// are built by precedence climbing afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// `expr LIKE value`
    Like { expr: Expr, pattern: Value },
    /// `expr IN (a, b, ...)`
    In { expr: Expr, items: Vec<Expr> },
    /// `NOT operation`
    Not(Box<Operation>),
    /// `expr OUTPUT id`
    OutputSingle {
        input: Expr,
        mode: OutputMode,
        output: Id,
    },
    /// `expr expr OUTPUT id, id`
    OutputMulti {
        inputs: [Expr; 2],
        mode: OutputMode,
        outputs: [Id; 2],
    },
    /// `expr expr expr OUTPUT id, id, id`
    OutputMultiIn {
        inputs: [Expr; 3],
        mode: OutputMode,
        outputs: [Id; 3],
    },
    /// `BY id, id ...`
    By(Vec<Id>),
    /// `expr AS id`
    Rename { expr: Expr, alias: Id },
    /// `id = expr`, or any other comparison
    KeyValue { field: Id, op: CompareOp, value: Expr },
    BareExpression(Expr),
    /// `( operation )`
    Paren(Box<Operation>),
    And(Box<Operation>, Box<Operation>),
    Or(Box<Operation>, Box<Operation>),
}

/// Span of the table operand of a `lookup` command body.
///
/// The table is the first operand. The multi-output forms absorb it as
/// their first input (`lookup geo ip OUTPUT city, country`).
pub fn lookup_table_span(operations: &[Operation]) -> Option<TokenSpan> {
    let first = operations.first()?;
    match first.output_parts() {
        Some((inputs, _)) => inputs.first().map(|e| e.span),
        None => Some(first.span),
    }
}

impl Operation {
    /// Pre-`OUTPUT` expressions and output identifiers of the lookup forms.
    pub fn output_parts(&self) -> Option<(&[Expr], &[Id])> {
        match &self.kind {
            OperationKind::OutputSingle { input, output, .. } => {
                Some((std::slice::from_ref(input), std::slice::from_ref(output)))
            }
            OperationKind::OutputMulti {
                inputs, outputs, ..
            } => Some((inputs.as_slice(), outputs.as_slice())),
            OperationKind::OutputMultiIn {
                inputs, outputs, ..
            } => Some((inputs.as_slice(), outputs.as_slice())),
            _ => None,
        }
    }

    pub fn as_bare_expression(&self) -> Option<&Expr> {
        match &self.kind {
            OperationKind::BareExpression(e) => Some(e),
            _ => None,
        }
    }

    /// Nested operations, left to right.
    pub fn children(&self) -> Vec<&Operation> {
        match &self.kind {
            OperationKind::Not(inner) | OperationKind::Paren(inner) => vec![inner.as_ref()],
            OperationKind::And(lhs, rhs) | OperationKind::Or(lhs, rhs) => {
                vec![lhs.as_ref(), rhs.as_ref()]
            }
            _ => Vec::new(),
        }
    }

    /// Expressions held directly by this operation, left to right.
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.kind {
            OperationKind::Like { expr, .. } | OperationKind::Rename { expr, .. } => vec![expr],
            OperationKind::In { expr, items } => std::iter::once(expr).chain(items).collect(),
            OperationKind::KeyValue { value, .. } => vec![value],
            OperationKind::BareExpression(e) => vec![e],
            _ => match self.output_parts() {
                Some((inputs, _)) => inputs.iter().collect(),
                None => Vec::new(),
            },
        }
    }
}
