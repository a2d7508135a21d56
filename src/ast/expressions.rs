use crate::ast::{ArithOp, TokenSpan};

/// How an identifier token was matched by the `id` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// Plain identifier
    FieldUse,
    /// Command keyword used as a name, e.g. `from` in `tstats ... from ...`
    CommandUse,
    /// Function keyword used as a name, e.g. `count` in `count<100`
    FunctionUse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Id {
    pub kind: IdKind,
    pub name: String,
    pub span: TokenSpan,
}

impl Id {
    pub fn is_field_use(&self) -> bool {
        self.kind == IdKind::FieldUse
    }
}

/// Function name at the head of a call.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub span: TokenSpan,
}

/// Time literal or `now`.
#[derive(Debug, Clone, PartialEq)]
pub struct Date {
    pub text: String,
    pub span: TokenSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Date(Date),
    /// Quoted string, quotes included
    String { text: String, span: TokenSpan },
    Id(Id),
    /// Number with its optional sign
    Number { text: String, span: TokenSpan },
}

impl Value {
    pub fn text(&self) -> &str {
        match self {
            Value::Date(d) => &d.text,
            Value::String { text, .. } | Value::Number { text, .. } => text,
            Value::Id(id) => &id.name,
        }
    }

    pub fn span(&self) -> TokenSpan {
        match self {
            Value::Date(d) => d.span,
            Value::String { span, .. } | Value::Number { span, .. } => *span,
            Value::Id(id) => id.span,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self, Value::String { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: TokenSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `fn(arg, ...)`
    Call { function: Function, args: Vec<Expr> },
    /// `( expr )`
    Paren(Box<Expr>),
    /// `*expr*`
    Contains(Box<Expr>),
    /// `*expr`
    EndsWith(Box<Expr>),
    /// `*`
    Wildcard,
    /// `/var/log/app.log`
    Path(Vec<Id>),
    Value(Value),
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `expr*`
    StartsWith(Box<Expr>),
}

impl Expr {
    /// The value when this expression is a lone value.
    pub fn as_value(&self) -> Option<&Value> {
        match &self.kind {
            ExprKind::Value(v) => Some(v),
            _ => None,
        }
    }

    /// The identifier when this expression is a lone identifier.
    pub fn as_id(&self) -> Option<&Id> {
        match self.as_value() {
            Some(Value::Id(id)) => Some(id),
            _ => None,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. })
    }

    /// Direct sub-expressions, left to right.
    pub fn children(&self) -> Vec<&Expr> {
        match &self.kind {
            ExprKind::Call { args, .. } => args.iter().collect(),
            ExprKind::Paren(inner)
            | ExprKind::Contains(inner)
            | ExprKind::EndsWith(inner)
            | ExprKind::StartsWith(inner) => vec![inner.as_ref()],
            ExprKind::Binary { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            ExprKind::Wildcard | ExprKind::Path(_) | ExprKind::Value(_) => Vec::new(),
        }
    }
}
