use crate::ast::TokenKind;

/// Arithmetic operators inside expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    /// `^`, right associative
    Pow,
    /// `*`
    Mult,
    /// `%`
    Mod,
    /// `/`
    Div,
    /// `+`
    Add,
    /// `-`
    Sub,
}

impl ArithOp {
    pub fn from_token(kind: TokenKind) -> Option<ArithOp> {
        match kind {
            TokenKind::Pow => Some(ArithOp::Pow),
            TokenKind::Mult => Some(ArithOp::Mult),
            TokenKind::Mod => Some(ArithOp::Mod),
            TokenKind::Div => Some(ArithOp::Div),
            TokenKind::Add => Some(ArithOp::Add),
            TokenKind::Sub => Some(ArithOp::Sub),
            _ => None,
        }
    }

    /// Binding strength and the minimum precedence of the right operand.
    ///
    /// `^` binds its right operand at its own level (right associative);
    /// the others are left associative.
    pub fn precedence(self) -> (u8, u8) {
        match self {
            ArithOp::Pow => (10, 10),
            ArithOp::Mult | ArithOp::Mod => (9, 10),
            ArithOp::Div => (8, 9),
            ArithOp::Add | ArithOp::Sub => (2, 3),
        }
    }
}

/// Comparison operators of a key-value operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl CompareOp {
    pub fn from_token(kind: TokenKind) -> Option<CompareOp> {
        match kind {
            TokenKind::Eq => Some(CompareOp::Eq),
            TokenKind::Ne => Some(CompareOp::Ne),
            TokenKind::Gt => Some(CompareOp::Gt),
            TokenKind::Lt => Some(CompareOp::Lt),
            TokenKind::Ge => Some(CompareOp::Ge),
            TokenKind::Le => Some(CompareOp::Le),
            _ => None,
        }
    }
}

/// `OUTPUT` replaces existing fields, `OUTPUTNEW` only fills missing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Output,
    OutputNew,
}
