use crate::ast::{Operation, Token, TokenKind, TokenSpan};

/// Command keyword at the head of a pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub kind: TokenKind,
    pub span: TokenSpan,
}

/// First stage of a pipeline. The command keyword is optional:
/// `src_ip=10.0.0.1` is an implicit search.
#[derive(Debug, Clone, PartialEq)]
pub struct InitCommand {
    pub leading_pipe: bool,
    pub command: Option<Command>,
    pub operations: Vec<Operation>,
    pub subquery: Option<Box<Subquery>>,
    pub span: TokenSpan,
}

impl InitCommand {
    pub fn command_name(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.name.as_str())
    }
}

/// Any stage after a `|`.
#[derive(Debug, Clone, PartialEq)]
pub struct NextCommand {
    pub command: Command,
    pub operations: Vec<Operation>,
    pub subquery: Option<Box<Subquery>>,
    pub span: TokenSpan,
}

/// `[ pipeline ]`
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    pub init: InitCommand,
    pub commands: Vec<NextCommand>,
    pub span: TokenSpan,
}

/// Complete pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub init: InitCommand,
    pub commands: Vec<NextCommand>,
    pub span: TokenSpan,
}

/// A parsed query together with the token stream it was built from.
#[derive(Debug, Clone)]
pub struct SyntaxTree<'a> {
    pub source: &'a str,
    pub tokens: Vec<Token<'a>>,
    pub query: Query,
}

impl<'a> SyntaxTree<'a> {
    /// Source text covered by `span`, trivia included.
    pub fn text(&self, span: TokenSpan) -> &'a str {
        let tokens = &self.tokens[span.start..span.end];
        match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => &self.source[first.span.start..last.span.end],
            _ => "",
        }
    }

    /// Text covered by `span` with whitespace and comments dropped, so
    /// `sum(Web.bytes) AS total` reads `sum(Web.bytes)AStotal`.
    pub fn compact_text(&self, span: TokenSpan) -> String {
        self.tokens[span.start..span.end]
            .iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.text)
            .collect()
    }
}
