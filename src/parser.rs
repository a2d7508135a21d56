use crate::{
    ast::{
        ArithOp, Command, CompareOp, Date, Expr, ExprKind, Function, Id, IdKind, InitCommand,
        NextCommand, Operation, OperationKind, OutputMode, Query, Subquery, SyntaxTree, Token,
        TokenKind, TokenSpan, Value,
    },
    lexer::{Lexer, Position},
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Unrecognized character or unterminated literal
    #[error("line {line}:{column} {message}")]
    Lex {
        line: usize,
        column: usize,
        message: String,
    },

    /// Grammar alternatives exhausted
    #[error("line {line}:{column} {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("query is empty")]
    EmptyInput,
}

impl ParseError {
    pub fn line(&self) -> Option<usize> {
        match self {
            ParseError::Lex { line, .. } | ParseError::Syntax { line, .. } => Some(*line),
            ParseError::EmptyInput => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            ParseError::Lex { column, .. } | ParseError::Syntax { column, .. } => Some(*column),
            ParseError::EmptyInput => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ParseError::Lex { message, .. } | ParseError::Syntax { message, .. } => message,
            ParseError::EmptyInput => "query is empty",
        }
    }
}

fn join_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Every error found while lexing and parsing one query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_errors(.0))]
pub struct ParseErrors(Vec<ParseError>);

impl ParseErrors {
    pub fn new(errors: Vec<ParseError>) -> Self {
        ParseErrors(errors)
    }

    pub fn single(error: ParseError) -> Self {
        ParseErrors(vec![error])
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParseError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.0
    }

    pub fn is_empty_input(&self) -> bool {
        matches!(self.0.as_slice(), [ParseError::EmptyInput])
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'e> IntoIterator for &'e ParseErrors {
    type Item = &'e ParseError;
    type IntoIter = std::slice::Iter<'e, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Lex and parse `source` into a [`SyntaxTree`].
///
/// A query that is empty after trimming yields [`ParseError::EmptyInput`].
pub fn parse(source: &str) -> Result<SyntaxTree<'_>, ParseErrors> {
    if source.trim().is_empty() {
        return Err(ParseErrors::single(ParseError::EmptyInput));
    }

    let tokens = Lexer::new(source).tokenize()?;
    let query = Parser::new(source, &tokens).parse_query()?;
    debug!(
        target: "spl_toolkit::parser",
        tokens = tokens.len(),
        commands = query.commands.len() + 1,
        "parsed query"
    );

    Ok(SyntaxTree {
        source,
        tokens,
        query,
    })
}

/// Marker for a failed alternative. Details of the furthest failure are
/// tracked on the parser for error reporting.
#[derive(Debug, Clone, Copy)]
struct Backtrack;

type PResult<T> = Result<T, Backtrack>;

type OperationAlternative<'t, 'a> = fn(&mut Parser<'t, 'a>) -> PResult<OperationKind>;

/// Deepest nesting of operations, expressions and subqueries accepted.
pub const MAX_NESTING: usize = 128;

pub struct Parser<'t, 'a> {
    source: &'a str,
    tokens: &'t [Token<'a>],
    /// Indices of non-trivia tokens; `pos` indexes into this.
    significant: Vec<usize>,
    pos: usize,
    /// `expression` results by start position and minimum precedence
    memo: HashMap<(usize, u8), Option<(Expr, usize)>>,
    depth: usize,
    /// Position where nesting went past [`MAX_NESTING`]; aborts the parse.
    too_deep: Option<usize>,
    furthest: Option<usize>,
    expected: Vec<&'static str>,
    errors: Vec<ParseError>,
}

impl<'t, 'a> Parser<'t, 'a> {
    /// `tokens` must come from [`Lexer::tokenize`] over `source`.
    pub fn new(source: &'a str, tokens: &'t [Token<'a>]) -> Self {
        let mut significant: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.is_trivia())
            .map(|(i, _)| i)
            .collect();

        // guarantee a trailing Eof even for hand-built token lists
        if significant
            .last()
            .is_none_or(|&i| tokens[i].kind != TokenKind::Eof)
        {
            significant.push(tokens.len());
        }

        Parser {
            source,
            tokens,
            significant,
            pos: 0,
            memo: HashMap::new(),
            depth: 0,
            too_deep: None,
            furthest: None,
            expected: Vec::new(),
            errors: Vec::new(),
        }
    }

    // ========================================================================
    // Token access
    // ========================================================================

    fn token_at(&self, pos: usize) -> Option<&Token<'a>> {
        self.significant.get(pos).and_then(|&i| self.tokens.get(i))
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.token_at(self.pos + offset)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek_kind_at(0)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// Index of the current token in the full stream.
    fn token_index(&self) -> usize {
        self.significant
            .get(self.pos)
            .copied()
            .unwrap_or(self.tokens.len())
    }

    fn text(&self) -> &'a str {
        self.token_at(self.pos).map_or("", |t| t.text)
    }

    /// Consume the current token and return its stream index.
    fn advance(&mut self) -> usize {
        let index = self.token_index();
        if self.pos < self.significant.len() - 1 {
            self.pos += 1;
        }
        index
    }

    fn fail(&mut self, expected: &'static str) -> Backtrack {
        match self.furthest {
            Some(at) if at > self.pos => {}
            Some(at) if at == self.pos => {
                if !self.expected.contains(&expected) {
                    self.expected.push(expected);
                }
            }
            _ => {
                self.furthest = Some(self.pos);
                self.expected = vec![expected];
            }
        }
        Backtrack
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<usize> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.fail(kind.describe()))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Option<usize> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Span from the token at `start_pos` to the last consumed token.
    fn span_from(&self, start_pos: usize) -> TokenSpan {
        let first = self.significant[start_pos];
        let last = self.significant[self.pos.max(start_pos + 1) - 1];
        TokenSpan::new(first, last + 1)
    }

    fn compact_text(&self, start_pos: usize) -> String {
        (start_pos..self.pos)
            .filter_map(|p| self.token_at(p))
            .map(|t| t.text)
            .collect()
    }

    /// No trivia between the current token and the previous one.
    fn attached_to_previous(&self) -> bool {
        self.pos > 0 && self.significant[self.pos] == self.significant[self.pos - 1] + 1
    }

    /// No trivia between the current token and the next one.
    fn attached_to_next(&self) -> bool {
        match (self.significant.get(self.pos), self.significant.get(self.pos + 1)) {
            (Some(&here), Some(&next)) => {
                next == here + 1 && self.peek_kind_at(1) != TokenKind::Eof
            }
            _ => false,
        }
    }

    fn enter(&mut self) -> PResult<()> {
        if self.too_deep.is_some() {
            return Err(Backtrack);
        }
        if self.depth >= MAX_NESTING {
            self.too_deep = Some(self.pos);
            return Err(Backtrack);
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ========================================================================
    // Error reporting and recovery
    // ========================================================================

    fn record_error(&mut self) {
        let at = self.furthest.unwrap_or(self.pos);
        let (offset, found) = match self.token_at(at) {
            Some(t) if t.kind == TokenKind::Eof => (t.span.start, "<EOF>".to_string()),
            Some(t) => (t.span.start, t.text.to_string()),
            None => (self.source.len(), "<EOF>".to_string()),
        };

        let message = match self.expected.as_slice() {
            [] => format!("no viable alternative at input '{}'", found),
            [one] => format!("mismatched input '{}' expecting {}", found, one),
            many => format!(
                "mismatched input '{}' expecting {{{}}}",
                found,
                many.join(", ")
            ),
        };

        let position = Position::locate(self.source, offset);
        trace!(
            target: "spl_toolkit::parser",
            line = position.line,
            column = position.column,
            "syntax error: {}",
            message
        );
        self.errors.push(ParseError::Syntax {
            line: position.line,
            column: position.column,
            message,
        });
        self.reset_failure();
    }

    fn nesting_error(&self, at: usize) -> ParseError {
        let offset = self.token_at(at).map_or(self.source.len(), |t| t.span.start);
        let position = Position::locate(self.source, offset);
        ParseError::Syntax {
            line: position.line,
            column: position.column,
            message: format!("nesting too deep (more than {} levels)", MAX_NESTING),
        }
    }

    fn reset_failure(&mut self) {
        self.furthest = None;
        self.expected.clear();
    }

    /// Skip to the next `|` outside any subquery brackets.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => return,
                TokenKind::Pipe if depth == 0 => return,
                TokenKind::LBrack => depth += 1,
                TokenKind::RBrack => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// query := initCommand ('|' nextCommand)* EOF
    pub fn parse_query(&mut self) -> Result<Query, ParseErrors> {
        let start = self.pos;
        self.reset_failure();

        let init = match self.init_command() {
            Ok(init) => Some(init),
            Err(Backtrack) => {
                self.record_error();
                self.recover();
                None
            }
        };

        let mut commands = Vec::new();
        loop {
            self.reset_failure();
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Pipe => {
                    self.advance();
                    match self.next_command() {
                        Ok(command) => commands.push(command),
                        Err(Backtrack) => {
                            self.record_error();
                            self.recover();
                        }
                    }
                }
                _ => {
                    let _ = self.fail("'|'");
                    let _ = self.fail("<EOF>");
                    self.record_error();
                    self.advance();
                    self.recover();
                }
            }
        }

        if let Some(at) = self.too_deep {
            return Err(ParseErrors::single(self.nesting_error(at)));
        }

        match init {
            Some(init) if self.errors.is_empty() => Ok(Query {
                span: TokenSpan::new(self.significant[start], self.token_index()),
                init,
                commands,
            }),
            _ => Err(ParseErrors::new(std::mem::take(&mut self.errors))),
        }
    }

    /// initCommand := '|'? INIT_COMMAND? operation+ subquery?
    fn init_command(&mut self) -> PResult<InitCommand> {
        let start = self.pos;
        let leading_pipe = self.eat(TokenKind::Pipe).is_some();

        if self.check(TokenKind::InitCommand) {
            let after_pipe = self.pos;
            let command = self.command()?;
            match self.command_body() {
                Ok((operations, subquery)) => {
                    return Ok(InitCommand {
                        leading_pipe,
                        command: Some(command),
                        operations,
                        subquery,
                        span: self.span_from(start),
                    });
                }
                // `search` alone is an implicit search for the word
                Err(Backtrack) => self.pos = after_pipe,
            }
        }

        let (operations, subquery) = self.command_body()?;
        Ok(InitCommand {
            leading_pipe,
            command: None,
            operations,
            subquery,
            span: self.span_from(start),
        })
    }

    /// nextCommand := command operation+ subquery?
    fn next_command(&mut self) -> PResult<NextCommand> {
        let start = self.pos;
        let command = self.command()?;
        let (operations, subquery) = self.command_body()?;
        Ok(NextCommand {
            command,
            operations,
            subquery,
            span: self.span_from(start),
        })
    }

    /// operation+ subquery?, or a lone subquery
    fn command_body(&mut self) -> PResult<(Vec<Operation>, Option<Box<Subquery>>)> {
        let mut operations = Vec::new();
        while self.starts_operation() {
            operations.push(self.operation(0)?);
            // `table a, b`
            if self.check(TokenKind::Comma) {
                self.advance();
            }
        }

        let subquery = if self.check(TokenKind::LBrack) {
            Some(Box::new(self.subquery()?))
        } else {
            None
        };

        if operations.is_empty() && subquery.is_none() {
            return Err(self.fail("operation"));
        }
        Ok((operations, subquery))
    }

    /// subquery := '[' initCommand ('|' nextCommand)* ']'
    fn subquery(&mut self) -> PResult<Subquery> {
        self.enter()?;
        let result = self.subquery_inner();
        self.leave();
        result
    }

    fn subquery_inner(&mut self) -> PResult<Subquery> {
        let start = self.pos;
        self.expect(TokenKind::LBrack)?;
        let init = self.init_command()?;
        let mut commands = Vec::new();
        while self.eat(TokenKind::Pipe).is_some() {
            commands.push(self.next_command()?);
        }
        self.expect(TokenKind::RBrack)?;
        Ok(Subquery {
            init,
            commands,
            span: self.span_from(start),
        })
    }

    fn command(&mut self) -> PResult<Command> {
        let kind = self.peek_kind();
        if !kind.is_command() {
            return Err(self.fail("command"));
        }
        let name = self.text().to_string();
        let index = self.advance();
        Ok(Command {
            name,
            kind,
            span: TokenSpan::single(index),
        })
    }

    fn starts_operation(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Not | TokenKind::By | TokenKind::LParen
        ) || self.starts_expression()
    }

    fn starts_expression(&self) -> bool {
        let kind = self.peek_kind();
        kind.is_command()
            || kind.is_function()
            || matches!(
                kind,
                TokenKind::LParen
                    | TokenKind::Mult
                    | TokenKind::Div
                    | TokenKind::Time
                    | TokenKind::String
                    | TokenKind::Identifier
                    | TokenKind::Number
                    | TokenKind::Add
                    | TokenKind::Sub
            )
    }

    // ========================================================================
    // Operations
    // ========================================================================

    fn operation(&mut self, min_prec: u8) -> PResult<Operation> {
        self.enter()?;
        let result = self.operation_climb(min_prec);
        self.leave();
        result
    }

    /// Precedence climbing over AND (13) and OR (12).
    fn operation_climb(&mut self, min_prec: u8) -> PResult<Operation> {
        let mut lhs = self.operation_primary()?;

        loop {
            let prec = match self.peek_kind() {
                TokenKind::And => 13,
                TokenKind::Or => 12,
                _ => break,
            };
            if prec < min_prec {
                break;
            }

            let is_and = self.check(TokenKind::And);
            self.advance();
            let rhs = self.operation(prec + 1)?;
            let span = lhs.span.join(rhs.span);
            let kind = if is_and {
                OperationKind::And(Box::new(lhs), Box::new(rhs))
            } else {
                OperationKind::Or(Box::new(lhs), Box::new(rhs))
            };
            lhs = Operation { kind, span };
        }

        Ok(lhs)
    }

    /// Ordered choice: the first alternative that parses wins.
    fn operation_primary(&mut self) -> PResult<Operation> {
        let start = self.pos;
        let alternatives: [OperationAlternative<'t, 'a>; 11] = [
            Self::like_operation,
            Self::in_operation,
            Self::not_operation,
            Self::output_single,
            Self::output_multi,
            Self::output_multi_in,
            Self::by_operation,
            Self::rename_operation,
            Self::key_value_operation,
            Self::bare_expression,
            Self::paren_operation,
        ];

        for alternative in alternatives {
            self.pos = start;
            if let Ok(kind) = alternative(self) {
                return Ok(Operation {
                    kind,
                    span: self.span_from(start),
                });
            }
        }

        self.pos = start;
        Err(self.fail("operation"))
    }

    fn like_operation(&mut self) -> PResult<OperationKind> {
        let expr = self.expression(0)?;
        self.expect(TokenKind::Like)?;
        let pattern = self.value()?;
        Ok(OperationKind::Like { expr, pattern })
    }

    fn in_operation(&mut self) -> PResult<OperationKind> {
        let expr = self.expression(0)?;
        self.expect(TokenKind::In)?;
        self.expect(TokenKind::LParen)?;
        let items = self.expression_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(OperationKind::In { expr, items })
    }

    fn not_operation(&mut self) -> PResult<OperationKind> {
        self.expect(TokenKind::Not)?;
        // operand binds at 9, so AND/OR chains nest under NOT
        let inner = self.operation(9)?;
        Ok(OperationKind::Not(Box::new(inner)))
    }

    fn output_mode(&mut self) -> PResult<OutputMode> {
        if self.eat(TokenKind::Output).is_some() {
            Ok(OutputMode::Output)
        } else if self.eat(TokenKind::OutputNew).is_some() {
            Ok(OutputMode::OutputNew)
        } else {
            let _ = self.fail("OUTPUT");
            Err(self.fail("OUTPUTNEW"))
        }
    }

    fn output_single(&mut self) -> PResult<OperationKind> {
        let input = self.expression(0)?;
        let mode = self.output_mode()?;
        let output = self.id()?;
        Ok(OperationKind::OutputSingle {
            input,
            mode,
            output,
        })
    }

    fn output_multi(&mut self) -> PResult<OperationKind> {
        let first = self.expression(0)?;
        let second = self.expression(0)?;
        let mode = self.output_mode()?;
        let out1 = self.id()?;
        self.expect(TokenKind::Comma)?;
        let out2 = self.id()?;
        Ok(OperationKind::OutputMulti {
            inputs: [first, second],
            mode,
            outputs: [out1, out2],
        })
    }

    fn output_multi_in(&mut self) -> PResult<OperationKind> {
        let first = self.expression(0)?;
        let second = self.expression(0)?;
        let third = self.expression(0)?;
        let mode = self.output_mode()?;
        let out1 = self.id()?;
        self.expect(TokenKind::Comma)?;
        let out2 = self.id()?;
        self.expect(TokenKind::Comma)?;
        let out3 = self.id()?;
        Ok(OperationKind::OutputMultiIn {
            inputs: [first, second, third],
            mode,
            outputs: [out1, out2, out3],
        })
    }

    /// BY id+ (commas between ids are accepted)
    fn by_operation(&mut self) -> PResult<OperationKind> {
        self.expect(TokenKind::By)?;
        let mut ids = vec![self.id()?];

        loop {
            let before_comma = self.pos;
            let had_comma = self.eat(TokenKind::Comma).is_some();
            if self.starts_id() {
                ids.push(self.id()?);
            } else {
                if had_comma {
                    self.pos = before_comma;
                }
                break;
            }
        }

        Ok(OperationKind::By(ids))
    }

    fn rename_operation(&mut self) -> PResult<OperationKind> {
        let expr = self.expression(0)?;
        self.expect(TokenKind::As)?;
        let alias = self.id()?;
        Ok(OperationKind::Rename { expr, alias })
    }

    fn key_value_operation(&mut self) -> PResult<OperationKind> {
        let field = self.id()?;
        let Some(op) = CompareOp::from_token(self.peek_kind()) else {
            return Err(self.fail("comparison operator"));
        };
        self.advance();
        let value = self.expression(0)?;
        Ok(OperationKind::KeyValue { field, op, value })
    }

    fn bare_expression(&mut self) -> PResult<OperationKind> {
        Ok(OperationKind::BareExpression(self.expression(0)?))
    }

    fn paren_operation(&mut self) -> PResult<OperationKind> {
        self.expect(TokenKind::LParen)?;
        let inner = self.operation(0)?;
        self.expect(TokenKind::RParen)?;
        Ok(OperationKind::Paren(Box::new(inner)))
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// (expression (',' expression)*)?
    fn expression_list(&mut self) -> PResult<Vec<Expr>> {
        let mut items = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(items);
        }
        items.push(self.expression(0)?);
        while self.eat(TokenKind::Comma).is_some() {
            items.push(self.expression(0)?);
        }
        Ok(items)
    }

    fn expression(&mut self, min_prec: u8) -> PResult<Expr> {
        let start = self.pos;
        if let Some(entry) = self.memo.get(&(start, min_prec)) {
            return match entry {
                Some((expr, end)) => {
                    self.pos = *end;
                    Ok(expr.clone())
                }
                None => Err(Backtrack),
            };
        }

        self.enter()?;
        let result = self.expression_climb(min_prec);
        self.leave();

        let entry = result.as_ref().ok().map(|e| (e.clone(), self.pos));
        self.memo.insert((start, min_prec), entry);
        result
    }

    fn expression_climb(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut lhs = self.expression_primary()?;

        loop {
            let kind = self.peek_kind();

            if kind == TokenKind::Mult {
                let attached_left = self.attached_to_previous();
                let attached_right = self.attached_to_next();

                // ` *foo` opens the next term
                if !attached_left && attached_right {
                    break;
                }

                // `foo* bar` is a wildcard, not a product
                if !(attached_left && !attached_right) && 9 >= min_prec {
                    let save = self.pos;
                    self.advance();
                    match self.expression(10) {
                        Ok(rhs) => {
                            lhs = Self::binary(ArithOp::Mult, lhs, rhs);
                            continue;
                        }
                        Err(Backtrack) => self.pos = save,
                    }
                }

                if attached_left && 5 >= min_prec {
                    self.advance();
                    let span = TokenSpan::new(lhs.span.start, self.significant[self.pos - 1] + 1);
                    lhs = Expr {
                        kind: ExprKind::StartsWith(Box::new(lhs)),
                        span,
                    };
                    continue;
                }
                break;
            }

            let Some(op) = ArithOp::from_token(kind) else {
                break;
            };
            let (prec, rhs_prec) = op.precedence();
            if prec < min_prec {
                break;
            }

            let save = self.pos;
            self.advance();
            match self.expression(rhs_prec) {
                Ok(rhs) => lhs = Self::binary(op, lhs, rhs),
                Err(Backtrack) => {
                    self.pos = save;
                    break;
                }
            }
        }

        Ok(lhs)
    }

    fn binary(op: ArithOp, lhs: Expr, rhs: Expr) -> Expr {
        let span = lhs.span.join(rhs.span);
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        }
    }

    fn expression_primary(&mut self) -> PResult<Expr> {
        let start = self.pos;

        // function '(' args ')'
        if self.peek_kind().is_function() && self.peek_kind_at(1) == TokenKind::LParen {
            if let Ok(kind) = self.call() {
                return Ok(Expr {
                    kind,
                    span: self.span_from(start),
                });
            }
            self.pos = start;
        }

        // '(' expression ')'
        if self.check(TokenKind::LParen) {
            self.advance();
            if let Ok(inner) = self.expression(0) {
                if self.expect(TokenKind::RParen).is_ok() {
                    return Ok(Expr {
                        kind: ExprKind::Paren(Box::new(inner)),
                        span: self.span_from(start),
                    });
                }
            }
            self.pos = start;
        }

        if self.check(TokenKind::Mult) {
            self.advance();

            // '*' expression '*'
            if let Ok(inner) = self.expression(6) {
                if self.check(TokenKind::Mult) && self.attached_to_previous() {
                    self.advance();
                    return Ok(Expr {
                        kind: ExprKind::Contains(Box::new(inner)),
                        span: self.span_from(start),
                    });
                }
            }

            // '*' expression
            self.pos = start + 1;
            if let Ok(inner) = self.expression(6) {
                return Ok(Expr {
                    kind: ExprKind::EndsWith(Box::new(inner)),
                    span: self.span_from(start),
                });
            }

            // '*'
            self.pos = start + 1;
            return Ok(Expr {
                kind: ExprKind::Wildcard,
                span: self.span_from(start),
            });
        }

        // ('/' id)+
        if self.check(TokenKind::Div) {
            let mut segments = Vec::new();
            while self.check(TokenKind::Div) {
                let before = self.pos;
                self.advance();
                if !self.starts_id() {
                    self.pos = before;
                    break;
                }
                segments.push(self.id()?);
            }
            if !segments.is_empty() {
                return Ok(Expr {
                    kind: ExprKind::Path(segments),
                    span: self.span_from(start),
                });
            }
            self.pos = start;
        }

        let value = self.value()?;
        Ok(Expr {
            span: value.span(),
            kind: ExprKind::Value(value),
        })
    }

    fn call(&mut self) -> PResult<ExprKind> {
        let name = self.text().to_string();
        let index = self.advance();
        self.expect(TokenKind::LParen)?;
        let args = self.expression_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(ExprKind::Call {
            function: Function {
                name,
                span: TokenSpan::single(index),
            },
            args,
        })
    }

    /// value := date | STRING | id | [ADD|SUB]? NUMBER
    fn value(&mut self) -> PResult<Value> {
        let start = self.pos;
        match self.peek_kind() {
            TokenKind::TimeAndFunction | TokenKind::Time => {
                let text = self.text().to_string();
                let index = self.advance();
                Ok(Value::Date(Date {
                    text,
                    span: TokenSpan::single(index),
                }))
            }
            TokenKind::String => {
                let text = self.text().to_string();
                let index = self.advance();
                Ok(Value::String {
                    text,
                    span: TokenSpan::single(index),
                })
            }
            _ if self.starts_id() => Ok(Value::Id(self.id()?)),
            TokenKind::Add | TokenKind::Sub if self.peek_kind_at(1) == TokenKind::Number => {
                self.advance();
                self.advance();
                Ok(Value::Number {
                    text: self.compact_text(start),
                    span: self.span_from(start),
                })
            }
            TokenKind::Number => {
                let text = self.text().to_string();
                let index = self.advance();
                Ok(Value::Number {
                    text,
                    span: TokenSpan::single(index),
                })
            }
            _ => Err(self.fail("value")),
        }
    }

    fn starts_id(&self) -> bool {
        let kind = self.peek_kind();
        kind == TokenKind::Identifier || kind.is_command() || kind.is_function()
    }

    /// id := IDENTIFIER | command | function
    fn id(&mut self) -> PResult<Id> {
        let kind = self.peek_kind();
        let id_kind = if kind == TokenKind::Identifier {
            IdKind::FieldUse
        } else if kind.is_command() {
            IdKind::CommandUse
        } else if kind.is_function() {
            IdKind::FunctionUse
        } else {
            return Err(self.fail("IDENTIFIER"));
        };

        let name = self.text().to_string();
        let index = self.advance();
        Ok(Id {
            kind: id_kind,
            name,
            span: TokenSpan::single(index),
        })
    }
}
