use std::fmt;

/// Byte range of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Half-open range of token indices into the full token stream
/// (trivia included).
///
/// Every parse node keeps one of these so the rewriter can find the
/// exact source text a node came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenSpan {
    pub start: usize,
    pub end: usize,
}

impl TokenSpan {
    pub fn new(start: usize, end: usize) -> Self {
        TokenSpan { start, end }
    }

    /// Span covering a single token.
    pub fn single(index: usize) -> Self {
        TokenSpan {
            start: index,
            end: index + 1,
        }
    }

    /// Smallest span containing both `self` and `other`.
    pub fn join(self, other: TokenSpan) -> TokenSpan {
        TokenSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn overlaps(&self, other: &TokenSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`, also the wildcard marker
    Mult,
    /// `/`, also the path separator
    Div,
    /// `%`
    Mod,
    /// `^`
    Pow,

    // Boolean keywords (upper-case only)
    And,
    Or,
    Not,

    // Comparison
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,

    // Punctuation
    Pipe,
    LParen,
    RParen,
    LBrack,
    RBrack,
    Comma,
    Colon,
    At,

    // Clause keywords (case-insensitive)
    As,
    By,
    Output,
    OutputNew,
    In,
    Like,

    /// Command that may open a pipeline, e.g. `search`, `tstats`, `inputlookup`
    InitCommand,
    /// Name that is both a command and a function, e.g. `lookup`
    StdCommandAndFunction,
    /// Pipeline command, e.g. `stats`, `eval`, `rename`
    StdCommand,
    /// Search modifier usable as a function, e.g. `earliest`
    ModifierAndFunction,
    /// `now`
    TimeAndFunction,
    /// Evaluation or aggregation function, e.g. `count`, `round`
    Function,

    /// Relative or absolute time literal
    ///
    /// # Examples
    /// ```text
    /// -24h
    /// -7d@d
    /// @w0
    /// 10/01/2024:00:00:00
    /// ```
    Time,
    /// Numeric literal, including dotted forms such as IPv4 addresses
    Number,
    /// Quoted string, quotes included in the token text
    String,
    Identifier,

    // Trivia, kept in the stream for text reconstruction
    Whitespace,
    Comment,

    Eof,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Token kinds accepted by the `command` rule.
    pub fn is_command(self) -> bool {
        matches!(
            self,
            TokenKind::InitCommand | TokenKind::StdCommandAndFunction | TokenKind::StdCommand
        )
    }

    /// Token kinds accepted by the `function` rule.
    pub fn is_function(self) -> bool {
        matches!(
            self,
            TokenKind::Like
                | TokenKind::StdCommandAndFunction
                | TokenKind::ModifierAndFunction
                | TokenKind::TimeAndFunction
                | TokenKind::Function
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            TokenKind::Eq
                | TokenKind::Ne
                | TokenKind::Gt
                | TokenKind::Lt
                | TokenKind::Ge
                | TokenKind::Le
        )
    }

    /// Name used in syntax error messages.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Add => "'+'",
            TokenKind::Sub => "'-'",
            TokenKind::Mult => "'*'",
            TokenKind::Div => "'/'",
            TokenKind::Mod => "'%'",
            TokenKind::Pow => "'^'",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Eq => "'='",
            TokenKind::Ne => "'!='",
            TokenKind::Gt => "'>'",
            TokenKind::Lt => "'<'",
            TokenKind::Ge => "'>='",
            TokenKind::Le => "'<='",
            TokenKind::Pipe => "'|'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrack => "'['",
            TokenKind::RBrack => "']'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::At => "'@'",
            TokenKind::As => "AS",
            TokenKind::By => "BY",
            TokenKind::Output => "OUTPUT",
            TokenKind::OutputNew => "OUTPUTNEW",
            TokenKind::In => "IN",
            TokenKind::Like => "LIKE",
            TokenKind::InitCommand => "INIT_COMMAND",
            TokenKind::StdCommandAndFunction => "STD_COMMAND_AND_FUNCTION",
            TokenKind::StdCommand => "STD_COMMAND",
            TokenKind::ModifierAndFunction => "MODIFIER_AND_FUNCTION",
            TokenKind::TimeAndFunction => "TIME_AND_FUNCTION",
            TokenKind::Function => "FUNCTION",
            TokenKind::Time => "TIME",
            TokenKind::Number => "NUMBER",
            TokenKind::String => "STRING",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::Eof => "<EOF>",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A lexed token borrowing its text from the query source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, span: Span) -> Self {
        Token { kind, text, span }
    }

    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}
