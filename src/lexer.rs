use crate::ast::{Span, Token, TokenKind};
use crate::parser::{ParseError, ParseErrors};

/// Commands that may open a pipeline.
pub const INIT_COMMANDS: &[&str] = &[
    "search",
    "inputlookup",
    "inputcsv",
    "tstats",
    "mstats",
    "datamodel",
    "from",
    "pivot",
    "makeresults",
    "metadata",
    "metasearch",
    "multisearch",
    "rest",
    "dbinspect",
    "eventcount",
    "loadjob",
    "savedsearch",
    "gentimes",
];

/// Names that act both as a pipeline command and as an eval function.
pub const COMMANDS_AND_FUNCTIONS: &[&str] = &["lookup", "replace", "spath"];

pub const COMMANDS: &[&str] = &[
    "eval",
    "stats",
    "where",
    "table",
    "fields",
    "rename",
    "sort",
    "head",
    "tail",
    "dedup",
    "rex",
    "regex",
    "append",
    "appendcols",
    "appendpipe",
    "join",
    "top",
    "rare",
    "chart",
    "timechart",
    "eventstats",
    "streamstats",
    "transaction",
    "fillnull",
    "bin",
    "bucket",
    "convert",
    "iplocation",
    "geostats",
    "outputlookup",
    "outputcsv",
    "collect",
    "fieldformat",
    "addtotals",
    "addinfo",
    "mvexpand",
    "makemv",
    "reverse",
    "uniq",
    "format",
    "return",
    "union",
    "xyseries",
    "untable",
    "foreach",
    "map",
    "delete",
    "predict",
    "cluster",
    "sendemail",
];

/// Search-time modifiers that double as functions.
pub const MODIFIERS_AND_FUNCTIONS: &[&str] = &["earliest", "latest"];

pub const TIME_FUNCTIONS: &[&str] = &["now"];

pub const FUNCTIONS: &[&str] = &[
    "count",
    "sum",
    "avg",
    "mean",
    "min",
    "max",
    "dc",
    "distinct_count",
    "estdc",
    "values",
    "list",
    "first",
    "last",
    "median",
    "mode",
    "stdev",
    "stdevp",
    "var",
    "varp",
    "range",
    "perc",
    "percentile",
    "sumsq",
    "rate",
    "earliest_time",
    "latest_time",
    "sparkline",
    "round",
    "floor",
    "ceil",
    "ceiling",
    "abs",
    "exp",
    "ln",
    "log",
    "pow",
    "sqrt",
    "pi",
    "random",
    "if",
    "case",
    "coalesce",
    "nullif",
    "null",
    "isnull",
    "isnotnull",
    "isnum",
    "isstr",
    "isint",
    "validate",
    "len",
    "lower",
    "upper",
    "substr",
    "trim",
    "ltrim",
    "rtrim",
    "split",
    "urldecode",
    "md5",
    "sha1",
    "sha256",
    "tostring",
    "tonumber",
    "typeof",
    "printf",
    "mvcount",
    "mvindex",
    "mvjoin",
    "mvfilter",
    "mvappend",
    "mvdedup",
    "mvfind",
    "mvsort",
    "mvzip",
    "match",
    "cidrmatch",
    "searchmatch",
    "strftime",
    "strptime",
    "relative_time",
    "true",
    "false",
    "json_extract",
    "json_object",
];

const TIME_UNITS: &[&str] = &[
    "s", "sec", "secs", "second", "seconds", "m", "min", "mins", "minute", "minutes", "h", "hr",
    "hrs", "hour", "hours", "d", "day", "days", "w", "week", "weeks", "mon", "month", "months",
    "q", "qtr", "qtrs", "quarter", "quarters", "y", "yr", "yrs", "year", "years",
];

/// 1-based line and column of a byte offset. Columns count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn locate(source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Position { line, column }
    }
}

/// Classify a word as a keyword, or `Identifier` when it is not one.
pub fn classify_word(word: &str) -> TokenKind {
    match word {
        "AND" => return TokenKind::And,
        "OR" => return TokenKind::Or,
        "NOT" => return TokenKind::Not,
        _ => {}
    }

    let lower = word.to_ascii_lowercase();
    match lower.as_str() {
        "as" => return TokenKind::As,
        "by" => return TokenKind::By,
        "in" => return TokenKind::In,
        "like" => return TokenKind::Like,
        "output" => return TokenKind::Output,
        "outputnew" => return TokenKind::OutputNew,
        _ => {}
    }

    if INIT_COMMANDS.contains(&word) {
        TokenKind::InitCommand
    } else if COMMANDS_AND_FUNCTIONS.contains(&word) {
        TokenKind::StdCommandAndFunction
    } else if COMMANDS.contains(&word) {
        TokenKind::StdCommand
    } else if MODIFIERS_AND_FUNCTIONS.contains(&word) {
        TokenKind::ModifierAndFunction
    } else if TIME_FUNCTIONS.contains(&word) {
        TokenKind::TimeAndFunction
    } else if FUNCTIONS.contains(&word) {
        TokenKind::Function
    } else {
        TokenKind::Identifier
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}

pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Lex the whole input. Trivia tokens are kept and the stream always
    /// ends with a single `Eof` token. Every lex error is reported.
    pub fn tokenize(mut self) -> Result<Vec<Token<'a>>, ParseErrors> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            match self.next_token() {
                Ok(token) => {
                    let done = token.kind == TokenKind::Eof;
                    tokens.push(token);
                    if done {
                        break;
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(ParseErrors::new(errors))
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position += ch.len_utf8();
        }
    }

    fn make(&self, kind: TokenKind, start: usize) -> Token<'a> {
        Token::new(kind, &self.input[start..self.position], Span::new(start, self.position))
    }

    fn error_at(&self, offset: usize, message: String) -> ParseError {
        let pos = Position::locate(self.input, offset);
        ParseError::Lex {
            line: pos.line,
            column: pos.column,
            message,
        }
    }

    fn at_token_boundary(&self) -> bool {
        self.input[..self.position]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace)
    }

    pub fn next_token(&mut self) -> Result<Token<'a>, ParseError> {
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(self.make(TokenKind::Eof, start));
        };

        if ch.is_whitespace() {
            while self.current_char().is_some_and(char::is_whitespace) {
                self.advance();
            }
            return Ok(self.make(TokenKind::Whitespace, start));
        }

        if self.rest().starts_with("```") {
            return self.read_block_comment(start, "```", "```");
        }
        if self.rest().starts_with("/*") {
            return self.read_block_comment(start, "/*", "*/");
        }
        if self.rest().starts_with("//") && self.at_token_boundary() {
            while self.current_char().is_some_and(|c| c != '\n') {
                self.advance();
            }
            return Ok(self.make(TokenKind::Comment, start));
        }

        if ch == '"' || ch == '\'' {
            return self.read_string(start, ch);
        }

        if ch.is_ascii_digit() {
            if let Some(len) = self.match_absolute_time() {
                self.position += len;
                return Ok(self.make(TokenKind::Time, start));
            }
            if let Some(len) = self.match_relative_time(0) {
                self.position += len;
                return Ok(self.make(TokenKind::Time, start));
            }
            self.read_number();
            return Ok(self.make(TokenKind::Number, start));
        }

        if (ch == '+' || ch == '-') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            if let Some(len) = self.match_relative_time(1) {
                self.position += len;
                return Ok(self.make(TokenKind::Time, start));
            }
        }

        if ch == '@' && self.peek_char(1).is_some_and(|c| c.is_ascii_alphabetic()) {
            if let Some(len) = self.match_snap(0) {
                if !self.input[self.position + len..]
                    .chars()
                    .next()
                    .is_some_and(is_word_char)
                {
                    self.position += len;
                    return Ok(self.make(TokenKind::Time, start));
                }
            }
        }

        // `.log` in `*.log` is a word too
        let dotted_word = ch == '.' && self.peek_char(1).is_some_and(|c| c.is_alphabetic() || c == '_');
        if ch.is_alphabetic() || ch == '_' || dotted_word {
            self.advance();
            self.read_word();
            let kind = classify_word(&self.input[start..self.position]);
            return Ok(self.make(kind, start));
        }

        if ch == '.' && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            self.read_number();
            return Ok(self.make(TokenKind::Number, start));
        }

        let two = match (ch, self.peek_char(1)) {
            ('!', Some('=')) => Some(TokenKind::Ne),
            ('>', Some('=')) => Some(TokenKind::Ge),
            ('<', Some('=')) => Some(TokenKind::Le),
            _ => None,
        };
        if let Some(kind) = two {
            self.advance();
            self.advance();
            return Ok(self.make(kind, start));
        }

        let single = match ch {
            '+' => TokenKind::Add,
            '-' => TokenKind::Sub,
            '*' => TokenKind::Mult,
            '/' => TokenKind::Div,
            '%' => TokenKind::Mod,
            '^' => TokenKind::Pow,
            '=' => TokenKind::Eq,
            '>' => TokenKind::Gt,
            '<' => TokenKind::Lt,
            '|' => TokenKind::Pipe,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBrack,
            ']' => TokenKind::RBrack,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '@' => TokenKind::At,
            other => {
                self.advance();
                return Err(self.error_at(
                    start,
                    format!("token recognition error at: '{}'", other),
                ));
            }
        };
        self.advance();
        Ok(self.make(single, start))
    }

    fn read_block_comment(
        &mut self,
        start: usize,
        open: &str,
        close: &str,
    ) -> Result<Token<'a>, ParseError> {
        self.position += open.len();
        match self.rest().find(close) {
            Some(i) => {
                self.position += i + close.len();
                Ok(self.make(TokenKind::Comment, start))
            }
            None => {
                self.position = self.input.len();
                Err(self.error_at(start, "unterminated comment".to_string()))
            }
        }
    }

    fn read_string(&mut self, start: usize, quote: char) -> Result<Token<'a>, ParseError> {
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '\\' => {
                    self.advance();
                    self.advance();
                }
                c if c == quote => {
                    self.advance();
                    return Ok(self.make(TokenKind::String, start));
                }
                _ => self.advance(),
            }
        }

        Err(self.error_at(
            start,
            format!("unterminated string literal starting with {}", quote),
        ))
    }

    fn read_word(&mut self) {
        while let Some(ch) = self.current_char() {
            if is_word_char(ch) {
                self.advance();
            } else if ch == ':' && self.peek_char(1).is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) {
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // dotted groups: 3.14, 192.168.1.1
        while self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current_char(), Some('e' | 'E')) {
            let digit_at = match self.peek_char(1) {
                Some('+' | '-') => 2,
                _ => 1,
            };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) && !self.exponent_runs_into_word(digit_at) {
                for _ in 0..digit_at {
                    self.advance();
                }
                while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
    }

    // `1e5x` is a number followed by a word, not an exponent.
    fn exponent_runs_into_word(&self, digit_at: usize) -> bool {
        let tail: String = self.rest().chars().skip(digit_at).collect();
        let after = tail.trim_start_matches(|c: char| c.is_ascii_digit());
        after.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
    }

    /// `MM/DD/YYYY` with an optional `:HH:MM:SS` suffix. Returns the byte length.
    fn match_absolute_time(&self) -> Option<usize> {
        let bytes = self.rest().as_bytes();
        let mut i = 0;

        let digits = |i: &mut usize, min: usize, max: usize| -> bool {
            let begin = *i;
            while *i < bytes.len() && bytes[*i].is_ascii_digit() && *i - begin < max {
                *i += 1;
            }
            *i - begin >= min && !(*i < bytes.len() && bytes[*i].is_ascii_digit())
        };
        let sep = |i: &mut usize, c: u8| -> bool {
            if *i < bytes.len() && bytes[*i] == c {
                *i += 1;
                true
            } else {
                false
            }
        };

        if !(digits(&mut i, 1, 2) && sep(&mut i, b'/') && digits(&mut i, 1, 2) && sep(&mut i, b'/') && digits(&mut i, 4, 4)) {
            return None;
        }

        let date_end = i;
        if sep(&mut i, b':')
            && digits(&mut i, 1, 2)
            && sep(&mut i, b':')
            && digits(&mut i, 2, 2)
            && sep(&mut i, b':')
            && digits(&mut i, 2, 2)
        {
            return Some(i);
        }
        Some(date_end)
    }

    /// `N unit [@snap]`, starting `skip` bytes past the cursor (used to step
    /// over a sign). Returns the byte length including the skipped prefix.
    fn match_relative_time(&self, skip: usize) -> Option<usize> {
        let rest = &self.rest()[skip..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        let unit_len = rest[digits..]
            .bytes()
            .take_while(u8::is_ascii_alphabetic)
            .count();
        let unit = &rest[digits..digits + unit_len];
        if !TIME_UNITS.contains(&unit) {
            return None;
        }

        let mut len = skip + digits + unit_len;
        if self.rest()[len..].starts_with('@') {
            len += self.match_snap(len)?;
        }

        if self.rest()[len..].chars().next().is_some_and(is_word_char) {
            return None;
        }
        Some(len)
    }

    /// `@unit` with an optional day digit (`@w0`). `at` is the byte offset
    /// of the `@` relative to the cursor.
    fn match_snap(&self, at: usize) -> Option<usize> {
        let rest = self.rest()[at..].strip_prefix('@')?;
        let unit_len = rest.bytes().take_while(u8::is_ascii_alphabetic).count();
        if !TIME_UNITS.contains(&&rest[..unit_len]) {
            return None;
        }
        let digit_len = rest[unit_len..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        Some(1 + unit_len + digit_len)
    }
}

/// Lex `input` and return only the significant (non-trivia) token kinds.
pub fn significant_kinds(input: &str) -> Result<Vec<TokenKind>, ParseErrors> {
    Ok(Lexer::new(input)
        .tokenize()?
        .into_iter()
        .filter(|t| !t.is_trivia())
        .map(|t| t.kind)
        .collect())
}
