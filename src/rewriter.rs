//! Token-accurate text reconstruction.
//!
//! The rewriter walks the full token stream, whitespace and comments
//! included, and copies every token's original text except where a
//! replacement has been registered for its span. The `Eof` marker is never
//! emitted, and the result is trimmed only at its two ends.

use crate::ast::{Token, TokenKind, TokenSpan};
use std::collections::BTreeMap;

pub struct TokenRewriter<'t, 'a> {
    tokens: &'t [Token<'a>],
    /// Keyed by span start
    replacements: BTreeMap<usize, (TokenSpan, String)>,
}

impl<'t, 'a> TokenRewriter<'t, 'a> {
    pub fn new(tokens: &'t [Token<'a>]) -> Self {
        TokenRewriter {
            tokens,
            replacements: BTreeMap::new(),
        }
    }

    /// Register `text` to replace every token in `span`.
    ///
    /// # Panics
    ///
    /// Panics if `span` overlaps a span registered earlier, or falls outside
    /// the token stream. Both are caller bugs.
    pub fn replace(&mut self, span: TokenSpan, text: impl Into<String>) {
        assert!(
            span.start < span.end && span.end <= self.tokens.len(),
            "replacement span {:?} is outside the token stream",
            span
        );

        let before = self.replacements.range(..span.end).next_back();
        if let Some((_, (existing, _))) = before {
            assert!(
                !existing.overlaps(&span),
                "replacement span {:?} overlaps {:?}",
                span,
                existing
            );
        }

        self.replacements.insert(span.start, (span, text.into()));
    }

    pub fn len(&self) -> usize {
        self.replacements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut i = 0;

        while i < self.tokens.len() {
            if let Some((span, text)) = self.replacements.get(&i) {
                out.push_str(text);
                i = span.end;
                continue;
            }

            let token = &self.tokens[i];
            if token.kind != TokenKind::Eof {
                out.push_str(token.text);
            }
            i += 1;
        }

        out.trim().to_string()
    }
}

/// Reproduce the token stream with `replacements` applied.
pub fn rewrite_tokens<'a>(
    tokens: &[Token<'a>],
    replacements: impl IntoIterator<Item = (TokenSpan, String)>,
) -> String {
    let mut rewriter = TokenRewriter::new(tokens);
    for (span, text) in replacements {
        rewriter.replace(span, text);
    }
    rewriter.render()
}
