//! Backtick macro detection.
//!
//! Macros are not part of the grammar, so any query that uses one fails to
//! parse. Scanning the raw text keeps them discoverable regardless.

use once_cell::sync::Lazy;
use regex::Regex;

static MACRO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"`([a-zA-Z_][a-zA-Z0-9_]*)(\([^)]*\))?`").expect("macro pattern is valid")
});

/// A macro invocation found in query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroCall {
    pub name: String,
    /// Raw argument list without the parentheses, if any
    pub arguments: Option<String>,
}

/// Every macro invocation in `query`, in order of appearance.
pub fn scan_macro_calls(query: &str) -> Vec<MacroCall> {
    MACRO_PATTERN
        .captures_iter(query)
        .map(|caps| MacroCall {
            name: caps[1].to_string(),
            arguments: caps
                .get(2)
                .map(|m| m.as_str().trim_start_matches('(').trim_end_matches(')').to_string()),
        })
        .collect()
}

/// Distinct macro names in `query`, first occurrence first.
pub fn scan_macros(query: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for call in scan_macro_calls(query) {
        if !names.contains(&call.name) {
            names.push(call.name);
        }
    }
    names
}
