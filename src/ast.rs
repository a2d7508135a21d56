//! # Search Pipeline Parse Tree
//!
//! This module defines the typed parse tree produced by the parser for
//! SPL-style search pipelines: piped commands, field comparisons and
//! arithmetic expressions.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens, byte spans and token-index spans
//! - **[query]** - Pipeline structure (query, init command, next command, subquery)
//! - **[operations]** - Command operands (key-value, `by`, `AS`, `OUTPUT`, boolean operators)
//! - **[expressions]** - Expressions, values, identifiers, function calls
//! - **[operators]** - Arithmetic and comparison operators
//!
//! ## Quick Start
//!
//! ```text
//! search sourcetype=access_combined | stats count by src_ip
//! ```
//!
//! This query has an init command (`search` with one key-value operation)
//! and one next command (`stats` with a bare expression and a `by` clause).
//!
//! ## Core Concepts
//!
//! ### Pipeline Structure
//!
//! ```text
//! [|] [init-command] operation... [ [subquery] ] | command operation... | ...
//! ```
//!
//! The first stage may omit its command keyword, in which case it is an
//! implicit search. Every later stage starts with a command keyword.
//!
//! ### Keyword Reuse
//!
//! Command and function names are reserved words in the lexer, yet they
//! are accepted wherever an identifier is expected. The resulting [`Id`]
//! records which path matched through [`IdKind`]:
//!
//! ```text
//! search count<100        // `count` is an Id with IdKind::FunctionUse
//! | tstats ... from ...   // `from` is an Id with IdKind::CommandUse
//! ```
//!
//! ### Spans
//!
//! Every node carries a [`TokenSpan`] into the full token stream, whitespace
//! and comments included. The span of a node always covers the spans of its
//! children, which is what lets the rewriter replace a single identifier
//! while reproducing every other byte of the query.
//!
//! ## Examples
//!
//! ### Lookup with outputs
//!
//! ```text
//! | lookup users.csv username OUTPUT full_name
//! ```
//!
//! ### Boolean operations
//!
//! ```text
//! search (status=404 OR status=500) AND NOT host=web*
//! ```
//!
//! ### Subquery
//!
//! ```text
//! search index=main [ search index=threats | fields src_ip ]
//! ```
pub mod tokens;
pub mod expressions;
pub mod operations;
pub mod operators;
pub mod query;

pub use tokens::{Span, Token, TokenKind, TokenSpan};
pub use expressions::{Date, Expr, ExprKind, Function, Id, IdKind, Value};
pub use operations::{Operation, OperationKind, lookup_table_span};
pub use operators::{ArithOp, CompareOp, OutputMode};
pub use query::{Command, InitCommand, NextCommand, Query, Subquery, SyntaxTree};
