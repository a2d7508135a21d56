pub mod ast;
pub mod config;
pub mod discovery;
pub mod lexer;
pub mod macros;
pub mod mapper;
pub mod output;
pub mod parser;
pub mod rewriter;
pub mod transform;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{Operation, OperationKind, Query, SyntaxTree, Token, TokenKind, TokenSpan};
pub use config::{
    Condition, ConditionalRule, ConfigError, FieldMapping, MappingConfig, ValidationResult,
};
pub use discovery::QueryInfo;
pub use lexer::{Lexer, Position};
pub use mapper::{
    MAX_QUERY_LEN, Mapper, discover, evaluate_mappings, rewrite, validate_config,
};
pub use output::{info_to_json, tree_to_json};
pub use parser::{ParseError, ParseErrors, Parser, parse};
pub use value::{ContextValue, MappingContext};
