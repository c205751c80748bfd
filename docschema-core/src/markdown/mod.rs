//! Markdown parsing
//!
//! Converts markdown text into the flat token stream the section indexer and
//! the rule evaluator work on.
//!
//! ```text
//! markdown text
//!     ↓
//! [tree-sitter-md block grammar]
//!     ↓
//! TokenStream (heading/paragraph/list/fence tokens with line maps)
//!     ↓
//! [Section indexer]
//! ```
//!
//! Parsing goes through a [`TokenCache`] owned by the caller so that the
//! predicate engine and the section checks share one parse per document.

pub mod cache;
pub mod parser;
pub mod tokens;

pub use cache::TokenCache;
pub use parser::{parse_markdown, MarkdownError};
pub use tokens::{LineMap, Token, TokenKind, TokenStream};
