// Token stream model
//
// This is the boundary between markdown parsing (text -> tokens) and everything
// that reasons about document structure (tokens -> sections -> rule checks).
// The stream is flat and ordered by document position; nesting is expressed
// with open/close pairs the same way block-level markdown parsers report it.

use std::fmt;

/// Source line span of a token: `start` is inclusive, `end` exclusive, both 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineMap {
    pub start: usize,
    pub end: usize,
}

impl LineMap {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    HeadingOpen { level: u8 },
    HeadingClose { level: u8 },
    /// Inline text run: heading text or paragraph text.
    Inline { text: String },
    /// `hidden` is set for paragraphs that sit directly inside tight list items.
    ParagraphOpen { hidden: bool },
    ParagraphClose { hidden: bool },
    /// Fenced code block body.
    Fence { info: String, text: String },
    /// Indented code block body.
    CodeBlock { text: String },
    ListOpen { ordered: bool },
    ListClose { ordered: bool },
    ListItemOpen,
    ListItemClose,
    BlockquoteOpen,
    BlockquoteClose,
    /// Any other block (thematic break, html block, metadata, ...), named by parser node kind.
    Other(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub map: Option<LineMap>,
}

impl Token {
    pub fn new(kind: TokenKind, map: Option<LineMap>) -> Self {
        Self { kind, map }
    }

    /// Text carried by inline and code tokens.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Inline { text } => Some(text),
            TokenKind::Fence { text, .. } | TokenKind::CodeBlock { text } => Some(text),
            _ => None,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self.kind, TokenKind::Inline { .. })
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            TokenKind::HeadingOpen { level } => Some(level),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::HeadingOpen { level } => write!(f, "heading_open(h{level})"),
            TokenKind::HeadingClose { level } => write!(f, "heading_close(h{level})"),
            TokenKind::Inline { .. } => f.write_str("inline"),
            TokenKind::ParagraphOpen { hidden } => write!(f, "paragraph_open(hidden={hidden})"),
            TokenKind::ParagraphClose { hidden } => write!(f, "paragraph_close(hidden={hidden})"),
            TokenKind::Fence { .. } => f.write_str("fence"),
            TokenKind::CodeBlock { .. } => f.write_str("code_block"),
            TokenKind::ListOpen { ordered: true } => f.write_str("ordered_list_open"),
            TokenKind::ListOpen { ordered: false } => f.write_str("bullet_list_open"),
            TokenKind::ListClose { ordered: true } => f.write_str("ordered_list_close"),
            TokenKind::ListClose { ordered: false } => f.write_str("bullet_list_close"),
            TokenKind::ListItemOpen => f.write_str("list_item_open"),
            TokenKind::ListItemClose => f.write_str("list_item_close"),
            TokenKind::BlockquoteOpen => f.write_str("blockquote_open"),
            TokenKind::BlockquoteClose => f.write_str("blockquote_close"),
            TokenKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Parsed document: the ordered token list. Shared read-only once built.
pub type TokenStream = Vec<Token>;
