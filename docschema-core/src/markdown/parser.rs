// Markdown -> token stream adapter
//
// tree-sitter-md gives us a concrete block tree (document > section > blocks).
// Everything downstream wants the flat, ordered open/close token stream that
// block-level markdown parsers report, with 0-based source line maps, so this
// module walks the tree once and flattens it.

use super::tokens::{LineMap, Token, TokenKind, TokenStream};
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

#[derive(Debug, Error)]
pub enum MarkdownError {
    #[error("failed to load markdown grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[error("markdown parser produced no syntax tree")]
    NoTree,
}

/// Parse markdown text into a flat token stream.
pub fn parse_markdown(text: &str) -> Result<TokenStream, MarkdownError> {
    let language: Language = tree_sitter_md::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let tree = parser.parse(text, None).ok_or(MarkdownError::NoTree)?;

    let mut builder = TokenBuilder::new(text);
    builder.walk_block(tree.root_node(), BlockContext::default());
    tracing::trace!(tokens = builder.tokens.len(), "parsed markdown");
    Ok(builder.tokens)
}

/// Where a block sits: inside how many block quotes, and whether it is a
/// direct child of a tight list item.
#[derive(Debug, Clone, Copy, Default)]
struct BlockContext {
    quote_depth: usize,
    tight_item: bool,
}

struct TokenBuilder<'a> {
    source: &'a str,
    lines: Vec<&'a str>,
    tokens: TokenStream,
}

impl<'a> TokenBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            lines: source.split('\n').collect(),
            tokens: Vec::new(),
        }
    }

    fn walk_block(&mut self, node: Node, ctx: BlockContext) {
        match node.kind() {
            "document" | "section" => self.walk_children(node, ctx),
            "atx_heading" => self.push_atx_heading(node),
            "setext_heading" => self.push_setext_heading(node, ctx),
            "paragraph" => self.push_paragraph(node, ctx, None),
            "fenced_code_block" => self.push_fence(node),
            "indented_code_block" => self.push_code_block(node),
            "list" => self.push_list(node, ctx),
            "block_quote" => self.push_block_quote(node, ctx),
            "pipe_table" => self.push_table(node, ctx),
            "thematic_break" => self.push_other("hr", node),
            "minus_metadata" | "plus_metadata" => self.push_other("front_matter", node),
            "link_reference_definition" => {}
            kind if is_structural_marker(kind) => {}
            kind => self.push_other(kind, node),
        }
    }

    fn walk_children(&mut self, node: Node, ctx: BlockContext) {
        for child in named_children(node) {
            self.walk_block(child, ctx);
        }
    }

    fn push_atx_heading(&mut self, node: Node) {
        let level = named_children(node)
            .iter()
            .find_map(|child| atx_marker_level(child.kind()))
            .unwrap_or(1);

        let text = node
            .child_by_field_name("heading_content")
            .or_else(|| named_children(node).into_iter().find(|c| c.kind() == "inline"))
            .map(|inline| strip_closing_sequence(self.text(inline)).to_string())
            .unwrap_or_default();

        let start = node.start_position().row;
        let map = Some(LineMap::new(start, start + 1));
        self.push_heading(level, text, map);
    }

    fn push_setext_heading(&mut self, node: Node, ctx: BlockContext) {
        let level = if named_children(node)
            .iter()
            .any(|child| child.kind() == "setext_h1_underline")
        {
            1
        } else {
            2
        };

        let text = node
            .child_by_field_name("heading_content")
            .map(|content| {
                let inline = find_child(content, "inline").unwrap_or(content);
                normalize_inline(self.text(inline), ctx.quote_depth)
            })
            .unwrap_or_default();

        let map = Some(self.line_map(node));
        self.push_heading(level, text, map);
    }

    fn push_heading(&mut self, level: u8, text: String, map: Option<LineMap>) {
        self.tokens
            .push(Token::new(TokenKind::HeadingOpen { level }, map));
        self.tokens.push(Token::new(TokenKind::Inline { text }, map));
        self.tokens
            .push(Token::new(TokenKind::HeadingClose { level }, None));
    }

    /// `lead` is a byte offset before the paragraph where its text starts
    /// instead, used to keep a task list checkbox as literal text.
    fn push_paragraph(&mut self, node: Node, ctx: BlockContext, lead: Option<usize>) {
        let hidden = ctx.tight_item;
        let inline = find_child(node, "inline").unwrap_or(node);
        let raw = match lead {
            Some(start) => self.source.get(start..inline.end_byte()).unwrap_or(""),
            None => self.text(inline),
        };
        let text = normalize_inline(raw, ctx.quote_depth);
        let map = Some(self.line_map(node));
        self.push_plain_paragraph(text, map, hidden);
    }

    fn push_fence(&mut self, node: Node) {
        let info = find_child(node, "info_string")
            .map(|n| self.text(n).trim().to_string())
            .unwrap_or_default();
        let text = find_child(node, "code_fence_content")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let map = Some(self.line_map(node));
        self.tokens
            .push(Token::new(TokenKind::Fence { info, text }, map));
    }

    fn push_code_block(&mut self, node: Node) {
        let text = self
            .text(node)
            .lines()
            .map(strip_code_indent)
            .collect::<Vec<_>>()
            .join("\n");
        let map = Some(self.line_map(node));
        self.tokens.push(Token::new(TokenKind::CodeBlock { text }, map));
    }

    fn push_list(&mut self, node: Node, ctx: BlockContext) {
        let items: Vec<Node> = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "list_item")
            .collect();

        let ordered = items
            .first()
            .map(|item| {
                named_children(*item).iter().any(|child| {
                    matches!(child.kind(), "list_marker_dot" | "list_marker_parenthesis")
                })
            })
            .unwrap_or(false);
        let tight = self.list_is_tight(&items);
        let map = Some(self.line_map(node));

        self.tokens
            .push(Token::new(TokenKind::ListOpen { ordered }, map));
        for item in items {
            let item_ctx = BlockContext {
                quote_depth: ctx.quote_depth,
                tight_item: tight,
            };
            let item_map = Some(self.line_map(item));
            self.tokens
                .push(Token::new(TokenKind::ListItemOpen, item_map));
            let mut checkbox = task_marker(item).map(|marker| marker.start_byte());
            for block in item_blocks(item) {
                if block.kind() == "paragraph" {
                    let lead = checkbox.take().or_else(|| task_marker(block).map(|m| m.start_byte()));
                    self.push_paragraph(block, item_ctx, lead);
                } else {
                    self.walk_block(block, item_ctx);
                }
            }
            self.tokens.push(Token::new(TokenKind::ListItemClose, None));
        }
        self.tokens
            .push(Token::new(TokenKind::ListClose { ordered }, None));
    }

    fn push_block_quote(&mut self, node: Node, ctx: BlockContext) {
        let inner = BlockContext {
            quote_depth: ctx.quote_depth + 1,
            tight_item: false,
        };
        let map = Some(self.line_map(node));
        self.tokens.push(Token::new(TokenKind::BlockquoteOpen, map));
        self.walk_children(node, inner);
        self.tokens.push(Token::new(TokenKind::BlockquoteClose, None));
    }

    /// Tables are not block syntax here: the rows read as one plain paragraph,
    /// joined to a paragraph that runs straight into the header row.
    fn push_table(&mut self, node: Node, ctx: BlockContext) {
        let hidden = ctx.tight_item;
        let text = normalize_inline(self.text(node), ctx.quote_depth);
        let map = self.line_map(node);

        if let Some((start, joined)) = self.take_adjoining_paragraph(map.start, hidden) {
            let map = Some(LineMap::new(start, map.end));
            let text = format!("{joined}\n{text}");
            self.push_plain_paragraph(text, map, hidden);
        } else {
            self.push_plain_paragraph(text, Some(map), hidden);
        }
    }

    fn push_plain_paragraph(&mut self, text: String, map: Option<LineMap>, hidden: bool) {
        self.tokens
            .push(Token::new(TokenKind::ParagraphOpen { hidden }, map));
        self.tokens.push(Token::new(TokenKind::Inline { text }, map));
        self.tokens
            .push(Token::new(TokenKind::ParagraphClose { hidden }, None));
    }

    /// Pop the paragraph just emitted when it ends on the line before `row`,
    /// returning its start line and text.
    fn take_adjoining_paragraph(&mut self, row: usize, hidden: bool) -> Option<(usize, String)> {
        let [.., open, inline, close] = self.tokens.as_slice() else {
            return None;
        };
        let adjoining = open.kind == TokenKind::ParagraphOpen { hidden }
            && close.kind == TokenKind::ParagraphClose { hidden }
            && open.map.is_some_and(|m| m.end == row);
        if !adjoining {
            return None;
        }
        let start = open.map.map(|m| m.start)?;
        let text = inline.content()?.to_string();
        self.tokens.truncate(self.tokens.len() - 3);
        Some((start, text))
    }

    fn push_other(&mut self, kind: &'static str, node: Node) {
        let map = Some(self.line_map(node));
        self.tokens.push(Token::new(TokenKind::Other(kind), map));
    }

    /// A list is loose when any two consecutive blocks inside it (across all
    /// of its items) are separated by a blank line.
    fn list_is_tight(&self, items: &[Node]) -> bool {
        let blocks: Vec<Node> = items.iter().flat_map(|item| item_blocks(*item)).collect();
        blocks.windows(2).all(|pair| {
            let gap_start = self.content_end(pair[0]);
            let gap_end = pair[1].start_position().row;
            !(gap_start..gap_end).any(|row| self.is_blank(row))
        })
    }

    fn line_map(&self, node: Node) -> LineMap {
        LineMap::new(node.start_position().row, self.content_end(node))
    }

    /// Exclusive end row of a node, ignoring trailing blank lines the grammar
    /// attaches to blocks.
    fn content_end(&self, node: Node) -> usize {
        let start = node.start_position().row;
        let end = node.end_position();
        let mut last = if end.column == 0 && end.row > start {
            end.row
        } else {
            end.row + 1
        };
        while last > start + 1 && self.is_blank(last - 1) {
            last -= 1;
        }
        last
    }

    fn is_blank(&self, row: usize) -> bool {
        self.lines.get(row).map_or(true, |line| line.trim().is_empty())
    }

    fn text(&self, node: Node) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or("")
    }
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

fn find_child<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    named_children(node).into_iter().find(|child| child.kind() == kind)
}

/// Block children of a list item (markers and continuations removed).
fn item_blocks(item: Node) -> Vec<Node> {
    named_children(item)
        .into_iter()
        .filter(|child| !is_structural_marker(child.kind()))
        .collect()
}

/// Task list checkbox (`[ ]` / `[x]`) directly under `node`.
fn task_marker(node: Node) -> Option<Node> {
    named_children(node)
        .into_iter()
        .find(|child| child.kind().starts_with("task_list_marker_"))
}

fn is_structural_marker(kind: &str) -> bool {
    kind.starts_with("list_marker_")
        || kind.starts_with("task_list_marker_")
        || atx_marker_level(kind).is_some()
        || kind.ends_with("_underline")
        || matches!(
            kind,
            "block_continuation" | "block_quote_marker" | "fenced_code_block_delimiter"
        )
}

fn atx_marker_level(kind: &str) -> Option<u8> {
    match kind {
        "atx_h1_marker" => Some(1),
        "atx_h2_marker" => Some(2),
        "atx_h3_marker" => Some(3),
        "atx_h4_marker" => Some(4),
        "atx_h5_marker" => Some(5),
        "atx_h6_marker" => Some(6),
        _ => None,
    }
}

/// Drop an optional ATX closing sequence (`## Title ##`).
fn strip_closing_sequence(text: &str) -> &str {
    let trimmed = text.trim();
    let without_hashes = trimmed.trim_end_matches('#');
    if without_hashes.len() == trimmed.len() {
        return trimmed;
    }
    if without_hashes.is_empty() {
        return "";
    }
    if without_hashes.ends_with([' ', '\t']) {
        without_hashes.trim_end()
    } else {
        trimmed
    }
}

/// Paragraph text as block parsers report it: one line per source line with
/// indentation and block quote markers removed.
fn normalize_inline(raw: &str, quote_depth: usize) -> String {
    raw.lines()
        .map(|line| strip_quote_markers(line.trim_start(), quote_depth).trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn strip_quote_markers(mut line: &str, depth: usize) -> &str {
    for _ in 0..depth {
        match line.strip_prefix('>') {
            Some(rest) => line = rest.trim_start(),
            None => break,
        }
    }
    line
}

fn strip_code_indent(line: &str) -> &str {
    let indent = line.len() - line.trim_start_matches(' ').len();
    &line[indent.min(4)..]
}
