//! Section indexer.
//!
//! Turns a markdown token stream into addressable sections (one per heading at
//! or above a minimum level) and answers content questions about them:
//! paragraph count, heuristic sentence count, list items, pattern matches.

use crate::markdown::{Token, TokenKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Headings of this level and deeper start sections by default (H2+).
pub const DEFAULT_MIN_LEVEL: u8 = 2;

/// End line used when the last section has no located content at all.
pub const LINE_END_OPEN: usize = usize::MAX;

// ─── Sentence heuristics ────────────────────────────────────────────────────

static ABBREVIATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Dr|Mr|Mrs|Ms|Prof|Sr|Jr|vs|etc|e\.g|i\.e)\.")
        .expect("abbreviation regex is valid")
});

static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d)\.(\d)").expect("decimal regex is valid"));

static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(?:\s+|$)").expect("sentence regex is valid"));

/// Stand-in for protected periods. Must not contain `.`, `!` or `?`.
const PERIOD_SENTINEL: &str = "<PERIOD>";

/// One heading and the tokens that follow it up to the next heading that
/// starts or closes a section.
///
/// `tokens` borrows from the parsed stream; sections never own or modify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionInfo<'a> {
    pub name: String,
    pub level: u8,
    /// Inline and code text of the section body, newline-joined.
    pub content: String,
    /// 0-based line of the heading.
    pub line_start: usize,
    /// 0-based last line of the section (inclusive).
    pub line_end: usize,
    pub tokens: &'a [Token],
}

impl<'a> SectionInfo<'a> {
    fn new(name: String, level: u8, tokens: &'a [Token], line_start: usize, line_end: usize) -> Self {
        let content = tokens
            .iter()
            .filter_map(Token::content)
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            name,
            level,
            content,
            line_start,
            line_end: line_end.max(line_start),
            tokens,
        }
    }
}

/// Sections keyed by heading text, iterated in document order.
///
/// Heading text is the key: when two headings share a name the later one
/// replaces the earlier one (keeping the earlier position).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections<'a> {
    ordered: Vec<SectionInfo<'a>>,
    index: HashMap<String, usize>,
}

impl<'a> Sections<'a> {
    fn insert(&mut self, section: SectionInfo<'a>) {
        match self.index.get(&section.name) {
            Some(&position) => self.ordered[position] = section,
            None => {
                self.index.insert(section.name.clone(), self.ordered.len());
                self.ordered.push(section);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&SectionInfo<'a>> {
        self.index.get(name).map(|&position| &self.ordered[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionInfo<'a>> {
        self.ordered.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(|section| section.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl<'s, 'a> IntoIterator for &'s Sections<'a> {
    type Item = &'s SectionInfo<'a>;
    type IntoIter = std::slice::Iter<'s, SectionInfo<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.iter()
    }
}

enum ScanState {
    Outside,
    InHeading {
        level: u8,
        line_start: usize,
    },
    InBody {
        name: String,
        level: u8,
        line_start: usize,
        body_start: usize,
    },
}

/// Split a token stream into sections.
///
/// A heading at `min_level` or deeper closes the open section and starts a
/// new one. A shallower heading (an H1 with the default level) closes the
/// open section without starting another.
pub fn extract_sections(tokens: &[Token], min_level: u8) -> Sections<'_> {
    let mut sections = Sections::default();
    let mut state = ScanState::Outside;

    for (position, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::HeadingOpen { level } => {
                let heading_line = token.map.map(|m| m.start);
                if let ScanState::InBody {
                    name,
                    level: open_level,
                    line_start,
                    body_start,
                } = std::mem::replace(&mut state, ScanState::Outside)
                {
                    let line_end = heading_line.map_or(0, |line| line.saturating_sub(1));
                    sections.insert(SectionInfo::new(
                        name,
                        open_level,
                        &tokens[body_start..position],
                        line_start,
                        line_end,
                    ));
                }
                if *level >= min_level {
                    state = ScanState::InHeading {
                        level: *level,
                        line_start: heading_line.unwrap_or(0),
                    };
                }
            }
            TokenKind::Inline { text } => {
                if let ScanState::InHeading { level, line_start } = state {
                    state = ScanState::InBody {
                        name: text.clone(),
                        level,
                        line_start,
                        body_start: position + 1,
                    };
                }
            }
            TokenKind::HeadingClose { .. } => {
                // The close of the heading that opened the section is not body content.
                if let ScanState::InBody { body_start, .. } = &mut state {
                    if *body_start == position {
                        *body_start = position + 1;
                    }
                }
            }
            _ => {}
        }
    }

    if let ScanState::InBody {
        name,
        level,
        line_start,
        body_start,
    } = state
    {
        let body = &tokens[body_start.min(tokens.len())..];
        let line_end = body
            .iter()
            .rev()
            .find_map(|token| token.map)
            .map_or(LINE_END_OPEN, |map| map.end.saturating_sub(1));
        sections.insert(SectionInfo::new(name, level, body, line_start, line_end));
    }

    sections
}

/// Look up one section by exact, case-sensitive heading text.
pub fn get_section<'a>(tokens: &'a [Token], name: &str) -> Option<SectionInfo<'a>> {
    let sections = extract_sections(tokens, DEFAULT_MIN_LEVEL);
    let position = *sections.index.get(name)?;
    sections.ordered.into_iter().nth(position)
}

/// Whether a section with this exact heading text exists.
pub fn section_present(tokens: &[Token], name: &str) -> bool {
    extract_sections(tokens, DEFAULT_MIN_LEVEL).contains(name)
}

/// Count visible paragraphs. Paragraphs inside tight list items are hidden
/// and do not count.
pub fn count_paragraphs(section: &SectionInfo) -> usize {
    section
        .tokens
        .iter()
        .filter(|token| matches!(token.kind, TokenKind::ParagraphOpen { hidden: false }))
        .count()
}

/// Heuristic sentence count over the section content.
pub fn count_sentences(section: &SectionInfo) -> usize {
    count_sentences_in(&section.content)
}

/// Heuristic sentence count: common abbreviations and decimal points are
/// protected, then the text is split on runs of `.!?` followed by whitespace
/// or end of text. Not grammatical segmentation.
pub fn count_sentences_in(text: &str) -> usize {
    let protected = ABBREVIATION_RE.replace_all(text, format!("${{1}}{PERIOD_SENTINEL}"));
    let protected = DECIMAL_RE.replace_all(&protected, format!("${{1}}{PERIOD_SENTINEL}${{2}}"));

    SENTENCE_END_RE
        .split(&protected)
        .filter(|fragment| !fragment.trim().is_empty())
        .count()
}

/// Inline text found inside list items, in document order, at any nesting depth.
pub fn extract_list_items<'a>(section: &SectionInfo<'a>) -> Vec<&'a str> {
    let mut items = Vec::new();
    let mut depth = 0usize;

    for token in section.tokens {
        match &token.kind {
            TokenKind::ListItemOpen => depth += 1,
            TokenKind::ListItemClose => depth = depth.saturating_sub(1),
            TokenKind::Inline { text } if depth > 0 => items.push(text.as_str()),
            _ => {}
        }
    }

    items
}

/// Whether `pattern` matches anywhere in the section content.
pub fn section_matches_pattern(section: &SectionInfo, pattern: &str) -> Result<bool, regex::Error> {
    Ok(Regex::new(pattern)?.is_match(&section.content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown;

    #[test]
    fn test_sentences_with_abbreviations() {
        let text = "Dr. Smith works at the clinic. Mr. Jones is his colleague.";
        assert_eq!(count_sentences_in(text), 2);
    }

    #[test]
    fn test_sentences_with_decimals() {
        let text = "The value is 3.14 approximately. Another value is 2.71 roughly.";
        assert_eq!(count_sentences_in(text), 2);
    }

    #[test]
    fn test_sentences_mixed_punctuation() {
        assert_eq!(count_sentences_in("First sentence. Second sentence! Third?"), 3);
        assert_eq!(count_sentences_in("Really?! Yes."), 2);
        assert_eq!(count_sentences_in("Use tools, e.g. grep, i.e. search. Done."), 2);
        assert_eq!(count_sentences_in(""), 0);
        assert_eq!(count_sentences_in("   "), 0);
        assert_eq!(count_sentences_in("No terminal punctuation"), 1);
    }

    #[test]
    fn test_paragraph_count() {
        let tokens = parse_markdown("## Test\n\nPara 1.\n\nPara 2.\n\nPara 3.\n").unwrap();
        let sections = extract_sections(&tokens, DEFAULT_MIN_LEVEL);
        assert_eq!(count_paragraphs(sections.get("Test").unwrap()), 3);
    }

    #[test]
    fn test_list_items_are_extracted() {
        let tokens = parse_markdown("## Test\n\n- Item 1\n- Item 2\n- Item 3\n").unwrap();
        let section = get_section(&tokens, "Test").unwrap();
        assert_eq!(extract_list_items(&section), vec!["Item 1", "Item 2", "Item 3"]);
        // Tight list paragraphs are hidden
        assert_eq!(count_paragraphs(&section), 0);
    }

    #[test]
    fn test_pattern_match_on_content() {
        let tokens = parse_markdown("## Test\n\nThis contains foo and bar.\n").unwrap();
        let section = get_section(&tokens, "Test").unwrap();
        assert!(section_matches_pattern(&section, r"foo.*bar").unwrap());
        assert!(!section_matches_pattern(&section, r"baz").unwrap());
        assert!(section_matches_pattern(&section, r"(unclosed").is_err());
    }
}
