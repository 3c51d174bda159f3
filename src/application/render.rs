//! Markdown rendering for estimate text.
//!
//! Projects the estimate into a tree of blocks and inlines. Supports the
//! GitHub-flavoured subset the estimation service produces: ATX and setext
//! headings, paragraphs, block quotes, nested lists (with task markers),
//! tables with column alignment, fenced code with a declared language,
//! thematic breaks and raw HTML, both as blocks and inline.
//!
//! Rendering is pure: the same text always yields the same tree.

use std::collections::HashMap;

use serde::Serialize;

use super::highlight::{highlight, Token};

/// Rendered estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Number of top-level headings.
    #[must_use]
    pub fn heading_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Heading { .. }))
            .count()
    }

    /// Top-level tables.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    Quote {
        blocks: Vec<Block>,
    },
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
    },
    Table(Table),
    Code {
        language: Option<String>,
        code: String,
        /// Highlighted lines, one token list per line of `code`.
        #[serde(skip)]
        lines: Vec<Vec<Token>>,
    },
    Html {
        html: String,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// Nesting depth, 0 for top-level items.
    pub depth: usize,
    pub ordered: bool,
    /// `Some(checked)` for task list items.
    pub task: Option<bool>,
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Vec<Inline>>,
    pub rows: Vec<Vec<Vec<Inline>>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, url: String },
    Image { alt: String, url: String },
    Html(String),
    LineBreak,
}

/// Render estimate text into a document tree.
#[must_use]
pub fn render(text: &str) -> Document {
    let lines: Vec<&str> = text.lines().collect();
    Document {
        blocks: parse_blocks(&lines, 0),
    }
}

/// Deepest block quote nesting parsed; deeper `>` markers stay in the text.
const MAX_QUOTE_DEPTH: usize = 16;

fn parse_blocks(lines: &[&str], depth: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(fence) = Fence::open(line) {
            let (block, next) = parse_code(lines, i, &fence);
            blocks.push(block);
            i = next;
        } else if let Some((level, text)) = atx_heading(line) {
            blocks.push(Block::Heading {
                level,
                content: parse_inlines(text),
            });
            i += 1;
        } else if is_rule(line) {
            blocks.push(Block::Rule);
            i += 1;
        } else if is_table_start(lines, i) {
            let (table, next) = parse_table(lines, i);
            blocks.push(Block::Table(table));
            i = next;
        } else if depth < MAX_QUOTE_DEPTH && quote_content(line).is_some() {
            let mut inner = Vec::new();
            while let Some(content) = lines.get(i).and_then(|l| quote_content(l)) {
                inner.push(content);
                i += 1;
            }
            blocks.push(Block::Quote {
                blocks: parse_blocks(&inner, depth + 1),
            });
        } else if list_marker(line).is_some() {
            let (block, next) = parse_list(lines, i);
            blocks.push(block);
            i = next;
        } else if is_html_start(line) {
            let start = i;
            while i < lines.len() && !lines[i].trim().is_empty() {
                i += 1;
            }
            blocks.push(Block::Html {
                html: lines[start..i].join("\n"),
            });
        } else {
            let (block, next) = parse_paragraph(lines, i);
            blocks.push(block);
            i = next;
        }
    }

    blocks
}

/// Opening code fence.
struct Fence {
    marker: char,
    len: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = strip_indent(line)?;
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }

        let info = trimmed[len..].trim();
        if marker == '`' && info.contains('`') {
            return None;
        }

        let language = info
            .split_whitespace()
            .next()
            .map(|lang| lang.trim_start_matches('{').trim_end_matches('}').to_string())
            .filter(|lang| !lang.is_empty());

        Some(Self {
            marker,
            len,
            language,
        })
    }

    fn closes(&self, line: &str) -> bool {
        let Some(trimmed) = strip_indent(line) else {
            return false;
        };
        let trimmed = trimmed.trim_end();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && run == trimmed.chars().count()
    }
}

fn parse_code(lines: &[&str], start: usize, fence: &Fence) -> (Block, usize) {
    let mut i = start + 1;
    let mut body = Vec::new();

    while i < lines.len() {
        if fence.closes(lines[i]) {
            i += 1;
            break;
        }
        body.push(lines[i]);
        i += 1;
    }

    let code = body.join("\n");
    let highlighted = highlight(fence.language.as_deref(), &code);

    (
        Block::Code {
            language: fence.language.clone(),
            code,
            lines: highlighted,
        },
        i,
    )
}

/// Strip up to three leading spaces; `None` if the line is indented further.
fn strip_indent(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    (indent <= 3).then_some(&line[indent..])
}

fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let trimmed = strip_indent(line)?;
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }

    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    // Optional closing sequence: "## Title ##"
    let mut text = rest.trim();
    let without_hashes = text.trim_end_matches('#');
    if without_hashes.is_empty() || without_hashes.ends_with([' ', '\t']) {
        text = without_hashes.trim_end();
    }

    u8::try_from(level).ok().map(|level| (level, text))
}

fn is_rule(line: &str) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    let Some(marker) = trimmed.chars().next().filter(|c| matches!(c, '-' | '*' | '_')) else {
        return false;
    };

    let mut count = 0;
    for c in trimmed.chars() {
        if c == marker {
            count += 1;
        } else if c != ' ' && c != '\t' {
            return false;
        }
    }
    count >= 3
}

fn setext_level(line: &str) -> Option<u8> {
    let trimmed = strip_indent(line)?.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '=') {
        Some(1)
    } else if trimmed.chars().all(|c| c == '-') {
        Some(2)
    } else {
        None
    }
}

fn quote_content(line: &str) -> Option<&str> {
    let rest = strip_indent(line)?.strip_prefix('>')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

fn is_html_start(line: &str) -> bool {
    let Some(trimmed) = strip_indent(line) else {
        return false;
    };
    let mut chars = trimmed.chars();
    chars.next() == Some('<')
        && chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!')
}

/// List item marker: (indent width, ordered start number, content).
fn list_marker(line: &str) -> Option<(usize, Option<u64>, &str)> {
    let indent = indent_width(line);
    let trimmed = line.trim_start();

    for bullet in ['-', '*', '+'] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            if rest.is_empty() {
                return Some((indent, None, ""));
            }
            if rest.starts_with([' ', '\t']) {
                return Some((indent, None, rest.trim_start()));
            }
        }
    }

    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    let rest = &trimmed[digits..];
    let rest = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')'))?;
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }

    let number = trimmed[..digits].parse().ok()?;
    Some((indent, Some(number), rest.trim_start()))
}

fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn parse_list(lines: &[&str], start: usize) -> (Block, usize) {
    let (base_indent, first_number, _) = list_marker(lines[start]).unwrap_or((0, None, ""));
    let ordered = first_number.is_some();

    // Indent widths seen so far, outermost first; depth is the position.
    let mut levels: Vec<usize> = vec![base_indent];
    let mut items: Vec<(usize, bool, Option<bool>, String)> = Vec::new();
    let mut i = start;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            // A blank line continues the list only if another item follows.
            let next_is_item = lines
                .get(i + 1)
                .and_then(|l| list_marker(l))
                .is_some_and(|(indent, _, _)| indent >= base_indent);
            if next_is_item {
                i += 1;
                continue;
            }
            break;
        }

        if let Some((indent, number, content)) = list_marker(line) {
            if indent < base_indent || (indent == base_indent && number.is_some() != ordered) {
                break;
            }
            while levels.len() > 1 && indent < levels[levels.len() - 1] {
                levels.pop();
            }
            if indent > levels[levels.len() - 1] {
                levels.push(indent);
            }
            let (task, content) = task_marker(content);
            items.push((levels.len() - 1, number.is_some(), task, content.to_string()));
        } else if !items.is_empty() && (indent_width(line) > base_indent || is_lazy_continuation(line)) {
            if let Some(last) = items.last_mut() {
                last.3.push('\n');
                last.3.push_str(line.trim());
            }
        } else {
            break;
        }
        i += 1;
    }

    let items = items
        .into_iter()
        .map(|(depth, ordered, task, text)| ListItem {
            depth,
            ordered,
            task,
            content: parse_inlines(&text),
        })
        .collect();

    (
        Block::List {
            ordered,
            start: first_number.unwrap_or(1),
            items,
        },
        i,
    )
}

/// A non-indented line directly following an item that starts no other block.
fn is_lazy_continuation(line: &str) -> bool {
    !(Fence::open(line).is_some()
        || atx_heading(line).is_some()
        || is_rule(line)
        || quote_content(line).is_some()
        || is_html_start(line)
        || line.contains('|'))
}

fn task_marker(content: &str) -> (Option<bool>, &str) {
    for (marker, checked) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
        if let Some(rest) = content.strip_prefix(marker) {
            if rest.is_empty() || rest.starts_with(' ') {
                return (Some(checked), rest.trim_start());
            }
        }
    }
    (None, content)
}

fn parse_paragraph(lines: &[&str], start: usize) -> (Block, usize) {
    let mut text: Vec<&str> = vec![lines[start].trim_start()];
    let mut i = start + 1;

    while i < lines.len() {
        let line = lines[i];

        if let Some(level) = setext_level(line) {
            return (
                Block::Heading {
                    level,
                    content: parse_inlines(text.join("\n").trim()),
                },
                i + 1,
            );
        }

        if line.trim().is_empty()
            || Fence::open(line).is_some()
            || atx_heading(line).is_some()
            || is_rule(line)
            || quote_content(line).is_some()
            || list_marker(line).is_some()
            || is_html_start(line)
            || is_table_start(lines, i)
        {
            break;
        }

        text.push(line.trim_start());
        i += 1;
    }

    (
        Block::Paragraph {
            content: parse_inlines(text.join("\n").trim_end()),
        },
        i,
    )
}

fn is_table_start(lines: &[&str], i: usize) -> bool {
    let Some(header) = lines.get(i) else {
        return false;
    };
    let Some(delimiter) = lines.get(i + 1) else {
        return false;
    };

    header.contains('|')
        && parse_alignments(delimiter)
            .is_some_and(|aligns| aligns.len() == split_row(header).len())
}

fn parse_alignments(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('-') || !(line.contains('|') || line.contains(':')) {
        return None;
    }

    split_row(line)
        .into_iter()
        .map(|cell| {
            let cell = cell.trim();
            let left = cell.starts_with(':');
            let right = cell.ends_with(':');
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.chars().all(|c| c == '-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

/// Split a table row into cells, honouring `\|` escapes and code spans.
fn split_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = if trimmed.ends_with('|') && !trimmed.ends_with("\\|") {
        &trimmed[..trimmed.len() - 1]
    } else {
        trimmed
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_code = false;
    let mut chars = trimmed.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                current.push(c);
            }
            '|' if !in_code => {
                cells.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());

    cells
}

fn parse_table(lines: &[&str], start: usize) -> (Table, usize) {
    let header_cells = split_row(lines[start]);
    let alignments = parse_alignments(lines[start + 1]).unwrap_or_default();
    let width = header_cells.len();

    let mut rows = Vec::new();
    let mut i = start + 2;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() || !line.contains('|') {
            break;
        }

        let mut cells: Vec<Vec<Inline>> = split_row(line)
            .iter()
            .take(width)
            .map(|cell| parse_inlines(cell))
            .collect();
        cells.resize_with(width, Vec::new);
        rows.push(cells);
        i += 1;
    }

    (
        Table {
            alignments,
            header: header_cells.iter().map(|c| parse_inlines(c)).collect(),
            rows,
        },
        i,
    )
}

// ---------------------------------------------------------------------------
// Inline parsing
// ---------------------------------------------------------------------------

/// Deepest emphasis or link nesting parsed; deeper markup stays literal.
const MAX_INLINE_DEPTH: usize = 16;

const EMPHASIS_DELIMITERS: [(char, usize); 5] =
    [('*', 1), ('*', 2), ('_', 1), ('_', 2), ('~', 2)];

fn parse_inlines(text: &str) -> Vec<Inline> {
    parse_inlines_at(text, 0)
}

fn parse_inlines_at(text: &str, depth: usize) -> Vec<Inline> {
    let index = InlineIndex::new(text);
    let nested = depth < MAX_INLINE_DEPTH;
    let mut out = InlineBuf::default();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        match c {
            '\\' => {
                let next = rest[1..].chars().next();
                match next {
                    Some('\n') => {
                        out.push(Inline::LineBreak);
                        i += 2;
                    }
                    Some(n) if n.is_ascii_punctuation() => {
                        out.text(n);
                        i += 1 + n.len_utf8();
                    }
                    _ => {
                        out.text('\\');
                        i += 1;
                    }
                }
            }
            '\n' => {
                if out.ends_with_hard_break() {
                    out.trim_trailing_spaces();
                    out.push(Inline::LineBreak);
                } else {
                    out.trim_trailing_spaces();
                    out.text(' ');
                }
                i += 1;
            }
            '`' => {
                if let Some((code, used)) = code_span(rest) {
                    out.push(Inline::Code(code));
                    i += used;
                } else {
                    let run = rest.chars().take_while(|c| *c == '`').count();
                    out.text_str(&rest[..run]);
                    i += run;
                }
            }
            '*' | '_' | '~' if nested => {
                if let Some((inline, used)) = emphasis(text, i, &index, depth) {
                    out.push(inline);
                    i += used;
                } else {
                    out.text(c);
                    i += 1;
                }
            }
            '!' if nested && rest.starts_with("![") => {
                if let Some((alt, url, end)) = link_parts(text, i + 1, &index) {
                    out.push(Inline::Image {
                        alt: plain_text(&parse_inlines_at(alt, depth + 1)),
                        url: url.to_string(),
                    });
                    i = end;
                } else {
                    out.text('!');
                    i += 1;
                }
            }
            '[' if nested => {
                if let Some((label, url, end)) = link_parts(text, i, &index) {
                    out.push(Inline::Link {
                        text: parse_inlines_at(label, depth + 1),
                        url: url.to_string(),
                    });
                    i = end;
                } else {
                    out.text('[');
                    i += 1;
                }
            }
            '<' => {
                if let Some((inline, used)) = angle(text, i, &index) {
                    out.push(inline);
                    i += used;
                } else {
                    out.text('<');
                    i += 1;
                }
            }
            _ => {
                out.text(c);
                i += c.len_utf8();
            }
        }
    }

    out.finish()
}

/// Delimiter positions of one inline run, collected up front so every
/// opener finds its closer without rescanning the text.
struct InlineIndex {
    /// Valid closing offsets, one list per entry of `EMPHASIS_DELIMITERS`.
    closers: [Vec<usize>; 5],
    /// Matching `]` for each `[`.
    brackets: HashMap<usize, usize>,
    parens: Vec<usize>,
    angles: Vec<usize>,
    newlines: Vec<usize>,
}

impl InlineIndex {
    fn new(text: &str) -> Self {
        let mut index = Self {
            closers: Default::default(),
            brackets: HashMap::new(),
            parens: Vec::new(),
            angles: Vec::new(),
            newlines: Vec::new(),
        };

        let mut open = Vec::new();
        for (pos, c) in text.char_indices() {
            match c {
                '[' => open.push(pos),
                ']' => {
                    if let Some(start) = open.pop() {
                        index.brackets.insert(start, pos);
                    }
                }
                ')' => index.parens.push(pos),
                '>' => index.angles.push(pos),
                '\n' => index.newlines.push(pos),
                _ => {}
            }
        }

        for (slot, &(marker, width)) in EMPHASIS_DELIMITERS.iter().enumerate() {
            index.closers[slot] = emphasis_closers(text, marker, width);
        }

        index
    }

    /// First closer for `marker` x `width` leaving a non-empty body.
    fn closer(&self, marker: char, width: usize, body_start: usize) -> Option<usize> {
        let slot = EMPHASIS_DELIMITERS
            .iter()
            .position(|&delimiter| delimiter == (marker, width))?;
        let closers = &self.closers[slot];
        closers
            .get(closers.partition_point(|&pos| pos <= body_start))
            .copied()
    }
}

/// First position in the sorted `positions` at or after `from`.
fn next_at(positions: &[usize], from: usize) -> Option<usize> {
    positions
        .get(positions.partition_point(|&pos| pos < from))
        .copied()
}

/// Offsets where `marker` x `width` can close an emphasis span.
fn emphasis_closers(text: &str, marker: char, width: usize) -> Vec<usize> {
    let delimiter = marker.to_string().repeat(width);
    text.char_indices()
        .filter(|&(pos, c)| c == marker && text[pos..].starts_with(delimiter.as_str()))
        .map(|(pos, _)| pos)
        .filter(|&pos| {
            let before = text[..pos].chars().next_back();
            let after = text[pos + width..].chars().next();
            before.is_some_and(|b| !b.is_whitespace())
                && (width == 2 || after != Some(marker))
                && !(marker == '_' && after.is_some_and(char::is_alphanumeric))
        })
        .collect()
}

/// Accumulates inlines, merging adjacent text.
#[derive(Default)]
struct InlineBuf {
    items: Vec<Inline>,
    text: String,
}

impl InlineBuf {
    fn text(&mut self, c: char) {
        self.text.push(c);
    }

    fn text_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    fn ends_with_hard_break(&self) -> bool {
        self.text.ends_with("  ")
    }

    fn trim_trailing_spaces(&mut self) {
        let len = self.text.trim_end_matches(' ').len();
        self.text.truncate(len);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.items.push(Inline::Text(std::mem::take(&mut self.text)));
        }
    }

    fn push(&mut self, inline: Inline) {
        self.flush();
        self.items.push(inline);
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush();
        self.items
    }
}

fn code_span(rest: &str) -> Option<(String, usize)> {
    let run = rest.chars().take_while(|c| *c == '`').count();
    let delimiter = &rest[..run];
    let body = &rest[run..];

    let mut search = 0;
    while let Some(pos) = body[search..].find(delimiter) {
        let at = search + pos;
        let closing_run = body[at..].chars().take_while(|c| *c == '`').count();
        if closing_run == run {
            let code = body[..at].replace('\n', " ");
            let code = if code.len() > 2 && code.starts_with(' ') && code.ends_with(' ') {
                code[1..code.len() - 1].to_string()
            } else {
                code
            };
            return Some((code, run + at + run));
        }
        search = at + closing_run;
    }
    None
}

/// `**strong**`, `__strong__`, `*em*`, `_em_`, `~~strike~~` starting at `start`.
fn emphasis(
    text: &str,
    start: usize,
    index: &InlineIndex,
    depth: usize,
) -> Option<(Inline, usize)> {
    let rest = &text[start..];
    let marker = rest.chars().next()?;
    let double = rest[1..].starts_with(marker);

    if marker == '~' && !double {
        return None;
    }
    if marker == '_' {
        // No intraword underscores: snake_case stays literal.
        let before = text[..start].chars().next_back();
        if before.is_some_and(char::is_alphanumeric) {
            return None;
        }
    }

    let width = if double { 2 } else { 1 };
    let body_start = start + width;
    if text[body_start..].starts_with(char::is_whitespace) {
        return None;
    }

    let close = index.closer(marker, width, body_start)?;
    let content = parse_inlines_at(&text[body_start..close], depth + 1);
    let inline = match (marker, double) {
        ('~', _) => Inline::Strikethrough(content),
        (_, true) => Inline::Strong(content),
        (_, false) => Inline::Emphasis(content),
    };

    Some((inline, close + width - start))
}

/// `[label](url)` with the `[` at `open` → (label, url, offset past `)`).
fn link_parts<'t>(
    text: &'t str,
    open: usize,
    index: &InlineIndex,
) -> Option<(&'t str, &'t str, usize)> {
    let close = *index.brackets.get(&open)?;
    let target_start = close + 1;
    if !text[target_start..].starts_with('(') {
        return None;
    }

    let end = next_at(&index.parens, target_start)?;
    let target = text[target_start + 1..end].trim();
    let url = target.split_whitespace().next().unwrap_or("");
    let url = url.trim_start_matches('<').trim_end_matches('>');

    Some((&text[open + 1..close], url, end + 1))
}

/// Autolinks (`<https://..>`) and inline HTML tags starting at `start`.
fn angle(text: &str, start: usize, index: &InlineIndex) -> Option<(Inline, usize)> {
    let end = next_at(&index.angles, start)?;
    let inner = &text[start + 1..end];
    let first = inner.chars().next()?;

    let multiline = next_at(&index.newlines, start).is_some_and(|nl| nl < end);
    if multiline && first != '!' {
        return None;
    }

    if (inner.starts_with("http://") || inner.starts_with("https://") || inner.starts_with("mailto:"))
        && !inner.contains(char::is_whitespace)
    {
        return Some((
            Inline::Link {
                text: vec![Inline::Text(inner.to_string())],
                url: inner.to_string(),
            },
            end + 1 - start,
        ));
    }

    if first.is_ascii_alphabetic() || first == '/' || first == '!' {
        return Some((Inline::Html(text[start..=end].to_string()), end + 1 - start));
    }
    None
}

/// Flatten inlines into plain text (markup removed, HTML kept verbatim).
#[must_use]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) | Inline::Html(t) => out.push_str(t),
            Inline::Strong(inner) | Inline::Emphasis(inner) | Inline::Strikethrough(inner) => {
                out.push_str(&plain_text(inner));
            }
            Inline::Link { text, .. } => out.push_str(&plain_text(text)),
            Inline::Image { alt, .. } => out.push_str(alt),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}
