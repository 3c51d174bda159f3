//! Output formatting for rendered estimates and workflow status.
//!
//! Supports multiple output formats: styled terminal text, JSON, and the raw
//! Markdown as returned by the service.

use colored::{ColoredString, Colorize};
use comfy_table::{presets::UTF8_FULL, CellAlignment, ContentArrangement, Table};

use super::highlight::{Token, TokenKind};
use super::render::{plain_text, render, Alignment, Block, Document, Inline, ListItem};
use crate::domain::{FlagState, WorkflowSnapshot};

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Styled text for the terminal.
    #[default]
    Terminal,
    /// JSON dump of the rendered tree.
    Json,
    /// Estimate text unchanged.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" | "term" | "text" => Ok(Self::Terminal),
            "json" => Ok(Self::Json),
            "markdown" | "md" | "raw" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use: terminal, json, markdown")),
        }
    }
}

/// Formats a rendered estimate for the terminal.
pub fn format_document_terminal(doc: &Document) -> String {
    let mut out = String::new();
    for (idx, block) in doc.blocks.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        write_block(&mut out, block, "");
    }
    out
}

/// Formats a rendered estimate as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_document_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Formats estimate text in the requested output format.
///
/// # Errors
/// Returns error if JSON serialization fails.
pub fn format_estimate(text: &str, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Terminal => {
            let doc = render(text);
            tracing::debug!(
                blocks = doc.blocks.len(),
                headings = doc.heading_count(),
                tables = doc.tables().count(),
                "Rendered estimate"
            );
            Ok(format_document_terminal(&doc))
        }
        OutputFormat::Json => format_document_json(&render(text)),
        OutputFormat::Markdown => Ok(text.to_string()),
    }
}

fn write_block(out: &mut String, block: &Block, prefix: &str) {
    match block {
        Block::Heading { level, content } => {
            let text = inline_terminal(content);
            let styled = match level {
                1 => text.bold().cyan().underline(),
                2 => text.bold().cyan(),
                3 => text.bold(),
                _ => text.bold().dimmed(),
            };
            push_line(out, prefix, &styled.to_string());
            if *level <= 2 {
                let rule = if *level == 1 { "═" } else { "─" };
                let width = plain_text(content).chars().count().max(3);
                push_line(out, prefix, &rule.repeat(width).dimmed().to_string());
            }
        }
        Block::Paragraph { content } => {
            for line in inline_terminal(content).lines() {
                push_line(out, prefix, line);
            }
        }
        Block::Quote { blocks } => {
            let nested = format!("{prefix}{} ", "│".dimmed());
            for block in blocks {
                write_block(out, block, &nested);
            }
        }
        Block::List { start, items, .. } => {
            let mut counters: Vec<u64> = Vec::new();
            for item in items {
                counters.truncate(item.depth + 1);
                counters.resize(item.depth + 1, 0);
                counters[item.depth] += 1;
                let offset = if item.depth == 0 { start.saturating_sub(1) } else { 0 };
                let number = item.ordered.then_some(counters[item.depth] + offset);
                push_line(out, prefix, &list_line(item, number));
            }
        }
        Block::Table(table) => {
            let mut grid = Table::new();
            grid.load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);
            grid.set_header(table.header.iter().map(|cell| cell_text(cell)).collect::<Vec<_>>());
            for row in &table.rows {
                grid.add_row(row.iter().map(|cell| cell_text(cell)).collect::<Vec<_>>());
            }
            for (idx, alignment) in table.alignments.iter().enumerate() {
                if let Some(column) = grid.column_mut(idx) {
                    column.set_cell_alignment(cell_alignment(*alignment));
                }
            }
            for line in grid.to_string().lines() {
                push_line(out, prefix, line);
            }
        }
        Block::Code {
            language, lines, ..
        } => {
            let label = language.as_deref().unwrap_or("code");
            push_line(out, prefix, &format!("┌─ {label}").dimmed().to_string());
            for line in lines {
                let body: String = line.iter().map(|t| token_terminal(t).to_string()).collect();
                push_line(out, prefix, &format!("{} {body}", "│".dimmed()));
            }
            push_line(out, prefix, &"└─".dimmed().to_string());
        }
        Block::Html { html } => {
            for line in html.lines() {
                push_line(out, prefix, &line.dimmed().to_string());
            }
        }
        Block::Rule => push_line(out, prefix, &"─".repeat(40).dimmed().to_string()),
    }
}

fn push_line(out: &mut String, prefix: &str, line: &str) {
    out.push_str(prefix);
    out.push_str(line);
    out.push('\n');
}

fn list_line(item: &ListItem, number: Option<u64>) -> String {
    let indent = "  ".repeat(item.depth);
    let marker = number.map_or_else(|| "•".to_string(), |n| format!("{n}."));
    let task = match item.task {
        Some(true) => format!("{} ", "[x]".green()),
        Some(false) => "[ ] ".to_string(),
        None => String::new(),
    };
    // Continuation lines line up under the item text.
    let hang = " ".repeat(indent.len() + marker.chars().count() + 1);
    let text = inline_terminal(&item.content).replace('\n', &format!("\n{hang}"));
    format!("{indent}{} {task}{text}", marker.cyan())
}

fn inline_terminal(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Strong(inner) => out.push_str(&inline_terminal(inner).bold().to_string()),
            Inline::Emphasis(inner) => out.push_str(&inline_terminal(inner).italic().to_string()),
            Inline::Strikethrough(inner) => {
                out.push_str(&inline_terminal(inner).strikethrough().to_string());
            }
            Inline::Code(code) => out.push_str(&code.yellow().to_string()),
            Inline::Link { text, url } => {
                let label = inline_terminal(text);
                if plain_text(text) == *url {
                    out.push_str(&url.blue().underline().to_string());
                } else {
                    out.push_str(&format!("{label} ({})", url.blue().underline()));
                }
            }
            Inline::Image { alt, url } => {
                out.push_str(&format!("[image: {alt}] ({})", url.blue().underline()));
            }
            Inline::Html(html) if is_line_break_tag(html) => out.push('\n'),
            Inline::Html(html) => out.push_str(&html.dimmed().to_string()),
            Inline::LineBreak => out.push('\n'),
        }
    }
    out
}

/// Table cells stay unstyled so column widths are measured correctly.
fn cell_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Html(html) if is_line_break_tag(html) => out.push('\n'),
            Inline::Strong(inner) | Inline::Emphasis(inner) | Inline::Strikethrough(inner) => {
                out.push_str(&cell_text(inner));
            }
            Inline::Link { text, .. } => out.push_str(&cell_text(text)),
            other => out.push_str(&plain_text(std::slice::from_ref(other))),
        }
    }
    out
}

fn is_line_break_tag(html: &str) -> bool {
    let tag: String = html
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    matches!(tag.as_str(), "<br>" | "<br/>")
}

const fn cell_alignment(alignment: Alignment) -> CellAlignment {
    match alignment {
        Alignment::None | Alignment::Left => CellAlignment::Left,
        Alignment::Center => CellAlignment::Center,
        Alignment::Right => CellAlignment::Right,
    }
}

fn token_terminal(token: &Token) -> ColoredString {
    let text = token.text.as_str();
    match token.kind {
        TokenKind::Plain => text.normal(),
        TokenKind::Keyword => text.magenta().bold(),
        TokenKind::Literal => text.cyan(),
        TokenKind::String => text.green(),
        TokenKind::Number => text.yellow(),
        TokenKind::Comment => text.dimmed().italic(),
    }
}

/// Formats the workflow status for display.
pub fn format_status(snapshot: &WorkflowSnapshot) -> String {
    let availability = snapshot.availability();
    let document = snapshot
        .document
        .as_deref()
        .map_or_else(|| "-".dimmed().to_string(), |name| truncate(name, 40).cyan().to_string());
    let updated = snapshot.updated_at.map_or_else(
        || "-".to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    let exporting = if snapshot.is_exporting() {
        "Downloading...".yellow().to_string()
    } else {
        flag_label(&snapshot.exporting)
    };

    let mut out = format!(
        "{}\n  Document: {}\n  Phase: {}\n  Download: {}\n  Estimate: {} chars\n  Updated: {}\n  Feedback: {}",
        "📋 Status".bold(),
        document,
        snapshot.phase().to_string().cyan(),
        exporting,
        snapshot.estimate.as_str().chars().count().to_string().cyan(),
        updated,
        if snapshot.feedback.trim().is_empty() {
            "-".to_string()
        } else {
            truncate(&snapshot.feedback, 40)
        },
    );

    out.push_str(&format!(
        "\n  Actions: generate {} | regenerate {} | download {}",
        on_off(availability.generate),
        on_off(availability.regenerate),
        on_off(availability.export)
    ));

    if let Some(error) = &snapshot.last_error {
        out.push_str(&format!("\n  Last error: {}", error.red()));
    }

    out
}

fn flag_label(flag: &FlagState) -> String {
    match flag {
        FlagState::Idle => "idle".to_string(),
        FlagState::InFlight => "in progress".yellow().to_string(),
        FlagState::Failed(_) => "failed".red().to_string(),
    }
}

fn on_off(enabled: bool) -> ColoredString {
    if enabled {
        "on".green()
    } else {
        "off".dimmed()
    }
}

/// Truncates a string to max length with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
