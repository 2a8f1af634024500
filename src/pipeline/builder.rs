//! Markdown → [`Document`]: the line classifier and table accumulator.
//!
//! ## Why not a CommonMark parser?
//!
//! The generated reports use a narrow Markdown subset (headings, flat
//! lists, emphasis, pipe tables) and frequently break CommonMark rules in
//! ways a strict parser punishes: tables interrupted by blank lines, a
//! separator row hanging off the second row, emphasis markers left open.
//! A single forward scan over trimmed lines with one line of lookahead
//! handles all of that predictably and never fails; anything it does not
//! recognise becomes a paragraph.
//!
//! ## Classification order
//!
//! Each non-blank line is classified by the first rule that matches:
//!
//! ```text
//! heading  ▶  "- " / "* " item  ▶  "1. " item  ▶  row containing '|'  ▶  paragraph
//! ```
//!
//! Table rows pile up in a [`TableAccumulator`] until some other block
//! kind (or end of input) closes the table. Blank lines do not close it.

use crate::document::{Block, Document, Row, StyledRun, Table, MAX_HEADING_LEVEL};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Build a [`Document`] and return its title alongside it.
///
/// The title is also stored in [`Document::title`]; it is returned
/// separately because callers mostly need it for the export filename.
pub fn build(markdown: &str) -> (String, Document) {
    let document = build_document(markdown);
    (document.title.clone(), document)
}

/// Classify every line of `markdown` and assemble the block sequence.
///
/// Total: every input produces a document. Empty or whitespace-only input
/// yields an empty block list and an empty title.
pub fn build_document(markdown: &str) -> Document {
    let lines: Vec<&str> = markdown.lines().map(str::trim).collect();
    let mut blocks = Vec::new();
    let mut table = TableAccumulator::default();
    let mut title: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        i += 1;

        if title.is_none() {
            title = derive_title(line).filter(|t| !t.is_empty());
        }

        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            table.flush_into(&mut blocks);
            blocks.push(parse_heading(line));
        } else if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            table.flush_into(&mut blocks);
            blocks.push(Block::ListItem {
                ordered: false,
                text: text.to_string(),
            });
        } else if let Some(m) = RE_ORDERED_ITEM.find(line) {
            table.flush_into(&mut blocks);
            blocks.push(Block::ListItem {
                ordered: true,
                text: line[m.end()..].to_string(),
            });
        } else if line.contains('|') {
            table.push_row(split_cells(line));
            if lines.get(i).is_some_and(|next| is_header_separator(next)) {
                table.mark_header();
                i += 1;
            }
        } else {
            table.flush_into(&mut blocks);
            blocks.push(Block::Paragraph {
                runs: parse_inline(line),
            });
        }
    }

    table.flush_into(&mut blocks);

    let title = title.unwrap_or_default();
    debug!("Built document: {} blocks, title {:?}", blocks.len(), title);
    Document { title, blocks }
}

// ── Line patterns ────────────────────────────────────────────────────────────

static RE_ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s").unwrap());

/// `|---|:--:|--:|`, `---|---`, `| :-- |` … at least one pipe required so a
/// lone `---` rule under a row is not mistaken for a separator.
static RE_HEADER_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?$").unwrap()
});

fn is_header_separator(line: &str) -> bool {
    let line = line.trim();
    line.contains('|') && RE_HEADER_SEPARATOR.is_match(line)
}

fn parse_heading(line: &str) -> Block {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    let level = hashes.min(MAX_HEADING_LEVEL as usize) as u8;
    let text = line.trim_start_matches('#').trim().to_string();
    Block::Heading { level, text }
}

/// Split a pipe row into trimmed cells. Only the empty pieces produced by
/// a leading or trailing pipe are dropped; `|a||b|` keeps its empty middle
/// cell.
fn split_cells(line: &str) -> Row {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

// ── Table accumulator ────────────────────────────────────────────────────────

/// An entry of the open table: a parsed row, or the marker saying the row
/// right before it is the header.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TableEntry {
    Row(Row),
    HeaderSeparator,
}

#[derive(Debug, Default)]
struct TableAccumulator {
    entries: Vec<TableEntry>,
}

impl TableAccumulator {
    fn push_row(&mut self, row: Row) {
        self.entries.push(TableEntry::Row(row));
    }

    /// Record a header separator after the latest row. A table keeps only
    /// its first separator; later ones are swallowed.
    fn mark_header(&mut self) {
        if !self.entries.contains(&TableEntry::HeaderSeparator) {
            self.entries.push(TableEntry::HeaderSeparator);
        }
    }

    /// Close the open table, if any, and append it to `blocks`.
    fn flush_into(&mut self, blocks: &mut Vec<Block>) {
        if self.entries.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.entries);
        let table = finish_table(entries);
        debug!(
            "Flushed table: {} rows × {} cols, header: {}",
            table.rows.len(),
            table.column_count(),
            table.header_row.is_some()
        );
        blocks.push(Block::Table(table));
    }
}

/// Split accumulated entries into `[header] + data` around the marker.
///
/// With a marker at `k`, the header is the row at `k - 1` and the data are
/// the rows after `k`; rows before the header are not part of the table.
fn finish_table(entries: Vec<TableEntry>) -> Table {
    let marker = entries
        .iter()
        .position(|e| *e == TableEntry::HeaderSeparator);

    let into_row = |e: TableEntry| match e {
        TableEntry::Row(r) => Some(r),
        TableEntry::HeaderSeparator => None,
    };

    match marker {
        Some(k) if k > 0 => {
            let mut entries = entries;
            let data = entries.split_off(k + 1);
            let header = entries.into_iter().nth(k - 1).and_then(into_row);
            let rows = header
                .into_iter()
                .chain(data.into_iter().filter_map(into_row))
                .collect();
            Table {
                rows,
                header_row: Some(0),
            }
        }
        _ => Table {
            rows: entries.into_iter().filter_map(into_row).collect(),
            header_row: None,
        },
    }
}

// ── Inline emphasis ──────────────────────────────────────────────────────────

/// Leftmost match wins; at one position `***` beats `**` beats `*`.
static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*\*\*(.+?)\*\*\*|\*\*(.+?)\*\*|\*(.+?)\*").unwrap()
});

/// Split a line into styled runs.
///
/// Spans are non-greedy and never nest. Every `*` is stripped from the
/// emitted text, including stray markers in plain stretches; runs left
/// empty by the stripping are dropped.
pub fn parse_inline(line: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for caps in RE_EMPHASIS.captures_iter(line) {
        let Some(whole) = caps.get(0) else { continue };
        push_run(&mut runs, &line[cursor..whole.start()], false, false);

        if let Some(m) = caps.get(1) {
            push_run(&mut runs, m.as_str(), true, true);
        } else if let Some(m) = caps.get(2) {
            push_run(&mut runs, m.as_str(), true, false);
        } else if let Some(m) = caps.get(3) {
            push_run(&mut runs, m.as_str(), false, true);
        }
        cursor = whole.end();
    }
    push_run(&mut runs, &line[cursor..], false, false);

    runs
}

fn push_run(runs: &mut Vec<StyledRun>, raw: &str, bold: bool, italic: bool) {
    let text = raw.replace('*', "");
    if !text.is_empty() {
        runs.push(StyledRun { text, bold, italic });
    }
}

// ── Title derivation ─────────────────────────────────────────────────────────

static RE_TITLE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s*(.*)$").unwrap());
static RE_TITLE_UNORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s+(.*)$").unwrap());
static RE_TITLE_ORDERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());
static RE_TITLE_QUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>\s*(.*)$").unwrap());
static RE_TITLE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^`{3}").unwrap());
static RE_TITLE_EMPHASIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*{1,3}(.+?)\*{1,3}$").unwrap());

/// Derive a title label from one trimmed line.
///
/// Returns `Some("")` for lines that carry no label (blank lines, code
/// fences); the caller keeps scanning past those.
fn derive_title(line: &str) -> Option<String> {
    if line.is_empty() {
        return Some(String::new());
    }
    for re in [&*RE_TITLE_HEADING, &*RE_TITLE_UNORDERED, &*RE_TITLE_ORDERED, &*RE_TITLE_QUOTE] {
        if let Some(caps) = re.captures(line) {
            return Some(caps[1].trim().to_string());
        }
    }
    if RE_TITLE_FENCE.is_match(line) {
        return Some(String::new());
    }
    if line.contains('|') {
        return Some(
            split_cells(line)
                .into_iter()
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    if let Some(caps) = RE_TITLE_EMPHASIS.captures(line) {
        return Some(caps[1].trim().to_string());
    }
    Some(line.to_string())
}

// ── Tests ────────────────────────────────────────────────────────────────────
