//! Structured document model produced from generated Markdown.
//!
//! The model is deliberately small: it carries exactly what the DOCX
//! exporter can render (four heading levels, styled runs, flat list items
//! and tables with an optional header row). Anything richer degrades to a
//! plain paragraph upstream in [`crate::pipeline::builder`].

use serde::{Deserialize, Serialize};

/// Deepest heading level the model keeps; deeper `#` runs are clamped.
pub const MAX_HEADING_LEVEL: u8 = 4;

/// A contiguous span of text sharing one emphasis combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
}

impl StyledRun {
    /// A run without emphasis.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: false,
        }
    }

    pub fn italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: true,
        }
    }

    pub fn bold_italic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            italic: true,
        }
    }
}

/// One table row: ordered cell strings.
pub type Row = Vec<String>;

/// A pipe table with an optional distinguished header row.
///
/// Rows are stored as parsed; short rows are never padded. Renderers ask
/// [`Table::cell`] for every position up to [`Table::column_count`] and
/// get `""` for the missing ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Row>,
    /// Index of the header row. Always `Some(0)` when present.
    pub header_row: Option<usize>,
}

impl Table {
    /// Widest row length across the table.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell text at `(row, col)`, or `""` when the position is past the
    /// end of that row (or of the table).
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_header(&self, row: usize) -> bool {
        self.header_row == Some(row)
    }

    /// The header row, if the table has one.
    pub fn header(&self) -> Option<&Row> {
        self.header_row.and_then(|i| self.rows.get(i))
    }

    /// Every row that is not the header, in order.
    pub fn data_rows(&self) -> impl Iterator<Item = &Row> {
        self.rows
            .iter()
            .enumerate()
            .filter(move |(i, _)| !self.is_header(*i))
            .map(|(_, r)| r)
    }
}

/// One structural unit of the output document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { runs: Vec<StyledRun> },
    ListItem { ordered: bool, text: String },
    Table(Table),
}

impl Block {
    /// Plain text of the block with emphasis dropped; table cells are
    /// joined by a space and rows by a newline.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { text, .. } | Block::ListItem { text, .. } => text.clone(),
            Block::Paragraph { runs } => runs.iter().map(|r| r.text.as_str()).collect(),
            Block::Table(table) => table
                .rows
                .iter()
                .map(|r| r.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// The finished document: blocks in input order plus a derived title.
///
/// Built once by [`crate::pipeline::builder::build_document`] and never
/// mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// First usable label found in the source, or `""`.
    pub title: String,
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Heading { level, text } => Some((*level, text.as_str())),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ragged() -> Table {
        Table {
            rows: vec![
                vec!["a".into(), "b".into(), "c".into()],
                vec!["1".into()],
            ],
            header_row: Some(0),
        }
    }

    #[test]
    fn column_count_is_widest_row() {
        assert_eq!(ragged().column_count(), 3);
        assert_eq!(Table::default().column_count(), 0);
    }

    #[test]
    fn missing_cells_read_as_empty() {
        let t = ragged();
        assert_eq!(t.cell(1, 0), "1");
        assert_eq!(t.cell(1, 2), "");
        assert_eq!(t.cell(9, 0), "");
        // Nothing was padded in storage.
        assert_eq!(t.rows[1].len(), 1);
    }

    #[test]
    fn header_and_data_rows() {
        let t = ragged();
        assert_eq!(t.header().map(|r| r[0].as_str()), Some("a"));
        let data: Vec<_> = t.data_rows().collect();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0][0], "1");
    }

    #[test]
    fn paragraph_plain_text_drops_styles() {
        let b = Block::Paragraph {
            runs: vec![StyledRun::bold("x"), StyledRun::plain(" y")],
        };
        assert_eq!(b.plain_text(), "x y");
    }

    #[test]
    fn block_serialises_with_kind_tag() {
        let b = Block::Heading {
            level: 2,
            text: "Plan".into(),
        };
        let json = serde_json::to_string(&b).unwrap();
        assert!(json.contains("\"kind\":\"heading\""), "got: {json}");
    }
}
