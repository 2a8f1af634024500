//! Output types returned by the generation and export entry points.

use crate::config::ExportConfig;
use crate::document::Document;
use crate::error::ReportError;
use crate::pipeline::docx;
use serde::{Deserialize, Serialize};

/// A finished report: the cleaned Markdown and the document built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportOutput {
    /// Cleaned Markdown, exactly what the document was built from.
    pub markdown: String,
    /// Title derived from the Markdown; `""` if none was found.
    pub title: String,
    pub document: Document,
    pub stats: GenerationStats,
}

impl ReportOutput {
    /// Render the document as DOCX bytes.
    pub fn to_docx(&self, export: &ExportConfig) -> Result<Vec<u8>, ReportError> {
        docx::render_docx(&self.document, export)
    }

    /// Sanitised `.docx` filename derived from the title.
    pub fn filename(&self) -> String {
        docx::export_filename(&self.title)
    }
}

/// Counters and timings for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Fragments received from the generation source.
    pub chunks: usize,
    /// Characters in the cleaned Markdown.
    pub markdown_chars: usize,
    pub blocks: usize,
    pub tables: usize,
    /// Time spent waiting on the generation source.
    pub generation_duration_ms: u64,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
}

/// A DOCX rendered straight from Markdown, without an LLM call.
#[derive(Debug, Clone)]
pub struct ExportedReport {
    pub title: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::builder;

    #[test]
    fn filename_follows_title() {
        let md = "# 2025 Plan: Draft\n\nBody";
        let (title, document) = builder::build(md);
        let out = ReportOutput {
            markdown: md.to_string(),
            title,
            document,
            stats: GenerationStats::default(),
        };
        assert_eq!(out.filename(), "2025 Plan_ Draft.docx");
    }

    #[test]
    fn untitled_output_gets_fallback_name() {
        let out = ReportOutput {
            markdown: String::new(),
            title: String::new(),
            document: Document::default(),
            stats: GenerationStats::default(),
        };
        assert_eq!(out.filename(), "generated_report.docx");
    }

    #[test]
    fn stats_serialise() {
        let stats = GenerationStats {
            chunks: 3,
            markdown_chars: 120,
            blocks: 5,
            tables: 1,
            generation_duration_ms: 800,
            total_duration_ms: 850,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert!(json.contains("\"chunks\":3"));
        assert!(json.contains("\"tables\":1"));
    }
}
