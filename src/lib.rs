//! # edgequake-reportgen
//!
//! Fill in plan and report templates with an LLM and export the result as
//! a Word document.
//!
//! ## Why this crate?
//!
//! Schools and programme offices write the same kinds of plans every year
//! from a fixed template. An LLM drafts the content well, but its answer is
//! Markdown, and the people receiving the plan expect a `.docx` with real
//! headings, lists and tables. This crate sends the template, an optional
//! reference document and the user's instructions to the model, turns the
//! Markdown answer into a structured [`Document`], and writes it as DOCX
//! with a font that renders Hangul.
//!
//! ## Pipeline Overview
//!
//! ```text
//! template text + reference + instructions
//!  │
//!  ├─ 1. Input    read text files (PDFs are rejected with a hint)
//!  ├─ 2. Prompt   system prompt + one user message
//!  ├─ 3. LLM      gemini / gpt / claude / … via edgequake-llm
//!  ├─ 4. Polish   strip fences, normalise whitespace
//!  ├─ 5. Build    headings, lists, emphasis runs, pipe tables → Document
//!  └─ 6. Export   WordprocessingML package (zip) named after the title
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_reportgen::{generate, GenerationConfig, ReportRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / OPENAI_API_KEY / …
//!     let config = GenerationConfig::default();
//!     let request = ReportRequest::new(
//!         std::fs::read_to_string("template.txt")?,
//!         "Write the 2025 reading programme plan for grade 5",
//!     );
//!     let report = generate(&request, &config).await?;
//!     std::fs::write(report.filename(), report.to_docx(&config.export)?)?;
//!     Ok(())
//! }
//! ```
//!
//! Already have the Markdown? Skip the model entirely:
//!
//! ```rust
//! use edgequake_reportgen::{export_markdown, ExportConfig};
//!
//! let report = export_markdown("# Budget\n\n| Item | Cost |\n|---|---|\n| Books | 300 |",
//!     &ExportConfig::default()).unwrap();
//! assert_eq!(report.filename, "Budget.docx");
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `reportgen` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-reportgen = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{system_font, ExportConfig, GenerationConfig, GenerationConfigBuilder};
pub use document::{Block, Document, Row, StyledRun, Table};
pub use error::ReportError;
pub use generate::{
    export_markdown, export_markdown_to_file, generate, generate_sync, generate_to_file,
    generate_with_source,
};
pub use output::{ExportedReport, GenerationStats, ReportOutput};
pub use pipeline::builder::{build, build_document};
pub use pipeline::docx::{export_filename, render_docx};
pub use pipeline::input::load_text;
pub use pipeline::llm::{ChunkStream, GenerationSource, LlmSource};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::ReportRequest;
pub use stream::generate_stream;
