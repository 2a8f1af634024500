//! Error types for the edgequake-reportgen library.
//!
//! A single fatal error type, [`ReportError`], covers every failure the
//! library can surface: unreadable inputs, an incomplete request, an
//! unconfigured or failing LLM provider, and export/write failures.
//!
//! The document builder itself never fails: any text produces a
//! [`crate::document::Document`], so no builder variant exists here.
//! Failures upstream of it (no template text, an empty generation) are
//! reported before the builder runs.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-reportgen library.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A PDF was given where extracted text is expected.
    #[error(
        "'{path}' is a PDF file.\nExtract its text first (e.g. `pdftotext {path:?} template.txt`) \
and pass the text file instead."
    )]
    PdfNotSupported { path: PathBuf },

    /// The file was read but contains no usable text.
    #[error("No text found in '{path}'")]
    EmptyInput { path: PathBuf },

    /// The file exists but could not be read as UTF-8 text.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Request errors ────────────────────────────────────────────────────
    /// The template text is empty or whitespace.
    #[error("Template text is empty.\nProvide the text content of the template document.")]
    EmptyTemplate,

    /// No writing instructions were given.
    #[error("Instructions are empty.\nDescribe what the report or plan should contain.")]
    MissingInstructions,

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error while generating.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The generation finished without producing any text.
    #[error("The model returned no text.\nTry again, or rephrase the instructions.")]
    EmptyGeneration,

    // ── Export errors ─────────────────────────────────────────────────────
    /// Building the DOCX package failed.
    #[error("DOCX export failed: {detail}")]
    ExportFailed { detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for ReportError {
    fn from(e: zip::result::ZipError) -> Self {
        ReportError::ExportFailed {
            detail: e.to_string(),
        }
    }
}
