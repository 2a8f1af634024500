//! Eager (whole-report) generation and export entry points.
//!
//! ## Why eager vs. streaming?
//!
//! The document builder needs the complete answer: a table's header is only
//! known once the separator row has arrived, and the title may come from any
//! early line. These functions consume the fragment stream to the end, firing
//! progress callbacks on the way, then clean and build once. Use
//! [`crate::stream::generate_stream`] to show raw text as it is written.

use crate::config::{ExportConfig, GenerationConfig};
use crate::error::ReportError;
use crate::output::{ExportedReport, GenerationStats, ReportOutput};
use crate::pipeline::llm::{self, GenerationSource, LlmSource};
use crate::pipeline::{builder, docx, postprocess};
use crate::prompts::ReportRequest;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Generate a report with the configured LLM provider.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - [`ReportError::EmptyTemplate`] / [`ReportError::MissingInstructions`]
///   for an incomplete request
/// - [`ReportError::ProviderNotConfigured`] when no provider can be resolved
/// - [`ReportError::LlmApiError`] when the call fails
/// - [`ReportError::EmptyGeneration`] when the model returns only whitespace
pub async fn generate(
    request: &ReportRequest,
    config: &GenerationConfig,
) -> Result<ReportOutput, ReportError> {
    llm::validate_request(request)?;
    let provider = llm::resolve_provider(config)?;
    info!(
        "Generating report (provider: {}, model: {})",
        config.provider_name.as_deref().unwrap_or("auto"),
        config.model.as_deref().unwrap_or("default")
    );
    let source = LlmSource::new(provider, config);
    generate_with_source(&source, request, config).await
}

/// Generate a report from any [`GenerationSource`].
///
/// Fragments are concatenated in arrival order; the first error aborts the
/// run and is returned unchanged.
pub async fn generate_with_source(
    source: &dyn GenerationSource,
    request: &ReportRequest,
    config: &GenerationConfig,
) -> Result<ReportOutput, ReportError> {
    let total_start = Instant::now();
    llm::validate_request(request)?;

    let messages = llm::build_messages(request, config);
    let callback = config.progress_callback.as_ref();

    // ── Step 1: Collect fragments ────────────────────────────────────────
    if let Some(cb) = callback {
        cb.on_generation_start();
    }
    let generation_start = Instant::now();
    let mut stream = source.generate(messages);
    let mut raw = String::new();
    let mut chunks = 0usize;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if chunk.is_empty() {
                    continue;
                }
                raw.push_str(&chunk);
                if let Some(cb) = callback {
                    cb.on_chunk(chunks, &chunk, raw.len());
                }
                chunks += 1;
            }
            Err(e) => {
                warn!("Generation aborted after {} fragments: {}", chunks, e);
                if let Some(cb) = callback {
                    cb.on_generation_error(e.to_string());
                }
                return Err(e);
            }
        }
    }
    let generation_duration_ms = generation_start.elapsed().as_millis() as u64;
    debug!("Received {} fragments, {} bytes", chunks, raw.len());

    // ── Step 2: Clean ────────────────────────────────────────────────────
    let markdown = postprocess::clean_markdown(&raw);
    if markdown.trim().is_empty() {
        let e = ReportError::EmptyGeneration;
        if let Some(cb) = callback {
            cb.on_generation_error(e.to_string());
        }
        return Err(e);
    }
    if let Some(cb) = callback {
        cb.on_generation_complete(chunks, raw.len());
    }

    // ── Step 3: Build ────────────────────────────────────────────────────
    let (title, document) = builder::build(&markdown);

    let stats = GenerationStats {
        chunks,
        markdown_chars: markdown.chars().count(),
        blocks: document.blocks.len(),
        tables: document.tables().count(),
        generation_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Generation complete: {:?}, {} blocks, {} tables, {}ms",
        title, stats.blocks, stats.tables, stats.total_duration_ms
    );

    Ok(ReportOutput {
        markdown,
        title,
        document,
        stats,
    })
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    request: &ReportRequest,
    config: &GenerationConfig,
) -> Result<ReportOutput, ReportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(request, config))
}

/// Generate a report and write it as DOCX.
///
/// `output` may be a directory, in which case the file is named after the
/// report title. Returns the written path alongside the report.
pub async fn generate_to_file(
    request: &ReportRequest,
    output: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<(PathBuf, ReportOutput), ReportError> {
    let report = generate(request, config).await?;
    let bytes = report.to_docx(&config.export)?;
    let path = output_path(output.as_ref(), &report.filename());
    write_atomic(&path, &bytes).await?;
    info!("Wrote {}", path.display());
    Ok((path, report))
}

// ── Export without generation ────────────────────────────────────────────

/// Render existing Markdown straight to DOCX, without an LLM call.
pub fn export_markdown(
    markdown: &str,
    export: &ExportConfig,
) -> Result<ExportedReport, ReportError> {
    let cleaned = postprocess::clean_markdown(markdown);
    let (title, document) = builder::build(&cleaned);
    let bytes = docx::render_docx(&document, export)?;
    Ok(ExportedReport {
        filename: docx::export_filename(&title),
        title,
        bytes,
    })
}

/// [`export_markdown`], then write the result to `output`.
///
/// `output` may be a directory, in which case the file is named after the
/// title. Uses atomic write (temp file + rename) to prevent partial files.
pub async fn export_markdown_to_file(
    markdown: &str,
    output: impl AsRef<Path>,
    export: &ExportConfig,
) -> Result<PathBuf, ReportError> {
    let report = export_markdown(markdown, export)?;
    let path = output_path(output.as_ref(), &report.filename);
    write_atomic(&path, &report.bytes).await?;
    info!("Wrote {}", path.display());
    Ok(path)
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn output_path(target: &Path, filename: &str) -> PathBuf {
    if target.is_dir() {
        target.join(filename)
    } else {
        target.to_path_buf()
    }
}

/// Write to `<path>.tmp`, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReportError> {
    let write_err = |source: std::io::Error| ReportError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            warn!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::ChunkStream;
    use edgequake_llm::ChatMessage;
    use futures::stream;

    struct Scripted(Vec<Result<String, ReportError>>);

    impl GenerationSource for Scripted {
        fn generate(&self, _messages: Vec<ChatMessage>) -> ChunkStream {
            let items: Vec<_> = self
                .0
                .iter()
                .map(|r| match r {
                    Ok(s) => Ok(s.clone()),
                    Err(e) => Err(ReportError::LlmApiError {
                        message: e.to_string(),
                    }),
                })
                .collect();
            Box::pin(stream::iter(items))
        }
    }

    fn request() -> ReportRequest {
        ReportRequest::new("1. Overview\n2. Schedule", "Write the 2025 plan")
    }

    #[tokio::test]
    async fn concatenates_fragments_and_builds() {
        let source = Scripted(vec![
            Ok("# 2025 ".into()),
            Ok("Plan\n\n| A | B |\n|---|".into()),
            Ok("---|\n| 1 | 2 |".into()),
        ]);
        let out = generate_with_source(&source, &request(), &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(out.title, "2025 Plan");
        assert_eq!(out.stats.chunks, 3);
        assert_eq!(out.stats.blocks, 2);
        assert_eq!(out.stats.tables, 1);
        assert_eq!(out.filename(), "2025 Plan.docx");
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let source = Scripted(vec![Ok(String::new()), Ok("# T".into()), Ok(String::new())]);
        let out = generate_with_source(&source, &request(), &GenerationConfig::default())
            .await
            .unwrap();
        assert_eq!(out.stats.chunks, 1);
    }

    #[tokio::test]
    async fn whitespace_generation_is_an_error() {
        let source = Scripted(vec![Ok("  \n\u{200B}\n".into())]);
        let err = generate_with_source(&source, &request(), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::EmptyGeneration));
    }

    #[tokio::test]
    async fn source_error_propagates() {
        let source = Scripted(vec![
            Ok("# Partial".into()),
            Err(ReportError::LlmApiError {
                message: "quota".into(),
            }),
        ]);
        let err = generate_with_source(&source, &request(), &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn incomplete_request_fails_before_generation() {
        let source = Scripted(vec![Ok("# never read".into())]);
        let err = generate_with_source(
            &source,
            &ReportRequest::new("", "x"),
            &GenerationConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReportError::EmptyTemplate));
    }

    #[test]
    fn export_markdown_names_file_from_title() {
        let report = export_markdown("```markdown\n# Budget: Q1\nBody\n```", &ExportConfig::default())
            .unwrap();
        assert_eq!(report.title, "Budget: Q1");
        assert_eq!(report.filename, "Budget_ Q1.docx");
        assert!(report.bytes.starts_with(b"PK"));
    }

    #[tokio::test]
    async fn export_to_directory_uses_title() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_markdown_to_file("# Weekly Report", dir.path(), &ExportConfig::default())
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("Weekly Report.docx"));
        assert!(path.exists());
        assert!(!dir.path().join("Weekly Report.docx.tmp").exists());
    }

    #[tokio::test]
    async fn export_to_explicit_path_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/out.docx");
        let path = export_markdown_to_file("plain text", &target, &ExportConfig::default())
            .await
            .unwrap();
        assert_eq!(path, target);
        assert!(target.exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let target = dir.path().join("taken");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep.txt"), b"x").unwrap();

        let err = write_atomic(&target, b"PK").await.unwrap_err();
        assert!(matches!(err, ReportError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("taken.tmp").exists());
        assert!(target.join("keep.txt").exists());
    }
}
