//! CLI binary for edgequake-reportgen.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GenerationConfig` / `ExportConfig`, runs the generation and writes the
//! DOCX.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_reportgen::pipeline::postprocess::clean_markdown;
use edgequake_reportgen::{
    export_markdown_to_file, generate_stream, generate_to_file, load_text, ExportConfig,
    GenerationConfig, GenerationProgressCallback, ProgressCallback, ReportError, ReportRequest,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that shows how much text the model
/// has produced so far.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl GenerationProgressCallback for CliProgressCallback {
    fn on_generation_start(&self) {
        self.bar.set_prefix("Writing");
        self.bar.set_message("Waiting for the model…");
    }

    fn on_chunk(&self, _index: usize, _chunk: &str, total_len: usize) {
        self.bar.set_message(format!("{total_len} bytes received"));
    }

    fn on_generation_complete(&self, chunks: usize, total_len: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} Report written  {}",
            green("✔"),
            dim(&format!("{total_len} bytes in {chunks} fragment(s)"))
        );
    }

    fn on_generation_error(&self, error: String) {
        self.bar.finish_and_clear();
        let msg = match error.char_indices().nth(100) {
            Some((i, _)) => format!("{}\u{2026}", &error[..i]),
            None => error,
        };
        eprintln!("{} {}", red("✘"), red(&msg));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Fill in a template (text extracted beforehand)
  reportgen template.txt -i "Write the 2025 reading programme plan for grade 5"

  # With a reference document and instructions from a file
  reportgen template.txt --reference last_year.txt --instructions-file brief.txt

  # Choose where the .docx goes
  reportgen template.txt -i "..." --output-dir reports/
  reportgen template.txt -i "..." -o plan.docx

  # Echo the text while the model writes it
  reportgen template.txt -i "..." --stream

  # Keep the Markdown too, or dump everything as JSON
  reportgen template.txt -i "..." --markdown-out plan.md
  reportgen template.txt -i "..." --json > plan.json

  # Convert existing Markdown to DOCX (no API key needed)
  reportgen --from-markdown plan.md -o plan.docx

  # Use a specific model and font
  reportgen template.txt -i "..." --provider openai --model gpt-4.1-mini --font "Noto Sans KR"

TEMPLATES:
  Templates are read as UTF-8 text. For a PDF template extract the text first:
    pdftotext template.pdf template.txt

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider when set)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  REPORTGEN_FONT          Document font (default depends on the OS)
"#;

/// Fill in plan and report templates with an LLM and export them as DOCX.
#[derive(Parser, Debug)]
#[command(
    name = "reportgen",
    version,
    about = "Fill in plan and report templates with an LLM and export them as DOCX",
    long_about = "Send a template's text, an optional reference document and your instructions \
to an LLM, then convert the Markdown answer into a Word document with headings, lists and \
tables. Supports Google Gemini, OpenAI, Anthropic and any provider edgequake-llm knows.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Template text file (or a Markdown file with --from-markdown).
    input: PathBuf,

    /// Reference document text file.
    #[arg(short, long, env = "REPORTGEN_REFERENCE")]
    reference: Option<PathBuf>,

    /// Writing instructions.
    #[arg(short, long, conflicts_with = "instructions_file")]
    instructions: Option<String>,

    /// Read the writing instructions from a file.
    #[arg(long, env = "REPORTGEN_INSTRUCTIONS_FILE")]
    instructions_file: Option<PathBuf>,

    /// Treat INPUT as finished Markdown and only export it.
    #[arg(long)]
    from_markdown: bool,

    /// Write the DOCX to this file.
    #[arg(short, long, env = "REPORTGEN_OUTPUT", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write the DOCX into this directory, named after the report title.
    #[arg(long, env = "REPORTGEN_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Also write the cleaned Markdown to this file.
    #[arg(long)]
    markdown_out: Option<PathBuf>,

    /// LLM model ID (e.g. gemini-1.5-flash, gpt-4.1-mini).
    #[arg(
        long,
        env = "EDGEQUAKE_MODEL",
        long_help = "LLM model to use. Default: gemini-1.5-flash for gemini, gpt-4.1-nano otherwise."
    )]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set."
    )]
    provider: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "REPORTGEN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "REPORTGEN_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "REPORTGEN_MAX_TOKENS", default_value_t = 10_000)]
    max_tokens: usize,

    /// Language the report is written in.
    #[arg(long, env = "REPORTGEN_LANGUAGE", default_value = "Korean")]
    language: String,

    /// Document font (default: a Hangul-capable font for this OS).
    #[arg(long, env = "REPORTGEN_FONT")]
    font: Option<String>,

    /// Body font size in points.
    #[arg(long, env = "REPORTGEN_FONT_SIZE", default_value_t = 11.0)]
    font_size: f32,

    /// Print the text to stdout as the model writes it.
    #[arg(long, conflicts_with = "json")]
    stream: bool,

    /// Print the full result (Markdown, document, stats) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "REPORTGEN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "REPORTGEN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters, so INFO logs are
    // only shown when it is off.
    let show_progress = !cli.quiet && !cli.stream && !cli.json && !cli.from_markdown;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let export = build_export(&cli)?;
    let target = cli.output.clone().unwrap_or_else(|| cli.output_dir.clone());

    // ── Markdown-only mode ───────────────────────────────────────────────
    if cli.from_markdown {
        let markdown = load_text(&cli.input).context("Failed to read Markdown")?;
        let path = export_markdown_to_file(&markdown, &target, &export)
            .await
            .context("Export failed")?;
        if !cli.quiet {
            eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
        }
        return Ok(());
    }

    // ── Build request and config ─────────────────────────────────────────
    let request = build_request(&cli)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn GenerationProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, export, progress_cb).await?;

    // ── Streaming mode ───────────────────────────────────────────────────
    if cli.stream {
        let start = Instant::now();
        let mut stream = generate_stream(&request, &config)
            .await
            .context("Generation failed")?;

        let stdout = io::stdout();
        let mut markdown = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Generation failed")?;
            let mut handle = stdout.lock();
            handle
                .write_all(chunk.as_bytes())
                .and_then(|_| handle.flush())
                .context("Failed to write to stdout")?;
            markdown.push_str(&chunk);
        }
        if !markdown.ends_with('\n') {
            println!();
        }
        if markdown.trim().is_empty() {
            return Err(ReportError::EmptyGeneration.into());
        }

        if let Some(ref path) = cli.markdown_out {
            write_markdown(path, &clean_markdown(&markdown)).await?;
        }
        let path = export_markdown_to_file(&markdown, &target, &config.export)
            .await
            .context("Export failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}ms  →  {}",
                green("✔"),
                start.elapsed().as_millis(),
                bold(&path.display().to_string())
            );
        }
        return Ok(());
    }

    // ── Eager mode ───────────────────────────────────────────────────────
    let (path, report) = generate_to_file(&request, &target, &config)
        .await
        .context("Generation failed")?;

    if let Some(ref path) = cli.markdown_out {
        write_markdown(path, &report.markdown).await?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        let stats = &report.stats;
        eprintln!(
            "{}  {}  {}ms  →  {}",
            cyan("◆"),
            bold(if report.title.is_empty() {
                "(untitled)"
            } else {
                &report.title
            }),
            stats.total_duration_ms,
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} blocks  /  {} tables  /  {} chars",
            dim(&stats.blocks.to_string()),
            dim(&stats.tables.to_string()),
            dim(&stats.markdown_chars.to_string()),
        );
    }

    Ok(())
}

/// Read the template, reference and instructions into a request.
fn build_request(cli: &Cli) -> Result<ReportRequest> {
    let template = load_text(&cli.input).context("Failed to read template")?;

    let instructions = match (&cli.instructions, &cli.instructions_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => load_text(path).context("Failed to read instructions")?,
        (None, None) => anyhow::bail!(
            "No instructions given.\nPass --instructions \"...\" or --instructions-file <FILE>."
        ),
    };

    let mut request = ReportRequest::new(template, instructions);
    if let Some(ref path) = cli.reference {
        request = request.with_reference(load_text(path).context("Failed to read reference")?);
    }
    Ok(request)
}

/// Map CLI args to `ExportConfig`.
fn build_export(cli: &Cli) -> Result<ExportConfig> {
    let mut export = ExportConfig::default().font_size_pt(cli.font_size);
    if let Some(ref font) = cli.font {
        export = export.font_name(font.clone());
    }
    export.validate().context("Invalid export settings")?;
    Ok(export)
}

/// Map CLI args to `GenerationConfig`.
async fn build_config(
    cli: &Cli,
    export: ExportConfig,
    progress: Option<ProgressCallback>,
) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .language(cli.language.clone())
        .export(export);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn write_markdown(path: &Path, markdown: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    tokio::fs::write(path, markdown)
        .await
        .with_context(|| format!("Failed to write Markdown to {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn env_of(id: &str) -> Option<String> {
        Cli::command()
            .get_arguments()
            .find(|a| a.get_id() == id)
            .and_then(|a| a.get_env())
            .map(|e| e.to_string_lossy().into_owned())
    }

    #[test]
    fn provider_and_model_env_match_help() {
        for id in ["provider", "model"] {
            let var = env_of(id).expect("flag reads an env var");
            assert!(AFTER_HELP.contains(&var), "{var} missing from help");
        }
        assert_eq!(env_of("provider").as_deref(), Some("EDGEQUAKE_LLM_PROVIDER"));
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
