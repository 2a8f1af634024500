//! Streaming generation API: emit raw text fragments as they arrive.
//!
//! ## Why stream?
//!
//! A multi-section report takes a while to write. A stream lets callers
//! echo text to a terminal or UI immediately instead of staring at a
//! spinner. The fragments are raw model output: no cleanup has run and no
//! document exists yet. Collect them and pass the text to
//! [`crate::generate::export_markdown`] to get a DOCX, or use
//! [`crate::generate::generate`] with a progress callback to get both.

use crate::config::GenerationConfig;
use crate::error::ReportError;
use crate::pipeline::llm::{self, ChunkStream, GenerationSource, LlmSource};
use crate::prompts::ReportRequest;
use tracing::info;

/// Start generating a report and return its fragment stream.
///
/// # Returns
/// - `Ok(ChunkStream)`: a stream of `Result<String, ReportError>`
/// - `Err(ReportError)`: the request is incomplete or no provider could
///   be resolved; nothing was sent to the model
///
/// # Example
/// ```rust,no_run
/// use edgequake_reportgen::{generate_stream, GenerationConfig, ReportRequest};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ReportRequest::new(
///     std::fs::read_to_string("template.txt")?,
///     "Write the 2025 after-school programme plan",
/// );
/// let mut stream = generate_stream(&request, &GenerationConfig::default()).await?;
/// while let Some(chunk) = stream.next().await {
///     print!("{}", chunk?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn generate_stream(
    request: &ReportRequest,
    config: &GenerationConfig,
) -> Result<ChunkStream, ReportError> {
    llm::validate_request(request)?;
    let provider = llm::resolve_provider(config)?;
    info!("Starting streaming generation");
    let source = LlmSource::new(provider, config);
    Ok(source.generate(llm::build_messages(request, config)))
}
