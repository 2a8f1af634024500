//! LLM interaction: build the chat request and expose the answer as a stream.
//!
//! The rest of the pipeline only sees a [`ChunkStream`], a lazy sequence of
//! text fragments. [`LlmSource`] adapts an edgequake-llm provider to that
//! shape; tests and callers with their own backend implement
//! [`GenerationSource`] directly. All prompt wording lives in
//! [`crate::prompts`].
//!
//! ## No retries
//!
//! A report is one long completion. Retrying silently would double the
//! cost and the wait; a failed call is reported to the caller, who can run
//! it again with the same inputs.

use crate::config::GenerationConfig;
use crate::error::ReportError;
use crate::prompts::{build_user_prompt, ReportRequest, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::traits::StreamChunk;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LlmError, ProviderFactory};
use futures::stream::{self, BoxStream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use tokio_stream::Stream;
use tracing::{debug, warn};

/// A boxed stream of generated text fragments.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ReportError>> + Send>>;

/// Anything that can turn a chat request into a stream of text fragments.
///
/// Only the concatenation of the fragments matters; how the text is split
/// is up to the implementation. The stream is consumed once.
pub trait GenerationSource: Send + Sync {
    fn generate(&self, messages: Vec<ChatMessage>) -> ChunkStream;
}

/// [`GenerationSource`] backed by an edgequake-llm provider.
///
/// Providers that stream hand out content deltas as they arrive through
/// `chat_with_tools_stream` (with no tools). Everything else, including a
/// provider that advertises streaming but answers `NotSupported`, goes
/// through `chat` and yields the whole answer as one fragment.
pub struct LlmSource {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmSource {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &GenerationConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

impl GenerationSource for LlmSource {
    fn generate(&self, messages: Vec<ChatMessage>) -> ChunkStream {
        let provider = Arc::clone(&self.provider);
        let options = self.options();

        if !(provider.supports_tool_streaming() || provider.supports_streaming()) {
            return Box::pin(stream::once(chat_once(provider, messages, options)));
        }

        let opened = stream::once(async move {
            let start = Instant::now();
            let result = provider
                .chat_with_tools_stream(&messages, &[], None, Some(&options))
                .await;
            match result {
                Ok(chunks) => {
                    debug!("Stream opened after {:?}", start.elapsed());
                    content_fragments(chunks)
                }
                Err(LlmError::NotSupported(reason)) => {
                    debug!("Streaming unavailable ({}), using chat", reason);
                    stream::once(chat_once(provider, messages, options)).boxed()
                }
                Err(e) => stream::once(async move { Err(api_error(e)) }).boxed(),
            }
        });
        Box::pin(opened.flatten())
    }
}

/// One `chat` call as a single fragment.
async fn chat_once(
    provider: Arc<dyn LLMProvider>,
    messages: Vec<ChatMessage>,
    options: CompletionOptions,
) -> Result<String, ReportError> {
    let start = Instant::now();
    let response = provider
        .chat(&messages, Some(&options))
        .await
        .map_err(api_error)?;
    debug!(
        "{} input tokens, {} output tokens, {:?}",
        response.prompt_tokens,
        response.completion_tokens,
        start.elapsed()
    );
    Ok(response.content)
}

/// Keep the non-empty content deltas of a provider stream.
///
/// Thinking text, tool-call deltas and the finish marker are not part of
/// the report and are skipped.
fn content_fragments(
    chunks: BoxStream<'static, edgequake_llm::Result<StreamChunk>>,
) -> BoxStream<'static, Result<String, ReportError>> {
    chunks
        .filter_map(|chunk| async move {
            match chunk {
                Ok(StreamChunk::Content(text)) if !text.is_empty() => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(api_error(e))),
            }
        })
        .boxed()
}

fn api_error(e: LlmError) -> ReportError {
    warn!("Generation failed: {}", e);
    ReportError::LlmApiError {
        message: e.to_string(),
    }
}

/// Build the chat messages for a report request.
///
/// Layout: the system prompt (config override or the default), then one
/// user message holding the template, reference and instructions.
pub fn build_messages(request: &ReportRequest, config: &GenerationConfig) -> Vec<ChatMessage> {
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(build_user_prompt(request, &config.language)),
    ]
}

/// Check the request has what the prompt needs.
pub fn validate_request(request: &ReportRequest) -> Result<(), ReportError> {
    if request.template_text.trim().is_empty() {
        return Err(ReportError::EmptyTemplate);
    }
    if request.instructions.trim().is_empty() {
        return Err(ReportError::MissingInstructions);
    }
    Ok(())
}

// ── Provider resolution ──────────────────────────────────────────────────

/// Model used when a provider is named but no model is given.
pub fn default_model(provider_name: &str) -> &'static str {
    if provider_name.eq_ignore_ascii_case("gemini") {
        "gemini-1.5-flash"
    } else {
        "gpt-4.1-nano"
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReportError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReportError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider** (`config.provider_name`) with `config.model` or
///    the provider's [`default_model`].
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    honoured only when both are set.
/// 4. **Gemini key** (`GEMINI_API_KEY`), the provider report templates
///    were first written against.
/// 5. **Full auto-detection** via [`ProviderFactory::from_env`].
pub fn resolve_provider(config: &GenerationConfig) -> Result<Arc<dyn LLMProvider>, ReportError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(default_model(name));
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            let model = config.model.as_deref().unwrap_or(default_model("gemini"));
            return create_provider("gemini", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReportError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use edgequake_llm::LLMResponse;

    #[derive(Clone, Copy, PartialEq)]
    enum Streaming {
        Off,
        On,
        /// Advertises streaming but refuses the streaming call.
        Refused,
        /// Fails after the first delta.
        Broken,
    }

    struct StubProvider {
        deltas: Vec<&'static str>,
        streaming: Streaming,
    }

    impl StubProvider {
        fn new(deltas: Vec<&'static str>, streaming: Streaming) -> Arc<dyn LLMProvider> {
            Arc::new(Self { deltas, streaming })
        }
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn max_context_length(&self) -> usize {
            8192
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            Ok(LLMResponse::new(self.deltas.concat(), "stub-model"))
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete(prompt).await
        }

        async fn chat(
            &self,
            _messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete("").await
        }

        async fn chat_with_tools_stream(
            &self,
            _messages: &[ChatMessage],
            _tools: &[edgequake_llm::ToolDefinition],
            _tool_choice: Option<edgequake_llm::ToolChoice>,
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<BoxStream<'static, edgequake_llm::Result<StreamChunk>>> {
            let mut chunks: Vec<edgequake_llm::Result<StreamChunk>> = vec![Ok(
                StreamChunk::ThinkingContent {
                    text: "planning".into(),
                    tokens_used: None,
                    budget_total: None,
                },
            )];
            match self.streaming {
                Streaming::Off | Streaming::Refused => {
                    return Err(LlmError::NotSupported("streaming".into()))
                }
                Streaming::On => {
                    for delta in &self.deltas {
                        chunks.push(Ok(StreamChunk::Content(delta.to_string())));
                    }
                    chunks.push(Ok(StreamChunk::Finished {
                        reason: "stop".into(),
                        ttft_ms: None,
                    }));
                }
                Streaming::Broken => {
                    chunks.push(Ok(StreamChunk::Content(self.deltas[0].to_string())));
                    chunks.push(Err(LlmError::NetworkError("connection reset".into())));
                }
            }
            Ok(stream::iter(chunks).boxed())
        }

        fn supports_tool_streaming(&self) -> bool {
            self.streaming != Streaming::Off
        }
    }

    fn source(provider: Arc<dyn LLMProvider>) -> LlmSource {
        LlmSource::new(provider, &GenerationConfig::default())
    }

    fn messages() -> Vec<ChatMessage> {
        build_messages(
            &ReportRequest::new("Template", "Write it"),
            &GenerationConfig::default(),
        )
    }

    const DELTAS: [&str; 3] = ["# 2025 ", "Plan\n\n", "- first item\n"];

    #[tokio::test]
    async fn streaming_provider_yields_each_delta() {
        let src = source(StubProvider::new(DELTAS.to_vec(), Streaming::On));
        let fragments: Vec<String> = src
            .generate(messages())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, DELTAS);
    }

    #[tokio::test]
    async fn non_streaming_provider_yields_one_fragment() {
        let src = source(StubProvider::new(DELTAS.to_vec(), Streaming::Off));
        let fragments: Vec<String> = src
            .generate(messages())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec![DELTAS.concat()]);
    }

    #[tokio::test]
    async fn refused_stream_falls_back_to_chat() {
        let src = source(StubProvider::new(DELTAS.to_vec(), Streaming::Refused));
        let fragments: Vec<String> = src
            .generate(messages())
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(fragments, vec![DELTAS.concat()]);
    }

    #[tokio::test]
    async fn stream_error_becomes_api_error() {
        let src = source(StubProvider::new(DELTAS.to_vec(), Streaming::Broken));
        let items: Vec<_> = src.generate(messages()).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "# 2025 ");
        match &items[1] {
            Err(ReportError::LlmApiError { message }) => {
                assert!(message.contains("connection reset"))
            }
            other => panic!("expected LlmApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn streamed_report_counts_every_fragment() {
        let src = source(StubProvider::new(DELTAS.to_vec(), Streaming::On));
        let out = crate::generate::generate_with_source(
            &src,
            &ReportRequest::new("Template", "Write it"),
            &GenerationConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(out.stats.chunks, 3);
        assert_eq!(out.markdown.trim_end(), "# 2025 Plan\n\n- first item");
        assert_eq!(out.title, "2025 Plan");
    }

    #[test]
    fn default_models() {
        assert_eq!(default_model("gemini"), "gemini-1.5-flash");
        assert_eq!(default_model("Gemini"), "gemini-1.5-flash");
        assert_eq!(default_model("openai"), "gpt-4.1-nano");
    }

    #[test]
    fn build_messages_has_system_then_user() {
        let config = GenerationConfig::default();
        let req = ReportRequest::new("Template", "Instructions");
        let messages = build_messages(&req, &config);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn validate_rejects_blank_template() {
        let req = ReportRequest::new("  \n", "Write it");
        assert!(matches!(
            validate_request(&req),
            Err(ReportError::EmptyTemplate)
        ));
    }

    #[test]
    fn validate_rejects_blank_instructions() {
        let req = ReportRequest::new("Template", "");
        assert!(matches!(
            validate_request(&req),
            Err(ReportError::MissingInstructions)
        ));
    }

    #[test]
    fn validate_accepts_complete_request() {
        let req = ReportRequest::new("Template", "Write it").with_reference("ref");
        assert!(validate_request(&req).is_ok());
    }
}
