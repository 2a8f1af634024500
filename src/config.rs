//! Configuration types for report generation and export.
//!
//! Generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]; export appearance through
//! [`ExportConfig`], which the generation config carries so a single
//! value describes a whole run.
//!
//! Nothing here is global: the LLM client and the document font are
//! resolved from the config each time a report is generated.

use crate::error::ReportError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for generating a report.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_reportgen::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .model("gemini-1.5-flash")
///     .provider_name("gemini")
///     .temperature(0.7)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// LLM model identifier, e.g. "gemini-1.5-flash", "gpt-4.1-mini".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Report writing benefits from some freedom of phrasing; transcription
    /// tasks would want something close to 0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 10000.
    ///
    /// A filled-in multi-section plan with tables regularly runs past
    /// 4 000 tokens; a lower cap silently truncates the last sections.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Language the report is written in. Default: "Korean".
    pub language: String,

    /// Receives per-fragment generation events.
    pub progress_callback: Option<ProgressCallback>,

    /// Appearance of the exported DOCX.
    pub export: ExportConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.7,
            max_tokens: 10_000,
            system_prompt: None,
            language: "Korean".to_string(),
            progress_callback: None,
            export: ExportConfig::default(),
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("language", &self.language)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn GenerationProgressCallback>"),
            )
            .field("export", &self.export)
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl fmt::Debug for GenerationConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl GenerationConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn export(mut self, export: ExportConfig) -> Self {
        self.config.export = export;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, ReportError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ReportError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.language.trim().is_empty() {
            return Err(ReportError::InvalidConfig("language must not be empty".into()));
        }
        c.export.validate()?;
        Ok(self.config)
    }
}

// ── Export ───────────────────────────────────────────────────────────────

/// Font and size used for every run in the exported document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Font family name. Default: a Hangul-capable font for the host OS.
    pub font_name: String,

    /// Body font size in points. Default: 11.
    pub font_size_pt: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            font_name: system_font().to_string(),
            font_size_pt: 11.0,
        }
    }
}

impl ExportConfig {
    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }

    pub fn font_size_pt(mut self, pt: f32) -> Self {
        self.font_size_pt = pt;
        self
    }

    /// Font size in WordprocessingML half-points.
    pub fn half_points(&self) -> u32 {
        (self.font_size_pt * 2.0).round() as u32
    }

    pub fn validate(&self) -> Result<(), ReportError> {
        if self.font_name.trim().is_empty() {
            return Err(ReportError::InvalidConfig("font name must not be empty".into()));
        }
        if !(1.0..=400.0).contains(&self.font_size_pt) {
            return Err(ReportError::InvalidConfig(format!(
                "font size must be 1–400 pt, got {}",
                self.font_size_pt
            )));
        }
        Ok(())
    }
}

/// Default document font for the current operating system.
///
/// Each choice ships with the OS (or its common Korean locale packages)
/// and covers Hangul; Arial is the fallback elsewhere.
pub fn system_font() -> &'static str {
    font_for_os(std::env::consts::OS)
}

fn font_for_os(os: &str) -> &'static str {
    match os {
        "macos" => "AppleGothic",
        "linux" => "NanumGothic",
        "windows" => "Malgun Gothic",
        _ => "Arial",
    }
}
