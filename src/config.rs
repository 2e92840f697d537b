//! Configuration types for contact extraction.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. Credentials travel inside the config and
//! are handed to the model client when the [`crate::Extractor`] is built;
//! nothing is stored in process-wide state.

use crate::error::ContactsError;
use crate::progress::ProgressCallback;
use crate::provider::VisionModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default model for the built-in OpenAI-compatible client.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default spreadsheet written by a run.
pub const DEFAULT_OUTPUT_FILE: &str = "customer_info.xlsx";

/// Configuration for a contact-extraction run.
///
/// # Example
/// ```rust
/// use edgequake_contacts::{ExtractionConfig, SchemaMode};
///
/// let config = ExtractionConfig::builder()
///     .api_key("sk-test")
///     .schema_mode(SchemaMode::Fixed)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 1000);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Vision model identifier. Default: `gpt-4o-mini`.
    pub model: String,

    /// LLM provider name (e.g. "openai", "anthropic", "gemini", "ollama").
    ///
    /// Any name other than "openai" is routed through the edgequake-llm
    /// provider factory, which reads that provider's key from the environment.
    pub provider_name: Option<String>,

    /// API key for the built-in OpenAI-compatible client.
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    pub base_url: String,

    /// Pre-constructed model client. Takes precedence over everything else.
    pub vision_model: Option<Arc<dyn VisionModel>>,

    /// Maximum tokens the model may generate per image. Default: 1000.
    pub max_tokens: usize,

    /// Optional image detail hint (`low`, `high`, `auto`). Default: none.
    pub image_detail: Option<String>,

    /// Per-image inference timeout in seconds; 0 disables it. Default: 120.
    pub api_timeout_secs: u64,

    /// Spreadsheet written by [`crate::run`]. Default: `customer_info.xlsx`.
    pub output_path: PathBuf,

    /// How parsed records are shaped before export. Default: as returned.
    pub schema_mode: SchemaMode,

    /// Process images in file-name order. Default: true.
    ///
    /// When false, images are processed in directory-listing order, which
    /// depends on the filesystem and may differ between runs.
    pub sort_files: bool,

    /// Custom instruction text. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Optional per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            provider_name: None,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            vision_model: None,
            max_tokens: 1000,
            image_detail: None,
            api_timeout_secs: 120,
            output_path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            schema_mode: SchemaMode::default(),
            sort_files: true,
            prompt: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("vision_model", &self.vision_model.as_ref().map(|m| m.name().to_string()))
            .field("max_tokens", &self.max_tokens)
            .field("image_detail", &self.image_detail)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("output_path", &self.output_path)
            .field("schema_mode", &self.schema_mode)
            .field("sort_files", &self.sort_files)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The instruction text sent with each image.
    pub fn prompt_text(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::EXTRACTION_PROMPT)
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn vision_model(mut self, model: Arc<dyn VisionModel>) -> Self {
        self.config.vision_model = Some(model);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn image_detail(mut self, detail: impl Into<String>) -> Self {
        self.config.image_detail = Some(detail.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn schema_mode(mut self, mode: SchemaMode) -> Self {
        self.config.schema_mode = mode;
        self
    }

    pub fn sort_files(mut self, v: bool) -> Self {
        self.config.sort_files = v;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ContactsError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(ContactsError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(ContactsError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ContactsError::InvalidConfig(format!(
                "base_url must be an HTTP/HTTPS URL, got '{}'",
                c.base_url
            )));
        }
        if c.output_path.as_os_str().is_empty() {
            return Err(ContactsError::InvalidConfig(
                "output_path must not be empty".into(),
            ));
        }
        if let Some(detail) = c.image_detail.as_deref() {
            if !matches!(detail, "low" | "high" | "auto") {
                return Err(ContactsError::InvalidConfig(format!(
                    "image_detail must be low, high or auto, got '{detail}'"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How parsed records are shaped before they reach the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SchemaMode {
    /// Keep whatever flat object the model returned. Columns are the union
    /// of all keys seen across the run. (default)
    #[default]
    AsReturned,
    /// Map recognised keys onto the twelve canonical fields, drop the rest,
    /// and fill missing fields with empty strings. Columns are stable.
    Fixed,
}
