//! Vision model clients.
//!
//! The pipeline talks to the remote model only through [`VisionModel`]:
//! one user turn with the instruction text and one JPEG image, answered by
//! a single text completion. Two implementations ship with the crate:
//!
//! * [`OpenAiVisionClient`] — a direct `reqwest` client for any
//!   OpenAI-compatible `/chat/completions` endpoint. It takes its API key
//!   explicitly, so credentials flow from the config into the client.
//! * [`ProviderModel`] — wraps an edgequake-llm [`LLMProvider`] so Anthropic,
//!   Gemini, Ollama and the other supported providers work unchanged.
//!
//! Tests plug in their own implementation through
//! [`crate::config::ExtractionConfigBuilder::vision_model`].

use crate::config::ExtractionConfig;
use crate::error::ContactsError;
use crate::pipeline::encode::{EncodedImage, JPEG_MIME};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// A single-image completion request.
#[derive(Debug, Clone, Copy)]
pub struct VisionRequest<'a> {
    pub prompt: &'a str,
    pub image: &'a EncodedImage,
    pub max_tokens: usize,
    pub detail: Option<&'a str>,
}

/// The model's answer plus token usage when the backend reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionReply {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl VisionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// Failure at the remote inference boundary.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Transport or provider error.
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response envelope carried no message content.
    #[error("response has no message content")]
    MissingContent,
}

/// A vision-capable chat model.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Send one prompt + image and return the first completion's text.
    async fn complete(&self, request: VisionRequest<'_>) -> Result<VisionReply, ModelError>;
}

// ── OpenAI-compatible client ─────────────────────────────────────────────

/// Direct client for OpenAI-compatible chat completion endpoints.
pub struct OpenAiVisionClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiVisionClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            model: crate::config::DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// Build the request body: one user turn with a text part and an
/// `image_url` part. No temperature is sent, so model defaults apply.
pub(crate) fn build_request_body(model: &str, request: &VisionRequest<'_>) -> serde_json::Value {
    let mut image_url = serde_json::json!({ "url": request.image.data_uri() });
    if let Some(detail) = request.detail {
        image_url["detail"] = serde_json::Value::String(detail.to_string());
    }
    serde_json::json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": request.prompt },
                { "type": "image_url", "image_url": image_url }
            ]
        }],
        "max_tokens": request.max_tokens
    })
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Pull the first choice's message content out of a response body.
fn parse_chat_response(body: &str) -> Result<VisionReply, ModelError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ModelError::Request(format!("malformed response: {e}")))?;
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or(ModelError::MissingContent)?;
    let (input_tokens, output_tokens) = response
        .usage
        .map(|u| (u.prompt_tokens, u.completion_tokens))
        .unwrap_or((0, 0));
    Ok(VisionReply {
        content,
        input_tokens,
        output_tokens,
    })
}

#[async_trait]
impl VisionModel for OpenAiVisionClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: VisionRequest<'_>) -> Result<VisionReply, ModelError> {
        let body = build_request_body(&self.model, &request);
        debug!(model = %self.model, "Sending vision request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ModelError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_chat_response(&text)
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter from an edgequake-llm provider to [`VisionModel`].
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    /// Instantiate a named provider; its API key is read by the factory.
    pub fn from_factory(provider_name: &str, model: &str) -> Result<Self, ContactsError> {
        let provider = ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
            ContactsError::ProviderNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        Ok(Self::new(provider, format!("{provider_name}/{model}")))
    }

    /// Pick the first provider whose API key is present in the environment.
    pub fn from_env() -> Result<Self, ContactsError> {
        let (provider, _embedding) =
            ProviderFactory::from_env().map_err(|e| ContactsError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "No LLM provider could be auto-detected from environment.\n\
                    Pass --api-key, set OPENAI_API_KEY, or configure a provider.\n\
                    Error: {}",
                    e
                ),
            })?;
        Ok(Self::new(provider, "auto"))
    }
}

#[async_trait]
impl VisionModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: VisionRequest<'_>) -> Result<VisionReply, ModelError> {
        let mut image = ImageData::new(request.image.base64.clone(), JPEG_MIME);
        if let Some(detail) = request.detail {
            image = image.with_detail(detail);
        }
        let messages = vec![ChatMessage::user_with_images(request.prompt, vec![image])];
        let options = CompletionOptions {
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ModelError::Request(format!("{e}")))?;

        if response.content.is_empty() {
            return Err(ModelError::MissingContent);
        }
        Ok(VisionReply {
            content: response.content,
            input_tokens: response.prompt_tokens as u64,
            output_tokens: response.completion_tokens as u64,
        })
    }
}

// ── Resolution ───────────────────────────────────────────────────────────

/// Resolve the model client, from most-specific to least-specific.
///
/// 1. **Pre-built client** (`config.vision_model`), used as-is.
/// 2. **Named non-OpenAI provider** (`config.provider_name`), through the
///    edgequake-llm factory which reads that provider's key.
/// 3. **Explicit API key** (`config.api_key`), with the built-in
///    OpenAI-compatible client against `config.base_url`.
/// 4. **Auto-detection** via `ProviderFactory::from_env`.
pub fn resolve_model(config: &ExtractionConfig) -> Result<Arc<dyn VisionModel>, ContactsError> {
    if let Some(ref model) = config.vision_model {
        return Ok(Arc::clone(model));
    }

    let api_key = config.api_key.as_deref().filter(|k| !k.is_empty());

    if let Some(ref name) = config.provider_name {
        let is_openai = name.eq_ignore_ascii_case("openai");
        if !is_openai || api_key.is_none() {
            return Ok(Arc::new(ProviderModel::from_factory(name, &config.model)?));
        }
    }

    if let Some(key) = api_key {
        return Ok(Arc::new(
            OpenAiVisionClient::new(key)
                .with_base_url(&config.base_url)
                .with_model(&config.model),
        ));
    }

    Ok(Arc::new(ProviderModel::from_env()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> EncodedImage {
        EncodedImage {
            base64: "AAAA".to_string(),
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn request_body_shape() {
        let image = sample_image();
        let req = VisionRequest {
            prompt: "extract",
            image: &image,
            max_tokens: 1000,
            detail: None,
        };
        let body = build_request_body("gpt-4o-mini", &req);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("temperature").is_none());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
        let parts = messages[0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[0]["text"], "extract");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert!(parts[1]["image_url"].get("detail").is_none());
    }

    #[test]
    fn request_body_with_detail() {
        let image = sample_image();
        let req = VisionRequest {
            prompt: "p",
            image: &image,
            max_tokens: 10,
            detail: Some("low"),
        };
        let body = build_request_body("m", &req);
        assert_eq!(body["messages"][0]["content"][1]["image_url"]["detail"], "low");
    }

    #[test]
    fn parse_first_choice() {
        let body = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "{\"Name\":\"A\"}"}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 900, "completion_tokens": 40, "total_tokens": 940}
        }"#;
        let reply = parse_chat_response(body).unwrap();
        assert_eq!(reply.content, "{\"Name\":\"A\"}");
        assert_eq!(reply.input_tokens, 900);
        assert_eq!(reply.output_tokens, 40);
    }

    #[test]
    fn parse_missing_content() {
        let no_choices = r#"{"choices": []}"#;
        assert!(matches!(
            parse_chat_response(no_choices),
            Err(ModelError::MissingContent)
        ));
        let null_content = r#"{"choices": [{"message": {"content": null}}]}"#;
        assert!(matches!(
            parse_chat_response(null_content),
            Err(ModelError::MissingContent)
        ));
    }

    #[test]
    fn parse_malformed_envelope() {
        assert!(matches!(
            parse_chat_response("<html>502</html>"),
            Err(ModelError::Request(_))
        ));
    }

    #[test]
    fn prebuilt_model_wins() {
        struct Fixed;
        #[async_trait]
        impl VisionModel for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            async fn complete(&self, _r: VisionRequest<'_>) -> Result<VisionReply, ModelError> {
                Ok(VisionReply::text("{}"))
            }
        }
        let config = ExtractionConfig::builder()
            .api_key("sk-ignored")
            .vision_model(Arc::new(Fixed))
            .build()
            .unwrap();
        assert_eq!(resolve_model(&config).unwrap().name(), "fixed");
    }

    #[test]
    fn explicit_key_uses_builtin_client() {
        let config = ExtractionConfig::builder()
            .api_key("sk-test")
            .model("gpt-4o")
            .build()
            .unwrap();
        assert_eq!(resolve_model(&config).unwrap().name(), "gpt-4o");

        let config = ExtractionConfig::builder()
            .provider_name("openai")
            .api_key("sk-test")
            .build()
            .unwrap();
        assert_eq!(resolve_model(&config).unwrap().name(), "gpt-4o-mini");
    }
}
