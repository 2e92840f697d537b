//! VLM interaction: send one encoded image with the extraction prompt.
//!
//! There is no retry: a failed or timed-out call fails this image only and
//! the batch moves on.

use crate::config::ExtractionConfig;
use crate::error::ImageError;
use crate::pipeline::encode::EncodedImage;
use crate::provider::{VisionModel, VisionReply, VisionRequest};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::debug;

/// Build the request for one image from the config.
pub fn build_request<'a>(config: &'a ExtractionConfig, image: &'a EncodedImage) -> VisionRequest<'a> {
    VisionRequest {
        prompt: config.prompt_text(),
        image,
        max_tokens: config.max_tokens,
        detail: config.image_detail.as_deref(),
    }
}

/// Call the model for the image at `path`.
///
/// `config.api_timeout_secs == 0` waits indefinitely.
pub async fn infer(
    model: &dyn VisionModel,
    path: &Path,
    image: &EncodedImage,
    config: &ExtractionConfig,
) -> Result<VisionReply, ImageError> {
    let start = Instant::now();
    let request = build_request(config, image);

    let result = if config.api_timeout_secs == 0 {
        model.complete(request).await
    } else {
        tokio::time::timeout(
            Duration::from_secs(config.api_timeout_secs),
            model.complete(request),
        )
        .await
        .map_err(|_| ImageError::Timeout {
            path: path.to_path_buf(),
            secs: config.api_timeout_secs,
        })?
    };

    let reply = result.map_err(|e| ImageError::Inference {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    debug!(
        "{}: {} input tokens, {} output tokens, {:?}",
        path.display(),
        reply.input_tokens,
        reply.output_tokens,
        start.elapsed()
    );
    Ok(reply)
}
