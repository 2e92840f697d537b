//! Extraction entry points: one image, one folder, or folder-to-workbook.
//!
//! Images are processed strictly one after another: encode, call the model,
//! recover JSON, append. Any per-image failure is logged and recorded in
//! [`BatchOutput::failures`]; only the final export can fail the run.

use crate::config::{ExtractionConfig, SchemaMode};
use crate::error::{ContactsError, ImageError};
use crate::output::{BatchOutput, BatchStats, CustomerRecord};
use crate::pipeline::recover::{recover_json, RecoveryError};
use crate::pipeline::{encode, export, input, llm, reconcile};
use crate::provider::{resolve_model, VisionModel, VisionReply};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives the per-image pipeline with one model client and one config.
pub struct Extractor {
    model: Arc<dyn VisionModel>,
    config: ExtractionConfig,
}

impl Extractor {
    pub fn new(model: Arc<dyn VisionModel>, config: ExtractionConfig) -> Self {
        Self { model, config }
    }

    /// Resolve the model client from `config` (see [`resolve_model`]).
    pub fn from_config(config: ExtractionConfig) -> Result<Self, ContactsError> {
        let model = resolve_model(&config)?;
        Ok(Self::new(model, config))
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract one customer record from the image at `path`.
    pub async fn extract(&self, path: impl AsRef<Path>) -> Result<CustomerRecord, ImageError> {
        self.extract_with_usage(path.as_ref())
            .await
            .map(|(record, _)| record)
    }

    async fn extract_with_usage(
        &self,
        path: &Path,
    ) -> Result<(CustomerRecord, VisionReply), ImageError> {
        let owned = path.to_path_buf();
        let image = tokio::task::spawn_blocking(move || encode::encode_file(&owned))
            .await
            .map_err(|e| ImageError::ImageRead {
                path: path.to_path_buf(),
                detail: format!("encoder task failed: {e}"),
            })??;

        let reply = llm::infer(self.model.as_ref(), path, &image, &self.config).await?;
        let content = reply.content.trim();
        info!(
            "Extracted customer information from {}:\n{}",
            path.display(),
            content
        );

        let record = recover_json(content).map_err(|e| match e {
            RecoveryError::NoJsonFound => ImageError::NoJsonFound {
                path: path.to_path_buf(),
                reply: content.to_string(),
            },
            RecoveryError::Parse(err) => ImageError::JsonParse {
                path: path.to_path_buf(),
                detail: err.to_string(),
                reply: content.to_string(),
            },
        })?;

        if record.is_empty() {
            return Err(ImageError::EmptyRecord {
                path: path.to_path_buf(),
                reply: content.to_string(),
            });
        }

        let record = match self.config.schema_mode {
            SchemaMode::AsReturned => record,
            SchemaMode::Fixed => reconcile::reconcile(&record),
        };
        Ok((record, reply))
    }

    /// Extract records from every image in `folder`. Nothing is written.
    pub async fn run(&self, folder: impl AsRef<Path>) -> Result<BatchOutput, ContactsError> {
        let start = Instant::now();
        let folder = folder.as_ref();
        let images = input::list_images(folder, self.config.sort_files)?;
        let total = images.len();
        info!(
            "Processing {} images from {} with {}",
            total,
            folder.display(),
            self.model.name()
        );

        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }

        let mut records = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut stats = BatchStats {
            total_images: total,
            ..Default::default()
        };

        for (i, path) in images.iter().enumerate() {
            let index = i + 1;
            if let Some(cb) = cb {
                cb.on_image_start(index, total, path);
            }
            match self.extract_with_usage(path).await {
                Ok((record, reply)) => {
                    stats.total_input_tokens += reply.input_tokens;
                    stats.total_output_tokens += reply.output_tokens;
                    if let Some(cb) = cb {
                        cb.on_image_complete(index, total, path, record.filled_fields());
                    }
                    records.push(record);
                }
                Err(e) => {
                    warn!("{}", e);
                    if let Some(reply) = e.raw_reply() {
                        warn!("Raw response: {}", reply);
                    }
                    if let Some(cb) = cb {
                        cb.on_image_error(index, total, path, &e.to_string());
                    }
                    failures.push(e);
                }
            }
        }

        stats.extracted = records.len();
        stats.failed = failures.len();
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        debug!(
            "Batch done: {}/{} extracted, {} tokens in / {} out",
            stats.extracted, total, stats.total_input_tokens, stats.total_output_tokens
        );

        if let Some(cb) = cb {
            cb.on_batch_complete(total, stats.extracted);
        }

        Ok(BatchOutput {
            records,
            failures,
            stats,
        })
    }

    /// Extract every image in `folder` and write the workbook to `output_path`.
    ///
    /// The file is written once, after all images have been attempted, and
    /// replaces any existing file. An export failure discards the run.
    pub async fn run_to_file(
        &self,
        folder: impl AsRef<Path>,
        output_path: impl AsRef<Path>,
    ) -> Result<BatchOutput, ContactsError> {
        let start = Instant::now();
        let mut output = self.run(folder).await?;
        let path = output_path.as_ref();
        export::export_records(&output.records, path).await?;
        output.stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Excel file '{}' has been created successfully ({} rows)",
            path.display(),
            output.records.len()
        );
        Ok(output)
    }
}

/// Extract every image in `folder` and write `config.output_path`.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ContactsError)` only for fatal errors: the folder cannot be
/// listed, no provider can be resolved, or the workbook cannot be written.
/// Per-image failures are reported in [`BatchOutput::failures`].
pub async fn run(
    folder: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ContactsError> {
    let output_path = config.output_path.clone();
    Extractor::from_config(config.clone())?
        .run_to_file(folder, output_path)
        .await
}

/// Extract every image in `folder` without writing anything.
pub async fn extract_folder(
    folder: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ContactsError> {
    Extractor::from_config(config.clone())?.run(folder).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    folder: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ContactsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ContactsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(folder, config))
}
