//! # edgequake-contacts
//!
//! Extract customer contact details from photographed or scanned documents
//! using Vision Language Models (VLMs), and export them to an Excel sheet.
//!
//! ## Pipeline Overview
//!
//! ```text
//! images/
//!  │
//!  ├─ 1. Input     list *.png / *.jpg / *.jpeg (no recursion)
//!  ├─ 2. Encode    decode → RGB → JPEG → base64 data URI
//!  ├─ 3. VLM       one call per image, fixed twelve-field JSON prompt
//!  ├─ 4. Recover   first `{` … last `}` → JSON object
//!  ├─ 5. Reconcile optional: map onto the twelve canonical fields
//!  └─ 6. Export    one row per record → customer_info.xlsx
//! ```
//!
//! Images are processed sequentially. A failure on one image (unreadable
//! file, API error, reply without JSON) drops that image and the batch goes
//! on; only a failed export aborts the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_contacts::{run, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .api_key(std::env::var("OPENAI_API_KEY")?)
//!         .build()?;
//!     let output = run("images", &config).await?;
//!     eprintln!("{} of {} images extracted",
//!         output.stats.extracted,
//!         output.stats.total_images);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `img2xlsx` binary (clap + anyhow + tracing-subscriber + dotenvy) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExtractionConfig, ExtractionConfigBuilder, SchemaMode};
pub use error::{ContactsError, ImageError};
pub use extract::{extract_folder, run, run_sync, Extractor};
pub use output::{BatchOutput, BatchStats, CustomerRecord, CUSTOMER_FIELDS};
pub use pipeline::encode::EncodedImage;
pub use pipeline::export::{Cell, ExportTable};
pub use pipeline::input::{is_image_file, list_images};
pub use pipeline::recover::recover_json;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use provider::{
    ModelError, OpenAiVisionClient, ProviderModel, VisionModel, VisionReply, VisionRequest,
};
