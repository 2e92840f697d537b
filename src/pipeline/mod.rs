//! Pipeline stages for image-to-spreadsheet extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ recover ──▶ reconcile ──▶ export
//! (folder)  (JPEG/b64)  (VLM)  (JSON)     (optional)     (xlsx)
//! ```
//!
//! 1. [`input`]     — list image files directly inside the folder
//! 2. [`encode`]    — decode, convert to RGB, JPEG-encode and base64-wrap
//! 3. [`llm`]       — one VLM call per image; the only stage with network I/O
//! 4. [`recover`]   — pull one JSON object out of the free-text reply
//! 5. [`reconcile`] — optionally reshape into the fixed twelve fields
//! 6. [`export`]    — union-of-keys table written as an `.xlsx` workbook

pub mod encode;
pub mod export;
pub mod input;
pub mod llm;
pub mod reconcile;
pub mod recover;
