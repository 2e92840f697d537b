//! Best-effort recovery of one JSON object from a free-text model reply.
//!
//! The prompt asks for nothing but JSON, yet models regularly wrap the
//! object in prose ("Here is the result: …") or in ```json fences. Recovery
//! works in four steps:
//!
//! 1. If the trimmed reply starts with `{` and ends with `}`, it is the
//!    candidate.
//! 2. Otherwise the candidate runs from the first `{` to the last `}`.
//! 3. No `{` (or no `}` at all) means there is nothing to parse.
//! 4. The candidate must parse as a JSON object.
//!
//! This is not a parser. A reply with two separate objects, or with braces
//! inside string values outside the object, produces a slice spanning both
//! and fails to parse (or parses to the wrong thing). That limitation is
//! accepted; no balancing or scanning for a "best" object is attempted.

use crate::output::CustomerRecord;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why no record could be recovered from a reply.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no JSON object found in reply")]
    NoJsonFound,

    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

/// Select the candidate JSON text inside `reply`.
///
/// Returns `None` when the reply holds no `{`, or holds a `{` but no `}`.
/// When the last `}` precedes the first `{`, the candidate is empty and will
/// fail to parse.
pub fn json_candidate(reply: &str) -> Option<&str> {
    let trimmed = reply.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return Some("");
    }
    Some(&trimmed[start..=end])
}

/// Recover a [`CustomerRecord`] from a model reply.
///
/// The object is returned as-is: keys and value types are whatever the model
/// produced.
pub fn recover_json(reply: &str) -> Result<CustomerRecord, RecoveryError> {
    let candidate = json_candidate(reply).ok_or(RecoveryError::NoJsonFound)?;
    let map: Map<String, Value> = serde_json::from_str(candidate)?;
    Ok(CustomerRecord::from(map))
}
