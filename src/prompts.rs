//! Instruction text sent alongside every image.
//!
//! The prompt dictates the exact twelve-key schema of
//! [`crate::output::CUSTOMER_FIELDS`] and asks for nothing but the JSON
//! object. Models do not always comply, which is why replies go through
//! [`crate::pipeline::recover::recover_json`] instead of a plain parse.
//!
//! Callers can override it via [`crate::config::ExtractionConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default extraction prompt.
pub const EXTRACTION_PROMPT: &str = "Extract customer information from this image and return ONLY a valid JSON object with this exact structure:
{
        \"Name\": \"\",
        \"Phone Number\": \"\",
        \"Mobile Number\": \"\",
        \"Email\": \"\",
        \"Street\": \"\",
        \"Street Number\": \"\",
        \"City\": \"\",
        \"ZIP Code\": \"\",
        \"State\": \"\",
        \"Country\": \"\",
        \"Latitude\": \"\",
        \"Longitude\": \"\"
}";
