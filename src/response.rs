//! Model response handling: fence stripping, JSON parsing and shape checks.
//!
//! Generative models tend to wrap JSON answers in Markdown code fences. These
//! helpers let a classifier turn raw response text into a `serde_json::Value`
//! and report anything unusable as [`ClassifyError::InvalidResponse`].

use crate::classify::ResultValidator;
use crate::error::ClassifyError;

/// Trim whitespace and a surrounding ```` ```json ```` or ```` ``` ```` fence
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Strip fences and parse the remainder as JSON
pub fn parse_json(text: &str) -> Result<serde_json::Value, ClassifyError> {
    let cleaned = strip_code_fences(text);
    if cleaned.is_empty() {
        return Err(ClassifyError::InvalidResponse("empty response".to_string()));
    }
    serde_json::from_str(cleaned).map_err(|e| ClassifyError::InvalidResponse(e.to_string()))
}

/// Strip fences and deserialize into `T`
pub fn parse_as<T>(text: &str) -> Result<T, ClassifyError>
where
    T: serde::de::DeserializeOwned,
{
    let value = parse_json(text)?;
    Ok(serde_json::from_value(value)?)
}

/// Requires a JSON array result, optionally of an exact length
///
/// Useful when one call classifies several reviews and must answer with one
/// entry per review.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonArray {
    expected_len: Option<usize>,
}

impl JsonArray {
    /// Accept any JSON array
    pub fn any() -> Self {
        Self { expected_len: None }
    }

    /// Accept only arrays with exactly `len` entries
    pub fn with_len(len: usize) -> Self {
        Self {
            expected_len: Some(len),
        }
    }
}

impl ResultValidator<serde_json::Value> for JsonArray {
    fn validate(&self, output: &serde_json::Value) -> Result<(), String> {
        let array = output
            .as_array()
            .ok_or_else(|| "expected a JSON array".to_string())?;
        match self.expected_len {
            Some(len) if array.len() != len => Err(format!(
                "expected {} entries, got {}",
                len,
                array.len()
            )),
            _ => Ok(()),
        }
    }
}
