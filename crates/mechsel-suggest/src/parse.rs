use mechsel_core::{
    ExtractedFormFields, Extracted, ExtractionFailure, JsonObject, MaterialSelectionResult,
    MotorSelectionResult,
};

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON object found in model output")]
    NotFound,
    #[error("model output is not valid JSON: {0}")]
    Invalid(String),
    #[error("model output is JSON but not an object")]
    NotAnObject,
}

/// Locate and decode the single JSON object in raw model output.
///
/// A ```json fenced block wins; otherwise the span from the first `{` to the
/// last `}` is taken. Braces inside surrounding prose can make that span
/// wrong, which then surfaces as `Invalid`. No repair is attempted.
pub fn extract_json_object(raw: &str) -> Result<JsonObject, ExtractError> {
    let candidate = fenced_block(raw)
        .or_else(|| brace_span(raw))
        .ok_or(ExtractError::NotFound)?;

    match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(serde_json::Value::Object(object)) => Ok(object),
        Ok(_) => Err(ExtractError::NotAnObject),
        Err(e) => Err(ExtractError::Invalid(e.to_string())),
    }
}

/// Content of the first ```json fence, if it is closed.
///
/// The tag must end its line (trailing spaces or tabs allowed); an inline
/// fence is not a fence.
fn fenced_block(raw: &str) -> Option<&str> {
    let open = raw.find(FENCE_OPEN)?;
    let after_tag = raw[open + FENCE_OPEN.len()..].trim_start_matches([' ', '\t']);
    let after_tag = after_tag.strip_prefix("\r\n").or_else(|| after_tag.strip_prefix('\n'))?;
    let close = after_tag.find(FENCE_CLOSE)?;
    Some(after_tag[..close].trim())
}

/// Greedy first-`{` to last-`}` span.
fn brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Motor task: the decoded object unchanged, or a null id with a local reason.
pub fn parse_motor_selection(raw: &str) -> MotorSelectionResult {
    match extract_json_object(raw) {
        Ok(object) => MotorSelectionResult::from_object(object),
        Err(e) => {
            tracing::warn!(error = %e, "motor selection extraction failed");
            MotorSelectionResult::failed(format!("failed to process the AI result: {e}"))
        }
    }
}

pub fn parse_material_selection(raw: &str) -> Extracted<MaterialSelectionResult> {
    extract_or_fail(raw, "material selection").map(MaterialSelectionResult::from_object)
}

pub fn parse_form_fields(raw: &str) -> Extracted<ExtractedFormFields> {
    extract_or_fail(raw, "form extraction").map(ExtractedFormFields::from_object)
}

fn extract_or_fail(raw: &str, task: &str) -> Extracted<JsonObject> {
    match extract_json_object(raw) {
        Ok(object) => Extracted::Parsed(object),
        Err(e) => {
            tracing::warn!(error = %e, task, "extraction failed");
            Extracted::Failed(ExtractionFailure::new(format!(
                "failed to process JSON from the AI: {e}"
            )))
        }
    }
}
