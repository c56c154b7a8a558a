pub mod engine;
pub mod parse;
pub mod prompt;

use mechsel_core::{
    ExtractedFormFields, Extracted, MaterialQuery, MaterialSelectionResult, MotorRecord,
    MotorSelectionResult, SelectionQuery,
};
use tracing::{debug, info, warn};

pub use engine::{ImageAttachment, ImageKind, InvokeError, LlmInvoker, ModelInvoker, ModelRequest};

/// Ask the model for the best motor among `candidates`.
///
/// At most `candidate_limit` candidates reach the prompt, closest speed first.
/// Only prompt rendering and the model call can fail; an unreadable answer
/// becomes a null `best_motor_id` with a diagnostic reason.
pub async fn select_motor(
    invoker: &dyn ModelInvoker,
    candidates: Vec<MotorRecord>,
    query: &SelectionQuery,
    candidate_limit: usize,
) -> Result<MotorSelectionResult, InvokeError> {
    let (candidates, dropped) = mechsel_core::shortlist(candidates, candidate_limit);
    if dropped > 0 {
        warn!(dropped, kept = candidates.len(), "candidate list truncated");
    }

    let prompt = prompt::motor_selection_prompt(&candidates, query)?;
    info!(model = invoker.model(), candidates = candidates.len(), "sending motor selection");

    let raw = invoker.generate(ModelRequest::text(prompt)).await?;
    debug!(%raw, "raw model output");

    let result = parse::parse_motor_selection(&raw);
    info!(best_motor_id = ?result.best_motor_id(), "motor selection parsed");
    debug!(reason = ?result.reason(), "motor selection reason");
    Ok(result)
}

/// Ask the model to pick a gear material from the reference table image.
pub async fn select_material(
    invoker: &dyn ModelInvoker,
    query: &MaterialQuery,
    reference: ImageAttachment,
) -> Result<Extracted<MaterialSelectionResult>, InvokeError> {
    let prompt = prompt::material_selection_prompt(query);
    info!(model = invoker.model(), "sending material selection");

    let raw = invoker
        .generate(ModelRequest::with_image(prompt, reference))
        .await?;
    debug!(%raw, "raw model output");

    Ok(parse::parse_material_selection(raw.trim()))
}

/// Read the 15 design inputs off a scanned form.
pub async fn extract_form_fields(
    invoker: &dyn ModelInvoker,
    form: ImageAttachment,
) -> Result<Extracted<ExtractedFormFields>, InvokeError> {
    let prompt = prompt::form_extraction_prompt();
    info!(model = invoker.model(), bytes = form.bytes.len(), "sending form extraction");

    let raw = invoker.generate(ModelRequest::with_image(prompt, form)).await?;
    debug!(%raw, "raw model output");

    Ok(parse::parse_form_fields(raw.trim()))
}
