use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use mechsel_core::fields::form_keys;
use mechsel_core::{
    ExtractedFormFields, Extracted, MaterialQuery, MaterialSelectionResult, MotorSelectionResult,
    SelectionQuery,
};
use mechsel_suggest::{ImageAttachment, ImageKind};

use crate::error::{ApiError, MISSING_INPUT};
use crate::AppState;

/// Name of the multipart field carrying the scanned form.
const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindMotorRequest {
    #[serde(default, alias = "cong_suat_can_tim")]
    pub required_power: Option<Value>,
    #[serde(default, alias = "van_toc_quay_can_tim")]
    pub required_speed: Option<Value>,
}

impl FindMotorRequest {
    /// Both values present, numeric and non-zero after rounding up.
    fn query(&self) -> Option<SelectionQuery> {
        let power = number(self.required_power.as_ref()).ok()??;
        let speed = number(self.required_speed.as_ref()).ok()??;
        SelectionQuery::from_requirements(power, speed)
    }
}

#[derive(Debug, Deserialize)]
pub struct FindMaterialRequest {
    #[serde(default, rename = "sH")]
    pub contact_stress: Option<Value>,
    #[serde(default)]
    pub z: Option<Value>,
    #[serde(default)]
    pub v: Option<Value>,
}

impl FindMaterialRequest {
    fn query(&self) -> Result<MaterialQuery, ApiError> {
        let field = |name: &str, value: Option<&Value>| {
            number(value).map_err(|_| ApiError::InvalidInput(format!("invalid number for '{name}'")))
        };
        Ok(MaterialQuery {
            contact_stress: field("sH", self.contact_stress.as_ref())?,
            z: field("z", self.z.as_ref())?,
            v: field("v", self.v.as_ref())?,
        })
    }
}

/// Absent and null are `None`; numbers and numeric strings are accepted.
fn number(value: Option<&Value>) -> Result<Option<f64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(inner)| inner)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn find_motor(
    State(state): State<AppState>,
    body: Result<Json<FindMotorRequest>, JsonRejection>,
) -> Result<Json<MotorSelectionResult>, ApiError> {
    let request = json_body(body)?;
    let query = request
        .query()
        .ok_or_else(|| ApiError::InvalidInput(MISSING_INPUT.to_string()))?;

    let candidates = state.catalog.find_motors(&query).await?;
    info!(
        required_power = query.required_power,
        required_speed = query.required_speed,
        candidates = candidates.len(),
        "catalog filtered"
    );

    let result = mechsel_suggest::select_motor(
        state.invoker.as_ref(),
        candidates,
        &query,
        state.candidate_limit,
    )
    .await?;
    Ok(Json(result))
}

pub async fn find_material(
    State(state): State<AppState>,
    body: Result<Json<FindMaterialRequest>, JsonRejection>,
) -> Result<Json<Extracted<MaterialSelectionResult>>, ApiError> {
    let query = json_body(body)?.query()?;

    let source = state.reference.as_ref().ok_or_else(|| {
        ApiError::Upstream("reference image location is not configured (IMAGE_URL)".to_string())
    })?;
    let reference = source.fetch().await?;

    let result =
        mechsel_suggest::select_material(state.invoker.as_ref(), &query, reference).await?;
    if let Extracted::Parsed(material) = &result {
        info!(material = ?material.material(), "material selection parsed");
        let missing = material.missing_fields();
        if !missing.is_empty() {
            warn!(?missing, "material answer lacks fields");
        }
    }
    Ok(Json(result))
}

pub async fn extract_form_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractedFormFields>, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::Rejected {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;

    let upload = read_upload(&mut multipart).await?;
    info!(bytes = upload.bytes.len(), kind = ?upload.kind, "form image received");

    let extracted = mechsel_suggest::extract_form_fields(state.invoker.as_ref(), upload).await?;
    let (missing, data) = match extracted {
        Extracted::Parsed(form) => {
            let missing = form.missing_fields();
            if missing.is_empty() {
                return Ok(Json(form));
            }
            (missing, Value::Object(form.as_object().clone()))
        }
        Extracted::Failed(failure) => (form_keys().collect(), json!({ "error": failure.error })),
    };

    warn!(?missing, "form extraction incomplete");
    Err(ApiError::MissingFields {
        fields: missing,
        data,
    })
}

/// Pull the `file` part out of the upload.
async fn read_upload(multipart: &mut Multipart) -> Result<ImageAttachment, ApiError> {
    let rejected = |e: axum::extract::multipart::MultipartError| ApiError::Rejected {
        status: e.status(),
        message: e.body_text(),
    };

    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if field.file_name().map_or(true, str::is_empty) {
            return Err(ApiError::InvalidInput("no file selected".to_string()));
        }
        let mime = field.content_type().map(|s| s.to_string());
        let bytes = field.bytes().await.map_err(rejected)?;
        return Ok(ImageAttachment::from_mime(
            bytes.to_vec(),
            mime.as_deref(),
            ImageKind::Png,
        ));
    }

    Err(ApiError::InvalidInput(
        "no file part in the request".to_string(),
    ))
}
