pub mod config;
pub mod fields;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A decoded JSON object as returned by the model, kept verbatim.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

// --- Catalog records ---

/// One motor from the catalog. Unknown catalog fields ride along in `extra`
/// so they reach the prompt unmodified.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MotorRecord {
    #[serde(alias = "_id", deserialize_with = "de_record_id")]
    pub id: String,
    /// Rated power in kW
    #[serde(alias = "cong_suat")]
    pub power: f64,
    /// Rotational speed in RPM
    #[serde(alias = "van_toc_vong_quay")]
    pub speed: f64,
    #[serde(flatten)]
    pub extra: JsonObject,
}

/// Accepts plain string ids, numeric ids and document-store `{"$oid": "..."}` ids.
fn de_record_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Object(ref map) => map
            .get("$oid")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| D::Error::custom(format!("unsupported motor id object: {value}"))),
        other => Err(D::Error::custom(format!("unsupported motor id: {other}"))),
    }
}

// --- Queries ---

/// Minimum requirements for a motor, rounded up to whole kW / RPM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionQuery {
    pub required_power: i64,
    pub required_speed: i64,
}

impl SelectionQuery {
    /// Round both requirements up. Returns `None` when either value is not
    /// finite or rounds to zero.
    pub fn from_requirements(power: f64, speed: f64) -> Option<Self> {
        let required_power = ceil_to_int(power)?;
        let required_speed = ceil_to_int(speed)?;
        if required_power == 0 || required_speed == 0 {
            return None;
        }
        Some(Self {
            required_power,
            required_speed,
        })
    }

    /// Catalog filter: power and speed must both meet the requirement.
    pub fn admits(&self, motor: &MotorRecord) -> bool {
        motor.power >= self.required_power as f64 && motor.speed >= self.required_speed as f64
    }
}

fn ceil_to_int(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    Some(value.ceil() as i64)
}

/// Order candidates closest-speed first (then lowest power, then id) and keep
/// at most `limit`. Returns the kept records and how many were dropped.
pub fn shortlist(mut motors: Vec<MotorRecord>, limit: usize) -> (Vec<MotorRecord>, usize) {
    motors.sort_by(|a, b| {
        a.speed
            .total_cmp(&b.speed)
            .then(a.power.total_cmp(&b.power))
            .then_with(|| a.id.cmp(&b.id))
    });
    let dropped = motors.len().saturating_sub(limit);
    motors.truncate(limit);
    (motors, dropped)
}

/// Inputs of the gear material task. Any of them may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialQuery {
    /// Contact stress
    #[serde(rename = "sH")]
    pub contact_stress: Option<f64>,
    /// Tooth count
    pub z: Option<f64>,
    /// Chain speed
    pub v: Option<f64>,
}

// --- Results ---

/// Diagnostic returned in place of a result when no JSON object could be
/// decoded from the model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub error: String,
}

impl ExtractionFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.error)
    }
}

/// Outcome of one extraction pass for the material and form tasks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extracted<T> {
    Parsed(T),
    Failed(ExtractionFailure),
}

impl<T> Extracted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        match self {
            Extracted::Parsed(value) => Extracted::Parsed(f(value)),
            Extracted::Failed(failure) => Extracted::Failed(failure),
        }
    }
}

/// `{best_motor_id, reason}` as decoded from the model, unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotorSelectionResult(JsonObject);

impl MotorSelectionResult {
    pub fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// Failure value: null id, locally produced reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        let mut object = JsonObject::new();
        object.insert("best_motor_id".into(), serde_json::Value::Null);
        object.insert("reason".into(), serde_json::Value::String(reason.into()));
        Self(object)
    }

    pub fn best_motor_id(&self) -> Option<&str> {
        self.0.get("best_motor_id").and_then(|v| v.as_str())
    }

    pub fn reason(&self) -> Option<&str> {
        self.0.get("reason").and_then(|v| v.as_str())
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

/// `{vat_lieu, nhiet_luyen, do_ran_be_mat, giai_thich}` as decoded from the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialSelectionResult(JsonObject);

impl MaterialSelectionResult {
    pub fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// Material name
    pub fn material(&self) -> Option<&str> {
        self.text(fields::MATERIAL_NAME)
    }

    /// Material keys that are absent or not strings.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fields::MATERIAL_FIELDS
            .iter()
            .copied()
            .filter(|key| self.text(key).is_none())
            .collect()
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

/// Whatever mapping the model produced for the scanned form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedFormFields(JsonObject);

impl ExtractedFormFields {
    pub fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// Required keys that are absent or null, in canonical field order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        fields::FORM_FIELDS
            .iter()
            .map(|f| f.key)
            .filter(|key| self.0.get(*key).map_or(true, |v| v.is_null()))
            .collect()
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }
}

// --- Storage ---

/// Resolve the service data directory (~/.mechsel/).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mechsel")
}

/// Catalog file used when no catalog location is configured.
pub fn default_catalog_path() -> PathBuf {
    data_dir().join("catalog.json")
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogFileError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{}: invalid catalog JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read a catalog file: a JSON array of motor records.
pub fn read_catalog(path: &Path) -> Result<Vec<MotorRecord>, CatalogFileError> {
    let raw = fs::read_to_string(path).map_err(|source| CatalogFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&raw).map_err(|source| CatalogFileError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse a JSON array of motor records.
///
/// Only a document that is not an array is an error. Entries that do not
/// decode as a motor (string power, missing speed, both `id` and `_id`) are
/// skipped so one bad record cannot take the whole catalog down.
pub fn parse_catalog(raw: &str) -> Result<Vec<MotorRecord>, serde_json::Error> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(raw)?;
    let motors = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(motor) => Some(motor),
            Err(e) => {
                warn!(index, error = %e, "skipping invalid catalog record");
                None
            }
        })
        .collect();
    Ok(motors)
}

/// Write a catalog file.
///
/// Uses atomic write (temp file + rename) so a server re-reading the catalog
/// never sees a half-written file.
pub fn write_catalog(path: &Path, motors: &[MotorRecord]) -> Result<(), CatalogFileError> {
    let io_err = |source| CatalogFileError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(motors).map_err(|source| CatalogFileError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "catalog.json".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    fs::write(&tmp, json).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
