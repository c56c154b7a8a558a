use mechsel_core::fields::{self, FORM_FIELDS};
use mechsel_core::{MaterialQuery, MotorRecord, SelectionQuery};

/// Pretty JSON for the candidate list, the only form catalog data takes inside
/// a prompt. Identical records always render identically.
pub fn serialize_candidates(candidates: &[MotorRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(candidates)
}

fn render_input(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "null".to_string(),
    }
}

pub fn motor_selection_prompt(
    candidates: &[MotorRecord],
    query: &SelectionQuery,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "You are an expert in selecting electric motors. Find the most suitable motor \
from the list below.\n\n\
### Motor list:\n\
{candidates}\n\n\
### Selection criteria:\n\
{criteria}\n\n\
### Required values:\n\
- Minimum power: {power} kW\n\
- Rotational speed: {speed} RPM\n\n\
### Output requirements:\n\
- Return exactly one **id**: the id of the most suitable motor.\n\
- Explain why that motor was chosen. If you can, point to documentation and links \
where the user can learn more about it, inside the reason text.\n\
- The answer MUST be **exact** JSON, with no explanation outside it.\n\n\
### Required JSON format (mandatory):\n\
```json\n\
{{\n\
    \"best_motor_id\": \"id of the most suitable motor\",\n\
    \"reason\": \"why this motor was chosen\"\n\
}}\n\
```\n\n\
Output ONLY the JSON object, nothing else.",
        candidates = serialize_candidates(candidates)?,
        criteria = fields::MOTOR_CRITERIA,
        power = query.required_power,
        speed = query.required_speed,
    ))
}

pub fn material_selection_prompt(query: &MaterialQuery) -> String {
    format!(
        "The attached image contains a gear material table. Using only that table, choose \
the single most suitable material and explain the choice inside the JSON, based on these \
conditions:\n\
{criteria}\n\n\
### Inputs:\n\
- Contact stress (sH): {sh}\n\
- Gear tooth count (z): {z}\n\
- Chain speed (v): {v}\n\n\
Return the result as **JSON** with these fields:\n\
- `\"{name}\"`: material name\n\
- `\"{heat}\"`: heat treatment\n\
- `\"{hardness}\"`: surface hardness\n\
- `\"{why}\"`: why this material was chosen\n\n\
Example:\n\
```json\n\
{{\n\
    \"{name}\": \"Thép 45\",\n\
    \"{heat}\": \"Tôi cải thiện\",\n\
    \"{hardness}\": \"HB170...210\",\n\
    \"{why}\": \"Vì này phù hợp nhất\"\n\
}}\n\
```\n\n\
Output ONLY the JSON object, nothing else.",
        criteria = fields::MATERIAL_CRITERIA,
        sh = render_input(query.contact_stress),
        z = render_input(query.z),
        v = render_input(query.v),
        name = fields::MATERIAL_NAME,
        heat = fields::HEAT_TREATMENT,
        hardness = fields::SURFACE_HARDNESS,
        why = fields::RATIONALE,
    )
}

pub fn form_extraction_prompt() -> String {
    let mut labels = String::new();
    let mut skeleton = String::from("{\n");
    for (i, field) in FORM_FIELDS.iter().enumerate() {
        labels.push_str("- ");
        labels.push_str(field.key);
        labels.push_str(": ");
        labels.push_str(field.label);
        labels.push_str(" (printed as \"");
        labels.push_str(field.printed);
        labels.push_str("\")\n");

        skeleton.push_str("    \"");
        skeleton.push_str(field.key);
        skeleton.push_str("\": {value}");
        if i + 1 < FORM_FIELDS.len() {
            skeleton.push(',');
        }
        skeleton.push('\n');
    }
    skeleton.push('}');

    format!(
        "You are an expert at extracting data from engineering forms. The input image is a \
form with Vietnamese labels and numeric input boxes.\n\n\
Read the image and extract the following technical parameters (where present), and \
return them as exact JSON with the structure shown below:\n\n\
{labels}\n\
### Required output:\n\
```json\n\
{skeleton}\n\
```\n\
(Return only the JSON, no description. Use null for a field you cannot read.)"
    )
}
