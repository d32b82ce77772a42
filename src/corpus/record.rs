//! Flattening of structured JSON records into a `field -> text` map.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::enrich::EnrichmentLimits;
use super::error::RecordError;

const TITLE_KEYS: &[&str] = &["title", "name"];
const OBJECTIVE_KEYS: &[&str] = &["objective", "summary", "description"];
const LEVEL_KEYS: &[&str] = &["level", "grade"];
const DURATION_KEYS: &[&str] = &["duration_minutes", "duration"];
const CATEGORY_KEYS: &[&str] = &["category", "subject"];
const NOTES_KEYS: &[&str] = &["notes", "observations", "adaptations"];
const TASK_TEXT_KEYS: &[&str] = &["description", "name", "title"];

/// Resolves a record into the canonical fields used for enrichment and boosting:
/// `title`, `objective`, `level`, `duration`, `category`, `resources`, `stages`, `notes`.
///
/// Only the first `max_resources` resources and `max_stages` stages (each with up
/// to `max_tasks_per_stage` tasks) are kept.
pub fn flatten_record(
    value: &Value,
    limits: &EnrichmentLimits,
) -> Result<BTreeMap<String, String>, RecordError> {
    let object = value.as_object().ok_or(RecordError::NotAnObject)?;

    let mut fields = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            fields.insert(key.to_string(), value);
        }
    };

    put("title", first_scalar(object, TITLE_KEYS));
    put("objective", first_scalar(object, OBJECTIVE_KEYS));
    put("level", first_scalar(object, LEVEL_KEYS));
    put("duration", first_scalar(object, DURATION_KEYS));
    put("category", first_scalar(object, CATEGORY_KEYS));
    put("notes", first_scalar(object, NOTES_KEYS));
    put("resources", resources(object, limits.max_resources));
    put("stages", stages(object, limits));

    let has_text = ["title", "objective", "notes", "stages", "resources"]
        .iter()
        .any(|key| fields.contains_key(*key));
    if !has_text {
        return Err(RecordError::NoTextualFields);
    }

    Ok(fields)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn first_scalar(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .filter_map(scalar_text)
        .find(|text| !text.is_empty())
}

fn resources(object: &Map<String, Value>, max: usize) -> Option<String> {
    let items: Vec<String> = object
        .get("resources")?
        .as_array()?
        .iter()
        .filter_map(scalar_text)
        .filter(|s| !s.is_empty())
        .take(max)
        .collect();
    (!items.is_empty()).then(|| items.join(", "))
}

fn stages(object: &Map<String, Value>, limits: &EnrichmentLimits) -> Option<String> {
    let rendered: Vec<String> = object
        .get("stages")?
        .as_array()?
        .iter()
        .take(limits.max_stages)
        .filter_map(|stage| render_stage(stage, limits.max_tasks_per_stage))
        .collect();
    (!rendered.is_empty()).then(|| rendered.join(" | "))
}

fn render_stage(stage: &Value, max_tasks: usize) -> Option<String> {
    let stage = match stage {
        Value::Object(map) => map,
        other => return scalar_text(other).filter(|s| !s.is_empty()),
    };

    let name = first_scalar(stage, &["name", "title"]).unwrap_or_default();
    let tasks: Vec<String> = stage
        .get("tasks")
        .and_then(Value::as_array)
        .map(|tasks| {
            tasks
                .iter()
                .filter_map(|task| match task {
                    Value::Object(map) => first_scalar(map, TASK_TEXT_KEYS),
                    other => scalar_text(other),
                })
                .filter(|s| !s.is_empty())
                .take(max_tasks)
                .collect()
        })
        .unwrap_or_default();

    match (name.is_empty(), tasks.is_empty()) {
        (true, true) => None,
        (false, true) => Some(name),
        (true, false) => Some(tasks.join("; ")),
        (false, false) => Some(format!("{name} ({})", tasks.join("; "))),
    }
}
