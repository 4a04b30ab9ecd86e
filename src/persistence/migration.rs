use crate::domain::TaskTemplate;
use chrono::Weekday;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// Shape written under the templates key
#[derive(Debug, Serialize)]
pub struct TemplatesBlob<'a> {
    pub task_templates: &'a [TaskTemplate],
}

/// Decode the templates blob, migrating older shapes
///
/// Accepted inputs:
/// 1. `{"task_templates": [...]}` with `recurrence_days` per template
/// 2. the legacy wrapper key `TaskTemplates`
/// 3. legacy single-day templates carrying `day` (name or 0=Sunday..6=Saturday)
///    instead of `recurrence_days`
///
/// Entries that still fail to decode are skipped with a warning.
pub fn decode_templates(raw: &str) -> Result<Vec<TaskTemplate>, serde_json::Error> {
    let root: Value = serde_json::from_str(raw)?;
    let entries = root
        .get("task_templates")
        .or_else(|| root.get("TaskTemplates"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut templates = Vec::with_capacity(entries.len());
    let mut migrated = 0;

    for mut entry in entries {
        if migrate_single_day(&mut entry) {
            migrated += 1;
        }
        match serde_json::from_value::<TaskTemplate>(entry) {
            Ok(template) if !template.is_free_time => templates.push(template),
            Ok(template) => warn!(id = %template.id, "dropping persisted free-time template"),
            Err(e) => warn!(error = %e, "skipping undecodable task template"),
        }
    }

    if migrated > 0 {
        info!(count = migrated, "migrated single-day templates to recurrence sets");
    }

    Ok(templates)
}

/// Rewrite a `day` field into a one-element `recurrence_days` set
fn migrate_single_day(entry: &mut Value) -> bool {
    let Some(object) = entry.as_object_mut() else {
        return false;
    };
    if object.contains_key("recurrence_days") {
        return false;
    }
    let Some(day) = object.remove("day").as_ref().and_then(legacy_weekday) else {
        return false;
    };

    object.insert(
        "recurrence_days".to_string(),
        Value::Array(vec![Value::String(format!("{:?}", day))]),
    );
    true
}

fn legacy_weekday(value: &Value) -> Option<Weekday> {
    match value {
        Value::String(name) => name.parse().ok(),
        // Sunday-first numbering
        Value::Number(n) => match n.as_u64()? {
            0 => Some(Weekday::Sun),
            d @ 1..=6 => Weekday::try_from(d as u8 - 1).ok(),
            _ => None,
        },
        _ => None,
    }
}
