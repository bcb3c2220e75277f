/// Canvas LMS access on behalf of a user
mod client;
mod error;
mod types;

pub use client::{CanvasClient, CanvasConfig, CANVAS_BASE_URL};
pub use error::CanvasError;
pub use types::PlannerRange;

use serde_json::Value;

/// Keeps only the named top-level keys of each object in `value`.
///
/// `fields` is a comma-separated list such as `"id,name,due_at"`. An empty or
/// missing list returns `value` unchanged. Arrays are filtered element-wise;
/// scalars are passed through.
pub fn filter_fields(value: Value, fields: Option<&str>) -> Value {
    let wanted: Vec<&str> = fields
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();

    if wanted.is_empty() {
        return value;
    }

    retain_keys(value, &wanted)
}

fn retain_keys(value: Value, wanted: &[&str]) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| retain_keys(item, wanted))
                .collect(),
        ),
        Value::Object(mut map) => {
            map.retain(|key, _| wanted.contains(&key.as_str()));
            Value::Object(map)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_fields_on_array() {
        let value = json!([
            {"id": 1, "name": "A", "secret": true},
            {"id": 2, "name": "B"}
        ]);

        assert_eq!(
            filter_fields(value, Some("id, name")),
            json!([{"id": 1, "name": "A"}, {"id": 2, "name": "B"}])
        );
    }

    #[test]
    fn test_filter_fields_without_list_is_identity() {
        let value = json!({"id": 1, "name": "A"});
        assert_eq!(filter_fields(value.clone(), None), value);
        assert_eq!(filter_fields(value.clone(), Some(" , ")), value);
    }

    #[test]
    fn test_filter_fields_passes_scalars() {
        assert_eq!(filter_fields(json!(3), Some("id")), json!(3));
    }
}
