//! JSON merge helper for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base, recursively overriding objects.
///
/// Scalars and arrays in the overlay replace the base value outright.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_key_by_key() {
        let mut base = json!({ "memory": { "recall_k": 5, "seed_text": "seed" } });
        merge_json_values(&mut base, &json!({ "memory": { "recall_k": 3 } }));
        assert_eq!(base, json!({ "memory": { "recall_k": 3, "seed_text": "seed" } }));
    }
}
