use serde_json::Value;

/// Overlay `overlay` onto `base`.
///
/// Objects merge key by key, recursively. Any other value, arrays included, replaces
/// what `base` holds.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Merge values in order, the last one taking precedence
pub fn merge_all<'a>(values: impl IntoIterator<Item = &'a Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Default::default()), |mut merged, value| {
            deep_merge(&mut merged, value);
            merged
        })
}
