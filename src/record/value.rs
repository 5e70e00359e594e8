use serde_json::Value;

/// Key under which a value is looked up in a remap table.
///
/// Custom fields store identifiers as strings while the identifier field
/// holds a number, so `"5"` and `5` share the key `5`. Values that cannot
/// act as a reference (null, arrays, objects) have no key.
pub fn remap_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(u8::from(*b).to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Collapse a custom field's value list: one value stands for itself,
/// several become an array.
pub fn flatten_values(values: &[Value]) -> Option<Value> {
    match values {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(Value::Array(many.to_vec())),
    }
}

/// Interpret an identifier value as a store row id.
pub fn parse_record_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
