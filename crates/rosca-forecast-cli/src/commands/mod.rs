pub mod forecast;
pub mod scenarios;
pub mod summary;
pub mod tools;
pub mod validate;

use serde_json::Value;

/// Replace an envelope's `result` with one of its fields, keeping warnings
/// and methodology but dropping the echoed assumptions.
pub(crate) fn narrow_result(mut value: Value, key: &str) -> Value {
    if let Some(envelope) = value.as_object_mut() {
        let selected = envelope
            .get_mut("result")
            .and_then(|r| r.get_mut(key))
            .map(Value::take)
            .unwrap_or(Value::Null);
        envelope.insert("result".into(), selected);
        envelope.remove("assumptions");
    }
    value
}
