use serde_json::Value;

/// Print just the headline value from the output.
///
/// Looks for well-known result fields in order of priority (descending into
/// `totals` when present), then falls back to the first field.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "lifetime_profit",
        "profit",
        "most_profitable",
        "allocated_total",
        "nii",
        "total_loss",
        "valid",
    ];

    let candidates = [result_obj.get("totals"), Some(result_obj)];
    for candidate in candidates.into_iter().flatten() {
        if let Value::Object(map) = candidate {
            for key in &priority_keys {
                if let Some(val) = map.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
        }
    }

    if let Value::Object(map) = result_obj {
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
