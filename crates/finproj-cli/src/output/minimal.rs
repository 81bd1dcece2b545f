use serde_json::Value;

/// Headline field of each command, in priority order.
const HEADLINE_KEYS: [&str; 8] = [
    "payment",
    "ending_value",
    "npv",
    "irr",
    "base_value",
    "equity_multiple",
    "payback_period",
    "dscr",
];

/// Print just the headline answer: the payment, ending value, NPV, IRR or
/// score, falling back to the first field of the result.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let Value::Object(map) = result else {
        println!("{}", format_minimal(result));
        return;
    };

    // Scores read best as "85 B"
    if let (Some(points), Some(grade)) = (map.get("points"), map.get("grade")) {
        println!("{} {}", format_minimal(points), format_minimal(grade));
        return;
    }

    if let Some(val) = HEADLINE_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
    {
        println!("{}", format_minimal(val));
        return;
    }

    if let Some((key, val)) = map.iter().next() {
        println!("{}: {}", key, format_minimal(val));
    }
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
