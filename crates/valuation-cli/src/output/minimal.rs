use serde_json::{Map, Value};

use super::plain_text;

/// Key answer fields in priority order.
const PRIORITY_KEYS: [&str; 4] = [
    "intrinsic_value_per_share",
    "upside_percent",
    "enterprise_value",
    "debt_financing_pct",
];

/// Print just the key answer value from the output.
///
/// DCF and report results yield intrinsic value per share; an EV history
/// yields the latest year's enterprise value.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match key_answer(result) {
        Some(answer) => println!("{}", answer),
        None => println!("{}", plain_text(result)),
    }
}

fn key_answer(result: &Value) -> Option<String> {
    match result {
        Value::Array(arr) => arr.last().and_then(key_answer),
        Value::Object(map) => match map.get("dcf") {
            Some(Value::Object(dcf)) => priority_field(dcf),
            _ => priority_field(map),
        },
        _ => None,
    }
}

fn priority_field(map: &Map<String, Value>) -> Option<String> {
    PRIORITY_KEYS
        .iter()
        .filter_map(|key| map.get(*key))
        .find(|val| !val.is_null())
        .map(plain_text)
}
