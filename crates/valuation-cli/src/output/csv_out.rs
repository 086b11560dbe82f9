use serde_json::{Map, Value};
use std::io;

use super::plain_text;

/// Write output as CSV to stdout.
///
/// An array result becomes one row per record. An object result becomes
/// field/value pairs, with nested objects flattened to dotted field names.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(arr) => write_array_csv(&mut wtr, arr),
        Value::Object(map) => {
            let _ = wtr.write_record(["field", "value"]);
            write_flattened(&mut wtr, "", map);
        }
        _ => {
            let _ = wtr.write_record([plain_text(result)]);
        }
    }

    let _ = wtr.flush();
}

fn write_flattened<W: io::Write>(wtr: &mut csv::Writer<W>, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let field = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => write_flattened(wtr, &field, inner),
            _ => {
                let _ = wtr.write_record([field.as_str(), &plain_text(val)]);
            }
        }
    }
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    let Some(Value::Object(first)) = arr.first() else {
        for item in arr {
            let _ = wtr.write_record([plain_text(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);

    for item in arr {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(plain_text).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}
