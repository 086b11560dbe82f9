use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::plain_text;

/// Format a computation envelope as tables using the tabled crate.
///
/// Scalar fields of the result go into a Field/Value table; nested arrays of
/// records (EV history, projections, KPIs) each get their own titled table.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_section(None, result);
                print_footer(map);
            } else {
                print_section(None, value);
            }
        }
        Value::Array(_) => print_section(None, value),
        _ => println!("{}", plain_text(value)),
    }
}

fn print_section(title: Option<&str>, value: &Value) {
    match value {
        Value::Object(map) => {
            let scalars: Vec<(&String, &Value)> =
                map.iter().filter(|(_, v)| !is_container(v)).collect();
            if !scalars.is_empty() {
                print_title(title);
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in scalars {
                    builder.push_record([key.as_str(), &plain_text(val)]);
                }
                println!("{}", Table::from(builder));
            }
            for (key, val) in map.iter().filter(|(_, v)| is_container(v)) {
                print_section(Some(key), val);
            }
        }
        Value::Array(arr) => {
            print_title(title);
            print_array_table(arr);
        }
        _ => println!("{}", plain_text(value)),
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(plain_text).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", plain_text(item));
        }
    }
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_title(title: Option<&str>) {
    if let Some(t) = title {
        println!("\n{}", t);
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
