use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Render an engine envelope as tables: headline figures first, then one
/// table per breakdown (per-trade detail, hedging sets, buckets, ...).
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(Value::Object(result)) => print_envelope(result, value),
            _ => print_fields(map),
        },
        Value::Array(arr) => print_rows(arr),
        _ => println!("{}", value),
    }
}

fn print_envelope(result: &Map<String, Value>, envelope: &Value) {
    print_fields(result);

    for (key, val) in result {
        match val {
            Value::Array(rows) if rows.iter().any(Value::is_object) => {
                println!("\n{}", heading(key));
                print_rows(rows);
            }
            Value::Object(inner) => {
                println!("\n{}", heading(key));
                print_fields(inner);
            }
            _ => {}
        }
    }

    let warnings = super::warnings_of(envelope);
    if !warnings.is_empty() {
        println!("\n{}", "Warnings:".yellow().bold());
        for w in warnings {
            println!("  - {}", w);
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
    if let Some(framework) = envelope
        .get("metadata")
        .and_then(|m| m.get("framework"))
        .and_then(Value::as_str)
    {
        println!("Parameters:  {}", framework);
    }
}

/// Field/value table of the scalar entries; nested breakdowns are skipped.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if is_breakdown(val) {
            continue;
        }
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(empty)");
        return;
    }

    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            println!("{}", format_value(item));
        }
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }
    println!("{}", Table::from(builder));
}

fn is_breakdown(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(rows) => rows.iter().any(Value::is_object),
        _ => false,
    }
}

fn heading(key: &str) -> String {
    key.replace('_', " ").to_uppercase().bold().to_string()
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
