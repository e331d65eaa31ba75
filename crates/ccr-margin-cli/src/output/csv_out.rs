use serde_json::{Map, Value};
use std::io;

/// Breakdowns in the order they are preferred for row-per-record CSV.
const DETAIL_KEYS: [&str; 5] = [
    "trade_details",
    "per_trade_contribution",
    "per_position_contribution",
    "risk_factor_contributions",
    "hedging_sets",
];

/// Write output as CSV to stdout.
///
/// When the result carries a per-trade / per-position / per-risk-factor
/// breakdown, that becomes one row per record; otherwise the scalar
/// fields are written as `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = super::result_of(value);

    match result {
        Value::Object(map) => match detail_rows(map) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        _ => {
            let _ = wtr.write_record([&format_csv_value(result)]);
        }
    }

    let _ = wtr.flush();
}

fn detail_rows(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    DETAIL_KEYS.iter().find_map(|k| match map.get(*k) {
        Some(Value::Array(rows)) if !rows.is_empty() => Some(rows),
        _ => None,
    })
}

fn write_fields(wtr: &mut csv::Writer<io::StdoutLock<'_>>, map: &Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        if let Value::Object(inner) = val {
            // Flatten keyed breakdowns such as per-asset-class add-ons
            for (sub, v) in inner {
                let name = format!("{}.{}", key, sub);
                let _ = wtr.write_record([name.as_str(), &format_csv_value(v)]);
            }
        } else {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
        }
    }
}

fn write_rows(wtr: &mut csv::Writer<io::StdoutLock<'_>>, rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for item in rows {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
        return;
    };

    let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
    let _ = wtr.write_record(&headers);
    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                .collect();
            let _ = wtr.write_record(&row);
        }
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
