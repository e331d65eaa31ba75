use colored::Colorize;
use serde_json::Value;

/// Headline figure of each engine, in lookup order. Net IM wins over gross
/// IM so collateral is reflected.
const HEADLINE_KEYS: [&str; 5] = ["ead", "pfe", "var", "net_initial_margin", "initial_margin"];

/// Print just the headline number, for shell pipelines.
///
/// Warnings are counted on stderr so stdout stays a single value.
pub fn print_minimal(value: &Value) {
    let result_obj = super::result_of(value);

    let count = super::warnings_of(value).len();
    if count > 0 {
        eprintln!("{} {} warning(s); use --output json to see them", "note:".yellow(), count);
    }

    if let Value::Object(map) = result_obj {
        if let Some(val) = HEADLINE_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find(|v| !v.is_null())
        {
            println!("{}", format_minimal(val));
            return;
        }

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
