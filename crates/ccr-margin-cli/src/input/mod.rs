pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Load a calculation input from `--input <file>` or, failing that, stdin.
pub fn load<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_json(path);
    }
    match stdin::read_piped()? {
        Some(body) => serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse {} input from stdin: {}", what, e).into()),
        None => Err(format!("--input <file.json> or stdin required for {}", what).into()),
    }
}
