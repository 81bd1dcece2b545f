pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Typed input from `--input <file>` or piped stdin, in that order.
/// `None` when neither is present and the command should fall back to flags.
pub fn load<T: DeserializeOwned>(path: Option<&str>) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        log::debug!("reading input from {path}");
        return Ok(Some(file::read_json(path)?));
    }
    match stdin::read_stdin()? {
        Some(text) => {
            log::debug!("reading input from stdin ({} bytes)", text.len());
            let value = serde_json::from_str(&text).map_err(|e| format!("Invalid input on stdin: {e}"))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
