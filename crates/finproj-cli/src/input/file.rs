use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON input file into a typed input.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let resolved = resolve_path(Path::new(path))?;
    let contents = fs::read_to_string(&resolved)
        .map_err(|e| format!("Failed to read '{}': {}", resolved.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("Invalid input in '{}': {}", resolved.display(), e).into())
}

fn resolve_path(path: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let resolved = fs::canonicalize(path)
        .map_err(|e| format!("Input file '{}' not found: {}", path.display(), e))?;
    if !resolved.is_file() {
        return Err(format!("Input path '{}' is not a file", resolved.display()).into());
    }
    Ok(resolved)
}
