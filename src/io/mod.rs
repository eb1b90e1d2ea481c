use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Path argument that means "read standard input"
pub const STDIN_PATH: &str = "-";

pub fn read_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)?;
    Ok(())
}

pub fn file_exists(path: &Path) -> bool {
    path.exists() && path.is_file()
}

/// Read a whole file, or stdin when the path is `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new(STDIN_PATH) {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        return Ok(buf);
    }
    read_file(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Deserialize a JSON document from a file or stdin
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

pub fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_read_json_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("req.json");
        write_file(&path, r#"{"a": 1.5}"#).unwrap();
        let value: BTreeMap<String, f64> = read_json(&path).unwrap();
        assert_eq!(value["a"], 1.5);
        assert!(file_exists(&path));
    }

    #[test]
    fn test_invalid_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        write_file(&path, "{not json").unwrap();
        let err = read_json::<BTreeMap<String, f64>>(&path).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_input(Path::new("/definitely/not/here.json")).is_err());
    }
}
