use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a JSON or YAML document as a generic `serde_json::Value`.
///
/// `.yaml` / `.yml` files are parsed as YAML; anything else as JSON.
pub fn read_document(path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    parse_document(&canonical, &contents)
}

fn parse_document(path: &Path, contents: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: Value = if is_yaml {
        serde_yaml::from_str(contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    } else {
        serde_json::from_str(contents)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?
    };
    Ok(value)
}

/// Resolve a relative path against the working directory and check that it names an existing file.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_by_extension() {
        let doc = "years: []\nassumptions:\n  growthRate: 4.5\n";
        let value = parse_document(Path::new("data.yaml"), doc).unwrap();
        assert_eq!(value["assumptions"]["growthRate"], 4.5);
    }

    #[test]
    fn test_json_by_default() {
        let value = parse_document(Path::new("data.json"), "[]").unwrap();
        assert!(value.as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        assert!(read_document("definitely/not/here.json").is_err());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = std::env::temp_dir();
        let err = resolve_path(dir.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Not a file"), "got {err}");
    }

    #[test]
    fn test_relative_path_resolves_against_cwd() {
        let resolved = resolve_path("Cargo.toml").unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, std::env::current_dir().unwrap().join("Cargo.toml"));
    }
}
