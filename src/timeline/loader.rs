//! Record file loader.
//!
//! Accepts either a JSON array of records or JSON Lines (one record per line).
//! Unparseable lines in a JSONL file are skipped with a warning.

use super::types::Record;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record array in {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_records(path: &Path) -> Result<Vec<Record>, LoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Loaded {} records from {:?}", records.len(), path);
    Ok(records)
}

pub fn parse_records(contents: &str) -> Result<Vec<Record>, serde_json::Error> {
    if contents.trim_start().starts_with('[') {
        return serde_json::from_str(contents);
    }
    let mut records = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!("Skipping line {}: {}", line_no + 1, e),
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let json = r#"[
            {"id": 1, "timestamp": 1000, "display": "a", "project": "p", "rating": null, "note": null},
            {"id": 2, "timestamp": 2000, "display": "b"}
        ]"#;
        let records = parse_records(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].project, None);
    }

    #[test]
    fn jsonl_skips_bad_lines() {
        let jsonl = "{\"id\":1,\"timestamp\":1,\"display\":\"ok\"}\n\nnot json\n{\"id\":2,\"timestamp\":2,\"display\":\"ok\",\"rating\":7}\n{\"id\":3,\"timestamp\":3,\"display\":\"ok\"}\n";
        let ids: Vec<i64> = parse_records(jsonl).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn bad_array_is_an_error() {
        assert!(parse_records("[{\"id\": \"x\"}]").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_records(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
