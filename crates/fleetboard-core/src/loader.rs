//! Contract snapshot loader
//!
//! Accepts three layouts:
//! - a JSON array of contract objects
//! - a backend response envelope `{ "data": [...], "error": null }`
//! - JSON Lines, one contract object per line
//!
//! Records that fail to deserialize are skipped and reported; a file is
//! only rejected when it cannot be read or yields nothing but errors.

use crate::error::{CoreError, LoadError, LoadReport};
use crate::models::ContractRecord;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

const SOURCE: &str = "contracts";

/// Records plus what went wrong reading them
#[derive(Debug, Default)]
pub struct LoadedContracts {
    pub records: Vec<ContractRecord>,
    pub report: LoadReport,
}

/// Loader for contract snapshot files
#[derive(Debug, Clone, Default)]
pub struct ContractLoader;

impl ContractLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a snapshot file
    pub fn load(&self, path: &Path) -> Result<LoadedContracts, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                CoreError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let loaded = self.parse_str(&content, path)?;
        debug!(
            path = %path.display(),
            loaded = loaded.report.records_loaded,
            skipped = loaded.report.records_skipped,
            "Loaded contract snapshot"
        );
        Ok(loaded)
    }

    /// Load with graceful degradation, recording failures in `report`
    pub fn load_graceful(&self, path: &Path, report: &mut LoadReport) -> Vec<ContractRecord> {
        match self.load(path) {
            Ok(loaded) => {
                report.merge(loaded.report);
                loaded.records
            }
            Err(e) => {
                report.add_error(LoadError::from_core_error(SOURCE, &e));
                Vec::new()
            }
        }
    }

    /// Parse snapshot content; `path` is only used in messages
    pub fn parse_str(&self, content: &str, path: &Path) -> Result<LoadedContracts, CoreError> {
        let trimmed = content.trim_start();
        let mut loaded = LoadedContracts::default();

        if trimmed.is_empty() {
            loaded.report.add_warning(SOURCE, format!("{} is empty", path.display()));
            return Ok(loaded);
        }

        if trimmed.starts_with('[') {
            let items: Vec<Value> = serde_json::from_str(content).map_err(|e| json_error(path, e))?;
            self.collect_values(items, &mut loaded);
        } else {
            match serde_json::from_str::<Value>(content) {
                Ok(Value::Object(mut object)) if object.contains_key("data") => {
                    if let Some(error) = object.get("error").filter(|e| !e.is_null()) {
                        loaded.report.add_error(
                            LoadError::error(SOURCE, format!("Response carries an error: {}", error))
                                .with_suggestion("The query behind this snapshot failed; re-export it before trusting totals"),
                        );
                    }
                    match object.remove("data") {
                        Some(Value::Array(items)) => self.collect_values(items, &mut loaded),
                        Some(Value::Null) | None => {}
                        Some(other) => self.collect_values(vec![other], &mut loaded),
                    }
                }
                // A single object is a one-line JSONL file
                Ok(value @ Value::Object(_)) => self.collect_values(vec![value], &mut loaded),
                Ok(_) | Err(_) => self.parse_jsonl(content, path, &mut loaded)?,
            }
        }

        warn_duplicate_ids(&mut loaded);
        Ok(loaded)
    }

    fn parse_jsonl(&self, content: &str, path: &Path, loaded: &mut LoadedContracts) -> Result<(), CoreError> {
        let mut first_error = None;

        for (idx, line) in content.lines().enumerate() {
            let line_number = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<ContractRecord>(line) {
                Ok(record) => self.accept(record, format!("line {}", line_number), loaded),
                Err(e) => {
                    let error = CoreError::JsonlParse {
                        path: path.to_path_buf(),
                        line_number,
                        message: e.to_string(),
                    };
                    warn!(line = line_number, error = %e, "Skipping malformed contract line");
                    loaded.report.add_warning(SOURCE, error.to_string());
                    loaded.report.records_skipped += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) if loaded.records.is_empty() => Err(error),
            _ => Ok(()),
        }
    }

    fn collect_values(&self, items: Vec<Value>, loaded: &mut LoadedContracts) {
        for (idx, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<ContractRecord>(item) {
                Ok(record) => self.accept(record, format!("record {}", idx), loaded),
                Err(e) => {
                    warn!(index = idx, error = %e, "Skipping malformed contract record");
                    loaded
                        .report
                        .add_warning(SOURCE, format!("record {}: {}", idx, e));
                    loaded.report.records_skipped += 1;
                }
            }
        }
    }

    fn accept(&self, record: ContractRecord, location: String, loaded: &mut LoadedContracts) {
        if record.id.is_empty() {
            loaded
                .report
                .add_warning(SOURCE, format!("{}: contract without id skipped", location));
            loaded.report.records_skipped += 1;
            return;
        }
        loaded.records.push(record);
        loaded.report.records_loaded += 1;
    }
}

fn json_error(path: &Path, e: serde_json::Error) -> CoreError {
    CoreError::JsonParse {
        path: path.to_path_buf(),
        message: e.to_string(),
        source: e,
    }
}

/// Duplicates are kept; lookups by ID return the first one
fn warn_duplicate_ids(loaded: &mut LoadedContracts) {
    let mut seen = HashSet::new();
    let duplicates: Vec<String> = loaded
        .records
        .iter()
        .filter(|r| !seen.insert(r.id.as_str()))
        .map(|r| r.id.to_string())
        .collect();

    for id in duplicates {
        loaded.report.add_error(
            LoadError::warning(SOURCE, format!("Duplicate contract id {}", id))
                .with_suggestion("Performance lookups use the first record with this id"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(content: &str) -> Result<LoadedContracts, CoreError> {
        ContractLoader::new().parse_str(content, Path::new("test.json"))
    }

    #[test]
    fn test_parse_array() {
        let loaded = parse(
            r#"[
                {"id": "c-1", "status": "active", "contract_amount": 1200},
                {"id": "c-2", "status": "expired", "monthly_amount": "99.5"}
            ]"#,
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.records[1].monthly(), 99.5);
        assert_eq!(loaded.report.records_loaded, 2);
        assert!(!loaded.report.has_errors());
    }

    #[test]
    fn test_parse_envelope() {
        let loaded = parse(r#"{"data": [{"id": "c-1", "status": "active"}], "error": null}"#).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert!(!loaded.report.has_errors());
    }

    #[test]
    fn test_envelope_error_is_reported() {
        let loaded = parse(r#"{"data": null, "error": {"message": "permission denied"}}"#).unwrap();
        assert!(loaded.records.is_empty());
        assert_eq!(loaded.report.error_count(), (0, 1, 0));
        assert!(loaded.report.errors[0].suggestion.is_some());
        assert!(!loaded.report.has_fatal_errors());
    }

    #[test]
    fn test_parse_jsonl_skips_bad_lines() {
        let loaded = parse(
            "{\"id\": \"c-1\", \"status\": \"active\"}\n\nnot json\n{\"id\": \"c-2\", \"status\": \"draft\"}\n",
        )
        .unwrap();

        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.report.records_skipped, 1);
        let warning = loaded.report.warnings().next().unwrap();
        assert!(warning.message.contains("line 3"));
    }

    #[test]
    fn test_all_bad_jsonl_is_an_error() {
        let result = parse("garbage\nmore garbage\n");
        assert!(matches!(
            result,
            Err(CoreError::JsonlParse { line_number: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_array_is_an_error() {
        assert!(matches!(parse("[{\"id\": "), Err(CoreError::JsonParse { .. })));
    }

    #[test]
    fn test_records_without_id_skipped() {
        let loaded = parse(r#"[{"status": "active"}, {"id": "", "status": "active"}, {"id": "ok"}]"#).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.report.records_skipped, 2);
    }

    #[test]
    fn test_duplicate_ids_warned() {
        let loaded = parse(r#"[{"id": "a"}, {"id": "a"}]"#).unwrap();
        assert_eq!(loaded.records.len(), 2);
        let warning = loaded.report.warnings().next().unwrap();
        assert!(warning.message.contains("Duplicate contract id a"));
        assert!(warning.suggestion.is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let result = ContractLoader::new().load(Path::new("/nonexistent/contracts.json"));
        assert!(matches!(result, Err(CoreError::FileNotFound { .. })));

        let mut report = LoadReport::new();
        let records =
            ContractLoader::new().load_graceful(Path::new("/nonexistent/contracts.json"), &mut report);
        assert!(records.is_empty());
        assert!(report.has_fatal_errors());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"[{{"id": "c-1", "status": "active"}}]"#).unwrap();

        let loaded = ContractLoader::new().load(file.path()).unwrap();
        assert_eq!(loaded.records.len(), 1);
    }
}
