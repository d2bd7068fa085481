//! Error types for fleetboard-core
//!
//! Analytics never fail on data: bad rows are skipped and reported through
//! [`LoadReport`], missing values zero out. `CoreError` covers the few
//! operations that can genuinely fail.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for fleetboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed JSONL line {line_number} in {path}: {message}")]
    JsonlParse {
        path: PathBuf,
        line_number: usize,
        message: String,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ===================
    // Engine Errors
    // ===================
    #[error("Contract {contract_id} not found")]
    ContractNotFound { contract_id: String },

    #[error("Invalid filter on '{field}': {reason}")]
    InvalidFilter { field: String, reason: String },

    #[error("Export format not supported: {format}")]
    UnsupportedExport { format: String },
}

/// Severity level for errors during load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Record skipped, the rest of the snapshot is usable
    Warning,
    /// Significant but not fatal
    Error,
    /// Cannot continue
    Fatal,
}

/// Individual error entry in load report
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create user-friendly error from CoreError with context-aware suggestions
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let source = source.into();
        let (message, suggestion) = match error {
            CoreError::FileNotFound { path } => (
                format!("File not found: {}", path.display()),
                Some(format!("Check if file exists: ls {}", path.display())),
            ),
            CoreError::FileRead { path, .. } => (
                format!("Cannot read file: {}", path.display()),
                Some(format!("Check permissions: chmod +r {}", path.display())),
            ),
            CoreError::JsonParse { path, message, .. } => (
                format!("Invalid JSON in {}: {}", path.display(), message),
                Some("Validate JSON syntax with: jq . <file>".to_string()),
            ),
            CoreError::JsonlParse {
                path,
                line_number,
                message,
            } => (
                format!(
                    "Malformed JSONL line {} in {}: {}",
                    line_number,
                    path.display(),
                    message
                ),
                Some(format!(
                    "Inspect line: sed -n '{}p' {}",
                    line_number,
                    path.display()
                )),
            ),
            CoreError::InvalidFilter { field, .. } => (
                error.to_string(),
                Some(format!(
                    "Check the operator and value for '{}' (between takes [min, max], in takes a list)",
                    field
                )),
            ),
            _ => (error.to_string(), None),
        };

        let severity = match error {
            CoreError::FileNotFound { .. } | CoreError::FileRead { .. } => ErrorSeverity::Fatal,
            _ => ErrorSeverity::Error,
        };

        Self {
            source,
            message,
            severity,
            suggestion,
        }
    }
}

/// Report of problems encountered while loading a contract snapshot
///
/// Malformed records are skipped and recorded here instead of failing
/// the whole load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub records_loaded: usize,
    pub records_skipped: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Returns true if there are any fatal errors
    pub fn has_fatal_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Fatal)
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns only warnings
    pub fn warnings(&self) -> impl Iterator<Item = &LoadError> {
        self.errors
            .iter()
            .filter(|e| e.severity == ErrorSeverity::Warning)
    }

    /// Returns count by severity
    pub fn error_count(&self) -> (usize, usize, usize) {
        let count = |severity: ErrorSeverity| {
            self.errors
                .iter()
                .filter(|e| e.severity == severity)
                .count()
        };
        (
            count(ErrorSeverity::Warning),
            count(ErrorSeverity::Error),
            count(ErrorSeverity::Fatal),
        )
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: LoadReport) {
        self.errors.extend(other.errors);
        self.records_loaded += other.records_loaded;
        self.records_skipped += other.records_skipped;
    }
}
