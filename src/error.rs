/*!
 * Error handling for RIPS library operations
 *
 * Provides detailed error types with context, suggestions, and recovery guidance.
 *
 * The parsing core itself never fails on malformed data: broken lines are
 * skipped and count mismatches surface as ordinary validation results. The
 * errors below cover the I/O shell around the core — missing files,
 * unreadable auxiliary tables, configuration, export, and the external
 * error-analysis service.
 */

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use serde::{Serialize, Deserialize};

/// RIPS library result type
pub type Result<T> = std::result::Result<T, RipsError>;

/// Error types with context and suggestions
#[derive(Error, Debug)]
pub enum RipsError {
    /// File I/O errors with context
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
        context: ErrorContext,
    },

    /// Delimited-table parsing errors with location information
    #[error("Table parsing error at line {line:?}: {message}")]
    TableParse {
        message: String,
        line: Option<usize>,
        column: Option<String>,
        context: ErrorContext,
    },

    /// Data validation errors with detailed information
    #[error("Data validation error: {message}")]
    DataValidation {
        message: String,
        field: Option<String>,
        value: Option<String>,
        context: ErrorContext,
    },

    /// File not found with suggestions
    #[error("File not found: {path}")]
    FileNotFound {
        path: PathBuf,
        suggestion: String,
    },

    /// Invalid segment code with format guidance
    #[error("Invalid segment code '{code}': {reason}")]
    InvalidSegmentCode {
        code: String,
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        suggestion: Option<String>,
    },

    /// Export errors
    #[error("Export error: {message}")]
    Export {
        message: String,
        format: ExportFormat,
        suggestion: Option<String>,
    },

    /// External error-analysis service failures
    #[error("Analysis service error: {message}")]
    Analysis {
        message: String,
        suggestion: Option<String>,
    },

    /// Generic errors with custom message
    #[error("{message}")]
    Custom {
        message: String,
        suggestion: Option<String>,
    },
}

/// Error context providing additional information
#[derive(Debug, Default, Clone)]
pub struct ErrorContext {
    pub file_path: Option<PathBuf>,
    pub line_number: Option<usize>,
    pub column_name: Option<String>,
    pub segment: Option<String>,
}

/// Export format for error context and exporter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "JSON"),
            ExportFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl RipsError {
    /// Create a file not found error with helpful suggestion
    pub fn file_not_found_with_suggestion(path: PathBuf) -> Self {
        let lossy = path.to_string_lossy().to_uppercase();
        let suggestion = if lossy.contains("CUPS") {
            format!(
                "Check if the CUPS dictionary exists at '{}'. It should be a delimited table with \
                a header row containing CUPS, CUPS VIGENTE, NOMBRE CUPS and TIPO SER columns.",
                path.display()
            )
        } else if lossy.ends_with(".TXT") {
            format!(
                "Check if the RIPS file exists at '{}'. RIPS submissions are plain text files \
                with comma-delimited records, usually one file per segment bundle.",
                path.display()
            )
        } else {
            format!(
                "Check if the file exists at '{}'. Make sure the path is correct and you have read permissions.",
                path.display()
            )
        };

        Self::FileNotFound { path, suggestion }
    }

    /// Create an invalid segment code error with validation details
    pub fn invalid_segment_code(code: &str) -> Self {
        let reason = if code.trim().is_empty() {
            "segment code cannot be empty".to_string()
        } else if !code.trim().chars().all(|c| c.is_ascii_alphabetic()) {
            "segment code must contain only letters".to_string()
        } else {
            "unrecognized segment code format".to_string()
        };

        Self::InvalidSegmentCode {
            code: code.to_string(),
            reason,
        }
    }

    /// Create an analysis service error with a recovery hint
    pub fn analysis_unavailable(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
            suggestion: Some(
                "The validation results are unaffected; retry the analysis once the service is reachable."
                    .to_string(),
            ),
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound { suggestion, .. } => {
                format!("{}\n\nSuggestion: {}", self, suggestion)
            }
            Self::Configuration { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Export { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Analysis { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            Self::Custom { suggestion: Some(sug), .. } => {
                format!("{}\n\nSuggestion: {}", self, sug)
            }
            _ => self.to_string(),
        }
    }
}

// Convenience conversions
impl From<std::io::Error> for RipsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: err,
            context: ErrorContext::default(),
        }
    }
}

impl From<csv::Error> for RipsError {
    fn from(err: csv::Error) -> Self {
        let (line, message) = match err.position() {
            Some(pos) => (Some(pos.line() as usize), err.to_string()),
            None => (None, err.to_string()),
        };

        Self::TableParse {
            message,
            line,
            column: None,
            context: ErrorContext::default(),
        }
    }
}

impl From<serde_json::Error> for RipsError {
    fn from(err: serde_json::Error) -> Self {
        RipsError::Export {
            message: err.to_string(),
            format: ExportFormat::Json,
            suggestion: Some("Check if the data is serializable to JSON.".to_string()),
        }
    }
}
