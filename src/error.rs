//! Unified error hierarchy for icgen
//!
//! Load, conversion and export failures each have their own enum so callers
//! can tell a fatal input problem from a step that can simply be skipped.

use std::path::PathBuf;
use thiserror::Error;

pub use crate::export::ExportError;

/// Top-level error type for all icgen operations
#[derive(Debug, Error)]
pub enum IcgenError {
    /// Catalog or training plan could not be loaded
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Duration or power conversion errors
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// FIT encoding or file writing errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// No FTP from the command line, the plan or the catalog
    #[error("No FTP available: pass --ftp or set `ftp` in the {source_kind}")]
    MissingFtp { source_kind: &'static str },

    /// Catalog loaded but holds no workouts
    #[error("No workouts found in catalog: {path}")]
    EmptyCatalog { path: PathBuf },

    /// Workout requested by name is not in the catalog
    #[error("Workout not found in catalog: {name}")]
    UnknownWorkout { name: String },
}

/// Errors raised while reading catalog and plan documents
#[derive(Debug, Error)]
pub enum LoadError {
    /// File not found at specified path
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// File exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or shape does not match the expected document
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Unit conversion errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// Duration is not `MM:SS`
    #[error("Invalid time format '{value}'. Expected 'MM:SS'")]
    InvalidDuration { value: String },

    /// Power target does not end in `%`
    #[error("Invalid FTP percentage '{value}': must be a string ending with '%'")]
    MissingPercentSign { value: String },

    /// Numeric part of a power target is not a number
    #[error("Invalid FTP percentage format: '{value}'")]
    InvalidPercentage { value: String },
}

impl ConversionError {
    /// A missing `%` means the catalog entry itself is malformed; it must be
    /// surfaced rather than skipped like an ordinary parse failure.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ConversionError::MissingPercentSign { .. })
    }

    /// Offending source value
    pub fn value(&self) -> &str {
        match self {
            ConversionError::InvalidDuration { value }
            | ConversionError::MissingPercentSign { value }
            | ConversionError::InvalidPercentage { value } => value,
        }
    }
}

/// Result type alias for icgen operations
pub type Result<T> = std::result::Result<T, IcgenError>;

impl IcgenError {
    /// Whether the error stops the whole batch
    pub fn is_fatal(&self) -> bool {
        match self {
            IcgenError::Conversion(err) => err.is_contract_violation(),
            _ => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            IcgenError::Conversion(err) if !err.is_contract_violation() => ErrorSeverity::Warning,
            IcgenError::UnknownWorkout { .. } => ErrorSeverity::Warning,
            IcgenError::Load(_) | IcgenError::MissingFtp { .. } | IcgenError::EmptyCatalog { .. } => {
                ErrorSeverity::Error
            }
            IcgenError::Export(_) => ErrorSeverity::Error,
            IcgenError::Conversion(_) => ErrorSeverity::Critical,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            IcgenError::Load(LoadError::FileNotFound { path }) => {
                format!("Could not find file: {}", path.display())
            }
            IcgenError::Load(LoadError::Parse { path, reason }) => {
                format!("{} is not a valid document: {}", path.display(), reason)
            }
            IcgenError::EmptyCatalog { .. } => "No available workouts found. Exiting.".to_string(),
            IcgenError::MissingFtp { source_kind } => {
                format!("FTP not specified in the {}. Exiting.", source_kind)
            }
            IcgenError::Conversion(err) if err.is_contract_violation() => format!(
                "Malformed workout catalog: power target '{}' must end with '%'",
                err.value()
            ),
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Malformed input that must not be skipped
    Critical,
    /// Error that prevents the run
    Error,
    /// Warning that doesn't prevent the run
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}
