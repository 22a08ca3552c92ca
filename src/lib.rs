// Library interface for icgen
// The binary and the integration tests both go through these modules

pub mod config;
pub mod conversion;
pub mod error;
pub mod export;
pub mod inspect;
pub mod loader;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod steps;
pub mod training_plan;

// Re-export commonly used types for convenience
pub use models::*;
pub use config::AppConfig;
pub use conversion::{parse_duration, percent_to_watts};
pub use error::{ConversionError, IcgenError, LoadError, Result};
pub use export::{DeviceInfo, ExportError, FitFileWriter, WorkoutFile, WorkoutStepRecord, WorkoutWriter};
pub use logging::{DiagnosticReport, DiagnosticSink, LogConfig, LogFormat, LogLevel};
pub use pipeline::{BatchOptions, BatchSummary, WorkoutSelection};
pub use steps::FIT_POWER_OFFSET;
pub use training_plan::{build_plan_workouts, rename, resolve, NamingPolicy};
