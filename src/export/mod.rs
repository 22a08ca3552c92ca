use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod fit;
pub mod text;

pub use fit::{encode_workout, FitFileWriter};

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Value out of range for {field}: {value}")]
    FieldOutOfRange { field: &'static str, value: i64 },
    #[error("Too many steps in workout '{workout}': {count}")]
    TooManySteps { workout: String, count: usize },
    #[error("Export failed to {path}: {reason}")]
    ExportFailed { path: PathBuf, reason: String },
}

/// Workout step intensity (FIT `intensity`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Active,
    Rest,
    Warmup,
    Cooldown,
    Recovery,
    Interval,
    Other,
}

impl Intensity {
    pub fn fit_value(&self) -> u8 {
        match self {
            Intensity::Active => 0,
            Intensity::Rest => 1,
            Intensity::Warmup => 2,
            Intensity::Cooldown => 3,
            Intensity::Recovery => 4,
            Intensity::Interval => 5,
            Intensity::Other => 6,
        }
    }
}

/// One `workout_step` message.
///
/// Duration is always time based and the target is always 3 second power,
/// with both custom bounds carrying the +1000 watt offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutStepRecord {
    pub name: String,
    pub intensity: Intensity,
    pub duration_ms: u32,
    pub custom_power_low: u32,
    pub custom_power_high: u32,
}

/// Identity written to the `file_id` message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub manufacturer: u16,
    pub product: u16,
    pub serial_number: u32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            manufacturer: 1, // garmin
            product: 0,
            serial_number: 0x1234_5678,
        }
    }
}

/// Everything needed to produce one FIT workout file
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutFile {
    pub name: String,
    pub steps: Vec<WorkoutStepRecord>,
    pub time_created: DateTime<Utc>,
    pub device: DeviceInfo,
}

impl WorkoutFile {
    pub fn file_name(&self) -> String {
        format!("{}_workout.fit", self.name)
    }
}

/// Destination for encoded workouts
pub trait WorkoutWriter {
    /// Write one workout, returning where it went
    fn write(&mut self, workout: &WorkoutFile) -> Result<PathBuf, ExportError>;

    fn output_dir(&self) -> &Path;
}
