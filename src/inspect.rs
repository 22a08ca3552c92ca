//! Decode generated workout files for verification

use fitparser::profile::MesgNum;
use fitparser::{FitDataRecord, Value};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::error::{ExportError, IcgenError, LoadError, Result};

/// Field name and displayed value
pub type FieldList = Vec<(String, String)>;

/// Workout contents as a FIT decoder sees them
#[derive(Debug, Clone, Default, Serialize)]
pub struct InspectedWorkout {
    pub name: Option<String>,
    pub sport: Option<String>,
    pub declared_steps: Option<u64>,
    pub file_id: FieldList,
    pub steps: Vec<FieldList>,
}

impl InspectedWorkout {
    /// Value of a named field in step `index`
    pub fn step_field(&self, index: usize, name: &str) -> Option<&str> {
        self.steps
            .get(index)?
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

fn field_list(record: &FitDataRecord) -> FieldList {
    record
        .fields()
        .iter()
        .map(|field| {
            let value = match field.units() {
                "" => field.value().to_string(),
                units => format!("{} {}", field.value(), units),
            };
            (field.name().to_string(), value)
        })
        .collect()
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::UInt8(v) => Some(u64::from(*v)),
        Value::UInt16(v) => Some(u64::from(*v)),
        Value::UInt32(v) => Some(u64::from(*v)),
        _ => None,
    }
}

/// Summarize decoded records
pub fn summarize(records: &[FitDataRecord]) -> InspectedWorkout {
    let mut inspected = InspectedWorkout::default();

    for record in records {
        match record.kind() {
            MesgNum::FileId => inspected.file_id = field_list(record),
            MesgNum::Workout => {
                for field in record.fields() {
                    match (field.name(), field.value()) {
                        ("wkt_name", Value::String(name)) => inspected.name = Some(name.clone()),
                        ("sport", value) => inspected.sport = Some(value.to_string()),
                        ("num_valid_steps", value) => inspected.declared_steps = as_u64(value),
                        _ => {}
                    }
                }
            }
            MesgNum::WorkoutStep => inspected.steps.push(field_list(record)),
            _ => {}
        }
    }

    inspected
}

/// Decode a FIT workout file from disk
pub fn inspect(path: &Path) -> Result<InspectedWorkout> {
    let mut file = File::open(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let records = fitparser::from_reader(&mut file).map_err(|e| {
        IcgenError::Export(ExportError::ExportFailed {
            path: path.to_path_buf(),
            reason: format!("not a readable FIT file: {}", e),
        })
    })?;

    tracing::debug!(path = %path.display(), records = records.len(), "Decoded FIT file");
    Ok(summarize(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{encode_workout, DeviceInfo, Intensity, WorkoutFile, WorkoutStepRecord};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn sample() -> WorkoutFile {
        WorkoutFile {
            name: "w_1_leg_day".to_string(),
            steps: (1..=3)
                .map(|n| WorkoutStepRecord {
                    name: format!("Step {}", n),
                    intensity: Intensity::Other,
                    duration_ms: 60_000 * n,
                    custom_power_low: 1100 + n,
                    custom_power_high: 1100 + n,
                })
                .collect(),
            time_created: Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap(),
            device: DeviceInfo::default(),
        }
    }

    #[test]
    fn test_decodes_generated_workout() {
        let data = encode_workout(&sample()).unwrap();
        let records = fitparser::from_bytes(&data).unwrap();

        let inspected = summarize(&records);

        assert_eq!(inspected.name.as_deref(), Some("w_1_leg_day"));
        assert_eq!(inspected.declared_steps, Some(3));
        assert_eq!(inspected.steps.len(), 3);
        assert_eq!(inspected.step_field(0, "wkt_step_name"), Some("Step 1"));
        assert_eq!(inspected.step_field(2, "wkt_step_name"), Some("Step 3"));
        assert!(!inspected.file_id.is_empty());
    }

    #[test]
    fn test_inspect_reads_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("w_1_leg_day_workout.fit");
        std::fs::write(&path, encode_workout(&sample()).unwrap()).unwrap();

        let inspected = inspect(&path).unwrap();
        assert_eq!(inspected.steps.len(), 3);
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.fit");
        std::fs::write(&path, b"definitely not a fit file").unwrap();

        assert!(matches!(inspect(&path), Err(IcgenError::Export(_))));
    }

    #[test]
    fn test_inspect_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            inspect(&dir.path().join("nope.fit")),
            Err(IcgenError::Load(LoadError::FileNotFound { .. }))
        ));
    }
}
