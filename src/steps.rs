//! Step encoding
//!
//! Converts catalog steps into [`PreparedStep`]s and then into the
//! `workout_step` records handed to the FIT writer.

use crate::conversion::{parse_duration, percent_to_watts};
use crate::error::{ExportError, Result};
use crate::export::{Intensity, WorkoutStepRecord};
use crate::logging::DiagnosticSink;
use crate::models::{PreparedStep, StepDef};

/// FIT custom power targets are stored as watts + 1000
pub const FIT_POWER_OFFSET: i64 = 1000;

/// Convert one step.
///
/// Returns `Ok(None)` when the step has to be dropped (unreadable duration or
/// percentage, negative power); the reason goes to `diagnostics`. A power
/// target without `%` is returned as an error.
pub fn prepare_step(
    step: &StepDef,
    ftp: u16,
    workout_name: &str,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Option<PreparedStep>> {
    let duration = parse_duration(&step.time);
    let watts = percent_to_watts(&step.ftp_percentage, ftp);

    if let Err(err) = &watts {
        if err.is_contract_violation() {
            return Err(err.clone().into());
        }
    }

    let (duration_ms, watts) = match (duration, watts) {
        (Ok(duration_ms), Ok(watts)) => (duration_ms, watts),
        (Err(err), _) | (_, Err(err)) => {
            skip(diagnostics, workout_name, &err.to_string());
            return Ok(None);
        }
    };

    if watts < 0 {
        skip(
            diagnostics,
            workout_name,
            &format!("Negative power target '{}'", step.ftp_percentage),
        );
        return Ok(None);
    }

    Ok(Some(PreparedStep {
        duration_ms,
        power_offset: watts + FIT_POWER_OFFSET,
    }))
}

fn skip(diagnostics: &mut dyn DiagnosticSink, workout_name: &str, reason: &str) {
    diagnostics.warn(
        &format!("workout '{}'", workout_name),
        &format!("Skipping invalid step in workout '{}': {}", workout_name, reason),
    );
}

/// Convert every step of a workout, keeping order and dropping failures
pub fn build_steps(
    workout_name: &str,
    steps: &[StepDef],
    ftp: u16,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Vec<PreparedStep>> {
    let mut prepared = Vec::with_capacity(steps.len());
    for step in steps {
        if let Some(step) = prepare_step(step, ftp, workout_name, diagnostics)? {
            prepared.push(step);
        }
    }
    Ok(prepared)
}

/// Turn prepared steps into FIT `workout_step` records.
///
/// Each record targets a single power value: low and high bounds are equal.
pub fn step_records(
    prepared: &[PreparedStep],
) -> std::result::Result<Vec<WorkoutStepRecord>, ExportError> {
    prepared
        .iter()
        .enumerate()
        .map(|(index, step)| {
            let duration_ms =
                u32::try_from(step.duration_ms).map_err(|_| ExportError::FieldOutOfRange {
                    field: "duration_time",
                    value: i64::try_from(step.duration_ms).unwrap_or(i64::MAX),
                })?;
            let power = u32::try_from(step.power_offset).map_err(|_| ExportError::FieldOutOfRange {
                field: "custom_target_power",
                value: step.power_offset,
            })?;

            Ok(WorkoutStepRecord {
                name: format!("Step {}", index + 1),
                intensity: Intensity::Other,
                duration_ms,
                custom_power_low: power,
                custom_power_high: power,
            })
        })
        .collect()
}
