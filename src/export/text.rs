//! Terminal rendering of workouts, catalogs and plans

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::conversion::{format_duration, parse_duration, percent_to_watts};
use crate::models::{StepDef, TrainingPlan, WorkoutCatalog};
use crate::training_plan::NamingPolicy;

/// One step of a power profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileStep {
    pub number: usize,
    pub start_ms: u64,
    /// None when the duration could not be parsed
    pub duration_ms: Option<u64>,
    pub target: String,
    /// None when the power target could not be converted
    pub watts: Option<i64>,
}

/// Power over time for one workout at a given FTP
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutProfile {
    pub name: String,
    pub ftp: u16,
    pub steps: Vec<ProfileStep>,
    pub total_ms: u64,
    pub invalid_steps: usize,
}

impl WorkoutProfile {
    /// Build the profile. Unreadable steps stay in the list, marked invalid,
    /// and add no time.
    pub fn new(name: &str, steps: &[StepDef], ftp: u16) -> Self {
        let mut elapsed = 0u64;
        let mut invalid_steps = 0;
        let mut profile_steps = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let duration_ms = parse_duration(&step.time).ok();
            let watts = percent_to_watts(&step.ftp_percentage, ftp).ok();
            if duration_ms.is_none() || watts.is_none() {
                invalid_steps += 1;
            }

            profile_steps.push(ProfileStep {
                number: index + 1,
                start_ms: elapsed,
                duration_ms,
                target: step.ftp_percentage.clone(),
                watts,
            });
            elapsed = elapsed.saturating_add(duration_ms.unwrap_or(0));
        }

        Self {
            name: name.to_string(),
            ftp,
            steps: profile_steps,
            total_ms: elapsed,
            invalid_steps,
        }
    }

    fn valid_steps(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        self.steps
            .iter()
            .filter_map(|s| Some((s.duration_ms?, s.watts?)))
    }

    /// Time weighted average over valid steps
    pub fn average_watts(&self) -> Option<f64> {
        let (time, energy) = self
            .valid_steps()
            .fold((0u64, 0f64), |(t, e), (ms, w)| (t + ms, e + ms as f64 * w as f64));
        (time > 0).then(|| energy / time as f64)
    }

    /// Mechanical work in kilojoules
    pub fn work_kj(&self) -> f64 {
        self.valid_steps()
            .map(|(ms, w)| ms as f64 / 1000.0 * w as f64)
            .sum::<f64>()
            / 1000.0
    }
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "#")]
    number: usize,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Watts")]
    watts: String,
}

const INVALID: &str = "invalid";

/// Step table followed by totals
pub fn render_profile(profile: &WorkoutProfile) -> String {
    let rows: Vec<ProfileRow> = profile
        .steps
        .iter()
        .map(|s| ProfileRow {
            number: s.number,
            start: format_duration(s.start_ms),
            duration: s
                .duration_ms
                .map(format_duration)
                .unwrap_or_else(|| INVALID.to_string()),
            target: s.target.clone(),
            watts: s
                .watts
                .map(|w| w.to_string())
                .unwrap_or_else(|| INVALID.to_string()),
        })
        .collect();

    let mut out = format!("{} (FTP {} W)\n", profile.name, profile.ftp);
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push('\n');
    out.push_str(&format!("Total duration: {}\n", format_duration(profile.total_ms)));
    match profile.average_watts() {
        Some(avg) => out.push_str(&format!("Average power: {:.0} W\n", avg)),
        None => out.push_str("Average power: -\n"),
    }
    out.push_str(&format!("Work: {:.0} kJ\n", profile.work_kj()));
    if profile.invalid_steps > 0 {
        out.push_str(&format!("Invalid steps: {}\n", profile.invalid_steps));
    }
    out
}

#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Workout")]
    name: String,
    #[tabled(rename = "Steps")]
    steps: usize,
    #[tabled(rename = "Duration")]
    duration: String,
}

/// Catalog listing with step count and total time of each workout
pub fn render_catalog(catalog: &WorkoutCatalog) -> String {
    let rows: Vec<CatalogRow> = catalog
        .workouts()
        .iter()
        .map(|w| {
            let total: u64 = w.steps.iter().filter_map(|s| parse_duration(&s.time).ok()).sum();
            CatalogRow {
                name: w.name.clone(),
                steps: w.steps.len(),
                duration: format_duration(total),
            }
        })
        .collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Workout")]
    workout: String,
    #[tabled(rename = "Output file")]
    output: String,
}

/// Plan entries with the file each one will produce, or why it will not
pub fn render_plan(plan: &TrainingPlan, catalog: Option<&WorkoutCatalog>) -> String {
    let policy = NamingPolicy::for_plan(plan);
    let mut resolved_index = 0;

    let rows: Vec<PlanRow> = plan
        .workouts
        .iter()
        .enumerate()
        .map(|(position, name)| {
            let found = catalog.map_or(true, |c| c.contains(name));
            let output = if found {
                let output_name =
                    policy.output_name(&plan.workout_file_prefix, resolved_index, name);
                resolved_index += 1;
                format!("{}_workout.fit", output_name)
            } else {
                "(not in catalog)".to_string()
            };
            PlanRow {
                position: position + 1,
                workout: name.clone(),
                output,
            }
        })
        .collect();

    let ftp = plan
        .ftp
        .map(|f| format!("{} W", f))
        .unwrap_or_else(|| "not set".to_string());
    let table = Table::new(rows).with(Style::rounded()).to_string();
    format!(
        "FTP: {}\nPrefix: {}\nRename: {}  Indexing: {}\n{}",
        ftp,
        plan.workout_file_prefix,
        plan.workout_rename_enabled,
        plan.workout_indexing_enabled,
        table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CatalogDocument, WorkoutDef};

    fn steps() -> Vec<StepDef> {
        vec![
            StepDef::new("10:00", "55%"),
            StepDef::new("05:00", "100%"),
            StepDef::new("oops", "80%"),
            StepDef::new("05:00", "55%"),
        ]
    }

    #[test]
    fn test_profile_timeline() {
        let profile = WorkoutProfile::new("Tempo", &steps(), 200);

        assert_eq!(profile.total_ms, 1_200_000);
        assert_eq!(profile.invalid_steps, 1);
        assert_eq!(profile.steps[1].start_ms, 600_000);
        assert_eq!(profile.steps[1].watts, Some(200));
        assert_eq!(profile.steps[2].duration_ms, None);
        assert_eq!(profile.steps[3].start_ms, 900_000);
    }

    #[test]
    fn test_profile_totals() {
        let profile = WorkoutProfile::new("Tempo", &steps(), 200);

        // (600s * 110 + 300s * 200 + 300s * 110) / 1200s
        assert_eq!(profile.average_watts(), Some(132.5));
        assert!((profile.work_kj() - 159.0).abs() < 1e-9);
    }

    #[test]
    fn test_profile_missing_percent_is_marked_not_fatal() {
        let profile = WorkoutProfile::new("Bad", &[StepDef::new("01:00", "50")], 200);
        assert_eq!(profile.invalid_steps, 1);
        assert_eq!(profile.average_watts(), None);
        assert!(render_profile(&profile).contains("invalid"));
    }

    #[test]
    fn test_profile_total_saturates() {
        let huge = format!("{}:00", u64::MAX / 60_000);
        let steps = vec![StepDef::new(huge.clone(), "50%"), StepDef::new(huge, "50%")];

        let profile = WorkoutProfile::new("Forever", &steps, 200);

        assert_eq!(profile.invalid_steps, 0);
        assert_eq!(profile.total_ms, u64::MAX);
    }

    #[test]
    fn test_render_profile_contains_steps() {
        let rendered = render_profile(&WorkoutProfile::new("Tempo", &steps(), 200));
        assert!(rendered.starts_with("Tempo (FTP 200 W)"));
        assert!(rendered.contains("Total duration: 20:00"));
        assert!(rendered.contains("Invalid steps: 1"));
    }

    #[test]
    fn test_render_plan_marks_missing_entries() {
        let document = CatalogDocument {
            ftp: None,
            workouts: vec![WorkoutDef { name: "Leg Day".to_string(), steps: steps() }],
        };
        let (catalog, _) = WorkoutCatalog::from_document(document);
        let plan = TrainingPlan {
            workouts: vec!["Unknown".to_string(), "Leg Day".to_string()],
            ..Default::default()
        };

        let rendered = render_plan(&plan, Some(&catalog));
        assert!(rendered.contains("(not in catalog)"));
        assert!(rendered.contains("w_1_leg_day_workout.fit"));
        assert!(rendered.contains("FTP: not set"));
    }

    #[test]
    fn test_render_catalog() {
        let document = CatalogDocument {
            ftp: Some(250),
            workouts: vec![WorkoutDef { name: "Leg Day".to_string(), steps: steps() }],
        };
        let (catalog, _) = WorkoutCatalog::from_document(document);
        let rendered = render_catalog(&catalog);
        assert!(rendered.contains("Leg Day"));
        assert!(rendered.contains("20:00"));
    }
}
