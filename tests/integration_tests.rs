use chrono::{TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use icgen::error::{IcgenError, LoadError};
use icgen::inspect::inspect;
use icgen::logging::DiagnosticReport;
use icgen::pipeline::{generate_from_catalog, generate_from_plan, BatchOptions, WorkoutSelection};

/// End-to-end generation runs against scratch catalogs and plans

const CATALOG: &str = r#"
ftp: 200
workouts:
  - name: A
    steps:
      - time: "10:00"
        ftp_percentage: "55%"
  - name: Leg Day
    steps:
      - time: "05:00"
        ftp_percentage: "60%"
      - time: "5 minutes"
        ftp_percentage: "90%"
      - time: "02:00"
        ftp_percentage: "120%"
"#;

struct Scratch {
    dir: TempDir,
}

impl Scratch {
    fn new() -> Self {
        let scratch = Scratch {
            dir: TempDir::new().unwrap(),
        };
        scratch.write("workouts.yaml", CATALOG);
        scratch
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    fn options(&self) -> BatchOptions {
        let mut options = BatchOptions::new(self.dir.path().join("workouts.yaml"), self.output_dir());
        options.start_time = Some(Utc.with_ymd_and_hms(2024, 3, 4, 6, 0, 0).unwrap());
        options
    }

    fn fit_files(&self) -> Vec<PathBuf> {
        let pattern = format!("{}/*.fit", self.output_dir().display());
        let mut files: Vec<PathBuf> = glob::glob(&pattern)
            .expect("Failed to read glob pattern")
            .filter_map(|entry| entry.ok())
            .collect();
        files.sort();
        files
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}

#[test]
fn test_single_workout_plan_end_to_end() {
    let scratch = Scratch::new();
    let plan = scratch.write(
        "week1.yaml",
        "workouts: [A]\nworkout_file_prefix: w\nworkout_rename_enabled: false\nworkout_indexing_enabled: true\n",
    );
    let mut report = DiagnosticReport::new("generate");

    let summary = generate_from_plan(&plan, &scratch.options(), &mut report).unwrap();

    // plan has no ftp, so the catalog default applies
    assert_eq!(summary.ftp, 200);
    let files = scratch.fit_files();
    assert_eq!(files.len(), 1);
    assert_eq!(file_name(&files[0]), "w_1_a_workout.fit");
    assert_eq!(report.files_written, files);

    let inspected = inspect(&files[0]).unwrap();
    assert_eq!(inspected.name.as_deref(), Some("w_1_a"));
    assert_eq!(inspected.steps.len(), 1);
    assert_eq!(inspected.declared_steps, Some(1));
    assert_eq!(inspected.step_field(0, "custom_target_value_low"), Some("1110"));
    assert_eq!(inspected.step_field(0, "custom_target_value_high"), Some("1110"));
    assert_eq!(inspected.step_field(0, "duration_time"), Some("600 s"));
}

#[test]
fn test_duplicate_plan_entries_produce_one_file_each() {
    let scratch = Scratch::new();
    let plan = scratch.write("dup.yaml", "ftp: 250\nworkouts: [A, Leg Day, A]\n");
    let mut report = DiagnosticReport::new("generate");

    let summary = generate_from_plan(&plan, &scratch.options(), &mut report).unwrap();

    assert_eq!(summary.ftp, 250);
    let names: Vec<String> = scratch.fit_files().iter().map(|p| file_name(p)).collect();
    assert_eq!(
        names,
        vec![
            "w_1_a_workout.fit",
            "w_2_leg_day_workout.fit",
            "w_3_a_workout.fit"
        ]
    );
}

#[test]
fn test_unknown_entries_and_bad_steps_are_skipped() {
    let scratch = Scratch::new();
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [Ghost, Leg Day]\n");
    let mut report = DiagnosticReport::new("generate");

    let summary = generate_from_plan(&plan, &scratch.options(), &mut report).unwrap();

    assert_eq!(summary.files.len(), 1);
    assert_eq!(summary.skipped_steps, 1);
    // index counts resolved workouts only
    assert_eq!(file_name(&summary.files[0]), "w_1_leg_day_workout.fit");
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings[0].message.contains("'Ghost'"));
    assert!(report.warnings[1].message.contains("'5 minutes'"));

    let inspected = inspect(&summary.files[0]).unwrap();
    assert_eq!(inspected.steps.len(), 2);
}

#[test]
fn test_creation_times_increase_through_batch() {
    let scratch = Scratch::new();
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [A, A, A]\n");
    let mut report = DiagnosticReport::new("generate");

    generate_from_plan(&plan, &scratch.options(), &mut report).unwrap();

    let stamps: Vec<String> = scratch
        .fit_files()
        .iter()
        .map(|path| {
            let inspected = inspect(path).unwrap();
            inspected
                .file_id
                .iter()
                .find(|(name, _)| name == "time_created")
                .map(|(_, value)| value.clone())
                .unwrap()
        })
        .collect();

    assert_eq!(stamps.len(), 3);
    assert!(stamps[0] != stamps[1] && stamps[1] != stamps[2]);
}

#[test]
fn test_missing_ftp_is_fatal_and_writes_nothing() {
    let scratch = Scratch::new();
    scratch.write("workouts.yaml", &CATALOG.replace("ftp: 200\n", ""));
    let plan = scratch.write("week.yaml", "ftp: 0\nworkouts: [A]\n");
    let mut options = scratch.options();
    options.ftp_override = Some(0);

    let err = generate_from_plan(&plan, &options, &mut DiagnosticReport::new("generate"))
        .unwrap_err();

    assert!(matches!(err, IcgenError::MissingFtp { .. }));
    assert!(!scratch.output_dir().exists());
}

#[test]
fn test_ftp_override_beats_plan() {
    let scratch = Scratch::new();
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [A]\n");
    let mut options = scratch.options();
    options.ftp_override = Some(300);

    let summary =
        generate_from_plan(&plan, &options, &mut DiagnosticReport::new("generate")).unwrap();

    assert_eq!(summary.ftp, 300);
}

#[test]
fn test_missing_catalog_is_fatal() {
    let scratch = Scratch::new();
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [A]\n");
    let mut options = scratch.options();
    options.catalog_path = scratch.dir.path().join("nope.yaml");

    let err = generate_from_plan(&plan, &options, &mut DiagnosticReport::new("generate"))
        .unwrap_err();

    assert!(matches!(err, IcgenError::Load(LoadError::FileNotFound { .. })));
    assert!(scratch.fit_files().is_empty());
}

#[test]
fn test_empty_catalog_is_fatal() {
    let scratch = Scratch::new();
    scratch.write("workouts.yaml", "ftp: 250\nworkouts: []\n");
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [A]\n");

    let err = generate_from_plan(&plan, &scratch.options(), &mut DiagnosticReport::new("generate"))
        .unwrap_err();

    assert!(matches!(err, IcgenError::EmptyCatalog { .. }));
    assert_eq!(err.user_message(), "No available workouts found. Exiting.");
}

#[test]
fn test_plan_with_no_resolvable_entries_writes_nothing() {
    let scratch = Scratch::new();
    let plan = scratch.write("week.yaml", "ftp: 250\nworkouts: [Ghost]\n");

    let summary =
        generate_from_plan(&plan, &scratch.options(), &mut DiagnosticReport::new("generate"))
            .unwrap();

    assert!(summary.files.is_empty());
    assert!(scratch.fit_files().is_empty());
}

#[test]
fn test_generate_single_catalog_workout() {
    let scratch = Scratch::new();
    let mut report = DiagnosticReport::new("workouts");

    let summary = generate_from_catalog(
        &WorkoutSelection::Named("Leg Day".to_string()),
        &scratch.options(),
        &mut report,
    )
    .unwrap();

    assert_eq!(summary.ftp, 200);
    assert_eq!(file_name(&summary.files[0]), "Leg Day_workout.fit");
}

#[test]
fn test_generate_all_catalog_workouts() {
    let scratch = Scratch::new();

    let summary = generate_from_catalog(
        &WorkoutSelection::All,
        &scratch.options(),
        &mut DiagnosticReport::new("workouts"),
    )
    .unwrap();

    assert_eq!(summary.files.len(), 2);
    assert_eq!(scratch.fit_files().len(), 2);
}

#[test]
fn test_generate_unknown_catalog_workout() {
    let scratch = Scratch::new();

    let err = generate_from_catalog(
        &WorkoutSelection::Named("Ghost".to_string()),
        &scratch.options(),
        &mut DiagnosticReport::new("workouts"),
    )
    .unwrap_err();

    assert!(matches!(err, IcgenError::UnknownWorkout { ref name } if name == "Ghost"));
}

#[test]
fn test_bundled_plans_resolve_against_bundled_catalog() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
    let catalog = icgen::loader::load_catalog(&root.join("workouts/workouts.yaml")).unwrap();
    let plans = icgen::loader::discover_plans(&root.join("training_plans")).unwrap();
    assert!(!plans.is_empty());

    for relative in plans {
        let plan = icgen::loader::load_plan(&root.join("training_plans").join(&relative)).unwrap();
        let mut report = DiagnosticReport::new("check");
        let workouts = icgen::build_plan_workouts(&plan, &catalog, &mut report);

        assert_eq!(workouts.len(), plan.workouts.len(), "{}", relative.display());
        assert!(!report.has_warnings(), "{}", relative.display());
    }
}
