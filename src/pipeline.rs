//! Batch generation: catalog + plan in, one FIT workout file per entry out

use chrono::{DateTime, Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{IcgenError, Result};
use crate::export::{DeviceInfo, FitFileWriter, WorkoutFile, WorkoutWriter};
use crate::loader::{load_catalog, load_plan};
use crate::logging::DiagnosticReport;
use crate::models::{ResolvedWorkout, WorkoutCatalog, WorkoutDef};
use crate::steps::{build_steps, step_records};
use crate::training_plan::build_plan_workouts;

/// Settings shared by both generation modes
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub catalog_path: PathBuf,
    pub output_dir: PathBuf,

    /// Takes precedence over any FTP in the plan or catalog
    pub ftp_override: Option<u16>,

    pub device: DeviceInfo,
    pub show_progress: bool,

    /// Creation time of the first file; defaults to now
    pub start_time: Option<DateTime<Utc>>,
}

impl BatchOptions {
    pub fn new(catalog_path: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            output_dir: output_dir.into(),
            ftp_override: None,
            device: DeviceInfo::default(),
            show_progress: false,
            start_time: None,
        }
    }
}

/// Which catalog workouts to generate directly
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkoutSelection {
    Named(String),
    All,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub ftp: u16,
    pub files: Vec<PathBuf>,
    pub skipped_steps: usize,
}

/// Pick the FTP to use. Zero counts as unset.
pub fn effective_ftp(
    ftp_override: Option<u16>,
    fallback: Option<u16>,
    source_kind: &'static str,
) -> Result<u16> {
    ftp_override
        .filter(|&ftp| ftp > 0)
        .or(fallback.filter(|&ftp| ftp > 0))
        .ok_or(IcgenError::MissingFtp { source_kind })
}

fn load_non_empty_catalog(path: &Path) -> Result<WorkoutCatalog> {
    let catalog = load_catalog(path)?;
    if catalog.is_empty() {
        return Err(IcgenError::EmptyCatalog {
            path: path.to_path_buf(),
        });
    }
    Ok(catalog)
}

/// Generate one file per training plan entry.
///
/// Loading, an empty catalog and a missing FTP are fatal before anything is
/// written. Unknown plan entries and unreadable steps are skipped and
/// recorded in `report`.
pub fn generate_from_plan(
    plan_path: &Path,
    options: &BatchOptions,
    report: &mut DiagnosticReport,
) -> Result<BatchSummary> {
    let catalog = load_non_empty_catalog(&options.catalog_path)?;
    let plan = load_plan(plan_path)?;
    report.add_context("catalog", options.catalog_path.display().to_string());
    report.add_context("plan", plan_path.display().to_string());

    let workouts = build_plan_workouts(&plan, &catalog, report);
    let fallback = plan.ftp.filter(|&ftp| ftp > 0).or(catalog.ftp());
    let ftp = effective_ftp(options.ftp_override, fallback, "training plan")?;

    let mut writer = FitFileWriter::new(&options.output_dir);
    encode_batch(&workouts, ftp, options, &mut writer, report)
}

/// Generate files straight from the catalog, names unchanged
pub fn generate_from_catalog(
    selection: &WorkoutSelection,
    options: &BatchOptions,
    report: &mut DiagnosticReport,
) -> Result<BatchSummary> {
    let catalog = load_non_empty_catalog(&options.catalog_path)?;
    report.add_context("catalog", options.catalog_path.display().to_string());

    let selected: Vec<&WorkoutDef> = match selection {
        WorkoutSelection::Named(name) => {
            let def = catalog
                .get(name)
                .ok_or_else(|| IcgenError::UnknownWorkout { name: name.clone() })?;
            vec![def]
        }
        WorkoutSelection::All => catalog.workouts().iter().collect(),
    };
    let workouts: Vec<ResolvedWorkout> =
        selected.into_iter().map(ResolvedWorkout::from_def).collect();

    let ftp = effective_ftp(options.ftp_override, catalog.ftp(), "workout catalog")?;

    let mut writer = FitFileWriter::new(&options.output_dir);
    encode_batch(&workouts, ftp, options, &mut writer, report)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Encode and write every workout in order.
///
/// Workout `i` is stamped `start + i` seconds so devices keep them apart.
/// A step without `%` aborts the batch; files already written stay.
pub fn encode_batch(
    workouts: &[ResolvedWorkout],
    ftp: u16,
    options: &BatchOptions,
    writer: &mut dyn WorkoutWriter,
    report: &mut DiagnosticReport,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary {
        ftp,
        ..Default::default()
    };
    report.add_context("ftp", ftp.to_string());

    if workouts.is_empty() {
        tracing::warn!("No workouts to generate");
        return Ok(summary);
    }

    let start = options.start_time.unwrap_or_else(Utc::now);
    let pb = progress_bar(workouts.len(), options.show_progress);

    for (index, workout) in workouts.iter().enumerate() {
        pb.set_message(workout.name.clone());

        let prepared = build_steps(&workout.source_name, &workout.steps, ftp, report)?;
        summary.skipped_steps += workout.steps.len() - prepared.len();

        let file = WorkoutFile {
            name: workout.name.clone(),
            steps: step_records(&prepared)?,
            time_created: start + Duration::seconds(index as i64),
            device: options.device.clone(),
        };

        let path = writer.write(&file)?;
        pb.println(format!("✓ {}", path.display()));
        report.add_file(&path);
        summary.files.push(path);
        pb.inc(1);
    }

    pb.finish_with_message("Generation complete");
    tracing::info!(
        files = summary.files.len(),
        skipped_steps = summary.skipped_steps,
        output_dir = %writer.output_dir().display(),
        "Batch complete"
    );
    Ok(summary)
}
