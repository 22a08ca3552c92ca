use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use icgen::config::AppConfig;
use icgen::error::IcgenError;
use icgen::export::text::{render_catalog, render_plan, render_profile, WorkoutProfile};
use icgen::inspect::inspect;
use icgen::loader::{discover_plans, load_catalog, load_plan, resolve_plan_path};
use icgen::logging::{init_logging, DiagnosticReport};
use icgen::pipeline::{
    effective_ftp, generate_from_catalog, generate_from_plan, BatchOptions, BatchSummary,
    WorkoutSelection,
};

/// icgen - Indoor cycling workout generator
///
/// Turns a YAML workout catalog and training plans into FIT workout files
/// for smart trainers and bike computers.
#[derive(Parser)]
#[command(name = "icgen")]
#[command(version)]
#[command(about = "Indoor cycling training plan to FIT workout generator", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Workout catalog to use instead of the configured one
    #[arg(long, value_name = "PATH", global = true)]
    catalog: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// List the training plans found in the plans directory
    #[arg(long)]
    list_plans: bool,

    /// List the workouts in the catalog
    #[arg(long)]
    list_workouts: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one FIT file per workout in a training plan
    Generate {
        /// Training plan file, or a path relative to the plans directory
        #[arg(short, long)]
        plan: PathBuf,

        /// FTP in watts, overrides the plan's value
        #[arg(long)]
        ftp: Option<u16>,

        /// Output directory for FIT files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Save a JSON diagnostic report of the run
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Generate FIT files straight from catalog workouts
    Workouts {
        /// Name of the workout to generate
        #[arg(short, long, required_unless_present = "all_workouts")]
        workout_name: Option<String>,

        /// Generate every workout in the catalog
        #[arg(short, long, conflicts_with = "workout_name")]
        all_workouts: bool,

        /// FTP in watts, overrides the catalog's value
        #[arg(long)]
        ftp: Option<u16>,

        /// Output directory for FIT files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Save a JSON diagnostic report of the run
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },

    /// Show a training plan and the files it would produce
    List {
        /// Training plan file
        plan_file: PathBuf,
    },

    /// Show the power profile of a catalog workout
    Show {
        /// Workout name
        workout: String,

        /// FTP in watts, overrides the catalog's value
        #[arg(long)]
        ftp: Option<u16>,
    },

    /// Decode a FIT workout file and print its steps
    Inspect {
        /// FIT file to decode
        file: PathBuf,
    },

    /// Show or create the configuration file
    Config {
        /// Print the effective configuration
        #[arg(short, long, conflicts_with = "init")]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<IcgenError>() {
                Some(icgen_err) => icgen_err.user_message(),
                None => format!("{:#}", err),
            };
            eprintln!("{} {}", "Error:".red().bold(), message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    let catalog_path = cli.catalog.clone().unwrap_or_else(|| config.paths.catalog.clone());

    if cli.list_plans || cli.list_workouts {
        if cli.list_plans {
            list_plans(&config.paths.plans_dir)?;
        }
        if cli.list_workouts {
            list_workouts(&catalog_path)?;
        }
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Generate {
            plan,
            ftp,
            output_dir,
            report,
            no_progress,
        } => {
            let plan_path = resolve_plan_path(&plan, &config.paths.plans_dir);
            let options = batch_options(&config, catalog_path, ftp, output_dir, !no_progress);

            println!("{}", "Generating workouts from training plan...".green().bold());
            println!("  Plan: {}", plan_path.display());
            run_batch("generate", report.as_deref(), |report| {
                generate_from_plan(&plan_path, &options, report)
            })?;
        }

        Commands::Workouts {
            workout_name,
            all_workouts,
            ftp,
            output_dir,
            report,
        } => {
            let selection = match workout_name {
                Some(name) if !all_workouts => WorkoutSelection::Named(name),
                _ => WorkoutSelection::All,
            };
            let options = batch_options(&config, catalog_path, ftp, output_dir, true);

            println!("{}", "Generating workouts from catalog...".green().bold());
            run_batch("workouts", report.as_deref(), |report| {
                generate_from_catalog(&selection, &options, report)
            })?;
        }

        Commands::List { plan_file } => {
            let plan_path = resolve_plan_path(&plan_file, &config.paths.plans_dir);
            let plan = load_plan(&plan_path).map_err(IcgenError::from)?;
            let catalog = match load_catalog(&catalog_path) {
                Ok(catalog) => Some(catalog),
                Err(e) => {
                    tracing::warn!("Catalog unavailable, entries are not checked: {}", e);
                    None
                }
            };

            println!("{}", plan_path.display().to_string().cyan().bold());
            println!("{}", render_plan(&plan, catalog.as_ref()));
        }

        Commands::Show { workout, ftp } => {
            let catalog = load_catalog(&catalog_path).map_err(IcgenError::from)?;
            let def = catalog
                .get(&workout)
                .ok_or_else(|| IcgenError::UnknownWorkout { name: workout.clone() })?;
            let ftp = effective_ftp(ftp, catalog.ftp(), "workout catalog")?;

            println!("{}", render_profile(&WorkoutProfile::new(&def.name, &def.steps, ftp)));
        }

        Commands::Inspect { file } => {
            let inspected = inspect(&file)?;

            println!("{}", file.display().to_string().cyan().bold());
            println!("  Workout: {}", inspected.name.as_deref().unwrap_or("-"));
            println!("  Sport: {}", inspected.sport.as_deref().unwrap_or("-"));
            match inspected.declared_steps {
                Some(n) => println!("  Steps: {} declared, {} found", n, inspected.steps.len()),
                None => println!("  Steps: {} found", inspected.steps.len()),
            }
            for (index, fields) in inspected.steps.iter().enumerate() {
                let line: Vec<String> = fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                println!("  {:>3}. {}", index + 1, line.join(", ").dimmed());
            }
        }

        Commands::Config { show, init } => {
            let path = cli.config.unwrap_or_else(AppConfig::default_config_path);
            if init {
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                let mut fresh = AppConfig::default();
                fresh.save_to_file(&path)?;
                println!("{} {}", "✓ Wrote".green(), path.display());
            } else if show {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            } else {
                println!("Config file: {}", path.display());
            }
        }
    }

    Ok(())
}

fn batch_options(
    config: &AppConfig,
    catalog_path: PathBuf,
    ftp: Option<u16>,
    output_dir: Option<PathBuf>,
    show_progress: bool,
) -> BatchOptions {
    let mut options = BatchOptions::new(
        catalog_path,
        output_dir.unwrap_or_else(|| config.paths.output_dir.clone()),
    );
    options.ftp_override = ftp;
    options.device = config.device.clone();
    options.show_progress = show_progress;
    options
}

/// Run one generation mode, keeping the diagnostic report in step with the
/// outcome and saving it when asked to.
fn run_batch<F>(operation: &str, report_path: Option<&Path>, generate: F) -> Result<()>
where
    F: FnOnce(&mut DiagnosticReport) -> icgen::Result<BatchSummary>,
{
    let started = Instant::now();
    let mut report = DiagnosticReport::new(operation);

    let result = generate(&mut report);
    report.set_duration(started.elapsed());
    match &result {
        Ok(_) => report.set_success(true),
        Err(e) => {
            tracing::error!(severity = ?e.severity(), "{}", e);
            report.add_error(e);
        }
    }

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
    }

    let summary = result?;
    println!(
        "{}",
        format!(
            "✓ {} workout files written (FTP {} W)",
            summary.files.len(),
            summary.ftp
        )
        .green()
    );
    if summary.skipped_steps > 0 || report.has_warnings() {
        println!(
            "{}",
            format!(
                "  {} warnings, {} steps skipped",
                report.warnings.len(),
                summary.skipped_steps
            )
            .yellow()
        );
    }
    Ok(())
}

fn list_plans(plans_dir: &Path) -> Result<()> {
    let plans = discover_plans(plans_dir)
        .with_context(|| format!("Failed to read plans directory: {}", plans_dir.display()))?;

    println!("{}", format!("Training plans in {}", plans_dir.display()).cyan().bold());
    if plans.is_empty() {
        println!("  (none)");
    }
    for plan in plans {
        println!("  {}", plan.display());
    }
    Ok(())
}

fn list_workouts(catalog_path: &Path) -> Result<()> {
    let catalog = load_catalog(catalog_path).map_err(IcgenError::from)?;

    println!("{}", format!("Workouts in {}", catalog_path.display()).cyan().bold());
    if let Some(ftp) = catalog.ftp() {
        println!("  Default FTP: {} W", ftp);
    }
    println!("{}", render_catalog(&catalog));
    Ok(())
}
