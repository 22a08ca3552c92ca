//! YAML loading for workout catalogs and training plans

use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::models::{CatalogDocument, TrainingPlan, WorkoutCatalog};

/// Read and deserialize a YAML document
pub fn parse_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;

    serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load a workout catalog. An empty file yields an empty catalog.
pub fn load_catalog(path: &Path) -> Result<WorkoutCatalog, LoadError> {
    let document: Option<CatalogDocument> = parse_yaml(path)?;
    let (catalog, redefined) = WorkoutCatalog::from_document(document.unwrap_or_default());

    for name in redefined {
        tracing::warn!(
            catalog = %path.display(),
            workout = %name,
            "Workout defined more than once; using the last definition"
        );
    }

    tracing::debug!(catalog = %path.display(), workouts = catalog.len(), "Loaded catalog");
    Ok(catalog)
}

/// Load a training plan. An empty document is a parse error.
pub fn load_plan(path: &Path) -> Result<TrainingPlan, LoadError> {
    let plan: Option<TrainingPlan> = parse_yaml(path)?;
    let plan = plan.ok_or_else(|| LoadError::Parse {
        path: path.to_path_buf(),
        reason: "document is empty".to_string(),
    })?;

    tracing::debug!(
        plan = %path.display(),
        entries = plan.workouts.len(),
        "Loaded training plan"
    );
    Ok(plan)
}

/// Use `plan` as given when it exists, otherwise look for it under
/// `plans_dir`, with or without a `.yaml` extension.
pub fn resolve_plan_path(plan: &Path, plans_dir: &Path) -> PathBuf {
    if plan.exists() || plan.is_absolute() {
        return plan.to_path_buf();
    }

    let candidates = [
        plans_dir.join(plan),
        plans_dir.join(plan).with_extension("yaml"),
        plans_dir.join(plan).with_extension("yml"),
    ];
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .unwrap_or_else(|| plan.to_path_buf())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

/// All plan documents under `plans_dir`, sorted, paths relative to it
pub fn discover_plans(plans_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut plans = Vec::new();
    collect_yaml(plans_dir, &mut plans)?;

    let mut relative: Vec<PathBuf> = plans
        .into_iter()
        .map(|p| p.strip_prefix(plans_dir).map(Path::to_path_buf).unwrap_or(p))
        .collect();
    relative.sort();
    Ok(relative)
}

fn collect_yaml(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml(&path, found)?;
        } else if is_yaml(&path) {
            found.push(path);
        }
    }
    Ok(())
}
