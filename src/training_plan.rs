//! Training plan resolution
//!
//! A plan lists catalog workouts by name, possibly more than once. Resolving
//! turns every entry into its own owned copy and renaming gives each copy the
//! output name the plan asks for.

use serde::{Deserialize, Serialize};

use crate::logging::DiagnosticSink;
use crate::models::{ResolvedWorkout, TrainingPlan, WorkoutCatalog};

/// How output names are built, from the plan's two flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingPolicy {
    /// `{prefix}_{n}`
    PrefixIndex,
    /// `{prefix}` for every workout; later files overwrite earlier ones
    PrefixOnly,
    /// `{prefix}_{n}_{name}`
    PrefixIndexName,
    /// `{prefix}_{name}`
    PrefixName,
}

impl NamingPolicy {
    pub fn from_flags(rename_enabled: bool, indexing_enabled: bool) -> Self {
        match (rename_enabled, indexing_enabled) {
            (true, true) => NamingPolicy::PrefixIndex,
            (true, false) => NamingPolicy::PrefixOnly,
            (false, true) => NamingPolicy::PrefixIndexName,
            (false, false) => NamingPolicy::PrefixName,
        }
    }

    pub fn for_plan(plan: &TrainingPlan) -> Self {
        Self::from_flags(plan.workout_rename_enabled, plan.workout_indexing_enabled)
    }

    /// Output name for the workout at 0-based `index`
    pub fn output_name(&self, prefix: &str, index: usize, original_name: &str) -> String {
        let number = index + 1;
        match self {
            NamingPolicy::PrefixIndex => format!("{}_{}", prefix, number),
            NamingPolicy::PrefixOnly => prefix.to_string(),
            NamingPolicy::PrefixIndexName => {
                format!("{}_{}_{}", prefix, number, sanitize_name(original_name))
            }
            NamingPolicy::PrefixName => format!("{}_{}", prefix, sanitize_name(original_name)),
        }
    }

    /// Every output gets the same name
    pub fn collides(&self) -> bool {
        matches!(self, NamingPolicy::PrefixOnly)
    }
}

/// Spaces to underscores, lower case
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_").to_lowercase()
}

/// Copy every plan entry found in the catalog, in plan order.
///
/// Names missing from the catalog are reported to `diagnostics` and skipped.
/// Repeated names produce separate copies.
pub fn resolve(
    plan: &TrainingPlan,
    catalog: &WorkoutCatalog,
    diagnostics: &mut dyn DiagnosticSink,
) -> Vec<ResolvedWorkout> {
    let mut resolved = Vec::with_capacity(plan.workouts.len());

    for (position, name) in plan.workouts.iter().enumerate() {
        match catalog.get(name) {
            Some(def) => resolved.push(ResolvedWorkout::from_def(def)),
            None => diagnostics.warn(
                &format!("plan entry {} '{}'", position + 1, name),
                &format!(
                    "Workout '{}' from training plan not found in available workouts",
                    name
                ),
            ),
        }
    }

    tracing::debug!(
        requested = plan.workouts.len(),
        resolved = resolved.len(),
        "Resolved training plan"
    );
    resolved
}

/// Apply the plan's naming policy in place. Indices count resolved workouts,
/// so skipped entries leave no gaps.
pub fn rename(workouts: &mut [ResolvedWorkout], plan: &TrainingPlan) {
    let policy = NamingPolicy::for_plan(plan);

    if policy.collides() && workouts.len() > 1 {
        tracing::warn!(
            prefix = %plan.workout_file_prefix,
            count = workouts.len(),
            "Renaming without indexing gives every workout the same name; output files will overwrite each other"
        );
    }

    for (index, workout) in workouts.iter_mut().enumerate() {
        workout.name = policy.output_name(&plan.workout_file_prefix, index, &workout.source_name);
    }
}

/// Resolve and rename in one go
pub fn build_plan_workouts(
    plan: &TrainingPlan,
    catalog: &WorkoutCatalog,
    diagnostics: &mut dyn DiagnosticSink,
) -> Vec<ResolvedWorkout> {
    let mut workouts = resolve(plan, catalog, diagnostics);
    rename(&mut workouts, plan);
    workouts
}
