use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One interval of a workout as written in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    /// Duration in `MM:SS`
    pub time: String,

    /// Power target relative to FTP, e.g. `"55%"`
    pub ftp_percentage: String,
}

impl StepDef {
    pub fn new(time: impl Into<String>, ftp_percentage: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            ftp_percentage: ftp_percentage.into(),
        }
    }
}

/// Workout definition from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutDef {
    pub name: String,

    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// Workout catalog document as it appears on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Default FTP for workouts generated straight from the catalog
    #[serde(default)]
    pub ftp: Option<u16>,

    #[serde(default)]
    pub workouts: Vec<WorkoutDef>,
}

/// Name-indexed set of workouts, read-only after load
#[derive(Debug, Clone, Default)]
pub struct WorkoutCatalog {
    ftp: Option<u16>,
    workouts: Vec<WorkoutDef>,
    by_name: HashMap<String, usize>,
}

impl WorkoutCatalog {
    /// Build the lookup table. A name defined twice keeps the later definition
    /// and is reported back so the loader can warn about it.
    pub fn from_document(document: CatalogDocument) -> (Self, Vec<String>) {
        let mut catalog = WorkoutCatalog {
            ftp: document.ftp,
            ..Default::default()
        };
        let mut redefined = Vec::new();

        for workout in document.workouts {
            match catalog.by_name.get(&workout.name) {
                Some(&slot) => {
                    redefined.push(workout.name.clone());
                    catalog.workouts[slot] = workout;
                }
                None => {
                    catalog.by_name.insert(workout.name.clone(), catalog.workouts.len());
                    catalog.workouts.push(workout);
                }
            }
        }

        (catalog, redefined)
    }

    pub fn get(&self, name: &str) -> Option<&WorkoutDef> {
        self.by_name.get(name).map(|&slot| &self.workouts[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Workouts in catalog order
    pub fn workouts(&self) -> &[WorkoutDef] {
        &self.workouts
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.workouts.iter().map(|w| w.name.as_str())
    }

    pub fn ftp(&self) -> Option<u16> {
        self.ftp
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

fn default_prefix() -> String {
    "w".to_string()
}

fn default_indexing() -> bool {
    true
}

/// Training plan: an ordered list of catalog references plus naming policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlan {
    #[serde(default)]
    pub ftp: Option<u16>,

    /// Catalog workout names, repeats allowed
    #[serde(default)]
    pub workouts: Vec<String>,

    #[serde(default = "default_prefix")]
    pub workout_file_prefix: String,

    #[serde(default)]
    pub workout_rename_enabled: bool,

    #[serde(default = "default_indexing")]
    pub workout_indexing_enabled: bool,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            ftp: None,
            workouts: Vec::new(),
            workout_file_prefix: default_prefix(),
            workout_rename_enabled: false,
            workout_indexing_enabled: default_indexing(),
        }
    }
}

/// Owned copy of a catalog workout carrying its output name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedWorkout {
    pub name: String,

    /// Catalog name this copy was made from
    pub source_name: String,

    pub steps: Vec<StepDef>,
}

impl ResolvedWorkout {
    pub fn from_def(def: &WorkoutDef) -> Self {
        Self {
            name: def.name.clone(),
            source_name: def.name.clone(),
            steps: def.steps.clone(),
        }
    }

    /// File name of the FIT workout written for this entry
    pub fn file_name(&self) -> String {
        format!("{}_workout.fit", self.name)
    }
}

/// Step after unit conversion, ready for the FIT writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreparedStep {
    pub duration_ms: u64,

    /// Watts plus the FIT custom power offset
    pub power_offset: i64,
}
