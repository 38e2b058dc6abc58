//! Workout plan ingestion.
//!
//! Plans arrive as JSON from the plan-generation collaborator. All validation
//! happens here so the progression engine can assume a well-formed plan.

use crate::{Error, ExercisePrescription, Result, TargetReps, TimingConfig, WorkoutPlan};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

/// Plan id as sent by the backend: numeric or string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// Reps as they appear in generated plans: `10`, `"10"`, `"8-12"` or `{min, max}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawReps {
    Number(i64),
    Text(String),
    Range { min: i64, max: i64 },
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    name: String,
    #[serde(default)]
    sets: Option<i64>,
    #[serde(default)]
    reps: Option<RawReps>,
    #[serde(default)]
    duration_seconds: Option<i64>,
    #[serde(default)]
    rest_seconds: Option<i64>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    muscle_groups: Vec<String>,
    #[serde(default)]
    instructions: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    id: Option<RawId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exercises: Vec<RawExercise>,
}

fn non_negative(value: i64, field: &str, exercise: &str) -> Result<u32> {
    if value < 0 {
        return Err(Error::PlanValidation(format!(
            "{}: {} must not be negative (got {})",
            exercise, field, value
        )));
    }
    u32::try_from(value).map_err(|_| {
        Error::PlanValidation(format!("{}: {} is out of range ({})", exercise, field, value))
    })
}

fn parse_reps(raw: RawReps, exercise: &str) -> Result<TargetReps> {
    let (min, max) = match raw {
        RawReps::Number(n) => (n, n),
        RawReps::Range { min, max } => (min, max),
        RawReps::Text(text) => {
            let text = text.trim();
            let parsed = match text.split_once('-') {
                Some((lo, hi)) => lo
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .zip(hi.trim().parse::<i64>().ok()),
                None => text.parse::<i64>().ok().map(|n| (n, n)),
            };
            parsed.ok_or_else(|| {
                Error::PlanValidation(format!("{}: unreadable reps {:?}", exercise, text))
            })?
        }
    };

    let min = non_negative(min, "reps", exercise)?;
    let max = non_negative(max, "reps", exercise)?;
    match min.cmp(&max) {
        std::cmp::Ordering::Equal => Ok(TargetReps::Exact(min)),
        std::cmp::Ordering::Less => Ok(TargetReps::Range { min, max }),
        std::cmp::Ordering::Greater => Err(Error::PlanValidation(format!(
            "{}: reps range {}-{} is inverted",
            exercise, min, max
        ))),
    }
}

fn ingest_exercise(raw: RawExercise, timing: &TimingConfig) -> Result<ExercisePrescription> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::PlanValidation("exercise name is empty".into()));
    }

    let target_sets = match raw.sets {
        Some(sets) => non_negative(sets, "sets", &name)?.max(1),
        None => 1,
    };

    let target_reps = raw.reps.map(|r| parse_reps(r, &name)).transpose()?;

    let target_duration_seconds = match raw.duration_seconds {
        Some(seconds) => Some(non_negative(seconds, "duration_seconds", &name)?).filter(|s| *s > 0),
        None => None,
    };

    if target_reps.is_none() && target_duration_seconds.is_none() {
        return Err(Error::PlanValidation(format!(
            "{}: needs either reps or duration_seconds",
            name
        )));
    }

    let rest_seconds = match raw.rest_seconds {
        Some(rest) => non_negative(rest, "rest_seconds", &name)?,
        None => timing.default_rest_seconds,
    };

    let target_weight = raw.weight.unwrap_or(0.0);
    if !target_weight.is_finite() || target_weight < 0.0 {
        return Err(Error::PlanValidation(format!(
            "{}: weight must be a non-negative number",
            name
        )));
    }

    Ok(ExercisePrescription {
        name,
        target_sets,
        target_reps,
        target_duration_seconds,
        rest_seconds,
        target_weight,
        muscle_groups: raw
            .muscle_groups
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect::<BTreeSet<_>>(),
        instructions: raw.instructions.filter(|i| !i.trim().is_empty()),
    })
}

impl WorkoutPlan {
    /// Parse and validate a plan from its JSON representation
    pub fn from_json(json: &str, timing: &TimingConfig) -> Result<Self> {
        let raw: RawPlan = serde_json::from_str(json)?;

        if raw.exercises.is_empty() {
            return Err(Error::PlanValidation("plan has no exercises".into()));
        }

        let exercises = raw
            .exercises
            .into_iter()
            .map(|e| ingest_exercise(e, timing))
            .collect::<Result<Vec<_>>>()?;

        let plan = WorkoutPlan {
            id: raw.id.map(|id| match id {
                RawId::Number(n) => n.to_string(),
                RawId::Text(s) => s,
            }),
            name: raw
                .name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Workout".to_string()),
            exercises,
        };

        tracing::debug!(
            "Ingested plan {:?} with {} exercises",
            plan.name,
            plan.exercises.len()
        );
        Ok(plan)
    }

    /// Load a plan file; a missing file means there is no plan to run
    pub fn load(path: &Path, timing: &TimingConfig) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingPlan(format!(
                "{} does not exist; generate a workout first",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        let plan = Self::from_json(&contents, timing)?;
        tracing::info!("Loaded plan {:?} from {:?}", plan.name, path);
        Ok(plan)
    }
}
