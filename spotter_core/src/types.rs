//! Core domain types for Spotter.
//!
//! This module defines the fundamental types used throughout the system:
//! - Workout plans and per-exercise prescriptions
//! - Completed set records collected during a session
//! - The finalized session log handed to the persistence port

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Plan Types
// ============================================================================

/// Prescribed repetitions for one set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetReps {
    Exact(u32),
    Range { min: u32, max: u32 },
}

impl TargetReps {
    /// Reps written into a set finalized from the prescription.
    ///
    /// Ranges record their lower bound; the user can edit upwards afterwards.
    pub fn recorded(&self) -> u32 {
        match self {
            TargetReps::Exact(reps) => *reps,
            TargetReps::Range { min, .. } => *min,
        }
    }
}

impl fmt::Display for TargetReps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetReps::Exact(reps) => write!(f, "{}", reps),
            TargetReps::Range { min, max } => write!(f, "{}-{}", min, max),
        }
    }
}

/// Planned target for one exercise within a plan
#[derive(Clone, Debug, PartialEq)]
pub struct ExercisePrescription {
    pub name: String,
    /// Always at least 1 after ingestion
    pub target_sets: u32,
    pub target_reps: Option<TargetReps>,
    /// Present for timed exercises; rep-based sets use the configured interval
    pub target_duration_seconds: Option<u32>,
    pub rest_seconds: u32,
    pub target_weight: f64,
    pub muscle_groups: BTreeSet<String>,
    pub instructions: Option<String>,
}

impl ExercisePrescription {
    /// Reps recorded when a set is finalized by timer expiry or skip
    pub fn recorded_reps(&self) -> u32 {
        // A timed set without a rep target counts as one effort
        self.target_reps.map(|r| r.recorded()).unwrap_or(1)
    }

    /// Human-readable target, e.g. "3 sets x 8-12" or "2 sets x 45s"
    pub fn target_summary(&self) -> String {
        let per_set = match (self.target_reps, self.target_duration_seconds) {
            (Some(reps), _) => reps.to_string(),
            (None, Some(seconds)) => format!("{}s", seconds),
            (None, None) => "?".to_string(),
        };
        format!("{} sets x {}", self.target_sets, per_set)
    }
}

/// A validated workout plan, immutable for the duration of a session
#[derive(Clone, Debug, PartialEq)]
pub struct WorkoutPlan {
    pub id: Option<String>,
    pub name: String,
    pub exercises: Vec<ExercisePrescription>,
}

impl WorkoutPlan {
    /// Sum of target sets across all exercises
    pub fn total_target_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.target_sets).sum()
    }
}

// ============================================================================
// Session Record Types
// ============================================================================

/// How a completed set came to be recorded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordSource {
    /// The exercise countdown ran out
    Timer,
    /// The user skipped the remaining countdown
    Skipped,
    /// The user typed in reps/weight by hand
    Manual,
}

/// Key of a completed set; ordering is exercise first, then set number
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetKey {
    pub exercise_index: usize,
    pub set_number: u32,
}

impl SetKey {
    pub fn new(exercise_index: usize, set_number: u32) -> Self {
        Self {
            exercise_index,
            set_number,
        }
    }
}

/// The actually-performed reps/weight for one set
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedSetRecord {
    pub reps: u32,
    pub weight: f64,
    pub recorded_at: DateTime<Utc>,
    pub source: RecordSource,
}

// ============================================================================
// Session Log Types (persistence payload)
// ============================================================================

/// One performed set in the persisted log
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SetLog {
    pub reps: u32,
    pub weight: f64,
}

/// One exercise with at least one qualifying set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseLog {
    pub name: String,
    pub sets: Vec<SetLog>,
}

/// The finalized record of a session, submitted once on Complete or Aborted
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionLog {
    pub workout_plan_id: Option<String>,
    pub duration_minutes: u32,
    pub exercises_completed: Vec<ExerciseLog>,
    pub notes: String,
    pub workout_date: DateTime<Utc>,
}

impl SessionLog {
    /// Total number of sets across all exercises
    pub fn set_count(&self) -> usize {
        self.exercises_completed.iter().map(|e| e.sets.len()).sum()
    }
}
