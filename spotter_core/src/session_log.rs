//! Builds the persisted session log from accumulated set records.

use crate::{
    Error, ExerciseLog, ExercisePrescription, Result, SessionLog, SessionState, SetLog,
};
use chrono::{DateTime, Utc};

/// Whole minutes between two instants, rounded up, never below 1
pub fn duration_minutes(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> u32 {
    let millis = (ended_at - started_at).num_milliseconds().max(0);
    let minutes = (millis + 59_999) / 60_000;
    u32::try_from(minutes).unwrap_or(u32::MAX).max(1)
}

/// Join per-exercise notes into one block, in plan order
fn collect_notes(state: &SessionState, exercises: &[ExercisePrescription]) -> String {
    state
        .notes
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(index, text)| match exercises.get(*index) {
            Some(exercise) => format!("{}: {}", exercise.name, text.trim()),
            None => text.trim().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert session state into the log handed to the persistence port.
///
/// Only sets with `reps > 0` qualify, ordered by set number; exercises
/// without a qualifying set are left out. Fails with [`Error::EmptyLog`]
/// when nothing qualifies.
pub fn build_session_log(
    state: &SessionState,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    workout_plan_id: Option<&str>,
    exercises: &[ExercisePrescription],
) -> Result<SessionLog> {
    let mut exercises_completed = Vec::new();

    for (index, exercise) in exercises.iter().enumerate() {
        // completed_sets is ordered by (exercise, set number)
        let sets: Vec<SetLog> = state
            .completed_sets
            .iter()
            .filter(|(key, record)| key.exercise_index == index && record.reps > 0)
            .map(|(_, record)| SetLog {
                reps: record.reps,
                weight: record.weight,
            })
            .collect();

        if !sets.is_empty() {
            exercises_completed.push(ExerciseLog {
                name: exercise.name.clone(),
                sets,
            });
        }
    }

    if exercises_completed.is_empty() {
        return Err(Error::EmptyLog);
    }

    Ok(SessionLog {
        workout_plan_id: workout_plan_id.map(str::to_string),
        duration_minutes: duration_minutes(started_at, ended_at),
        exercises_completed,
        notes: collect_notes(state, exercises),
        workout_date: ended_at,
    })
}
