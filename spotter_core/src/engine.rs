//! Progression engine: the session state machine.
//!
//! The engine is a pure reducer. Commands and clock events mutate
//! [`SessionState`] and return the [`Effect`]s the caller must carry out
//! (start or stop the countdown, play a cue). It never touches a clock,
//! audio device or storage itself, so it can be driven step by step in
//! tests.
//!
//! ```text
//! Idle -> Exercising <-> Paused
//!         Exercising -> Resting <-> Paused
//!         Resting -> Exercising | Complete
//!         any non-terminal -> Aborted (quit)
//! ```

use crate::{
    CompletedSetRecord, Cue, Error, ExercisePrescription, RecordSource, Result, SetKey,
    TimingConfig, WorkoutPlan,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Phase that was active before a pause
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivePhase {
    Exercising,
    Resting,
}

/// Top-level mode of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Exercising,
    Resting,
    Paused(ActivePhase),
    Complete,
    Aborted,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Complete | Phase::Aborted)
    }
}

impl From<ActivePhase> for Phase {
    fn from(active: ActivePhase) -> Self {
        match active {
            ActivePhase::Exercising => Phase::Exercising,
            ActivePhase::Resting => Phase::Resting,
        }
    }
}

/// How a session ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Aborted,
}

/// User commands understood by the engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    SkipSet,
    SkipExercise,
    PreviousExercise,
    Quit,
}

/// Side effects requested by a transition, to be applied in order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    StartClock(u32),
    PauseClock,
    ResumeClock,
    CancelClock,
    Cue(Cue),
    SessionEnded(Outcome),
}

/// Mutable session state, owned by the engine
#[derive(Clone, Debug, PartialEq)]
pub struct SessionState {
    pub current_exercise_index: usize,
    pub current_set_number: u32,
    pub phase: Phase,
    pub remaining_seconds: u32,
    pub completed_sets: BTreeMap<SetKey, CompletedSetRecord>,
    pub notes: BTreeMap<usize, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current_exercise_index: 0,
            current_set_number: 1,
            phase: Phase::Idle,
            remaining_seconds: 0,
            completed_sets: BTreeMap::new(),
            notes: BTreeMap::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Finite-state machine sequencing exercises, sets and rests
#[derive(Clone, Debug)]
pub struct ProgressionEngine {
    plan: WorkoutPlan,
    timing: TimingConfig,
    state: SessionState,
}

impl ProgressionEngine {
    pub fn new(plan: WorkoutPlan, timing: TimingConfig) -> Result<Self> {
        if plan.exercises.is_empty() {
            return Err(Error::PlanValidation("plan has no exercises".into()));
        }
        Ok(Self {
            plan,
            timing,
            state: SessionState::new(),
        })
    }

    pub fn plan(&self) -> &WorkoutPlan {
        &self.plan
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn current_exercise(&self) -> &ExercisePrescription {
        &self.plan.exercises[self.state.current_exercise_index]
    }

    /// Prescribed sets done with at least one rep, as a share of all prescribed sets
    pub fn progress_percent(&self) -> u8 {
        let total = self.plan.total_target_sets().max(1) as usize;
        let done = self
            .state
            .completed_sets
            .iter()
            .filter(|(key, record)| {
                record.reps > 0
                    && self
                        .plan
                        .exercises
                        .get(key.exercise_index)
                        .is_some_and(|ex| key.set_number <= ex.target_sets)
            })
            .count();
        ((done.min(total) * 100) / total) as u8
    }

    fn has_qualifying_set(&self) -> bool {
        self.state.completed_sets.values().any(|record| record.reps > 0)
    }

    fn work_seconds(&self) -> u32 {
        self.current_exercise()
            .target_duration_seconds
            .unwrap_or(self.timing.default_exercise_seconds)
    }

    fn is_last_exercise(&self) -> bool {
        self.state.current_exercise_index + 1 >= self.plan.exercises.len()
    }

    /// Apply a user command
    pub fn handle(&mut self, command: Command, now: DateTime<Utc>) -> Vec<Effect> {
        let phase = self.state.phase;
        if phase.is_terminal() {
            tracing::debug!("Ignoring {:?}: session already {:?}", command, phase);
            return Vec::new();
        }

        let effects = match command {
            Command::Start => self.start(),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::SkipSet => self.skip_set(now),
            Command::SkipExercise => self.skip_exercise(),
            Command::PreviousExercise => self.previous_exercise(),
            Command::Quit => self.quit(),
        };

        if effects.is_empty() {
            tracing::debug!("{:?} has no effect in phase {:?}", command, phase);
        }
        effects
    }

    /// Clock tick: mirror the remaining time while a countdown is live
    pub fn on_tick(&mut self, remaining_seconds: u32) {
        if matches!(self.state.phase, Phase::Exercising | Phase::Resting) {
            self.state.remaining_seconds = remaining_seconds;
        }
    }

    /// Clock expiry
    pub fn on_expire(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        match self.state.phase {
            Phase::Exercising => self.finish_set(now, RecordSource::Timer),
            Phase::Resting => {
                tracing::info!(
                    "Rest over: exercise {} set {}",
                    self.state.current_exercise_index,
                    self.state.current_set_number
                );
                self.begin_work()
            }
            phase => {
                tracing::debug!("Ignoring clock expiry in phase {:?}", phase);
                Vec::new()
            }
        }
    }

    fn start(&mut self) -> Vec<Effect> {
        if self.state.phase != Phase::Idle {
            return Vec::new();
        }
        tracing::info!(
            "Starting {} (set {})",
            self.current_exercise().name,
            self.state.current_set_number
        );
        self.begin_work()
    }

    fn begin_work(&mut self) -> Vec<Effect> {
        let seconds = self.work_seconds();
        self.state.phase = Phase::Exercising;
        self.state.remaining_seconds = seconds;
        vec![Effect::StartClock(seconds), Effect::Cue(Cue::Start)]
    }

    fn begin_rest(&mut self, seconds: u32) -> Vec<Effect> {
        if seconds == 0 {
            return self.begin_work();
        }
        self.state.phase = Phase::Resting;
        self.state.remaining_seconds = seconds;
        vec![Effect::StartClock(seconds), Effect::Cue(Cue::RestStart)]
    }

    fn pause(&mut self) -> Vec<Effect> {
        let active = match self.state.phase {
            Phase::Exercising => ActivePhase::Exercising,
            Phase::Resting => ActivePhase::Resting,
            _ => return Vec::new(),
        };
        self.state.phase = Phase::Paused(active);
        vec![Effect::PauseClock]
    }

    fn resume(&mut self) -> Vec<Effect> {
        match self.state.phase {
            Phase::Paused(active) => {
                self.state.phase = active.into();
                vec![Effect::ResumeClock]
            }
            _ => Vec::new(),
        }
    }

    /// Finalize the current set from the prescription and move on
    fn finish_set(&mut self, now: DateTime<Utc>, source: RecordSource) -> Vec<Effect> {
        let exercise = self.current_exercise();
        let record = CompletedSetRecord {
            reps: exercise.recorded_reps(),
            weight: exercise.target_weight,
            recorded_at: now,
            source,
        };
        let target_sets = exercise.target_sets;
        let rest_seconds = exercise.rest_seconds;

        let key = SetKey::new(
            self.state.current_exercise_index,
            self.state.current_set_number,
        );
        // A hand-entered record for this set wins over the prescription
        self.state.completed_sets.entry(key).or_insert(record);
        tracing::info!(
            "Set {} of exercise {} done ({:?})",
            key.set_number,
            key.exercise_index,
            source
        );

        if self.state.current_set_number < target_sets {
            self.state.current_set_number += 1;
            self.begin_rest(rest_seconds)
        } else if !self.is_last_exercise() {
            self.state.current_exercise_index += 1;
            self.state.current_set_number = 1;
            self.begin_rest(rest_seconds.max(self.timing.min_transition_rest_seconds))
        } else {
            self.complete()
        }
    }

    fn skip_set(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = vec![Effect::CancelClock];
        effects.extend(self.finish_set(now, RecordSource::Skipped));
        effects
    }

    fn skip_exercise(&mut self) -> Vec<Effect> {
        if self.is_last_exercise() {
            return self.complete();
        }
        tracing::info!(
            "Skipping rest of {} at set {}",
            self.current_exercise().name,
            self.state.current_set_number
        );
        self.state.current_exercise_index += 1;
        self.state.current_set_number = 1;
        self.state.phase = Phase::Idle;
        self.state.remaining_seconds = 0;
        vec![Effect::CancelClock]
    }

    fn previous_exercise(&mut self) -> Vec<Effect> {
        if self.state.current_exercise_index == 0 {
            return Vec::new();
        }
        self.state.current_exercise_index -= 1;
        self.state.current_set_number = 1;
        self.state.phase = Phase::Idle;
        self.state.remaining_seconds = 0;
        tracing::info!("Back to {}", self.current_exercise().name);
        vec![Effect::CancelClock]
    }

    /// End the session as complete.
    ///
    /// Refused with [`Error::EmptyLog`] while no recorded set has reps, and
    /// the state is left untouched. A no-op once the session has ended.
    pub fn finish(&mut self) -> Result<Vec<Effect>> {
        if self.state.phase.is_terminal() {
            return Ok(Vec::new());
        }
        if !self.has_qualifying_set() {
            return Err(Error::EmptyLog);
        }
        Ok(self.complete())
    }

    fn complete(&mut self) -> Vec<Effect> {
        self.state.phase = Phase::Complete;
        self.state.remaining_seconds = 0;
        tracing::info!(
            "Workout complete: {} sets recorded",
            self.state.completed_sets.len()
        );
        vec![
            Effect::CancelClock,
            Effect::Cue(Cue::Complete),
            Effect::SessionEnded(Outcome::Completed),
        ]
    }

    fn quit(&mut self) -> Vec<Effect> {
        self.state.phase = Phase::Aborted;
        self.state.remaining_seconds = 0;
        tracing::info!(
            "Workout aborted with {} sets recorded",
            self.state.completed_sets.len()
        );
        vec![Effect::CancelClock, Effect::SessionEnded(Outcome::Aborted)]
    }

    /// Record or overwrite a set by hand, without a timer cycle.
    ///
    /// Set numbers past the prescription are accepted, since real workouts
    /// may exceed it.
    pub fn manual_record_set(
        &mut self,
        exercise_index: usize,
        set_number: u32,
        reps: u32,
        weight: f64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if self.state.phase.is_terminal() {
            return Err(Error::InvalidRecord("the session has already ended".into()));
        }
        if exercise_index >= self.plan.exercises.len() {
            return Err(Error::InvalidRecord(format!(
                "no exercise #{} in this plan",
                exercise_index + 1
            )));
        }
        if set_number == 0 {
            return Err(Error::InvalidRecord("set numbers start at 1".into()));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidRecord(format!(
                "weight must be a non-negative number (got {})",
                weight
            )));
        }

        self.state.completed_sets.insert(
            SetKey::new(exercise_index, set_number),
            CompletedSetRecord {
                reps,
                weight,
                recorded_at: now,
                source: RecordSource::Manual,
            },
        );
        tracing::debug!(
            "Recorded {} reps @ {} for exercise {} set {}",
            reps,
            weight,
            exercise_index,
            set_number
        );
        Ok(())
    }

    /// Attach free text to an exercise; empty text clears the note
    pub fn set_note(&mut self, exercise_index: usize, text: &str) -> Result<()> {
        if exercise_index >= self.plan.exercises.len() {
            return Err(Error::InvalidRecord(format!(
                "no exercise #{} in this plan",
                exercise_index + 1
            )));
        }
        let text = text.trim();
        if text.is_empty() {
            self.state.notes.remove(&exercise_index);
        } else {
            self.state.notes.insert(exercise_index, text.to_string());
        }
        Ok(())
    }
}
