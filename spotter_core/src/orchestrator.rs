//! Session orchestrator: wires commands, the countdown clock, audio cues and
//! the persistence port around the progression engine.
//!
//! Everything runs on the caller's thread. The caller feeds user commands
//! in and calls [`SessionOrchestrator::poll`] regularly so clock events
//! reach the engine.

use crate::{
    build_session_log, ClockEvent, Command, Config, CueEmitter, Effect, Error, LogSubmitter,
    Outcome, Phase, ProgressionEngine, Result, SessionClock, SessionLog, SessionState,
    TimeSource, ToneSink, WorkoutPlan,
};
use chrono::{DateTime, Duration, Utc};

/// Where the finished log is in its trip to the persistence port
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    /// The session has not ended yet
    NotAttempted,
    /// The session ended with nothing worth persisting
    NothingToSubmit,
    /// Built but not yet accepted; retry with `retry_submission`
    Pending(SessionLog),
    /// Accepted by the persistence port
    Submitted(SessionLog),
}

/// Immutable view handed to the UI after each step
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub state: SessionState,
    pub exercise_name: String,
    pub target_sets: u32,
    pub exercise_count: usize,
    pub progress_percent: u8,
    pub sound_enabled: bool,
}

pub struct SessionOrchestrator<T: TimeSource + Clone, S: ToneSink, P: LogSubmitter> {
    engine: ProgressionEngine,
    clock: SessionClock<T>,
    time: T,
    cues: CueEmitter<S>,
    submitter: P,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    submission: Submission,
}

impl<T: TimeSource + Clone, S: ToneSink, P: LogSubmitter> SessionOrchestrator<T, S, P> {
    /// Set up a session for `plan`. `started_at` anchors wall-clock
    /// timestamps; elapsed time after it comes from the monotonic source.
    pub fn new(
        plan: WorkoutPlan,
        config: &Config,
        time: T,
        tones: S,
        submitter: P,
        started_at: DateTime<Utc>,
    ) -> Result<Self> {
        let engine = ProgressionEngine::new(plan, config.timing.clone())?;
        Ok(Self {
            engine,
            clock: SessionClock::new(time.clone()),
            time,
            cues: CueEmitter::new(tones, config.audio.enabled),
            submitter,
            started_at,
            ended_at: None,
            submission: Submission::NotAttempted,
        })
    }

    /// Wall-clock "now", derived from the start time plus monotonic elapsed time
    fn now(&self) -> DateTime<Utc> {
        let elapsed = Duration::from_std(self.time.elapsed()).unwrap_or_else(|_| Duration::zero());
        self.started_at + elapsed
    }

    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    pub fn phase(&self) -> Phase {
        self.engine.phase()
    }

    pub fn submission(&self) -> &Submission {
        &self.submission
    }

    pub fn submitter(&self) -> &P {
        &self.submitter
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn snapshot(&self) -> Snapshot {
        let exercise = self.engine.current_exercise();
        Snapshot {
            state: self.engine.state().clone(),
            exercise_name: exercise.name.clone(),
            target_sets: exercise.target_sets,
            exercise_count: self.engine.plan().exercises.len(),
            progress_percent: self.engine.progress_percent(),
            sound_enabled: self.cues.enabled(),
        }
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.cues.set_enabled(enabled);
    }

    pub fn start(&mut self) -> Result<()> {
        self.command(Command::Start)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.command(Command::Pause)
    }

    pub fn resume(&mut self) -> Result<()> {
        self.command(Command::Resume)
    }

    pub fn skip_set(&mut self) -> Result<()> {
        self.command(Command::SkipSet)
    }

    pub fn skip_exercise(&mut self) -> Result<()> {
        self.command(Command::SkipExercise)
    }

    pub fn previous_exercise(&mut self) -> Result<()> {
        self.command(Command::PreviousExercise)
    }

    /// Abort the session and submit whatever was recorded
    pub fn quit(&mut self) -> Result<()> {
        self.command(Command::Quit)
    }

    /// End the session as complete. Refused with [`Error::EmptyLog`], and
    /// nothing changes, while no set qualifies for the log.
    pub fn finish(&mut self) -> Result<()> {
        let effects = self.engine.finish()?;
        self.dispatch(effects)
    }

    /// Record a set by hand; `manualRecordSet` of the logging workflow
    pub fn record_set(
        &mut self,
        exercise_index: usize,
        set_number: u32,
        reps: u32,
        weight: f64,
    ) -> Result<()> {
        let now = self.now();
        self.engine
            .manual_record_set(exercise_index, set_number, reps, weight, now)
    }

    pub fn set_note(&mut self, exercise_index: usize, text: &str) -> Result<()> {
        self.engine.set_note(exercise_index, text)
    }

    /// Deliver due clock events to the engine. Returns the event handled, if any.
    pub fn poll(&mut self) -> Result<Option<ClockEvent>> {
        let Some(event) = self.clock.poll() else {
            return Ok(None);
        };
        match event {
            ClockEvent::Tick(remaining) => self.engine.on_tick(remaining),
            ClockEvent::Expired => {
                let now = self.now();
                let effects = self.engine.on_expire(now);
                self.dispatch(effects)?;
            }
        }
        Ok(Some(event))
    }

    /// Resubmit a log whose earlier submission failed
    pub fn retry_submission(&mut self) -> Result<()> {
        match &self.submission {
            Submission::Pending(log) => {
                let log = log.clone();
                self.submit(log)
            }
            _ => Ok(()),
        }
    }

    fn command(&mut self, command: Command) -> Result<()> {
        let now = self.now();
        let effects = self.engine.handle(command, now);
        self.dispatch(effects)
    }

    fn dispatch(&mut self, effects: Vec<Effect>) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::StartClock(seconds) => self.clock.start(seconds),
                Effect::PauseClock => {
                    self.clock.pause();
                }
                Effect::ResumeClock => {
                    self.clock.resume();
                    self.engine.on_tick(self.clock.remaining_secs());
                }
                Effect::CancelClock => self.clock.cancel(),
                Effect::Cue(cue) => self.cues.emit(cue),
                Effect::SessionEnded(outcome) => self.end_session(outcome)?,
            }
        }
        Ok(())
    }

    fn end_session(&mut self, outcome: Outcome) -> Result<()> {
        let ended_at = self.now();
        self.ended_at = Some(ended_at);

        let plan = self.engine.plan();
        let log = match build_session_log(
            self.engine.state(),
            self.started_at,
            ended_at,
            plan.id.as_deref(),
            &plan.exercises,
        ) {
            Ok(log) => log,
            Err(Error::EmptyLog) => {
                tracing::info!("Session {:?} with no qualifying sets; nothing submitted", outcome);
                self.submission = Submission::NothingToSubmit;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Session {:?}: {} exercises, {} min",
            outcome,
            log.exercises_completed.len(),
            log.duration_minutes
        );
        self.submit(log)
    }

    fn submit(&mut self, log: SessionLog) -> Result<()> {
        match self.submitter.submit(&log) {
            Ok(()) => {
                self.submission = Submission::Submitted(log);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Session log submission failed: {}", e);
                self.submission = Submission::Pending(log);
                Err(match e {
                    Error::Submission(msg) => Error::Submission(msg),
                    other => Error::Submission(other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cues::tests::RecordingSink;
    use crate::{Cue, ExercisePrescription, ManualTimeSource, TargetReps};
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct MemorySubmitter {
        accepted: Vec<SessionLog>,
        failures_left: usize,
    }

    impl LogSubmitter for MemorySubmitter {
        fn submit(&mut self, log: &SessionLog) -> Result<()> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(Error::Submission("server returned 503".into()));
            }
            self.accepted.push(log.clone());
            Ok(())
        }
    }

    type TestSession = SessionOrchestrator<ManualTimeSource, RecordingSink, MemorySubmitter>;

    fn plan(exercises: usize, sets: u32) -> WorkoutPlan {
        WorkoutPlan {
            id: Some("11".into()),
            name: "Full Body".into(),
            exercises: (0..exercises)
                .map(|i| ExercisePrescription {
                    name: format!("Exercise {}", i),
                    target_sets: sets,
                    target_reps: Some(TargetReps::Exact(10)),
                    target_duration_seconds: None,
                    rest_seconds: 60,
                    target_weight: 15.0,
                    muscle_groups: BTreeSet::new(),
                    instructions: None,
                })
                .collect(),
        }
    }

    fn session(exercises: usize, sets: u32) -> (ManualTimeSource, TestSession) {
        let time = ManualTimeSource::new();
        let started_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let orchestrator = SessionOrchestrator::new(
            plan(exercises, sets),
            &Config::default(),
            time.clone(),
            RecordingSink::default(),
            MemorySubmitter::default(),
            started_at,
        )
        .unwrap();
        (time, orchestrator)
    }

    /// Advance one second at a time, polling like an event loop would
    fn run_for(time: &ManualTimeSource, session: &mut TestSession, secs: u64) {
        for _ in 0..secs {
            time.advance_secs(1);
            session.poll().unwrap();
        }
    }

    #[test]
    fn test_timer_driven_session_completes_and_submits() {
        let (time, mut session) = session(2, 3);
        session.start().unwrap();

        // 2 exercises x 3 sets of 30s, 2 x 60s rest within each, 120s between
        run_for(&time, &mut session, 6 * 30 + 4 * 60 + 120);

        assert_eq!(session.phase(), Phase::Complete);
        let accepted = &session.submitter().accepted;
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].exercises_completed.len(), 2);
        assert!(accepted[0].exercises_completed.iter().all(|e| e.sets.len() == 3));
        assert_eq!(accepted[0].duration_minutes, 9);
        assert_eq!(accepted[0].workout_plan_id.as_deref(), Some("11"));
        assert!(matches!(session.submission(), Submission::Submitted(_)));
    }

    #[test]
    fn test_skip_set_scenario_two_by_three() {
        let (_time, mut session) = session(2, 3);
        for _ in 0..6 {
            session.skip_set().unwrap();
        }
        assert_eq!(session.phase(), Phase::Complete);
        let log = &session.submitter().accepted[0];
        assert_eq!(log.exercises_completed.len(), 2);
        assert_eq!(log.exercises_completed[1].sets.len(), 3);
    }

    #[test]
    fn test_ticks_update_snapshot_and_pause_freezes() {
        let (time, mut session) = session(1, 1);
        session.start().unwrap();
        run_for(&time, &mut session, 5);
        assert_eq!(session.snapshot().state.remaining_seconds, 25);

        session.pause().unwrap();
        run_for(&time, &mut session, 300);
        assert_eq!(session.snapshot().state.remaining_seconds, 25);
        assert_eq!(session.phase(), Phase::Paused(crate::ActivePhase::Exercising));

        session.resume().unwrap();
        run_for(&time, &mut session, 24);
        assert_eq!(session.snapshot().state.remaining_seconds, 1);
        run_for(&time, &mut session, 1);
        assert_eq!(session.phase(), Phase::Complete);
    }

    #[test]
    fn test_quit_submits_partial_log() {
        let (time, mut session) = session(2, 3);
        session.start().unwrap();
        run_for(&time, &mut session, 30); // set 1 done by timer
        session.skip_set().unwrap(); // set 2 skipped during rest
        time.advance_secs(200);
        session.quit().unwrap();

        assert_eq!(session.phase(), Phase::Aborted);
        let log = &session.submitter().accepted[0];
        assert_eq!(log.exercises_completed.len(), 1);
        assert_eq!(log.exercises_completed[0].sets.len(), 2);
        // 230 seconds elapsed
        assert_eq!(log.duration_minutes, 4);
        assert_eq!(
            log.workout_date,
            session.started_at() + Duration::seconds(230)
        );

        // Nothing reacts after the session has ended
        run_for(&time, &mut session, 120);
        assert_eq!(session.submitter().accepted.len(), 1);
    }

    #[test]
    fn test_quit_with_nothing_recorded_submits_nothing() {
        let (_time, mut session) = session(1, 3);
        session.quit().unwrap();
        assert_eq!(session.phase(), Phase::Aborted);
        assert_eq!(session.submission(), &Submission::NothingToSubmit);
        assert!(session.submitter().accepted.is_empty());
    }

    #[test]
    fn test_finish_with_zero_rep_sets_is_refused() {
        let (_time, mut session) = session(2, 3);
        session.record_set(0, 1, 0, 40.0).unwrap();
        session.record_set(1, 1, 0, 40.0).unwrap();

        let err = session.finish().unwrap_err();
        assert!(matches!(err, Error::EmptyLog));
        assert!(err.is_recoverable());
        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.submission(), &Submission::NotAttempted);

        session.record_set(1, 1, 12, 40.0).unwrap();
        session.finish().unwrap();
        assert_eq!(session.phase(), Phase::Complete);
        let log = &session.submitter().accepted[0];
        assert_eq!(log.exercises_completed.len(), 1);
        assert_eq!(log.exercises_completed[0].name, "Exercise 1");
    }

    #[test]
    fn test_failed_submission_can_be_retried() {
        let (_time, mut session) = session(1, 1);
        session.submitter.failures_left = 1;
        session.record_set(0, 1, 10, 15.0).unwrap();

        let err = session.finish().unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        assert_eq!(session.phase(), Phase::Complete);
        assert!(matches!(session.submission(), Submission::Pending(_)));

        session.retry_submission().unwrap();
        assert!(matches!(session.submission(), Submission::Submitted(_)));
        assert_eq!(session.submitter().accepted.len(), 1);
    }

    #[test]
    fn test_cues_follow_transitions() {
        let (time, mut session) = session(1, 2);
        session.start().unwrap();
        run_for(&time, &mut session, 30 + 60 + 30);
        assert_eq!(session.phase(), Phase::Complete);

        let played = &session.cues.sink().played;
        assert_eq!(
            played,
            &vec![
                Cue::Start.tone(),
                Cue::RestStart.tone(),
                Cue::Start.tone(),
                Cue::Complete.tone(),
            ]
        );
    }

    #[test]
    fn test_muted_session_plays_nothing() {
        let (_time, mut session) = session(1, 1);
        session.set_sound_enabled(false);
        session.start().unwrap();
        session.skip_set().unwrap();
        assert!(session.cues.sink().played.is_empty());
        assert!(!session.snapshot().sound_enabled);
    }
}
