#![forbid(unsafe_code)]

//! Core logic for Spotter, a guided workout-session runner.
//!
//! This crate provides:
//! - Plan ingestion and validation
//! - The progression engine (exercise/set/rest state machine)
//! - A drift-free pausable countdown clock
//! - Audio cues, session log building and the persistence port
//! - The orchestrator tying them together

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod plan;
pub mod clock;
pub mod cues;
pub mod engine;
pub mod session_log;
pub mod outbox;
pub mod orchestrator;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::{AudioConfig, Config, DataConfig, TimingConfig};
pub use clock::{ClockEvent, ManualTimeSource, SessionClock, SystemTimeSource, TimeSource};
pub use cues::{Cue, CueEmitter, SilentSink, TerminalBell, Tone, ToneSink};
pub use engine::{ActivePhase, Command, Effect, Outcome, Phase, ProgressionEngine, SessionState};
pub use session_log::{build_session_log, duration_minutes};
pub use outbox::{read_submitted_logs, JsonlLogSink, LogSubmitter, SubmittedLog};
pub use orchestrator::{SessionOrchestrator, Snapshot, Submission};
