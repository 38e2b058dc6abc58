use clap::{Parser, Subcommand};
use spotter_core::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

/// How often the event loop wakes up to poll the countdown
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(name = "spotter")]
#[command(about = "Guided workout session runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a guided session for a workout plan
    Run {
        /// Plan JSON produced by the workout generator
        #[arg(long)]
        plan: PathBuf,

        /// Auto-complete (for testing) - skip through every set without waiting
        #[arg(long)]
        auto: bool,

        /// Print the session log instead of saving it
        #[arg(long)]
        dry_run: bool,

        /// Start with audio cues muted
        #[arg(long)]
        no_sound: bool,
    },

    /// Check a plan file without starting a session
    Validate {
        #[arg(long)]
        plan: PathBuf,
    },

    /// List saved session logs
    History {
        /// Number of most recent logs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> ExitCode {
    spotter_core::logging::init_with_level("warn");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }

    match cli.command {
        Commands::Run {
            plan,
            auto,
            dry_run,
            no_sound,
        } => cmd_run(&config, plan, auto, dry_run, no_sound),
        Commands::Validate { plan } => cmd_validate(&config, plan),
        Commands::History { limit } => cmd_history(&config, limit),
    }
}

/// Prints the log instead of persisting it
struct DryRunSink;

impl LogSubmitter for DryRunSink {
    fn submit(&mut self, log: &SessionLog) -> Result<()> {
        println!("\n[Dry run - log not saved]");
        println!("{}", serde_json::to_string_pretty(log)?);
        Ok(())
    }
}

type CliSession =
    SessionOrchestrator<SystemTimeSource, Box<dyn ToneSink>, Box<dyn LogSubmitter>>;

fn cmd_run(
    config: &Config,
    plan_path: PathBuf,
    auto: bool,
    dry_run: bool,
    no_sound: bool,
) -> Result<()> {
    let plan = WorkoutPlan::load(&plan_path, &config.timing)?;
    display_plan(&plan);
    tracing::info!(
        "Running {:?} (auto: {}, dry run: {}) with outbox {:?}",
        plan.name,
        auto,
        dry_run,
        config.outbox_path()
    );

    let submitter: Box<dyn LogSubmitter> = if dry_run {
        Box::new(DryRunSink)
    } else {
        Box::new(JsonlLogSink::new(config.outbox_path()))
    };
    let tones: Box<dyn ToneSink> = if auto {
        Box::new(SilentSink)
    } else {
        Box::new(TerminalBell)
    };

    let mut session = SessionOrchestrator::new(
        plan,
        config,
        SystemTimeSource::new(),
        tones,
        submitter,
        chrono::Utc::now(),
    )?;
    if no_sound {
        session.set_sound_enabled(false);
    }

    if auto {
        session.start()?;
        while !session.phase().is_terminal() {
            session.skip_set()?;
        }
    } else {
        let lines = spawn_stdin_reader();
        run_interactive(&mut session, &lines)?;
        retry_pending(&mut session, &lines)?;
    }

    report_outcome(&session)
}

/// Forward stdin lines over a channel so the main thread can keep polling the clock
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

enum Input {
    Start,
    TogglePause,
    SkipSet,
    SkipExercise,
    Previous,
    Record { set: u32, reps: u32, weight: f64 },
    Note(String),
    ToggleSound,
    Finish,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));

    let input = match word.to_lowercase().as_str() {
        "" | "s" => Input::Start,
        "p" => Input::TogglePause,
        "n" => Input::SkipSet,
        "x" => Input::SkipExercise,
        "b" => Input::Previous,
        "m" => Input::ToggleSound,
        "f" => Input::Finish,
        "q" => Input::Quit,
        "note" => Input::Note(rest.to_string()),
        "r" => {
            let mut parts = rest.split_whitespace();
            let set = parts.next()?.parse().ok()?;
            let reps = parts.next()?.parse().ok()?;
            let weight = parts.next().map(|w| w.parse().ok()).unwrap_or(Some(0.0))?;
            Input::Record { set, reps, weight }
        }
        "?" | "h" => Input::Help,
        _ => return None,
    };
    Some(input)
}

fn apply_input(session: &mut CliSession, input: Input) -> Result<()> {
    match input {
        Input::Start => session.start(),
        Input::TogglePause => match session.phase() {
            Phase::Paused(_) => session.resume(),
            _ => session.pause(),
        },
        Input::SkipSet => session.skip_set(),
        Input::SkipExercise => session.skip_exercise(),
        Input::Previous => session.previous_exercise(),
        Input::Record { set, reps, weight } => {
            let index = session.snapshot().state.current_exercise_index;
            session.record_set(index, set, reps, weight)?;
            println!("  ✓ Set {}: {} reps @ {}", set, reps, weight);
            Ok(())
        }
        Input::Note(text) => {
            let index = session.snapshot().state.current_exercise_index;
            session.set_note(index, &text)
        }
        Input::ToggleSound => {
            let enabled = !session.snapshot().sound_enabled;
            session.set_sound_enabled(enabled);
            println!("  Sound {}", if enabled { "on" } else { "off" });
            Ok(())
        }
        Input::Finish => session.finish(),
        Input::Quit => session.quit(),
        Input::Help => {
            print_help();
            Ok(())
        }
    }
}

fn run_interactive(session: &mut CliSession, lines: &Receiver<String>) -> Result<()> {
    print_help();
    print_status(&session.snapshot());

    while !session.phase().is_terminal() {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                match parse_input(&line) {
                    Some(input) => report_recoverable(apply_input(session, input))?,
                    None => println!("  Unknown command {:?} ('?' for help)", line.trim()),
                }
                print_status(&session.snapshot());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // stdin closed: leaving the screen cancels the session
                report_recoverable(session.quit())?;
                break;
            }
        }

        loop {
            match session.poll() {
                Ok(Some(ClockEvent::Tick(remaining))) => print_countdown(session, remaining),
                Ok(Some(ClockEvent::Expired)) => print_status(&session.snapshot()),
                Ok(None) => break,
                Err(e) => {
                    report_recoverable(Err(e))?;
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Print recoverable errors and carry on; anything else aborts the run
fn report_recoverable(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_recoverable() => {
            println!("  ✗ {}", e);
            Ok(())
        }
        other => other,
    }
}

/// Offer to resubmit a log the persistence port rejected
fn retry_pending(session: &mut CliSession, lines: &Receiver<String>) -> Result<()> {
    while matches!(session.submission(), Submission::Pending(_)) {
        println!("Press Enter to retry saving, or 'd' + Enter to discard the log");
        match lines.recv() {
            Ok(line) if line.trim().eq_ignore_ascii_case("d") => break,
            Ok(_) => report_recoverable(session.retry_submission())?,
            Err(_) => break,
        }
    }
    Ok(())
}

fn report_outcome(session: &CliSession) -> Result<()> {
    let outcome = match session.phase() {
        Phase::Aborted => "Workout ended early",
        _ => "Workout complete!",
    };
    println!("\n{}", outcome);

    match session.submission() {
        Submission::Submitted(log) => {
            println!(
                "✓ Session logged! {} exercises, {} sets, {} min",
                log.exercises_completed.len(),
                log.set_count(),
                log.duration_minutes
            );
            Ok(())
        }
        Submission::NothingToSubmit => {
            println!("Nothing to save - no sets were recorded.");
            Ok(())
        }
        Submission::Pending(_) => Err(Error::Submission(
            "the workout log was not saved".into(),
        )),
        Submission::NotAttempted => Ok(()),
    }
}

fn cmd_validate(config: &Config, plan_path: PathBuf) -> Result<()> {
    let plan = WorkoutPlan::load(&plan_path, &config.timing)?;
    println!("✓ Plan is valid");
    display_plan(&plan);
    Ok(())
}

fn cmd_history(config: &Config, limit: usize) -> Result<()> {
    let path = config.outbox_path();
    let logs = read_submitted_logs(&path)?;

    if logs.is_empty() {
        println!("No saved workouts yet.");
        return Ok(());
    }

    let skip = logs.len().saturating_sub(limit);
    for entry in logs.iter().skip(skip).rev() {
        let log = &entry.log;
        println!(
            "{}  {:>3} min  {} exercises, {} sets",
            log.workout_date.format("%Y-%m-%d %H:%M"),
            log.duration_minutes,
            log.exercises_completed.len(),
            log.set_count()
        );
        for exercise in &log.exercises_completed {
            let sets: Vec<String> = exercise
                .sets
                .iter()
                .map(|s| format!("{}x{}", s.reps, s.weight))
                .collect();
            println!("    {}: {}", exercise.name, sets.join(", "));
        }
    }
    Ok(())
}

fn display_plan(plan: &WorkoutPlan) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", plan.name);
    println!("╰─────────────────────────────────────────╯");
    println!();
    for (i, exercise) in plan.exercises.iter().enumerate() {
        println!(
            "  {}. {}  ({}, {}s rest)",
            i + 1,
            exercise.name,
            exercise.target_summary(),
            exercise.rest_seconds
        );
        if !exercise.muscle_groups.is_empty() {
            let groups: Vec<&str> = exercise.muscle_groups.iter().map(String::as_str).collect();
            println!("     → {}", groups.join(", "));
        }
    }
    println!();
}

fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Idle => "Ready",
        Phase::Exercising => "Exercise",
        Phase::Resting => "Rest",
        Phase::Paused(_) => "Paused",
        Phase::Complete => "Complete",
        Phase::Aborted => "Aborted",
    }
}

fn print_status(snapshot: &Snapshot) {
    let state = &snapshot.state;
    println!("─────────────────────────────────────────");
    println!(
        "  Exercise {} of {}: {}",
        state.current_exercise_index + 1,
        snapshot.exercise_count,
        snapshot.exercise_name
    );
    println!(
        "  Set {} of {}  |  {} {}  |  {}% complete",
        state.current_set_number,
        snapshot.target_sets,
        phase_label(state.phase),
        format_time(state.remaining_seconds),
        snapshot.progress_percent
    );
}

fn print_countdown(session: &CliSession, remaining: u32) {
    let label = phase_label(session.phase());
    print!("\r  {} {}   ", label, format_time(remaining));
    let _ = io::stdout().flush();
}

fn print_help() {
    println!("Commands (type + Enter):");
    println!("  s / Enter  start set          p  pause/resume");
    println!("  n  skip set                   x  skip exercise");
    println!("  b  previous exercise          m  toggle sound");
    println!("  r <set> <reps> [weight]       note <text>");
    println!("  f  finish and save            q  quit (saves progress)");
}
