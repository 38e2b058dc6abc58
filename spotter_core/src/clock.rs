//! Pausable countdown clock driven by a monotonic time source.
//!
//! The countdown is kept as an absolute deadline on the time source, and
//! every poll recomputes `remaining = max(0, deadline - now)`. Late or
//! missed polls therefore never make the countdown drift; they only
//! coalesce ticks.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time, measured from an arbitrary fixed origin
pub trait TimeSource {
    fn elapsed(&self) -> Duration;
}

/// Real monotonic time backed by `Instant`
#[derive(Clone, Debug)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven time source for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and give another to the clock under test.
#[derive(Clone, Debug, Default)]
pub struct ManualTimeSource {
    now: Rc<Cell<Duration>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl TimeSource for ManualTimeSource {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

/// Event produced by polling a running clock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockEvent {
    /// Whole seconds left, reported at most once per second of change
    Tick(u32),
    /// The countdown reached zero; emitted exactly once per `start`
    Expired,
}

#[derive(Clone, Copy, Debug)]
enum ClockState {
    Stopped,
    Running { deadline: Duration, last_reported: u32 },
    Paused { remaining: Duration },
}

fn ceil_secs(d: Duration) -> u32 {
    let millis = d.as_millis();
    u32::try_from(millis.div_ceil(1000)).unwrap_or(u32::MAX)
}

/// A cancellable, pausable countdown. Holds no knowledge of exercises or rest.
#[derive(Debug)]
pub struct SessionClock<T: TimeSource> {
    source: T,
    state: ClockState,
}

impl<T: TimeSource> SessionClock<T> {
    pub fn new(source: T) -> Self {
        Self {
            source,
            state: ClockState::Stopped,
        }
    }

    /// Begin a countdown; replaces any countdown already in progress
    pub fn start(&mut self, duration_seconds: u32) {
        let deadline = self.source.elapsed() + Duration::from_secs(u64::from(duration_seconds));
        self.state = ClockState::Running {
            deadline,
            last_reported: duration_seconds,
        };
        tracing::debug!("Clock started for {}s", duration_seconds);
    }

    /// Freeze the countdown. Returns false if nothing was running.
    pub fn pause(&mut self) -> bool {
        match self.state {
            ClockState::Running { deadline, .. } => {
                let remaining = deadline.saturating_sub(self.source.elapsed());
                self.state = ClockState::Paused { remaining };
                true
            }
            _ => false,
        }
    }

    /// Continue a paused countdown from its frozen value. Returns false if not paused.
    pub fn resume(&mut self) -> bool {
        match self.state {
            ClockState::Paused { remaining } => {
                self.state = ClockState::Running {
                    deadline: self.source.elapsed() + remaining,
                    last_reported: ceil_secs(remaining),
                };
                true
            }
            _ => false,
        }
    }

    /// Stop without emitting anything further
    pub fn cancel(&mut self) {
        self.state = ClockState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, ClockState::Running { .. })
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.state, ClockState::Paused { .. })
    }

    /// Whole seconds left (rounded up); zero when stopped
    pub fn remaining_secs(&self) -> u32 {
        match self.state {
            ClockState::Stopped => 0,
            ClockState::Running { deadline, .. } => {
                ceil_secs(deadline.saturating_sub(self.source.elapsed()))
            }
            ClockState::Paused { remaining } => ceil_secs(remaining),
        }
    }

    /// Deliver whatever event is due now, if any.
    ///
    /// Called from the owner's event loop. Paused and stopped clocks never
    /// produce events.
    pub fn poll(&mut self) -> Option<ClockEvent> {
        let ClockState::Running {
            deadline,
            last_reported,
        } = self.state
        else {
            return None;
        };

        let remaining = deadline.saturating_sub(self.source.elapsed());
        if remaining.is_zero() {
            self.state = ClockState::Stopped;
            return Some(ClockEvent::Expired);
        }

        let secs = ceil_secs(remaining);
        if secs < last_reported {
            self.state = ClockState::Running {
                deadline,
                last_reported: secs,
            };
            Some(ClockEvent::Tick(secs))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> (ManualTimeSource, SessionClock<ManualTimeSource>) {
        let time = ManualTimeSource::new();
        (time.clone(), SessionClock::new(time))
    }

    #[test]
    fn test_ticks_once_per_second_then_expires_once() {
        let (time, mut clock) = clock();
        clock.start(3);
        assert_eq!(clock.poll(), None);

        time.advance_secs(1);
        assert_eq!(clock.poll(), Some(ClockEvent::Tick(2)));
        assert_eq!(clock.poll(), None);

        time.advance_secs(1);
        assert_eq!(clock.poll(), Some(ClockEvent::Tick(1)));

        time.advance_secs(1);
        assert_eq!(clock.poll(), Some(ClockEvent::Expired));
        assert_eq!(clock.poll(), None);
        assert!(!clock.is_running());
    }

    #[test]
    fn test_late_poll_does_not_drift() {
        let (time, mut clock) = clock();
        clock.start(30);

        // One poll after a long stall reports the true remaining time
        time.advance(Duration::from_millis(12_400));
        assert_eq!(clock.poll(), Some(ClockEvent::Tick(18)));

        time.advance_secs(60);
        assert_eq!(clock.poll(), Some(ClockEvent::Expired));
    }

    #[test]
    fn test_pause_freezes_remaining() {
        let (time, mut clock) = clock();
        clock.start(10);
        time.advance_secs(4);
        assert!(clock.pause());

        time.advance_secs(100);
        assert_eq!(clock.poll(), None);
        assert_eq!(clock.remaining_secs(), 6);

        assert!(clock.resume());
        assert_eq!(clock.remaining_secs(), 6);
        time.advance_secs(1);
        assert_eq!(clock.poll(), Some(ClockEvent::Tick(5)));
        time.advance_secs(5);
        assert_eq!(clock.poll(), Some(ClockEvent::Expired));
    }

    #[test]
    fn test_cancel_silences_clock() {
        let (time, mut clock) = clock();
        clock.start(2);
        clock.cancel();
        time.advance_secs(5);
        assert_eq!(clock.poll(), None);
        assert_eq!(clock.remaining_secs(), 0);
        assert!(!clock.resume());
    }

    #[test]
    fn test_pause_and_resume_require_matching_state() {
        let (_time, mut clock) = clock();
        assert!(!clock.pause());
        clock.start(5);
        assert!(!clock.resume());
        assert!(clock.pause());
        assert!(!clock.pause());
        assert!(clock.is_paused());
    }
}
