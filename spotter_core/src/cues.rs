//! Audio cues for phase transitions.
//!
//! Cues are cosmetic: every failure to produce sound is logged at debug
//! level and dropped, never returned to the caller.

use std::io::{self, Write};

/// Named transition events that have a tone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// A work interval begins (session start or end of rest)
    Start,
    /// A rest interval begins
    RestStart,
    /// The session reached Complete
    Complete,
}

/// A short sine tone
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
}

impl Cue {
    pub fn tone(self) -> Tone {
        let frequency_hz = match self {
            Cue::Start => 800,
            Cue::RestStart => 400,
            Cue::Complete => 600,
        };
        Tone {
            frequency_hz,
            duration_ms: 300,
        }
    }
}

/// Output device for tones
pub trait ToneSink {
    fn play(&mut self, tone: Tone) -> io::Result<()>;
}

impl<T: ToneSink + ?Sized> ToneSink for Box<T> {
    fn play(&mut self, tone: Tone) -> io::Result<()> {
        (**self).play(tone)
    }
}

/// Rings the terminal bell; a terminal cannot vary pitch, so every tone sounds alike
#[derive(Debug, Default)]
pub struct TerminalBell;

impl ToneSink for TerminalBell {
    fn play(&mut self, _tone: Tone) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(b"\x07")?;
        out.flush()
    }
}

/// Discards every tone
#[derive(Debug, Default)]
pub struct SilentSink;

impl ToneSink for SilentSink {
    fn play(&mut self, _tone: Tone) -> io::Result<()> {
        Ok(())
    }
}

/// Fire-and-forget cue emitter gated by a mutable `enabled` flag
#[derive(Debug)]
pub struct CueEmitter<S: ToneSink> {
    sink: S,
    enabled: bool,
}

impl<S: ToneSink> CueEmitter<S> {
    pub fn new(sink: S, enabled: bool) -> Self {
        Self { sink, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn emit(&mut self, cue: Cue) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.sink.play(cue.tone()) {
            tracing::debug!("Dropped {:?} cue: {}", cue, e);
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records tones; can be told to fail like an unavailable audio device
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pub played: Vec<Tone>,
        pub fail: bool,
    }

    impl ToneSink for RecordingSink {
        fn play(&mut self, tone: Tone) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Unsupported, "no audio output"));
            }
            self.played.push(tone);
            Ok(())
        }
    }

    #[test]
    fn test_cues_have_distinct_tones() {
        let tones = [Cue::Start.tone(), Cue::RestStart.tone(), Cue::Complete.tone()];
        assert_ne!(tones[0].frequency_hz, tones[1].frequency_hz);
        assert_ne!(tones[1].frequency_hz, tones[2].frequency_hz);
        assert_ne!(tones[0].frequency_hz, tones[2].frequency_hz);
    }

    #[test]
    fn test_disabled_emitter_is_silent() {
        let mut emitter = CueEmitter::new(RecordingSink::default(), false);
        emitter.emit(Cue::Start);
        assert!(emitter.sink().played.is_empty());

        emitter.set_enabled(true);
        emitter.emit(Cue::Complete);
        assert_eq!(emitter.sink().played, vec![Cue::Complete.tone()]);
    }

    #[test]
    fn test_sink_failure_is_swallowed() {
        crate::logging::init_test();
        let sink = RecordingSink {
            played: vec![],
            fail: true,
        };
        let mut emitter = CueEmitter::new(sink, true);
        emitter.emit(Cue::RestStart);
        assert!(emitter.sink().played.is_empty());
    }
}
