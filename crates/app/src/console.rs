//! Terminal stand-ins for the audio devices. Ambient playback is reported
//! through tracing; the chime rings the terminal bell.

use std::io::Write;

use kensho_core::{AudioSink, OutputState, Result, SoundId, ToneBuffer, ToneOutput};

#[derive(Debug, Default)]
pub struct ConsoleSink {
    /// Last gain reported per channel, so ramps log once per 10% step.
    reported: [Option<u8>; 3],
}

impl ConsoleSink {
    fn slot(id: SoundId) -> usize {
        SoundId::ALL
            .iter()
            .position(|candidate| *candidate == id)
            .unwrap_or(0)
    }
}

impl AudioSink for ConsoleSink {
    fn play(&mut self, id: SoundId) -> Result<()> {
        tracing::info!(sound = %id, "ambient playing");
        Ok(())
    }

    fn pause(&mut self, id: SoundId) {
        tracing::info!(sound = %id, "ambient paused");
    }

    fn rewind(&mut self, id: SoundId) {
        tracing::trace!(sound = %id, "ambient rewound");
    }

    fn set_gain(&mut self, id: SoundId, gain: f32) {
        let bucket = (gain * 10.0).round() as u8;
        let slot = &mut self.reported[Self::slot(id)];
        if *slot != Some(bucket) {
            *slot = Some(bucket);
            tracing::debug!(sound = %id, gain, "ambient gain");
        }
    }
}

#[derive(Debug)]
pub struct TerminalBell {
    state: OutputState,
}

impl TerminalBell {
    pub fn new() -> Self {
        Self {
            state: OutputState::Uninitialized,
        }
    }
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self::new()
    }
}

impl ToneOutput for TerminalBell {
    fn state(&self) -> OutputState {
        self.state
    }

    fn initialize(&mut self) -> Result<()> {
        self.state = OutputState::Running;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.state = OutputState::Running;
        Ok(())
    }

    fn play(&mut self, tone: ToneBuffer) -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        tracing::debug!(duration_ms = tone.duration_ms(), peak = tone.peak(), "chime");
        Ok(())
    }
}
