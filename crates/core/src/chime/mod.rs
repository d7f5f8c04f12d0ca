use std::{cell::RefCell, f32::consts::TAU, rc::Rc};

use crate::{config::ChimeConfig, KenshoError, Result};

/// Level the decay heads towards; an exponential curve never reaches zero.
const DECAY_FLOOR: f32 = 0.001;

/// Rendered mono samples, handed over to the output and dropped once played.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl ToneBuffer {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1_000 / self.sample_rate as u64
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Uninitialized,
    /// Created but held by host policy until resumed.
    Suspended,
    Running,
}

/// Device the chime is played through.
pub trait ToneOutput {
    fn state(&self) -> OutputState;
    fn initialize(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn play(&mut self, tone: ToneBuffer) -> Result<()>;
}

/// One-shot completion tone: linear attack, exponential decay.
#[derive(Debug, Clone)]
pub struct Chime {
    config: ChimeConfig,
}

impl Chime {
    pub fn new(config: ChimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChimeConfig {
        &self.config
    }

    /// Gain of the envelope `t_ms` after the strike.
    pub fn envelope(&self, t_ms: f32) -> f32 {
        let attack = self.config.attack_ms as f32;
        let decay = self.config.decay_ms as f32;
        let peak = self.config.peak_gain;

        if peak <= 0.0 || t_ms < 0.0 || t_ms >= attack + decay {
            0.0
        } else if t_ms < attack {
            peak * t_ms / attack
        } else {
            let floor = DECAY_FLOOR.min(peak);
            peak * (floor / peak).powf((t_ms - attack) / decay.max(1.0))
        }
    }

    pub fn render(&self) -> ToneBuffer {
        let sample_rate = self.config.sample_rate;
        let total_ms = (self.config.attack_ms as u64 + self.config.decay_ms as u64)
            .min(ChimeConfig::MAX_TONE_MS);
        let count = (total_ms * sample_rate as u64 / 1_000) as usize;
        let step = TAU * self.config.frequency_hz / sample_rate as f32;

        let samples = (0..count)
            .map(|i| {
                let t_ms = i as f32 * 1_000.0 / sample_rate as f32;
                (i as f32 * step).sin() * self.envelope(t_ms)
            })
            .collect();

        ToneBuffer {
            sample_rate,
            samples,
        }
    }

    /// Plays the chime, bringing the output up first if needed. Failures are
    /// logged and reported as `false`; they never propagate.
    pub fn play(&self, output: &mut dyn ToneOutput) -> bool {
        match self.try_play(output) {
            Ok(()) => {
                tracing::debug!(frequency = self.config.frequency_hz, "chime played");
                true
            }
            Err(err) => {
                tracing::warn!(%err, "chime failed");
                false
            }
        }
    }

    fn try_play(&self, output: &mut dyn ToneOutput) -> Result<()> {
        self.config.validate()?;
        if output.state() == OutputState::Uninitialized {
            output.initialize()?;
        }
        if output.state() == OutputState::Suspended {
            output.resume()?;
        }
        output.play(self.render())
    }
}

#[derive(Debug)]
struct MemoryToneState {
    state: OutputState,
    fail_initialize: bool,
    fail_resume: bool,
    played: Vec<u64>,
}

/// Headless output that records the length of every tone it is given.
/// Clones share one record.
#[derive(Debug, Clone)]
pub struct MemoryToneOutput {
    inner: Rc<RefCell<MemoryToneState>>,
}

impl MemoryToneOutput {
    pub fn new(state: OutputState) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MemoryToneState {
                state,
                fail_initialize: false,
                fail_resume: false,
                played: Vec::new(),
            })),
        }
    }

    /// Makes initialisation fail, as when no audio device exists.
    pub fn fail_initialize(&self) {
        self.inner.borrow_mut().fail_initialize = true;
    }

    /// Makes resuming fail, as when the host keeps the output suspended.
    pub fn fail_resume(&self) {
        self.inner.borrow_mut().fail_resume = true;
    }

    pub fn state_now(&self) -> OutputState {
        self.inner.borrow().state
    }

    /// Durations in milliseconds of every tone played so far.
    pub fn played(&self) -> Vec<u64> {
        self.inner.borrow().played.clone()
    }
}

impl Default for MemoryToneOutput {
    fn default() -> Self {
        Self::new(OutputState::Uninitialized)
    }
}

impl ToneOutput for MemoryToneOutput {
    fn state(&self) -> OutputState {
        self.inner.borrow().state
    }

    fn initialize(&mut self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_initialize {
            return Err(KenshoError::ToneOutput("no output device".to_string()));
        }
        // Hosts typically create the output suspended until a user gesture.
        inner.state = OutputState::Suspended;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_resume {
            return Err(KenshoError::ToneOutput("resume refused".to_string()));
        }
        inner.state = OutputState::Running;
        Ok(())
    }

    fn play(&mut self, tone: ToneBuffer) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.state != OutputState::Running {
            return Err(KenshoError::ToneOutput("output is not running".to_string()));
        }
        inner.played.push(tone.duration_ms());
        Ok(())
    }
}
