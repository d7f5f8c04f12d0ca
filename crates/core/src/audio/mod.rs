//! Ambient channels and the crossfade controller.
//!
//! Each channel owns at most one ramp. The ramp's [`TaskId`] is the ownership
//! token: starting a new fade cancels the old task before arming a new one, so
//! a superseded ramp can never touch the gain again.

use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{
    config::AudioConfig,
    timeline::{Lane, Scheduler, Task, TaskId},
    KenshoError, Result,
};

/// Identifier of an ambient channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundId {
    Rain,
    Forest,
    Waves,
}

impl SoundId {
    pub const ALL: [SoundId; 3] = [SoundId::Rain, SoundId::Forest, SoundId::Waves];

    pub fn as_str(self) -> &'static str {
        match self {
            SoundId::Rain => "rain",
            SoundId::Forest => "forest",
            SoundId::Waves => "waves",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoundId {
    type Err = KenshoError;

    fn from_str(value: &str) -> Result<Self> {
        SoundId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| KenshoError::UnknownSound(value.to_string()))
    }
}

/// Parses a settings-panel choice, where `none` means silence.
pub fn parse_selection(value: &str) -> Result<Option<SoundId>> {
    if value.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// Playback backend for the ambient loops.
pub trait AudioSink {
    /// Begins or resumes playback. The host may refuse.
    fn play(&mut self, id: SoundId) -> Result<()>;
    fn pause(&mut self, id: SoundId);
    /// Moves the play head back to the start.
    fn rewind(&mut self, id: SoundId);
    fn set_gain(&mut self, id: SoundId, gain: f32);
}

/// Backend that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&mut self, _id: SoundId) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self, _id: SoundId) {}

    fn rewind(&mut self, _id: SoundId) {}

    fn set_gain(&mut self, _id: SoundId, _gain: f32) {}
}

/// Call recorded by [`MemorySink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCall {
    Play(SoundId),
    Pause(SoundId),
    Rewind(SoundId),
    Gain(SoundId, f32),
}

#[derive(Debug, Default)]
struct MemorySinkState {
    calls: Vec<SinkCall>,
    denied: Vec<SoundId>,
}

/// Headless backend that records every call. Clones share one log, so a
/// host can keep a handle after giving the sink to a [`Mixer`].
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Rc<RefCell<MemorySinkState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `play` fail for `id`, as an autoplay policy would.
    pub fn deny(&self, id: SoundId) {
        self.state.borrow_mut().denied.push(id);
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.state.borrow().calls.clone()
    }

    pub fn play_count(&self, id: SoundId) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|call| **call == SinkCall::Play(id))
            .count()
    }

    pub fn last_gain(&self, id: SoundId) -> Option<f32> {
        self.state.borrow().calls.iter().rev().find_map(|call| match call {
            SinkCall::Gain(sound, gain) if *sound == id => Some(*gain),
            _ => None,
        })
    }
}

impl AudioSink for MemorySink {
    fn play(&mut self, id: SoundId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.denied.contains(&id) {
            return Err(KenshoError::PlaybackDenied(id));
        }
        state.calls.push(SinkCall::Play(id));
        Ok(())
    }

    fn pause(&mut self, id: SoundId) {
        self.state.borrow_mut().calls.push(SinkCall::Pause(id));
    }

    fn rewind(&mut self, id: SoundId) {
        self.state.borrow_mut().calls.push(SinkCall::Rewind(id));
    }

    fn set_gain(&mut self, id: SoundId, gain: f32) {
        self.state.borrow_mut().calls.push(SinkCall::Gain(id, gain));
    }
}

/// What a ramp does once it lands on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterFade {
    #[default]
    Nothing,
    /// Preview behaviour: hold the level, then fade back to silence.
    HoldThenRelease,
}

#[derive(Debug, Clone, Copy)]
struct Ramp {
    task: TaskId,
    from: f32,
    to: f32,
    steps: u32,
    taken: u32,
    after: AfterFade,
}

/// Reported on the tick that lands a ramp on its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeFinished {
    pub sound: SoundId,
    pub gain: f32,
}

/// State of one ambient channel.
#[derive(Debug, Clone)]
pub struct AudioChannel {
    id: SoundId,
    gain: f32,
    playing: bool,
    available: bool,
    ramp: Option<Ramp>,
}

impl AudioChannel {
    fn new(id: SoundId) -> Self {
        Self {
            id,
            gain: 0.0,
            playing: false,
            available: true,
            ramp: None,
        }
    }

    pub fn id(&self) -> SoundId {
        self.id
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Token of the ramp currently driving this channel.
    pub fn active_ramp(&self) -> Option<TaskId> {
        self.ramp.map(|ramp| ramp.task)
    }
}

/// Crossfade controller for every ambient channel.
pub struct Mixer {
    config: AudioConfig,
    channels: Vec<AudioChannel>,
    sink: Box<dyn AudioSink>,
    preview_hold: Option<(SoundId, TaskId)>,
}

impl Mixer {
    pub fn new(config: AudioConfig, sink: Box<dyn AudioSink>) -> Self {
        Self {
            config,
            channels: SoundId::ALL.into_iter().map(AudioChannel::new).collect(),
            sink,
            preview_hold: None,
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn channel(&self, id: SoundId) -> &AudioChannel {
        &self.channels[id.index()]
    }

    pub fn channels(&self) -> &[AudioChannel] {
        &self.channels
    }

    /// Channels that are currently audible (or about to be).
    pub fn playing(&self) -> Vec<SoundId> {
        self.channels
            .iter()
            .filter(|channel| channel.playing)
            .map(|channel| channel.id)
            .collect()
    }

    pub fn preview_pending(&self) -> bool {
        self.preview_hold.is_some()
    }

    /// Ramps `id` from `from` to `to` over `duration_ms`, replacing any ramp
    /// already running on that channel. Returns `false` when the fade could
    /// not start; a refused playback is logged and never escalated.
    #[allow(clippy::too_many_arguments)]
    pub fn fade(
        &mut self,
        timeline: &mut Scheduler,
        now_ms: u64,
        id: SoundId,
        from: f32,
        to: f32,
        duration_ms: u64,
        after: AfterFade,
    ) -> bool {
        let tick_ms = self.config.ramp_tick_ms.max(1);
        let channel = &mut self.channels[id.index()];
        if let Some(old) = channel.ramp.take() {
            timeline.cancel(old.task);
        }
        if !channel.available {
            tracing::warn!(sound = %id, "skipping fade on unavailable channel");
            return false;
        }

        let from = from.clamp(0.0, 1.0);
        let to = to.clamp(0.0, 1.0);
        channel.gain = from;
        self.sink.set_gain(id, from);

        if from < to {
            if let Err(err) = self.sink.play(id) {
                tracing::warn!(sound = %id, %err, "playback refused; fade aborted");
                if channel.playing {
                    self.sink.pause(id);
                    self.sink.rewind(id);
                    channel.playing = false;
                }
                return false;
            }
            channel.playing = true;
        }

        let steps = duration_ms.div_ceil(tick_ms).clamp(1, u32::MAX as u64) as u32;
        let task = timeline.every(Task::Ramp(id), Lane::Timer, tick_ms, now_ms);
        tracing::debug!(sound = %id, from, to, duration_ms, steps, "fade armed");
        channel.ramp = Some(Ramp {
            task,
            from,
            to,
            steps,
            taken: 0,
            after,
        });
        true
    }

    /// Advances the ramp owning `task`. Ticks from a superseded ramp are
    /// dropped.
    pub fn on_ramp_tick(
        &mut self,
        timeline: &mut Scheduler,
        now_ms: u64,
        id: SoundId,
        task: TaskId,
    ) -> Option<FadeFinished> {
        let channel = &mut self.channels[id.index()];
        let ramp = match channel.ramp.as_mut() {
            Some(ramp) if ramp.task == task => ramp,
            _ => {
                timeline.cancel(task);
                return None;
            }
        };

        ramp.taken += 1;
        if ramp.taken < ramp.steps {
            let t = ramp.taken as f32 / ramp.steps as f32;
            channel.gain = (ramp.from + (ramp.to - ramp.from) * t).clamp(0.0, 1.0);
            self.sink.set_gain(id, channel.gain);
            return None;
        }

        let ramp = *ramp;
        channel.ramp = None;
        timeline.cancel(task);
        channel.gain = ramp.to;
        self.sink.set_gain(id, ramp.to);
        if ramp.to == 0.0 {
            self.sink.pause(id);
            self.sink.rewind(id);
            channel.playing = false;
        }
        tracing::debug!(sound = %id, gain = ramp.to, "fade finished");

        if ramp.after == AfterFade::HoldThenRelease {
            self.cancel_preview(timeline);
            let hold = timeline.after(Task::PreviewHold(id), self.config.preview_hold_ms, now_ms);
            self.preview_hold = Some((id, hold));
        }

        Some(FadeFinished {
            sound: id,
            gain: ramp.to,
        })
    }

    /// End of a preview hold: fade the auditioned channel back out.
    pub fn on_preview_hold(
        &mut self,
        timeline: &mut Scheduler,
        now_ms: u64,
        id: SoundId,
        task: TaskId,
    ) -> bool {
        if self.preview_hold != Some((id, task)) {
            return false;
        }
        self.preview_hold = None;
        let channel = self.channel(id);
        if channel.playing {
            let gain = channel.gain;
            let duration = self.config.preview_fade_ms;
            self.fade(timeline, now_ms, id, gain, 0.0, duration, AfterFade::Nothing);
        }
        true
    }

    /// Drops a pending preview hold so it cannot fade anything back out.
    pub fn cancel_preview(&mut self, timeline: &mut Scheduler) -> bool {
        match self.preview_hold.take() {
            Some((_, task)) => timeline.cancel(task),
            None => false,
        }
    }

    /// Auditions a new choice: whatever is playing fades away quickly and the
    /// chosen channel plays a short sample.
    pub fn preview(&mut self, timeline: &mut Scheduler, now_ms: u64, selection: Option<SoundId>) {
        self.cancel_preview(timeline);
        let stop_ms = self.config.selection_stop_ms;
        for id in self.playing() {
            let gain = self.channel(id).gain;
            self.fade(timeline, now_ms, id, gain, 0.0, stop_ms, AfterFade::Nothing);
        }

        if let Some(id) = selection {
            self.sink.rewind(id);
            let peak = self.config.preview_peak;
            let duration = self.config.preview_fade_ms;
            self.fade(timeline, now_ms, id, 0.0, peak, duration, AfterFade::HoldThenRelease);
        }
    }

    /// Session start: the selected channel rises to full volume. Any preview
    /// still in flight loses its fade-back, and channels other than the
    /// selection are silenced quickly.
    pub fn fade_in(&mut self, timeline: &mut Scheduler, now_ms: u64, selection: Option<SoundId>) -> bool {
        self.cancel_preview(timeline);
        let stop_ms = self.config.selection_stop_ms;
        for id in self.playing() {
            if Some(id) != selection {
                let gain = self.channel(id).gain;
                self.fade(timeline, now_ms, id, gain, 0.0, stop_ms, AfterFade::Nothing);
            }
        }
        match selection {
            Some(id) => {
                self.sink.rewind(id);
                let duration = self.config.session_fade_ms;
                self.fade(timeline, now_ms, id, 0.0, 1.0, duration, AfterFade::Nothing)
            }
            None => false,
        }
    }

    /// Session end: every playing channel fades to silence.
    pub fn fade_out(&mut self, timeline: &mut Scheduler, now_ms: u64) {
        self.cancel_preview(timeline);
        let duration = self.config.session_fade_ms;
        for id in self.playing() {
            let gain = self.channel(id).gain;
            self.fade(timeline, now_ms, id, gain, 0.0, duration, AfterFade::Nothing);
        }
    }

    /// Takes a channel out of service after its source failed.
    pub fn disable(&mut self, timeline: &mut Scheduler, id: SoundId) {
        if matches!(self.preview_hold, Some((held, _)) if held == id) {
            self.cancel_preview(timeline);
        }
        let channel = &mut self.channels[id.index()];
        if let Some(ramp) = channel.ramp.take() {
            timeline.cancel(ramp.task);
        }
        if channel.playing {
            self.sink.pause(id);
            self.sink.rewind(id);
            channel.playing = false;
        }
        channel.gain = 0.0;
        channel.available = false;
    }
}

impl fmt::Debug for Mixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixer")
            .field("config", &self.config)
            .field("channels", &self.channels)
            .field("preview_hold", &self.preview_hold)
            .finish()
    }
}
