//! The countdown controller.
//!
//! [`FocusTimer`] is the clock of record for a session. It keeps two loops on
//! the [`Scheduler`]: a frame-lane visual loop that repaints the countdown and
//! the pattern, and a timer-lane watchdog that alone decides when the session
//! is over. The host drives everything by calling [`FocusTimer::pump`] and
//! draining [`FocusTimer::take_events`].

use std::fmt;

use crate::{
    audio::{AudioSink, Mixer},
    chime::{Chime, ToneOutput},
    clock::Clock,
    config::{AppConfig, LoopConfig, PatternConfig},
    event::{CoreEvent, Notice},
    reveal::{reveal_fraction, MotionPreference, RevealedPattern},
    session::{Session, SessionState},
    timeline::{Lane, Scheduler, Task, TaskId},
    KenshoError, Result, SoundId,
};

/// Host capabilities the controller depends on.
pub struct Host {
    pub clock: Box<dyn Clock>,
    pub audio: Box<dyn AudioSink>,
    pub tone: Box<dyn ToneOutput>,
    pub motion: Box<dyn MotionPreference>,
}

pub struct FocusTimer {
    clock: Box<dyn Clock>,
    motion: Box<dyn MotionPreference>,
    tone: Box<dyn ToneOutput>,
    timeline: Scheduler,
    session: Session,
    pattern_config: PatternConfig,
    loops: LoopConfig,
    pattern: Option<RevealedPattern>,
    mixer: Mixer,
    chime: Chime,
    visual_task: Option<TaskId>,
    watchdog_task: Option<TaskId>,
    events: Vec<CoreEvent>,
}

impl FocusTimer {
    /// Builds an idle controller. The configuration is validated up front so
    /// a session can never start with a broken duration or pattern.
    pub fn new(config: &AppConfig, host: Host) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            clock: host.clock,
            motion: host.motion,
            tone: host.tone,
            timeline: Scheduler::new(),
            session: Session::new(config.timer.duration_minutes)?,
            pattern_config: config.pattern.clone(),
            loops: config.loops.clone(),
            pattern: None,
            mixer: Mixer::new(config.audio.clone(), host.audio),
            chime: Chime::new(config.chime.clone()),
            visual_task: None,
            watchdog_task: None,
            events: Vec::new(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn pattern(&self) -> Option<&RevealedPattern> {
        self.pattern.as_ref()
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn timeline(&self) -> &Scheduler {
        &self.timeline
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Earliest moment something is scheduled to happen.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timeline.next_due()
    }

    /// Removes and returns everything emitted since the last call.
    pub fn take_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events)
    }

    /// Sets the session length. Only legal while idle.
    pub fn configure(&mut self, duration_minutes: f64) -> Result<()> {
        self.session.configure(duration_minutes)?;
        tracing::info!(total_seconds = self.session.total_seconds(), "session configured");
        self.emit_remaining();
        Ok(())
    }

    /// Auditions a sound choice from the settings panel.
    pub fn preview(&mut self, selection: Option<SoundId>) -> Result<()> {
        if self.session.state() == SessionState::Running {
            return Err(KenshoError::SessionActive);
        }
        if let Some(id) = selection {
            if !self.mixer.channel(id).is_available() {
                return Err(KenshoError::ChannelUnavailable(id));
            }
        }
        let now = self.clock.now_ms();
        self.mixer.preview(&mut self.timeline, now, selection);
        Ok(())
    }

    /// Starts the countdown with the sound the settings panel handed over.
    ///
    /// Returns `Ok(false)` when a session is already running; the running
    /// session is left untouched.
    pub fn start(&mut self, sound: Option<SoundId>) -> Result<bool> {
        match self.session.state() {
            SessionState::Running => {
                tracing::debug!("start ignored; session already running");
                return Ok(false);
            }
            SessionState::Complete => return Err(KenshoError::RestartRequiresReset),
            SessionState::Idle => {}
        }

        let pattern = self.pattern_config.generate()?;
        let now = self.clock.now_ms();
        self.session.begin(now);
        self.events.push(CoreEvent::PatternGenerated {
            segments: pattern.segments.clone(),
        });
        self.pattern = Some(RevealedPattern::new(pattern));

        self.visual_task = Some(self.timeline.every(
            Task::VisualFrame,
            Lane::Frame,
            self.loops.frame_interval_ms,
            now,
        ));
        self.watchdog_task = Some(self.timeline.every(
            Task::Watchdog,
            Lane::Timer,
            self.loops.watchdog_interval_ms,
            now,
        ));

        let sound = sound.filter(|id| self.mixer.channel(*id).is_available());
        self.mixer.fade_in(&mut self.timeline, now, sound);

        tracing::info!(
            total_seconds = self.session.total_seconds(),
            sound = sound.map(SoundId::as_str).unwrap_or("none"),
            "session started"
        );
        self.emit_remaining();
        self.events.push(CoreEvent::Status {
            notice: Notice::Started,
        });
        Ok(true)
    }

    /// Ends the running session. Calling it again, or on a session that is
    /// not running, does nothing.
    pub fn complete(&mut self) {
        if self.session.state() != SessionState::Running {
            return;
        }
        self.disarm_loops();

        let now = self.clock.now_ms();
        let shown = self.session.remaining_seconds();
        self.session.finish();
        if shown != 0 {
            self.emit_remaining();
        }
        if let Some(pattern) = self.pattern.as_mut() {
            pattern.set_fraction(1.0);
            self.events.push(CoreEvent::Reveal { fraction: 1.0 });
        }

        self.mixer.fade_out(&mut self.timeline, now);
        let played = self.chime.play(self.tone.as_mut());
        self.events.push(CoreEvent::Chime { played });

        tracing::info!("session complete");
        self.events.push(CoreEvent::Status {
            notice: Notice::Complete,
        });
    }

    /// Returns to idle from any state with the full duration restored.
    pub fn reset(&mut self) {
        self.disarm_loops();

        let now = self.clock.now_ms();
        self.session.rewind();
        if self.pattern.take().is_some() {
            self.events.push(CoreEvent::PatternCleared);
        }
        self.mixer.fade_out(&mut self.timeline, now);

        tracing::info!(total_seconds = self.session.total_seconds(), "session reset");
        self.emit_remaining();
        self.events.push(CoreEvent::Status {
            notice: Notice::Reset,
        });
    }

    /// Compensates for a sound source that failed to load: the channel is
    /// disabled and, when it was the selection, the selection becomes silence.
    /// Returns the selection to use from now on.
    pub fn channel_unavailable(&mut self, sound: SoundId, selection: Option<SoundId>) -> Option<SoundId> {
        tracing::warn!(%sound, "sound source unavailable");
        self.mixer.disable(&mut self.timeline, sound);
        let reverted = selection == Some(sound);
        self.events.push(CoreEvent::ChannelDisabled { sound, reverted });
        if reverted {
            None
        } else {
            selection
        }
    }

    /// Mirrors host visibility. A hidden view stops the visual loop but never
    /// the watchdog.
    pub fn set_visible(&mut self, visible: bool) {
        tracing::debug!(visible, "visibility changed");
        self.timeline.set_frames_suspended(!visible);
    }

    /// Delivers every callback due at the current time.
    pub fn pump(&mut self) {
        let now = self.clock.now_ms();
        while let Some((id, task)) = self.timeline.pop_due(now) {
            match task {
                Task::VisualFrame => self.on_frame(id, now),
                Task::Watchdog => self.on_watchdog(id, now),
                Task::Ramp(sound) => {
                    if let Some(finished) = self.mixer.on_ramp_tick(&mut self.timeline, now, sound, id) {
                        self.events.push(CoreEvent::FadeFinished {
                            sound: finished.sound,
                            gain: finished.gain,
                        });
                    }
                }
                Task::PreviewHold(sound) => {
                    self.mixer.on_preview_hold(&mut self.timeline, now, sound, id);
                }
            }
        }
    }

    fn on_frame(&mut self, id: TaskId, now: u64) {
        if self.visual_task != Some(id) {
            self.timeline.cancel(id);
            return;
        }
        if let Some(seconds) = self.session.observe(now) {
            tracing::trace!(seconds, "countdown tick");
            self.emit_remaining();
        }
        let progress = self.session.progress(now);
        let fraction = reveal_fraction(progress, self.motion.is_reduced_motion());
        if let Some(pattern) = self.pattern.as_mut() {
            pattern.set_fraction(fraction);
            self.events.push(CoreEvent::Reveal { fraction });
        }
    }

    fn on_watchdog(&mut self, id: TaskId, now: u64) {
        if self.watchdog_task != Some(id) {
            self.timeline.cancel(id);
            return;
        }
        if self.session.is_due(now) {
            self.complete();
        }
    }

    fn disarm_loops(&mut self) {
        for task in [self.visual_task.take(), self.watchdog_task.take()]
            .into_iter()
            .flatten()
        {
            self.timeline.cancel(task);
        }
    }

    fn emit_remaining(&mut self) {
        self.events.push(CoreEvent::Remaining {
            seconds: self.session.remaining_seconds(),
            display: self.session.display(),
        });
    }
}

impl fmt::Debug for FocusTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTimer")
            .field("session", &self.session)
            .field("timeline", &self.timeline)
            .field("mixer", &self.mixer)
            .field("pattern", &self.pattern.as_ref().map(|p| p.fraction()))
            .field("pending_events", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::MemorySink,
        chime::{MemoryToneOutput, OutputState},
        clock::ManualClock,
        reveal::MotionToggle,
    };

    struct Rig {
        timer: FocusTimer,
        clock: ManualClock,
        tone: MemoryToneOutput,
        motion: MotionToggle,
    }

    fn rig(minutes: f64) -> Rig {
        let clock = ManualClock::starting_at(10_000);
        let tone = MemoryToneOutput::default();
        let motion = MotionToggle::new(false);
        let mut config = AppConfig::default();
        config.timer.duration_minutes = minutes;
        let timer = FocusTimer::new(
            &config,
            Host {
                clock: Box::new(clock.clone()),
                audio: Box::new(MemorySink::new()),
                tone: Box::new(tone.clone()),
                motion: Box::new(motion.clone()),
            },
        )
        .unwrap();
        Rig {
            timer,
            clock,
            tone,
            motion,
        }
    }

    impl Rig {
        /// Steps the clock through every deadline up to `until`.
        fn run_until(&mut self, until: u64) {
            while let Some(due) = self.timer.next_deadline().filter(|due| *due <= until) {
                self.clock.set(due);
                self.timer.pump();
            }
            self.clock.set(until);
            self.timer.pump();
        }

        fn elapse(&mut self, ms: u64) {
            let until = self.clock.now_ms() + ms;
            self.run_until(until);
        }
    }

    fn notices(events: &[CoreEvent]) -> Vec<Notice> {
        events
            .iter()
            .filter_map(|event| match event {
                CoreEvent::Status { notice } => Some(*notice),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn start_arms_one_loop_pair() {
        let mut rig = rig(5.0);
        assert!(rig.timer.start(None).unwrap());
        assert!(!rig.timer.start(None).unwrap());

        assert_eq!(rig.timer.timeline().pending(Task::VisualFrame), 1);
        assert_eq!(rig.timer.timeline().pending(Task::Watchdog), 1);
        assert_eq!(notices(&rig.timer.take_events()), vec![Notice::Started]);
    }

    #[test]
    fn visual_loop_updates_display_then_reveal() {
        let mut rig = rig(1.0);
        rig.timer.start(None).unwrap();
        rig.timer.take_events();

        rig.elapse(1_050);
        let events = rig.timer.take_events();
        let remaining = events
            .iter()
            .position(|event| matches!(event, CoreEvent::Remaining { seconds: 59, .. }))
            .unwrap();
        let reveal = events
            .iter()
            .rposition(|event| matches!(event, CoreEvent::Reveal { .. }))
            .unwrap();
        assert!(remaining < reveal);

        let fraction = rig.timer.pattern().unwrap().fraction();
        assert!(fraction > 0.0 && fraction < 0.05);
    }

    #[test]
    fn display_is_emitted_once_per_second() {
        let mut rig = rig(1.0);
        rig.timer.start(None).unwrap();
        rig.timer.take_events();

        rig.elapse(10_000);
        let displays: Vec<String> = rig
            .timer
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                CoreEvent::Remaining { display, .. } => Some(display),
                _ => None,
            })
            .collect();
        assert_eq!(displays.len(), 10);
        assert_eq!(displays.first().map(String::as_str), Some("00:59"));
        assert_eq!(displays.last().map(String::as_str), Some("00:50"));
    }

    #[test]
    fn zero_is_shown_exactly_once() {
        let zeros = |events: &[CoreEvent]| {
            events
                .iter()
                .filter(|event| matches!(event, CoreEvent::Remaining { seconds: 0, .. }))
                .count()
        };

        let mut natural = rig(1.0);
        natural.timer.start(None).unwrap();
        natural.elapse(61_000);
        assert_eq!(natural.timer.state(), SessionState::Complete);
        assert_eq!(zeros(&natural.timer.take_events()), 1);

        let mut early = rig(1.0);
        early.timer.start(None).unwrap();
        early.elapse(5_000);
        early.timer.complete();
        assert_eq!(zeros(&early.timer.take_events()), 1);
    }

    #[test]
    fn reduced_motion_is_checked_every_frame() {
        let mut rig = rig(10.0);
        rig.timer.start(None).unwrap();
        rig.elapse(100);
        assert!(rig.timer.pattern().unwrap().fraction() < 0.01);

        rig.motion.set(true);
        rig.elapse(20);
        assert_eq!(rig.timer.pattern().unwrap().fraction(), 1.0);

        rig.motion.set(false);
        rig.elapse(20);
        assert!(rig.timer.pattern().unwrap().fraction() < 0.01);
    }

    #[test]
    fn complete_is_idempotent() {
        let mut rig = rig(1.0);
        rig.timer.start(None).unwrap();
        rig.timer.complete();
        rig.timer.complete();

        let events = rig.timer.take_events();
        assert_eq!(notices(&events), vec![Notice::Started, Notice::Complete]);
        assert_eq!(rig.tone.played().len(), 1);
        assert_eq!(rig.timer.timeline().pending(Task::VisualFrame), 0);
        assert_eq!(rig.timer.timeline().pending(Task::Watchdog), 0);
    }

    #[test]
    fn complete_requires_reset_before_restart() {
        let mut rig = rig(1.0);
        rig.timer.start(None).unwrap();
        rig.timer.complete();

        assert!(matches!(
            rig.timer.start(None),
            Err(KenshoError::RestartRequiresReset)
        ));
        rig.timer.reset();
        assert!(rig.timer.start(None).unwrap());
    }

    #[test]
    fn configure_only_while_idle() {
        let mut rig = rig(1.0);
        rig.timer.configure(25.0).unwrap();
        assert_eq!(rig.timer.session().total_seconds(), 1_500);

        rig.timer.start(None).unwrap();
        assert!(matches!(
            rig.timer.configure(5.0),
            Err(KenshoError::SessionActive)
        ));
        assert!(matches!(
            rig.timer.preview(Some(SoundId::Rain)),
            Err(KenshoError::SessionActive)
        ));
    }

    #[test]
    fn hidden_view_still_completes() {
        let mut rig = rig(1.0);
        rig.timer.start(None).unwrap();
        rig.timer.set_visible(false);

        rig.elapse(60_000);
        assert_eq!(rig.timer.state(), SessionState::Complete);
        assert_eq!(rig.timer.session().remaining_seconds(), 0);
        assert!(rig.timer.pattern().unwrap().is_fully_drawn());
    }

    #[test]
    fn unavailable_selection_reverts_to_silence() {
        let mut rig = rig(1.0);
        let selection = rig
            .timer
            .channel_unavailable(SoundId::Forest, Some(SoundId::Forest));
        assert_eq!(selection, None);

        let selection = rig
            .timer
            .channel_unavailable(SoundId::Waves, Some(SoundId::Rain));
        assert_eq!(selection, Some(SoundId::Rain));

        assert!(matches!(
            rig.timer.preview(Some(SoundId::Forest)),
            Err(KenshoError::ChannelUnavailable(SoundId::Forest))
        ));
        // Starting with a disabled sound runs silently.
        assert!(rig.timer.start(Some(SoundId::Waves)).unwrap());
        assert!(rig.timer.mixer().playing().is_empty());
    }

    #[test]
    fn chime_failure_does_not_block_completion() {
        let mut rig = rig(1.0);
        rig.tone.fail_resume();
        rig.timer.start(None).unwrap();

        rig.elapse(61_000);
        assert_eq!(rig.timer.state(), SessionState::Complete);
        let events = rig.timer.take_events();
        assert!(events.contains(&CoreEvent::Chime { played: false }));
        assert_eq!(notices(&events).last(), Some(&Notice::Complete));
        assert_eq!(rig.tone.state_now(), OutputState::Suspended);
    }
}
