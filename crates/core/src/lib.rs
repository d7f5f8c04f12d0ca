//! Core library for the Kenshō focus timer.
//!
//! The crate holds the session engine: a countdown that is the clock of
//! record, a generated star pattern revealed in step with elapsed time, and
//! the ambient-sound crossfades and completion chime that accompany it. Each
//! module owns one subsystem; [`FocusTimer`] wires them together on a single
//! cooperative [`Scheduler`]. Hosts supply time, audio and accessibility
//! through the traits in [`clock`], [`audio`], [`chime`] and [`reveal`].

pub mod assets;
pub mod audio;
pub mod chime;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod pattern;
pub mod render;
pub mod reveal;
pub mod session;
pub mod timeline;

pub use assets::{SoundLibrary, SoundSource};
pub use audio::{AfterFade, AudioChannel, AudioSink, FadeFinished, Mixer, SoundId};
pub use chime::{Chime, OutputState, ToneBuffer, ToneOutput};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, AudioConfig, ChimeConfig, LoopConfig, PatternConfig, TimerConfig};
pub use engine::{FocusTimer, Host};
pub use error::{KenshoError, Result};
pub use event::{CoreEvent, Notice};
pub use pattern::{PatternSpec, Segment};
pub use render::render_svg;
pub use reveal::{MotionPreference, RevealedPattern};
pub use session::{format_clock, Session, SessionState};
pub use timeline::{Lane, Scheduler, Task, TaskId};
