use serde::{Deserialize, Serialize};

use crate::{pattern::Segment, SoundId};

/// Status changes worth announcing to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notice {
    Started,
    Reset,
    Complete,
}

/// Everything the engine tells the outside world, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    /// Whole-second change of the countdown, formatted `MM:SS`.
    Remaining { seconds: u64, display: String },
    /// A fresh pattern for the session that just started.
    PatternGenerated { segments: Vec<Segment> },
    /// Reveal fraction applied to every segment on this tick.
    Reveal { fraction: f64 },
    PatternCleared,
    Status { notice: Notice },
    FadeFinished { sound: SoundId, gain: f32 },
    /// A channel was taken out of service; `reverted` is set when it was the
    /// selected sound and the selection fell back to silence.
    ChannelDisabled { sound: SoundId, reverted: bool },
    Chime { played: bool },
}
