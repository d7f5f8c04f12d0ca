use crate::SoundId;

/// Result alias that carries the custom [`KenshoError`] type.
pub type Result<T> = std::result::Result<T, KenshoError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum KenshoError {
    /// A session length that is not a positive, finite number of minutes, or
    /// one that rounds down to zero seconds.
    #[error("invalid session duration: {0} minutes")]
    InvalidDuration(f64),
    /// Settings cannot change while a session is counting down.
    #[error("a session is running; reset it first")]
    SessionActive,
    /// A completed session has to be reset before it can be started again.
    #[error("session is complete; reset before starting again")]
    RestartRequiresReset,
    /// Pattern parameters that would produce a degenerate figure.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    /// Chime settings that would render silence, NaN samples or an endless tone.
    #[error("invalid chime: {0}")]
    InvalidChime(String),
    /// The host refused to begin playback (autoplay policy and friends).
    #[error("playback of `{0}` was denied by the host")]
    PlaybackDenied(SoundId),
    /// The source behind a channel failed to load or decode.
    #[error("sound `{0}` is unavailable")]
    ChannelUnavailable(SoundId),
    /// A sound identifier that does not name any channel.
    #[error("unknown sound `{0}`")]
    UnknownSound(String),
    /// The chime output could not be initialised, resumed or fed.
    #[error("tone output failed: {0}")]
    ToneOutput(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl KenshoError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for KenshoError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for KenshoError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
