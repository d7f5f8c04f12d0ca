use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::{assets::SoundSource, session::seconds_from_minutes, KenshoError, Result, SoundId};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub timer: TimerConfig,
    pub pattern: PatternConfig,
    pub loops: LoopConfig,
    pub audio: AudioConfig,
    pub chime: ChimeConfig,
    pub sounds: Vec<SoundSource>,
}

impl AppConfig {
    /// Parses a JSON document. Missing fields fall back to their defaults.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Reads the settings file at `path`. A missing or unreadable file yields
    /// the defaults; the caller never has to handle a broken settings file.
    pub fn load_or_default(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(raw) => match Self::from_json_str(&raw) {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "ignoring corrupt settings file");
                    Self::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "could not read settings file");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks everything a controller would reject at build time.
    pub fn validate(&self) -> Result<()> {
        seconds_from_minutes(self.timer.duration_minutes)?;
        self.pattern.validate()?;
        self.chime.validate()
    }
}

/// Session length and the choices the settings panel hands to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    pub duration_minutes: f64,
    pub sound: Option<SoundId>,
    pub reduced_motion: bool,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            duration_minutes: 15.0,
            sound: None,
            reduced_motion: false,
        }
    }
}

/// Geometry of the generated pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub line_count: usize,
    /// Connection step; must be coprime with `line_count`.
    pub multiplier: usize,
    pub size: f64,
    pub padding: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            line_count: 36,
            multiplier: 7,
            size: 400.0,
            padding: 20.0,
        }
    }
}

/// Cadence of the two countdown loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub frame_interval_ms: u64,
    pub watchdog_interval_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            watchdog_interval_ms: 1_000,
        }
    }
}

/// Crossfade timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub ramp_tick_ms: u64,
    pub session_fade_ms: u64,
    pub preview_peak: f32,
    pub preview_fade_ms: u64,
    pub preview_hold_ms: u64,
    /// Fade applied to whatever is playing when the selection changes.
    pub selection_stop_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ramp_tick_ms: 50,
            session_fade_ms: 1_000,
            preview_peak: 0.5,
            preview_fade_ms: 500,
            preview_hold_ms: 1_000,
            selection_stop_ms: 200,
        }
    }
}

/// Parameters of the completion chime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChimeConfig {
    pub frequency_hz: f32,
    pub peak_gain: f32,
    pub attack_ms: u32,
    pub decay_ms: u32,
    pub sample_rate: u32,
}

impl Default for ChimeConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 528.0,
            peak_gain: 0.3,
            attack_ms: 50,
            decay_ms: 3_000,
            sample_rate: 48_000,
        }
    }
}

impl ChimeConfig {
    /// Longest tone the synthesiser agrees to render.
    pub const MAX_TONE_MS: u64 = 10_000;

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Err(KenshoError::InvalidChime(reason.to_string()));
        if self.sample_rate == 0 {
            return invalid("sample rate must be positive");
        }
        if !self.frequency_hz.is_finite()
            || self.frequency_hz <= 0.0
            || self.frequency_hz >= self.sample_rate as f32 / 2.0
        {
            return invalid("frequency must lie between 0 and the Nyquist limit");
        }
        if !self.peak_gain.is_finite() || self.peak_gain <= 0.0 || self.peak_gain > 1.0 {
            return invalid("peak gain must lie in (0, 1]");
        }
        if self.decay_ms == 0 {
            return invalid("decay must be positive");
        }
        if self.attack_ms as u64 + self.decay_ms as u64 > Self::MAX_TONE_MS {
            return invalid("attack plus decay exceeds the longest tone");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_documents_keep_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "timer": { "duration_minutes": 25, "sound": "rain" } }"#)
                .unwrap();

        assert_eq!(config.timer.duration_minutes, 25.0);
        assert_eq!(config.timer.sound, Some(SoundId::Rain));
        assert_eq!(config.pattern, PatternConfig::default());
        assert_eq!(config.audio.ramp_tick_ms, 50);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.json");
        fs::write(&path, "{garbage_json: true").unwrap();

        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn saves_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("saved.json");
        let mut config = AppConfig::default();
        config.timer.duration_minutes = 45.0;
        config.timer.sound = Some(SoundId::Waves);
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load_or_default(&path), config);
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.timer.duration_minutes = -1.0;
        assert!(config.validate().is_err());

        config.timer.duration_minutes = 10.0;
        config.pattern.multiplier = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_degenerate_chimes() {
        let mut config = AppConfig::default();
        config.chime.peak_gain = 0.0;
        assert!(matches!(config.validate(), Err(KenshoError::InvalidChime(_))));

        config.chime = ChimeConfig {
            attack_ms: u32::MAX,
            decay_ms: u32::MAX,
            ..ChimeConfig::default()
        };
        assert!(matches!(config.validate(), Err(KenshoError::InvalidChime(_))));

        config.chime = ChimeConfig {
            frequency_hz: f32::NAN,
            ..ChimeConfig::default()
        };
        assert!(config.chime.validate().is_err());

        config.chime = ChimeConfig {
            sample_rate: 0,
            ..ChimeConfig::default()
        };
        assert!(config.chime.validate().is_err());

        assert!(ChimeConfig::default().validate().is_ok());
    }
}
