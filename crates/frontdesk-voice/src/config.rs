use crate::error::VoiceError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_rate() -> f32 {
    0.95
}

fn default_pitch() -> f32 {
    1.1
}

fn default_volume() -> f32 {
    1.0
}

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_start_grace_ms() -> u64 {
    100
}

fn default_synthesizer() -> String {
    "espeak-ng".to_string()
}

fn default_listen_timeout_secs() -> u64 {
    15
}

/// Static speech engine configuration.
///
/// `rate`, `pitch` and `volume` use Web Speech conventions: 1.0 is the
/// engine's normal value, volume is clamped to `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_locale")]
    pub locale: String,
    /// How long the engine gets to signal the start of an utterance before
    /// the adapter re-issues it. Default: 100 ms.
    #[serde(default = "default_start_grace_ms")]
    pub start_grace_ms: u64,
    /// Synthesizer program used by [`ProcessSpeechEngine`](crate::ProcessSpeechEngine).
    #[serde(default = "default_synthesizer")]
    pub synthesizer: String,
    /// Explicit synthesizer voice; derived from `locale` when unset.
    #[serde(default)]
    pub voice: Option<String>,
    /// Recognizer program and arguments. It must print the recognized
    /// utterance on stdout. Empty disables voice input.
    #[serde(default)]
    pub recognizer_command: Vec<String>,
    /// Upper bound on a single listen session. Default: 15 s.
    #[serde(default = "default_listen_timeout_secs")]
    pub listen_timeout_secs: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            pitch: default_pitch(),
            volume: default_volume(),
            locale: default_locale(),
            start_grace_ms: default_start_grace_ms(),
            synthesizer: default_synthesizer(),
            voice: None,
            recognizer_command: Vec::new(),
            listen_timeout_secs: default_listen_timeout_secs(),
        }
    }
}

impl SpeechConfig {
    /// Checks that the prosody values are in the ranges engines accept.
    pub fn validate(&self) -> Result<(), VoiceError> {
        if !(0.1..=10.0).contains(&self.rate) {
            return Err(VoiceError::Config(
                "Rate must be between 0.1 and 10.0".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.pitch) {
            return Err(VoiceError::Config(
                "Pitch must be between 0.0 and 2.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(VoiceError::Config(
                "Volume must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.locale.trim().is_empty() {
            return Err(VoiceError::Config("Locale must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn start_grace(&self) -> Duration {
        Duration::from_millis(self.start_grace_ms)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    /// The synthesizer voice name: the explicit `voice`, else the locale in
    /// lower case (`en-US` becomes `en-us`).
    pub fn voice_name(&self) -> String {
        self.voice
            .clone()
            .unwrap_or_else(|| self.locale.to_ascii_lowercase())
    }
}
