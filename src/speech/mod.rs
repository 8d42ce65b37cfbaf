pub mod client;
pub mod error;
pub mod kokoro;

pub use client::SpeechClient;
pub use error::{ErrorCategory, SpeechError};
pub use kokoro::KokoroProvider;

use crate::options::{
    AudioFormat, FormData, SynthesisConfig, CONF_FORMAT, CONF_PAD_MS, CONF_SAMPLE_RATE,
    CONF_SPEED, MAX_PAD_MS, MAX_SPEED, MIN_SPEED,
};
use async_trait::async_trait;
use serde_json::Value;

/// Per-call options a host may pass along with a message.
pub const SUPPORTED_OPTIONS: [&str; 6] = [
    "voice",
    "speed",
    "pad_ms",
    "format",
    "sample_rate",
    "volume_multiplier",
];

/// Audio handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub format: AudioFormat,
    pub data: Vec<u8>,
}

impl SpeechAudio {
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Fully resolved parameters of one synthesis call.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub model: String,
    pub voice: Option<String>,
    pub speed: f32,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub volume_multiplier: f32,
    pub pad_ms: u32,
    pub pad_trailing: bool,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

impl SpeechOptions {
    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            model: config.model.clone(),
            voice: config.persona.clone(),
            speed: config.speed,
            format: config.format,
            sample_rate: config.sample_rate,
            volume_multiplier: 1.0,
            pad_ms: config.pad_ms,
            pad_trailing: false,
        }
    }

    /// Apply per-call overrides on top of stored defaults.
    pub fn with_overrides(mut self, overrides: &SpeechOverrides) -> Self {
        if let Some(voice) = &overrides.voice {
            self.voice = Some(voice.clone());
        }
        if let Some(speed) = overrides.speed {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(rate) = overrides.sample_rate {
            self.sample_rate = rate;
        }
        if let Some(volume) = overrides.volume_multiplier {
            self.volume_multiplier = volume;
        }
        if let Some(pad) = overrides.pad_ms {
            self.pad_ms = pad.min(MAX_PAD_MS);
        }
        self
    }
}

/// Overrides parsed from the host's per-call option map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeechOverrides {
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub format: Option<AudioFormat>,
    pub sample_rate: Option<u32>,
    pub volume_multiplier: Option<f32>,
    pub pad_ms: Option<u32>,
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl SpeechOverrides {
    /// Unparseable values are ignored rather than rejected.
    pub fn from_map(map: &FormData) -> Self {
        Self {
            voice: map
                .get("voice")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            speed: map.get(CONF_SPEED).and_then(number).map(|v| v as f32),
            format: map
                .get(CONF_FORMAT)
                .and_then(Value::as_str)
                .and_then(AudioFormat::parse),
            sample_rate: map
                .get(CONF_SAMPLE_RATE)
                .and_then(number)
                .filter(|v| *v > 0.0)
                .map(|v| v as u32),
            volume_multiplier: map
                .get("volume_multiplier")
                .and_then(number)
                .filter(|v| *v >= 0.0)
                .map(|v| v as f32),
            pad_ms: map
                .get(CONF_PAD_MS)
                .and_then(number)
                .filter(|v| *v >= 0.0)
                .map(|v| v as u32),
        }
    }
}

/// A speech engine the host can call at synthesis time.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    fn name(&self) -> &str;

    fn default_language(&self) -> &str;

    fn supported_languages(&self) -> Vec<String>;

    fn supported_options(&self) -> &'static [&'static str] {
        &SUPPORTED_OPTIONS
    }

    async fn get_tts_audio(
        &self,
        message: &str,
        language: &str,
        options: &FormData,
    ) -> Result<SpeechAudio, SpeechError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overrides_applied() {
        let base = SpeechOptions::default();
        let map = json!({
            "voice": "bm_george",
            "speed": "1.5",
            "format": "mp3",
            "sample_rate": 44100,
            "volume_multiplier": 2,
            "pad_ms": 99999
        });
        let opts = base.with_overrides(&SpeechOverrides::from_map(map.as_object().unwrap()));
        assert_eq!(opts.voice.as_deref(), Some("bm_george"));
        assert_eq!(opts.speed, 1.5);
        assert_eq!(opts.format, AudioFormat::Mp3);
        assert_eq!(opts.sample_rate, 44100);
        assert_eq!(opts.volume_multiplier, 2.0);
        assert_eq!(opts.pad_ms, MAX_PAD_MS);
    }

    #[test]
    fn test_bad_overrides_ignored() {
        let map = json!({ "speed": "fast", "format": "aac", "voice": "  " });
        let overrides = SpeechOverrides::from_map(map.as_object().unwrap());
        assert_eq!(overrides, SpeechOverrides::default());
    }
}
