//! Field keys, defaults and the typed synthesis configuration.
//!
//! Entries are persisted by the host as plain key/value maps. The keys and
//! value domains are defined here; [`SynthesisConfig`] is the typed view the
//! speech adapter works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Form input and persisted entry data as delivered by the host.
pub type FormData = Map<String, Value>;

pub const CONF_BASE_URL: &str = "base_url";
pub const CONF_API_KEY: &str = "api_key";
pub const CONF_MODEL: &str = "model";
pub const CONF_PERSONA: &str = "persona";
pub const CONF_LANGUAGE: &str = "language";
pub const CONF_SEX: &str = "sex";
pub const CONF_SPEED: &str = "speed";
pub const CONF_FORMAT: &str = "format";
pub const CONF_SAMPLE_RATE: &str = "sample_rate";
pub const CONF_PREVIEW_TEXT: &str = "preview_text";
pub const CONF_PAD_MS: &str = "pad_ms";

pub const DEFAULT_API_KEY: &str = "not-needed";
pub const DEFAULT_MODEL: &str = "kokoro";
pub const DEFAULT_SPEED: f32 = 0.9;
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;
pub const DEFAULT_PREVIEW_TEXT: &str = "Hello, this is a preview of the selected persona.";

pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;
pub const SPEED_STEP: f32 = 0.05;
pub const MAX_PAD_MS: u32 = 2000;

pub const SUPPORTED_SAMPLE_RATES: [u32; 3] = [22050, 24000, 44100];

/// Credentials that mean "the server does not need one".
const PLACEHOLDER_API_KEYS: [&str; 3] = ["", "x", DEFAULT_API_KEY];

/// True when `key` is a real bearer credential rather than a placeholder.
pub fn is_real_api_key(key: &str) -> bool {
    !PLACEHOLDER_API_KEYS.contains(&key.trim())
}

/// Output audio container requested from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Mp3,
    Opus,
    Flac,
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Wav,
        AudioFormat::Mp3,
        AudioFormat::Opus,
        AudioFormat::Flac,
        AudioFormat::Pcm,
    ];

    /// API parameter value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Pcm => "pcm",
        }
    }

    /// File extension handed back to the host. PCM is delivered as wav.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pcm => "wav",
            other => other.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "mp3" => Some(Self::Mp3),
            "opus" => Some(Self::Opus),
            "flac" => Some(Self::Flac),
            "pcm" => Some(Self::Pcm),
            _ => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replace a string `sample_rate` with its integer value.
///
/// Dropdown selectors only carry strings. A value that does not parse is
/// left as it was.
pub fn coerce_sample_rate(data: &mut FormData) {
    if let Some(Value::String(raw)) = data.get(CONF_SAMPLE_RATE) {
        if let Ok(rate) = raw.trim().parse::<u64>() {
            data.insert(CONF_SAMPLE_RATE.to_string(), Value::from(rate));
        }
    }
}

/// Widen an f32 to the short decimal it was written as, for JSON output.
pub fn wire_f32(v: f32) -> f64 {
    (v as f64 * 1000.0).round() / 1000.0
}

/// Read a string field, treating blanks as absent.
pub fn str_field<'a>(data: &'a FormData, key: &str) -> Option<&'a str> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn f32_field(data: &FormData, key: &str) -> Option<f32> {
    match data.get(key)? {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn u32_field(data: &FormData, key: &str) -> Option<u32> {
    match data.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Stored synthesis defaults of one configured entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisConfig {
    pub model: String,
    pub persona: Option<String>,
    pub language: String,
    pub sex: String,
    pub speed: f32,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub preview_text: Option<String>,
    pub pad_ms: u32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            persona: None,
            language: crate::catalog::ALL_LANGUAGES.to_string(),
            sex: crate::catalog::ALL_SEXES.to_string(),
            speed: DEFAULT_SPEED,
            format: AudioFormat::default(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            preview_text: None,
            pad_ms: 0,
        }
    }
}

impl SynthesisConfig {
    /// Build from stored entry data. Missing or out-of-domain values fall
    /// back to defaults.
    pub fn from_data(data: &FormData) -> Self {
        let defaults = Self::default();
        Self {
            model: str_field(data, CONF_MODEL)
                .map(str::to_string)
                .unwrap_or(defaults.model),
            persona: str_field(data, CONF_PERSONA).map(str::to_string),
            language: str_field(data, CONF_LANGUAGE)
                .map(str::to_string)
                .unwrap_or(defaults.language),
            sex: str_field(data, CONF_SEX)
                .map(str::to_string)
                .unwrap_or(defaults.sex),
            speed: f32_field(data, CONF_SPEED)
                .map(|s| s.clamp(MIN_SPEED, MAX_SPEED))
                .unwrap_or(defaults.speed),
            format: str_field(data, CONF_FORMAT)
                .and_then(AudioFormat::parse)
                .unwrap_or(defaults.format),
            sample_rate: u32_field(data, CONF_SAMPLE_RATE)
                .filter(|r| SUPPORTED_SAMPLE_RATES.contains(r))
                .unwrap_or(defaults.sample_rate),
            preview_text: str_field(data, CONF_PREVIEW_TEXT).map(str::to_string),
            pad_ms: u32_field(data, CONF_PAD_MS)
                .map(|p| p.min(MAX_PAD_MS))
                .unwrap_or(defaults.pad_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: Value) -> FormData {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_coerce_sample_rate() {
        let mut d = data(json!({ "sample_rate": "44100" }));
        coerce_sample_rate(&mut d);
        assert_eq!(d["sample_rate"], json!(44100));

        let mut bad = data(json!({ "sample_rate": "fast" }));
        coerce_sample_rate(&mut bad);
        assert_eq!(bad["sample_rate"], json!("fast"));
    }

    #[test]
    fn test_placeholder_api_keys() {
        assert!(!is_real_api_key("not-needed"));
        assert!(!is_real_api_key("x"));
        assert!(!is_real_api_key("  "));
        assert!(is_real_api_key("sk-123"));
    }

    #[test]
    fn test_config_from_data() {
        let cfg = SynthesisConfig::from_data(&data(json!({
            "model": "kokoro-v1",
            "persona": "af_heart",
            "speed": 9.0,
            "format": "MP3",
            "sample_rate": "22050",
            "pad_ms": 300
        })));
        assert_eq!(cfg.model, "kokoro-v1");
        assert_eq!(cfg.persona.as_deref(), Some("af_heart"));
        assert_eq!(cfg.speed, MAX_SPEED);
        assert_eq!(cfg.format, AudioFormat::Mp3);
        assert_eq!(cfg.sample_rate, 22050);
        assert_eq!(cfg.pad_ms, 300);
    }

    #[test]
    fn test_config_defaults_for_unknown_values() {
        let cfg = SynthesisConfig::from_data(&data(json!({
            "format": "aac",
            "sample_rate": 16000
        })));
        assert_eq!(cfg.format, AudioFormat::Wav);
        assert_eq!(cfg.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(cfg.speed, DEFAULT_SPEED);
        assert!(cfg.persona.is_none());
    }

    #[test]
    fn test_pcm_extension_is_wav() {
        assert_eq!(AudioFormat::Pcm.extension(), "wav");
        assert_eq!(AudioFormat::Opus.extension(), "opus");
    }
}
