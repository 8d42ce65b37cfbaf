use super::{SpeechAudio, SpeechClient, SpeechError, SpeechOptions, SpeechOverrides, SpeechProvider};
use crate::config_loader::{self, Settings};
use crate::entry::ConfigEntry;
use crate::fingerprint::EndpointError;
use crate::options::{FormData, SynthesisConfig, CONF_PAD_MS};
use async_trait::async_trait;
use tracing::debug;

/// Speech provider backed by one configured Kokoro entry.
pub struct KokoroProvider {
    name: String,
    config: SynthesisConfig,
    pad_trailing: bool,
    client: SpeechClient,
}

impl KokoroProvider {
    pub fn from_entry(entry: &ConfigEntry) -> Result<Self, EndpointError> {
        Self::with_settings(entry, &config_loader::current())
    }

    fn with_settings(entry: &ConfigEntry, settings: &Settings) -> Result<Self, EndpointError> {
        let endpoint = entry.endpoint()?;
        let merged = entry.merged();

        let mut config = SynthesisConfig::from_data(&merged);
        // A stored value, zero included, wins over the process default.
        if !merged.contains_key(CONF_PAD_MS) {
            config.pad_ms = settings.default_pad_ms;
        }

        Ok(Self {
            name: entry.title.clone(),
            config,
            pad_trailing: settings.pad_trailing,
            client: SpeechClient::new(endpoint),
        })
    }

    pub fn with_client(mut self, client: SpeechClient) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Stored defaults with per-call overrides applied.
    pub fn resolve(&self, overrides: &SpeechOverrides) -> SpeechOptions {
        let mut opts = SpeechOptions::from_config(&self.config).with_overrides(overrides);
        opts.pad_trailing = self.pad_trailing;
        opts
    }
}

#[async_trait]
impl SpeechProvider for KokoroProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_language(&self) -> &str {
        "en"
    }

    fn supported_languages(&self) -> Vec<String> {
        vec!["en".to_string()]
    }

    async fn get_tts_audio(
        &self,
        message: &str,
        language: &str,
        options: &FormData,
    ) -> Result<SpeechAudio, SpeechError> {
        let opts = self.resolve(&SpeechOverrides::from_map(options));
        debug!(provider = %self.name, language = %language, "Synthesizing");
        self.client.synthesize(message, &opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::AudioFormat;
    use serde_json::json;

    fn entry() -> ConfigEntry {
        let data = json!({
            "base_url": "http://kokoro.local:8880",
            "api_key": "not-needed",
            "model": "kokoro",
            "persona": "af_heart",
            "speed": 0.9,
            "format": "wav",
            "sample_rate": 24000
        });
        let mut e = ConfigEntry::new("id", "Kokoro TTS (kokoro.local, kokoro)", data.as_object().cloned().unwrap());
        e.options = json!({ "persona": "bm_george", "format": "mp3" })
            .as_object()
            .cloned()
            .unwrap();
        e
    }

    #[test]
    fn test_options_override_stored_data() {
        let provider = KokoroProvider::from_entry(&entry()).unwrap();
        assert_eq!(provider.config().persona.as_deref(), Some("bm_george"));
        assert_eq!(provider.config().format, AudioFormat::Mp3);
        assert_eq!(provider.name(), "Kokoro TTS (kokoro.local, kokoro)");
    }

    #[test]
    fn test_call_overrides_win() {
        let provider = KokoroProvider::from_entry(&entry()).unwrap();
        let overrides = json!({ "voice": "jm_kumo", "speed": 1.2 });
        let opts = provider.resolve(&SpeechOverrides::from_map(overrides.as_object().unwrap()));
        assert_eq!(opts.voice.as_deref(), Some("jm_kumo"));
        assert!((opts.speed - 1.2).abs() < 1e-6);
        assert_eq!(opts.format, AudioFormat::Mp3);
    }

    #[test]
    fn test_default_pad_only_when_unset() {
        let settings = Settings {
            default_pad_ms: 300,
            ..Settings::default()
        };

        let unset = KokoroProvider::with_settings(&entry(), &settings).unwrap();
        assert_eq!(unset.config().pad_ms, 300);

        let mut zero = entry();
        zero.options.insert("pad_ms".to_string(), json!(0));
        let zero = KokoroProvider::with_settings(&zero, &settings).unwrap();
        assert_eq!(zero.config().pad_ms, 0);

        let mut stored = entry();
        stored.data.insert("pad_ms".to_string(), json!(120));
        let stored = KokoroProvider::with_settings(&stored, &settings).unwrap();
        assert_eq!(stored.config().pad_ms, 120);
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let e = ConfigEntry::new("id", "t", FormData::new());
        assert!(KokoroProvider::from_entry(&e).is_err());
    }
}
