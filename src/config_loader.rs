use config::{Config, File};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Remote service
    pub discovery_timeout_secs: u64, // Per-lookup total timeout
    pub speech_timeout_secs: u64,    // Synthesis call, including the follow-up download
    pub preview_timeout_secs: u64,
    pub personas_path: String, // "/v1/audio/voices" or "/v1/audio/personas"
    // Audio post-processing
    pub default_pad_ms: u32,
    pub pad_trailing: bool,
    // Host
    pub entry_store_path: String,
    pub log_filter: String,
}

fn default_store_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kokoro-bridge")
        .join("entries.json")
        .to_string_lossy()
        .into_owned()
}

fn user_config_file() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kokoro-bridge")
        .join("Kokoro")
        .to_string_lossy()
        .into_owned()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            discovery_timeout_secs: 8,
            speech_timeout_secs: 60,
            preview_timeout_secs: 10,
            personas_path: "/v1/audio/voices".to_string(),
            default_pad_ms: 0,
            pad_trailing: false,
            entry_store_path: default_store_path(),
            log_filter: "info".to_string(),
        }
    }
}

lazy_static! {
    pub static ref SETTINGS: RwLock<Settings> =
        RwLock::new(Settings::new().unwrap_or_else(|e| {
            eprintln!("Falling back to default settings: {}", e);
            Settings::default()
        }));
}

/// Snapshot of the process-wide settings.
pub fn current() -> Settings {
    SETTINGS
        .read()
        .map(|s| s.clone())
        .unwrap_or_default()
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = Config::builder()
            .set_default("discovery_timeout_secs", 8)?
            .set_default("speech_timeout_secs", 60)?
            .set_default("preview_timeout_secs", 10)?
            .set_default("personas_path", "/v1/audio/voices")?
            .set_default("default_pad_ms", 0)?
            .set_default("pad_trailing", false)?
            .set_default("entry_store_path", default_store_path())?
            .set_default("log_filter", "info")?
            // Merge with local config file (if exists)
            .add_source(File::with_name("Kokoro").required(false))
            .add_source(File::with_name(&user_config_file()).required(false))
            // Merge with environment variables (e.g. KOKORO_SPEECH_TIMEOUT_SECS)
            .add_source(config::Environment::with_prefix("KOKORO"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.discovery_timeout_secs == 0
            || self.speech_timeout_secs == 0
            || self.preview_timeout_secs == 0
        {
            return Err(config::ConfigError::Message(
                "timeouts must be greater than 0".to_string(),
            ));
        }
        if self.default_pad_ms > 2000 {
            return Err(config::ConfigError::Message(format!(
                "Invalid default_pad_ms: {}. Must be between 0 and 2000",
                self.default_pad_ms
            )));
        }
        if !self.personas_path.starts_with('/') {
            return Err(config::ConfigError::Message(format!(
                "personas_path must start with '/': {}",
                self.personas_path
            )));
        }
        Ok(())
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs)
    }

    pub fn speech_timeout(&self) -> Duration {
        Duration::from_secs(self.speech_timeout_secs)
    }

    pub fn preview_timeout(&self) -> Duration {
        Duration::from_secs(self.preview_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_load() {
        let settings = Settings::new().expect("Failed to load settings");
        assert!(settings.speech_timeout_secs > 0);
        assert!(settings.personas_path.starts_with('/'));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("KOKORO_SPEECH_TIMEOUT_SECS", "5");
        let settings = Settings::new();
        std::env::remove_var("KOKORO_SPEECH_TIMEOUT_SECS");
        assert_eq!(settings.unwrap().speech_timeout_secs, 5);
    }

    #[test]
    fn test_validate_rejects_large_pad() {
        let settings = Settings {
            default_pad_ms: 5000,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
