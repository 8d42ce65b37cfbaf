//! Short audio previews of the persona selected in a details form.

use crate::catalog::{self, LanguageFilter, SexFilter};
use crate::config_loader;
use crate::fingerprint::Endpoint;
use crate::options::{
    str_field, AudioFormat, FormData, SynthesisConfig, CONF_LANGUAGE, CONF_PERSONA,
    CONF_PREVIEW_TEXT, CONF_SEX, DEFAULT_PREVIEW_TEXT,
};
use crate::speech::{SpeechClient, SpeechError, SpeechOptions};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("select a persona to preview")]
    PersonaRequired,
    #[error(transparent)]
    Speech(#[from] SpeechError),
}

/// Encoded preview clip, shaped for a frontend event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preview {
    pub audio_base64: String,
    pub format: &'static str,
    pub persona: String,
    pub text: String,
}

/// Synthesize the preview text with the persona currently shown in `form`.
/// The form value may be in display or technical form. Always requests WAV.
pub async fn preview_audio(endpoint: &Endpoint, form: &FormData) -> Result<Preview, PreviewError> {
    let display = str_field(form, CONF_PERSONA)
        .filter(|p| !catalog::is_placeholder(p))
        .ok_or(PreviewError::PersonaRequired)?;
    let persona = catalog::technical_name_in(
        display,
        LanguageFilter::parse_opt(str_field(form, CONF_LANGUAGE)),
        SexFilter::parse_opt(str_field(form, CONF_SEX)),
    );
    let text = str_field(form, CONF_PREVIEW_TEXT)
        .unwrap_or(DEFAULT_PREVIEW_TEXT)
        .to_string();

    let config = SynthesisConfig::from_data(form);
    let opts = SpeechOptions {
        voice: Some(persona.clone()),
        format: AudioFormat::Wav,
        pad_ms: 0,
        ..SpeechOptions::from_config(&config)
    };

    let client =
        SpeechClient::new(endpoint.clone()).with_timeout(config_loader::current().preview_timeout());
    let audio = client.synthesize(&text, &opts).await?;
    info!(persona = %persona, bytes = audio.data.len(), "Preview ready");

    Ok(Preview {
        audio_base64: BASE64.encode(&audio.data),
        format: AudioFormat::Wav.as_str(),
        persona,
        text,
    })
}
