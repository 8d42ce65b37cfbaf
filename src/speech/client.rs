use super::error::{ErrorCategory, SpeechError};
use super::{SpeechAudio, SpeechOptions};
use crate::config_loader;
use crate::fingerprint::Endpoint;
use crate::options::{wire_f32, AudioFormat};
use crate::wav;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const SPEECH_PATH: &str = "/v1/audio/speech";

/// Issues synthesis requests against one Kokoro endpoint.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    endpoint: Endpoint,
    timeout: Duration,
}

fn transport_error(url: &str) -> impl Fn(reqwest::Error) -> SpeechError + '_ {
    move |e| {
        if e.is_timeout() {
            error!(url = %url, "Timeout talking to Kokoro TTS");
            SpeechError::Timeout {
                url: url.to_string(),
            }
        } else {
            error!(url = %url, error = %e, "Network error talking to Kokoro TTS");
            SpeechError::Network(e)
        }
    }
}

impl SpeechClient {
    pub fn new(endpoint: Endpoint) -> Self {
        let timeout = config_loader::current().speech_timeout();
        Self { endpoint, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// JSON body of a synthesis request. `voice` and `volume_multiplier` are
    /// only sent when they would change anything.
    pub fn request_body(message: &str, opts: &SpeechOptions) -> Value {
        let mut body = json!({
            "model": opts.model,
            "input": message,
            "response_format": opts.format.as_str(),
            "download_format": opts.format.as_str(),
            "speed": wire_f32(opts.speed),
            "stream": false,
        });
        if let Some(voice) = opts.voice.as_deref().filter(|v| !v.trim().is_empty()) {
            body["voice"] = json!(voice);
        }
        if (opts.volume_multiplier - 1.0).abs() > 1e-6 {
            body["volume_multiplier"] = json!(wire_f32(opts.volume_multiplier));
        }
        body
    }

    pub async fn synthesize(
        &self,
        message: &str,
        opts: &SpeechOptions,
    ) -> Result<SpeechAudio, SpeechError> {
        if message.trim().is_empty() {
            return Err(SpeechError::EmptyMessage);
        }

        let url = self.endpoint.url(SPEECH_PATH);
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(SpeechError::Network)?;

        let mut request = client.post(&url).json(&Self::request_body(message, opts));
        if let Some(key) = self.endpoint.bearer() {
            request = request.bearer_auth(key);
        }

        debug!(url = %url, model = %opts.model, voice = ?opts.voice, format = %opts.format, "Requesting speech");
        let resp = request.send().await.map_err(transport_error(&url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "(unable to read error response)".to_string());
            let category = ErrorCategory::from_status(status.as_u16());
            if category.is_server_side() {
                error!(status = status.as_u16(), body = %body, "Kokoro TTS {}", category.message());
            } else {
                warn!(status = status.as_u16(), body = %body, "Kokoro TTS {}", category.message());
            }
            return Err(SpeechError::Remote {
                category,
                status: status.as_u16(),
                body,
            });
        }

        let is_json = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_lowercase().contains("application/json"))
            .unwrap_or(false);

        let raw = resp.bytes().await.map_err(transport_error(&url))?;
        let audio = if is_json {
            self.audio_from_json(&client, &raw).await?
        } else {
            raw.to_vec()
        };

        if audio.is_empty() {
            error!(url = %url, "Kokoro TTS returned an empty audio body");
            return Err(SpeechError::EmptyAudio);
        }

        let audio = if opts.format == AudioFormat::Wav && opts.pad_ms > 0 {
            wav::pad_silence(audio, opts.pad_ms, opts.sample_rate, opts.pad_trailing)
        } else {
            audio
        };

        Ok(SpeechAudio {
            format: opts.format,
            data: audio,
        })
    }

    /// Resolve a JSON reply: inline base64 `audio`, or a `download_url` to
    /// fetch the audio from.
    async fn audio_from_json(
        &self,
        client: &reqwest::Client,
        raw: &[u8],
    ) -> Result<Vec<u8>, SpeechError> {
        let value: Value = serde_json::from_slice(raw)
            .map_err(|e| SpeechError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        let obj = value.as_object().ok_or_else(|| {
            SpeechError::MalformedResponse("expected a JSON object".to_string())
        })?;

        if let Some(encoded) = obj.get("audio").and_then(Value::as_str) {
            return BASE64.decode(encoded.trim()).map_err(|e| {
                error!(error = %e, "Failed to decode base64 audio field");
                SpeechError::MalformedResponse(format!("audio field is not base64: {}", e))
            });
        }

        if let Some(link) = obj
            .get("download_url")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
        {
            let url = if link.starts_with('/') {
                self.endpoint.url(link)
            } else {
                link.to_string()
            };
            debug!(url = %url, "Fetching audio from download link");
            let resp = client.get(&url).send().await.map_err(transport_error(&url))?;
            if resp.status() != reqwest::StatusCode::OK {
                error!(url = %url, status = resp.status().as_u16(), "Audio download failed");
                return Err(SpeechError::Download {
                    url,
                    status: resp.status().as_u16(),
                });
            }
            let bytes = resp.bytes().await.map_err(transport_error(&url))?;
            return Ok(bytes.to_vec());
        }

        error!("JSON response did not contain audio or download_url");
        Err(SpeechError::MalformedResponse(
            "JSON response did not contain audio or download_url".to_string(),
        ))
    }
}
