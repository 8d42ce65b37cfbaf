//! Discovery of the models and personas a Kokoro server offers.
//!
//! Both lookups are best effort: any failure yields an empty list for that
//! lookup only.

use crate::catalog;
use crate::config_loader;
use crate::fingerprint::Endpoint;
use crate::options::DEFAULT_MODEL;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const MODELS_PATH: &str = "/v1/models";

/// Field names under which a listing may arrive, in lookup order.
const MODEL_KEYS: [&str; 2] = ["data", "models"];
const PERSONA_KEYS: [&str; 3] = ["voices", "personas", "data"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    pub models: Vec<String>,
    pub personas: Vec<String>,
}

impl Discovery {
    /// Substitute the static catalog for missing personas and the default
    /// model for missing models.
    pub fn with_fallbacks(mut self) -> Self {
        if self.personas.is_empty() {
            debug!("No personas discovered, using the static catalog");
            self.personas = catalog::all_ids();
        }
        if self.models.is_empty() {
            debug!("No models discovered, using '{}'", DEFAULT_MODEL);
            self.models = vec![DEFAULT_MODEL.to_string()];
        }
        self
    }
}

/// Discovery client for one endpoint.
pub struct Discoverer {
    endpoint: Endpoint,
    personas_path: String,
    timeout: Duration,
}

impl Discoverer {
    pub fn new(endpoint: Endpoint) -> Self {
        let settings = config_loader::current();
        Self {
            endpoint,
            personas_path: settings.personas_path.clone(),
            timeout: settings.discovery_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_personas_path(mut self, path: impl Into<String>) -> Self {
        self.personas_path = path.into();
        self
    }

    /// Run both lookups, one after the other.
    pub async fn discover(&self) -> Discovery {
        let models = self.list(MODELS_PATH, &MODEL_KEYS).await;
        let personas = self.list(&self.personas_path, &PERSONA_KEYS).await;
        debug!(
            base_url = %self.endpoint.base_url,
            models = models.len(),
            personas = personas.len(),
            "Discovery complete"
        );
        Discovery { models, personas }
    }

    pub async fn models(&self) -> Vec<String> {
        self.list(MODELS_PATH, &MODEL_KEYS).await
    }

    pub async fn personas(&self) -> Vec<String> {
        self.list(&self.personas_path, &PERSONA_KEYS).await
    }

    async fn list(&self, path: &str, keys: &[&str]) -> Vec<String> {
        let url = self.endpoint.url(path);
        match self.fetch(&url).await {
            Ok(Some(body)) => extract_ids(&body, keys),
            Ok(None) => Vec::new(),
            Err(e) => {
                debug!(url = %url, error = %e, "Discovery lookup failed");
                Vec::new()
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Option<Value>, reqwest::Error> {
        // A fresh client per lookup, dropped on every exit path.
        let client = reqwest::Client::builder().timeout(self.timeout).build()?;
        let mut request = client.get(url);
        if let Some(key) = self.endpoint.bearer() {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await?;
        if resp.status() != reqwest::StatusCode::OK {
            warn!(url = %url, status = %resp.status(), "Discovery lookup returned non-200");
            return Ok(None);
        }
        resp.json::<Value>().await.map(Some)
    }
}

/// Convenience wrapper: discover with process settings.
pub async fn discover(endpoint: &Endpoint) -> Discovery {
    Discoverer::new(endpoint.clone()).discover().await
}

/// Normalise a listing payload to an ordered list of ids.
///
/// Accepts an object holding an array under one of `keys`, or a bare array.
/// Array items may be strings or objects with a string `id`; anything else
/// is dropped.
pub fn extract_ids(body: &Value, keys: &[&str]) -> Vec<String> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(map) => match keys.iter().find_map(|k| map.get(*k)?.as_array()) {
            Some(items) => items,
            None => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("id").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_models_shape() {
        let body = json!({ "data": [{ "id": "kokoro" }, { "id": "" }, { "name": "x" }, 7, { "id": "tts-1" }] });
        assert_eq!(extract_ids(&body, &MODEL_KEYS), vec!["kokoro", "tts-1"]);
    }

    #[test]
    fn test_extract_persona_shapes() {
        let voices = json!({ "voices": ["af_heart", 3, "bm_george"] });
        assert_eq!(extract_ids(&voices, &PERSONA_KEYS), vec!["af_heart", "bm_george"]);

        let personas = json!({ "voices": "nope", "personas": ["jm_kumo"] });
        assert_eq!(extract_ids(&personas, &PERSONA_KEYS), vec!["jm_kumo"]);

        let bare = json!(["ff_siwis", null]);
        assert_eq!(extract_ids(&bare, &PERSONA_KEYS), vec!["ff_siwis"]);
    }

    #[test]
    fn test_extract_unknown_shape() {
        assert!(extract_ids(&json!({ "result": [] }), &PERSONA_KEYS).is_empty());
        assert!(extract_ids(&json!("af_heart"), &PERSONA_KEYS).is_empty());
    }

    #[test]
    fn test_fallbacks() {
        let d = Discovery::default().with_fallbacks();
        assert_eq!(d.models, vec![DEFAULT_MODEL]);
        assert_eq!(d.personas.len(), catalog::PERSONAS.len());

        let kept = Discovery {
            models: vec!["m".into()],
            personas: vec!["p".into()],
        }
        .with_fallbacks();
        assert_eq!(kept.personas, vec!["p"]);
    }
}
