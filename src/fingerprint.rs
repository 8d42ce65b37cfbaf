//! Connection endpoint validation and the stable identity derived from it.

use crate::options::{is_real_api_key, DEFAULT_API_KEY};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::{Host, Url};

/// Hex characters kept from the SHA-256 digest.
const FINGERPRINT_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("base URL is required")]
    Missing,
    #[error("base URL must be an http(s) URL with a hostname: {0}")]
    Invalid(String),
}

impl EndpointError {
    /// Field-scoped error key shown next to the base URL input.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Missing => "base_url_required",
            Self::Invalid(_) => "invalid_base_url",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
}

/// Trim whitespace and trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

impl Endpoint {
    /// Validate and normalise a base address. A missing credential becomes
    /// the "not needed" sentinel.
    pub fn parse(raw_url: &str, api_key: Option<&str>) -> Result<Self, EndpointError> {
        let base_url = normalize_base_url(raw_url);
        if base_url.is_empty() {
            return Err(EndpointError::Missing);
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EndpointError::Invalid(base_url));
        }
        let has_host = Url::parse(&base_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| !h.is_empty()))
            .unwrap_or(false);
        if !has_host {
            return Err(EndpointError::Invalid(base_url));
        }

        Ok(Self {
            base_url,
            api_key: api_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .unwrap_or(DEFAULT_API_KEY)
                .to_string(),
        })
    }

    /// Host part of the base address; IPv6 literals come without brackets.
    pub fn hostname(&self) -> String {
        let Ok(url) = Url::parse(&self.base_url) else {
            return self.base_url.clone();
        };
        match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(addr)) => addr.to_string(),
            Some(Host::Ipv6(addr)) => addr.to_string(),
            None => self.base_url.clone(),
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.base_url)
    }

    /// Bearer credential, if one is actually configured.
    pub fn bearer(&self) -> Option<&str> {
        is_real_api_key(&self.api_key).then_some(self.api_key.as_str())
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Stable short identity of a base address, used to refuse configuring the
/// same server twice.
pub fn fingerprint(base_url: &str) -> String {
    let digest = Sha256::digest(base_url.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(FINGERPRINT_LEN);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let ep = Endpoint::parse("  https://tts.example:8080/ ", None).unwrap();
        assert_eq!(ep.base_url, "https://tts.example:8080");
        assert_eq!(ep.api_key, DEFAULT_API_KEY);
        assert_eq!(ep.hostname(), "tts.example");
        assert!(ep.bearer().is_none());
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(Endpoint::parse("", None), Err(EndpointError::Missing));
        assert_eq!(Endpoint::parse(" / ", None), Err(EndpointError::Missing));
        assert_eq!(
            Endpoint::parse("tts.example:8080", None).unwrap_err().reason(),
            "invalid_base_url"
        );
        assert_eq!(
            Endpoint::parse("ftp://tts.example", None).unwrap_err().reason(),
            "invalid_base_url"
        );
        assert_eq!(
            Endpoint::parse("http://", None).unwrap_err().reason(),
            "invalid_base_url"
        );
    }

    #[test]
    fn test_hostname_forms() {
        let v6 = Endpoint::parse("http://[::1]:8880", None).unwrap();
        assert_eq!(v6.hostname(), "::1");
        let v4 = Endpoint::parse("http://192.168.1.20:8880/", None).unwrap();
        assert_eq!(v4.hostname(), "192.168.1.20");
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = fingerprint("http://kokoro.local:8880");
        let b = Endpoint::parse("http://kokoro.local:8880/", None)
            .unwrap()
            .fingerprint();
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_ne!(a, fingerprint("http://kokoro.local:8881"));
    }

    #[test]
    fn test_bearer_only_for_real_keys() {
        let ep = Endpoint::parse("http://h", Some("sk-abc")).unwrap();
        assert_eq!(ep.bearer(), Some("sk-abc"));
        let ep = Endpoint::parse("http://h", Some("x")).unwrap();
        assert_eq!(ep.bearer(), None);
    }
}
