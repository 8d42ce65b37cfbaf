use thiserror::Error;

/// User-facing category of a failed synthesis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    Auth,
    Forbidden,
    NotFound,
    Validation,
    RateLimited,
    ServerError,
    BadGateway,
    Unavailable,
    Timeout,
    Generic,
}

impl ErrorCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Auth,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::Validation,
            429 => Self::RateLimited,
            500 => Self::ServerError,
            502 => Self::BadGateway,
            503 => Self::Unavailable,
            504 => Self::Timeout,
            _ => Self::Generic,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest => {
                "Invalid request parameters. Check your model, voice, and format settings"
            }
            Self::Auth => "Authentication failed. Check your API key configuration",
            Self::Forbidden => {
                "Access forbidden. Your API key may not have permission for this operation"
            }
            Self::NotFound => "TTS endpoint not found. Verify your base URL configuration",
            Self::Validation => {
                "Input validation failed. Check your text, voice, or model parameters"
            }
            Self::RateLimited => "Rate limit exceeded. Please wait before making more requests",
            Self::ServerError => "Server error. The TTS service is experiencing issues",
            Self::BadGateway => "Bad gateway. The TTS service may be temporarily unavailable",
            Self::Unavailable => "Service unavailable. The TTS service may be under maintenance",
            Self::Timeout => "Timeout. The TTS request took too long to process",
            Self::Generic => "Unexpected response from the TTS service",
        }
    }

    pub fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::ServerError | Self::BadGateway | Self::Unavailable | Self::Timeout
        )
    }
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("message text is empty")]
    EmptyMessage,

    #[error("{} (HTTP {status}): {body}", .category.message())]
    Remote {
        category: ErrorCategory,
        status: u16,
        body: String,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("download from {url} failed with HTTP {status}")]
    Download { url: String, status: u16 },

    #[error("server returned no audio")]
    EmptyAudio,
}

impl SpeechError {
    /// Category for errors that map onto the remote taxonomy.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Remote { category, .. } => Some(*category),
            Self::Timeout { .. } => Some(ErrorCategory::Timeout),
            Self::Network(_) | Self::Download { .. } => Some(ErrorCategory::Generic),
            _ => None,
        }
    }

    /// Raw response body, when the server sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Remote { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_taxonomy() {
        let table = [
            (400, ErrorCategory::BadRequest),
            (401, ErrorCategory::Auth),
            (403, ErrorCategory::Forbidden),
            (404, ErrorCategory::NotFound),
            (422, ErrorCategory::Validation),
            (429, ErrorCategory::RateLimited),
            (500, ErrorCategory::ServerError),
            (502, ErrorCategory::BadGateway),
            (503, ErrorCategory::Unavailable),
            (504, ErrorCategory::Timeout),
            (418, ErrorCategory::Generic),
        ];
        for (status, category) in table {
            assert_eq!(ErrorCategory::from_status(status), category, "{}", status);
        }
    }

    #[test]
    fn test_remote_display_carries_body() {
        let err = SpeechError::Remote {
            category: ErrorCategory::RateLimited,
            status: 429,
            body: "slow down".into(),
        };
        let text = err.to_string();
        assert!(text.contains("Rate limit"));
        assert!(text.contains("slow down"));
        assert_eq!(err.detail(), Some("slow down"));
    }
}
