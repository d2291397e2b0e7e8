use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by a text generator or by the retry executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Transient quota signal from the model API (HTTP 429 / RESOURCE_EXHAUSTED).
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Rate limit persisted through every allowed attempt.
    #[error("rate limit persisted after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },

    /// Anything else: auth, network, malformed or empty response.
    #[error("{0}")]
    Other(String),
}

impl GenerationError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GenerationError::RateLimited(_))
    }

    /// Classify a non-success HTTP response. The status decides, except that
    /// Gemini reports some quota hits as `RESOURCE_EXHAUSTED` under another code.
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == StatusCode::TOO_MANY_REQUESTS || message.contains("RESOURCE_EXHAUSTED") {
            GenerationError::RateLimited(message)
        } else {
            GenerationError::Other(message)
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    /// Transport failures. The URL is stripped because it can carry credentials.
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Other(format!("Gemini API request: {}", e.without_url()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_429_is_rate_limit() {
        let err = GenerationError::from_status(StatusCode::TOO_MANY_REQUESTS, "quota");
        assert_eq!(err, GenerationError::RateLimited("quota".to_string()));
    }

    #[test]
    fn test_resource_exhausted_body_is_rate_limit() {
        let err = GenerationError::from_status(StatusCode::SERVICE_UNAVAILABLE, "status: RESOURCE_EXHAUSTED");
        assert!(err.is_rate_limit());
    }

    #[test]
    fn test_other_status_with_429_digits_is_not_rate_limit() {
        let err = GenerationError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "trace id 84291 failed");
        assert_eq!(err, GenerationError::Other("trace id 84291 failed".to_string()));

        let err = GenerationError::from_status(StatusCode::FORBIDDEN, "API key not valid");
        assert!(!err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_transport_error_hides_query_key() {
        let err = reqwest::Client::new()
            .post("http://127.0.0.1:1/v1beta/models/m:generateContent?key=SECRET-API-KEY")
            .send()
            .await
            .unwrap_err();
        let converted = GenerationError::from(err);
        assert!(!converted.is_rate_limit());
        assert!(!converted.to_string().contains("SECRET-API-KEY"));
        assert!(converted.to_string().starts_with("Gemini API request:"));
    }

    #[test]
    fn test_exhausted_message() {
        let err = GenerationError::Exhausted { attempts: 3 };
        assert_eq!(err.to_string(), "rate limit persisted after 3 attempt(s)");
    }
}
