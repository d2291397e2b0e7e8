use super::TextGenerator;
use crate::error::GenerationError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini generateContent client with Google Search grounding enabled.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiMessage>,
    tools: Vec<GeminiTool>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiMessage {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GeminiTool {
    google_search: GoogleSearch,
}

#[derive(Serialize)]
struct GoogleSearch {}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize, Default)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Other(format!("HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at another endpoint (a proxy or a local stub).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiMessage {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            tools: vec![GeminiTool { google_search: GoogleSearch {} }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                max_output_tokens: 8192,
            },
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_request(prompt))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = format!("Gemini API {status}: {}", truncate_chars(&body, 300));
            return Err(GenerationError::from_status(status, message));
        }

        let body = resp.text().await?;
        let (text, usage) = parse_response(&body)?;

        debug!(
            "Gemini {}: {} tokens in, {} tokens out, ~${}",
            self.model,
            usage.prompt_token_count,
            usage.candidates_token_count,
            estimate_cost(&usage)
        );

        Ok(text)
    }
}

fn parse_response(body: &str) -> Result<(String, UsageMetadata), GenerationError> {
    let data: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Other(format!("Parse Gemini response: {e}")))?;

    let text = data
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .and_then(|c| c.parts)
        .map(|parts| parts.into_iter().map(|p| p.text).collect::<Vec<_>>().join(""))
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::Other("Gemini returned empty response".to_string()));
    }

    Ok((text, data.usage_metadata.unwrap_or_default()))
}

/// Gemini 2.5 Flash paid tier: $0.30/1M input, $2.50/1M output. Search
/// grounding is billed separately and not included.
fn estimate_cost(usage: &UsageMetadata) -> Decimal {
    Decimal::from(usage.prompt_token_count) * dec!(0.0000003)
        + Decimal::from(usage.candidates_token_count) * dec!(0.0000025)
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::Router;

    #[test]
    fn test_request_enables_google_search() {
        let json = serde_json::to_value(GeminiClient::build_request("hello")).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json["tools"][0]["google_search"].is_object());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn test_parse_joins_parts() {
        let body = r#"{
            "candidates": [{"content": {"parts": [{"text": "[NEWS] a"}, {"text": " b"}]}}],
            "usageMetadata": {"promptTokenCount": 1000, "candidatesTokenCount": 2000}
        }"#;
        let (text, usage) = parse_response(body).unwrap();
        assert_eq!(text, "[NEWS] a b");
        assert_eq!(usage.prompt_token_count, 1000);
        assert_eq!(estimate_cost(&usage), dec!(0.0053));
    }

    #[test]
    fn test_parse_empty_candidates_is_other_error() {
        let err = parse_response(r#"{"candidates": []}"#).unwrap_err();
        assert_eq!(err, GenerationError::Other("Gemini returned empty response".to_string()));

        let err = parse_response("not json").unwrap_err();
        assert!(!err.is_rate_limit());
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("伺服器市場", 3), "伺服器");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_is_configured() {
        let client = GeminiClient::new("", "gemini-2.5-flash", Duration::from_secs(5)).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.model(), "gemini-2.5-flash");
    }

    async fn stub_server(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().fallback(move |headers: HeaderMap, uri: Uri| async move {
            let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
            if key != Some("test-key") || uri.query().is_some() {
                return (StatusCode::UNAUTHORIZED, "missing header key".to_string());
            }
            (status, body.to_string())
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta/models")
    }

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new("test-key", "gemini-2.5-flash", Duration::from_secs(5))
            .unwrap()
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_generate_success_sends_key_in_header() {
        let base = stub_server(
            StatusCode::OK,
            r#"{"candidates": [{"content": {"parts": [{"text": "[NEWS] ok"}]}}]}"#,
        )
        .await;
        assert_eq!(client(&base).generate("prompt").await.unwrap(), "[NEWS] ok");
    }

    #[tokio::test]
    async fn test_generate_429_status_is_rate_limit() {
        let base = stub_server(StatusCode::TOO_MANY_REQUESTS, "quota exceeded").await;
        let err = client(&base).generate("prompt").await.unwrap_err();
        assert!(err.is_rate_limit());
    }

    #[tokio::test]
    async fn test_generate_server_error_mentioning_429_is_fatal() {
        let base = stub_server(StatusCode::INTERNAL_SERVER_ERROR, "backend 429 shard failed").await;
        let err = client(&base).generate("prompt").await.unwrap_err();
        assert!(!err.is_rate_limit());
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_generate_transport_error_keeps_key_private() {
        let err = GeminiClient::new("SECRET-API-KEY", "m", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://127.0.0.1:1/v1beta/models")
            .generate("prompt")
            .await
            .unwrap_err();
        assert!(!err.is_rate_limit());
        assert!(!err.to_string().contains("SECRET-API-KEY"));
    }
}
