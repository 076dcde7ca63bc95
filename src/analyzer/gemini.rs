use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::Analyzer;
use super::parse::parse_findings;
use super::prompt::build_prompt;
use crate::config::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL};
use crate::errors::{Result, ReviewError};
use crate::findings::Finding;

const KEY_PROBLEM: &str = "Failed to analyze code. There might be an issue with the API key \
configuration (set GEMINI_API_KEY before running) or permissions with the Gemini API.";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Gemini `generateContent` implementation of [`Analyzer`].
pub struct GeminiAnalyzer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiAnalyzer {
    /// Create an analyzer with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the base URL.
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        debug!(model = %self.model, chars = prompt.len(), "sending analysis request");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&serde_json::json!({
                "contents": [{ "parts": [{ "text": prompt }] }],
                "generationConfig": { "responseMimeType": "application/json" }
            }))
            .send()
            .await
            .map_err(|e| ReviewError::Analysis(format!("Failed to reach the analyzer: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorEnvelope>()
                .await
                .map(|e| e.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(classify_failure(status, &message));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ReviewError::Analysis(format!("Unreadable analyzer response: {}", e)))?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        Ok(text)
    }
}

/// Key and permission problems get a message that points at configuration.
fn classify_failure(status: StatusCode, message: &str) -> ReviewError {
    let lower = message.to_lowercase();
    let key_problem = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || lower.contains("api key")
        || lower.contains("api_key")
        || lower.contains("permission denied")
        || lower.contains("authentication");
    if key_problem {
        ReviewError::Analysis(KEY_PROBLEM.to_string())
    } else {
        ReviewError::Analysis(format!(
            "Analyzer request failed ({}): {}",
            status.as_u16(),
            message
        ))
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    fn ensure_ready(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ReviewError::Config(
                "Analyzer API key is not configured. Set GEMINI_API_KEY (or API_KEY).".to_string(),
            ));
        }
        Ok(())
    }

    async fn analyze(
        &self,
        content: &str,
        file_path: &str,
        sibling_paths: Option<&[String]>,
    ) -> Result<Vec<Finding>> {
        self.ensure_ready()?;
        let prompt = build_prompt(content, file_path, sibling_paths);
        let text = self.generate(&prompt).await?;
        parse_findings(&text, file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::findings::Severity;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GEN_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn analyzer(server: &MockServer) -> GeminiAnalyzer {
        GeminiAnalyzer::new("key-1")
            .with_model("gemini-test")
            .with_api_base(server.uri())
    }

    fn reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        }))
    }

    #[tokio::test]
    async fn test_analyze_fenced_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEN_PATH))
            .and(header("x-goog-api-key", "key-1"))
            .and(body_partial_json(serde_json::json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(reply(
                "```json\n[{\"lineNumber\":\"3\",\"issueTitle\":\"Hardcoded secret\",\
                 \"description\":\"A password literal.\",\"severity\":\"Critical\",\
                 \"category\":\"Security\"}]\n```",
            ))
            .mount(&server)
            .await;

        let findings = analyzer(&server)
            .analyze("let pw = \"hunter2\";", "src/auth.rs", None)
            .await
            .unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity(), Severity::Critical);
        assert_eq!(findings[0].file_path(), "src/auth.rs");
    }

    #[tokio::test]
    async fn test_analyze_empty_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEN_PATH))
            .respond_with(reply("[]"))
            .mount(&server)
            .await;

        let findings = analyzer(&server).analyze("x", "a.rs", None).await.unwrap();
        assert!(findings.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_no_candidates_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("x", "a.rs", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Analysis);
    }

    #[tokio::test]
    async fn test_invalid_key_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEN_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" }
            })))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("x", "a.rs", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Analysis);
        assert!(err.to_string().contains("API key configuration"));
    }

    #[tokio::test]
    async fn test_server_error_keeps_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GEN_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": { "code": 503, "message": "The model is overloaded.", "status": "UNAVAILABLE" }
            })))
            .mount(&server)
            .await;

        let err = analyzer(&server).analyze("x", "a.rs", None).await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_ensure_ready_requires_key() {
        let err = GeminiAnalyzer::new("").ensure_ready().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(GeminiAnalyzer::new("k").ensure_ready().is_ok());
    }

    #[test]
    fn test_classify_forbidden() {
        let err = classify_failure(StatusCode::FORBIDDEN, "nope");
        assert!(err.to_string().contains("permissions"));
    }
}
