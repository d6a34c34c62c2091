use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    reqwest::header::{HeaderMap, HeaderValue},
    saju_config::GeminiConfig,
    tracing::{debug, trace, warn},
};

use crate::{
    backend::{ClientFactory, GenerationBackend},
    credentials::Credential,
    error::AttemptError,
};

/// Longest error body kept in an [`AttemptError::Api`].
const MAX_ERROR_BODY: usize = 2_000;

/// Information about a Gemini model returned from the API.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelInfo {
    /// Full resource name (e.g., "models/gemini-2.5-flash")
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl GeminiModelInfo {
    /// "models/gemini-2.5-flash" -> "gemini-2.5-flash"
    pub fn model_id(&self) -> &str {
        self.name.strip_prefix("models/").unwrap_or(&self.name)
    }

    pub fn supports_generation(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "generateContent")
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Builds one [`GeminiClient`] per credential.
#[derive(Debug, Clone)]
pub struct GeminiClientFactory {
    base_url: String,
    timeout: Duration,
    max_output_tokens: u32,
}

impl GeminiClientFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_output_tokens: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            max_output_tokens,
        }
    }

    pub fn from_config(config: &GeminiConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.attempt_timeout(),
            config.max_output_tokens,
        )
    }

    /// Concrete client for callers that need more than generation
    /// (model listing in `doctor`).
    pub fn build(&self, credential: &Credential) -> Result<GeminiClient, AttemptError> {
        let mut key = HeaderValue::from_str(credential.expose())
            .map_err(|e| AttemptError::construction(credential.slot(), e))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
            .map_err(|e| AttemptError::construction(credential.slot(), e))?;

        Ok(GeminiClient {
            client,
            base_url: self.base_url.clone(),
            max_output_tokens: self.max_output_tokens,
        })
    }
}

impl Default for GeminiClientFactory {
    fn default() -> Self {
        Self::from_config(&GeminiConfig::default())
    }
}

impl ClientFactory for GeminiClientFactory {
    fn connect(&self, credential: &Credential) -> Result<Arc<dyn GenerationBackend>, AttemptError> {
        Ok(Arc::new(self.build(credential)?))
    }
}

/// `generateContent` client bound to a single API key.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    /// Models visible to this key that support `generateContent`, sorted.
    pub async fn list_models(&self) -> Result<Vec<GeminiModelInfo>, AttemptError> {
        let mut all_models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.client.get(format!("{}/v1beta/models", self.base_url));
            if let Some(ref token) = page_token {
                req = req.query(&[("pageToken", token)]);
            }

            let resp = req.send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(api_error(status.as_u16(), body));
            }

            let page: ListModelsResponse = resp.json().await?;
            all_models.extend(page.models);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let mut models: Vec<_> = all_models
            .into_iter()
            .filter(GeminiModelInfo::supports_generation)
            .collect();
        models.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(models)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<String, AttemptError> {
        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }],
            }],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
            },
        });

        debug!(model, prompt_chars = prompt.chars().count(), "gemini generate request");

        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let http_resp = self.client.post(&url).json(&body).send().await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(model, status = %status, "gemini API error");
            return Err(api_error(status.as_u16(), body_text));
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "gemini raw response");
        parse_generate_response(&resp)
    }
}

/// Pull the answer text out of a `generateContent` response.
fn parse_generate_response(resp: &serde_json::Value) -> Result<String, AttemptError> {
    if !resp.is_object() {
        return Err(AttemptError::Malformed("response is not a JSON object".into()));
    }

    let candidate = &resp["candidates"][0];
    let text = candidate["content"]["parts"]
        .as_array()
        .and_then(|parts| extract_text(parts));

    if let Some(text) = text {
        return Ok(text);
    }

    if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
        return Err(AttemptError::Blocked {
            reason: reason.to_string(),
        });
    }
    match candidate["finishReason"].as_str() {
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
            Err(AttemptError::Blocked {
                reason: reason.to_string(),
            })
        },
        _ => Err(AttemptError::EmptyResponse),
    }
}

/// Concatenate the text parts; `None` when there is no non-empty text.
fn extract_text(parts: &[serde_json::Value]) -> Option<String> {
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

fn api_error(status: u16, mut body: String) -> AttemptError {
    if body.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    AttemptError::Api { status, body }
}

#[cfg(test)]
mod tests {
    use {super::*, crate::error::FailureKind};

    fn factory(base_url: &str) -> GeminiClientFactory {
        GeminiClientFactory::new(base_url, Duration::from_secs(5), 1024)
    }

    fn key(value: &str) -> Credential {
        Credential::new("GEMINI_API_KEY", value)
    }

    #[test]
    fn extract_text_combines_text_parts() {
        let parts = vec![
            serde_json::json!({ "text": "<h3>Hello " }),
            serde_json::json!({ "text": "world</h3>" }),
        ];
        assert_eq!(extract_text(&parts), Some("<h3>Hello world</h3>".to_string()));
    }

    #[test]
    fn extract_text_returns_none_without_text() {
        assert_eq!(extract_text(&[]), None);
        let parts = vec![serde_json::json!({ "functionCall": { "name": "x" } })];
        assert_eq!(extract_text(&parts), None);
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let resp = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(
            parse_generate_response(&resp),
            Err(AttemptError::Blocked {
                reason: "SAFETY".into()
            })
        );
    }

    #[test]
    fn candidate_without_parts_is_empty() {
        let resp = serde_json::json!({ "candidates": [{ "finishReason": "MAX_TOKENS" }] });
        assert_eq!(parse_generate_response(&resp), Err(AttemptError::EmptyResponse));
    }

    #[test]
    fn non_object_response_is_malformed() {
        let resp = serde_json::json!(["nope"]);
        assert!(matches!(
            parse_generate_response(&resp),
            Err(AttemptError::Malformed(_))
        ));
    }

    #[test]
    fn api_error_truncates_on_char_boundary() {
        let err = api_error(500, "가".repeat(1_000));
        let AttemptError::Api { body, .. } = err else {
            panic!("expected api error");
        };
        assert!(body.len() <= MAX_ERROR_BODY);
    }

    #[test]
    fn header_invalid_key_fails_construction() {
        let err = factory("https://example.com")
            .connect(&key("bad\nkey"))
            .err()
            .unwrap();
        assert_eq!(err.kind(), FailureKind::Construction);
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn gemini_model_info_helpers() {
        let info = GeminiModelInfo {
            name: "models/gemini-2.5-flash".into(),
            display_name: "Gemini 2.5 Flash".into(),
            supported_generation_methods: vec!["generateContent".into()],
        };
        assert_eq!(info.model_id(), "gemini-2.5-flash");
        assert!(info.supports_generation());
    }

    // ── HTTP tests (mockito) ───────────────────────────────────────────────

    #[tokio::test]
    async fn generate_sends_key_and_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "k-123")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{ "parts": [{ "text": "birth info" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "<p>ok</p>" }], "role": "model" },
                        "finishReason": "STOP"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = factory(&server.url()).connect(&key("k-123")).unwrap();
        let text = client.generate("gemini-2.5-flash", "birth info").await.unwrap();

        assert_eq!(text, "<p>ok</p>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_maps_http_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-x:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let client = factory(&server.url()).connect(&key("k")).unwrap();
        let err = client.generate("gemini-x", "p").await.unwrap_err();

        assert_eq!(err.kind(), FailureKind::RateLimited);
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn generate_rejects_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/m:generateContent")
            .with_status(200)
            .with_body("<html>proxy error</html>")
            .create_async()
            .await;

        let client = factory(&server.url()).connect(&key("k")).unwrap();
        let err = client.generate("m", "p").await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn list_models_filters_and_sorts() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1beta/models")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "models": [
                        {
                            "name": "models/gemini-2.5-flash",
                            "supportedGenerationMethods": ["generateContent"]
                        },
                        {
                            "name": "models/text-embedding-004",
                            "supportedGenerationMethods": ["embedContent"]
                        },
                        {
                            "name": "models/gemini-2.0-flash",
                            "supportedGenerationMethods": ["generateContent"]
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = factory(&server.url()).build(&key("k")).unwrap();
        let models = client.list_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(GeminiModelInfo::model_id).collect();
        assert_eq!(ids, ["gemini-2.0-flash", "gemini-2.5-flash"]);
    }

    #[tokio::test]
    async fn list_models_encodes_page_token() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/v1beta/models")
            .match_query(mockito::Matcher::Missing)
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "models": [
                        {
                            "name": "models/gemini-2.5-flash",
                            "supportedGenerationMethods": ["generateContent"]
                        }
                    ],
                    "nextPageToken": "a/b+c=&d"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1beta/models")
            .match_query(mockito::Matcher::UrlEncoded(
                "pageToken".into(),
                "a/b+c=&d".into(),
            ))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "models": [
                        {
                            "name": "models/gemini-2.0-flash",
                            "supportedGenerationMethods": ["generateContent"]
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = factory(&server.url()).build(&key("k")).unwrap();
        let models = client.list_models().await.unwrap();
        let ids: Vec<&str> = models.iter().map(GeminiModelInfo::model_id).collect();
        assert_eq!(ids, ["gemini-2.0-flash", "gemini-2.5-flash"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn zero_attempt_timeout_from_config_still_completes() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/m:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"<p>ok</p>"}]}}]}"#)
            .create_async()
            .await;

        let config = GeminiConfig {
            base_url: server.url(),
            attempt_timeout_secs: 0,
            ..GeminiConfig::default()
        };
        let client = GeminiClientFactory::from_config(&config)
            .connect(&key("k"))
            .unwrap();
        let text = client.generate("m", "p").await.unwrap();
        assert_eq!(text, "<p>ok</p>");
    }
}
