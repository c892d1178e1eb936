//! Gemini transport: text and inline-image parts in, text out.
//!
//! Stateless. No retries, no fallback; callers decide what an error or an
//! empty reply means for them.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::GatewayError;

/// One piece of a multimodal request.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineImage {
            mime_type: mime_type.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Returns the first text field of the reply, trimmed. An empty string
    /// means the provider produced no content; that is not an error.
    async fn infer(&self, parts: &[Part], options: GenerationOptions) -> Result<String, GatewayError>;
}

// --- Wire format ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: WireGenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<WirePart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

fn build_request<'a>(parts: &'a [Part], options: GenerationOptions) -> GenerateContentRequest<'a> {
    let parts = parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart::Text { text: text.as_str() },
            Part::InlineImage { mime_type, data } => WirePart::Inline {
                inline_data: InlineData {
                    mime_type: mime_type.as_str(),
                    data: STANDARD.encode(data),
                },
            },
        })
        .collect();

    GenerateContentRequest {
        contents: [Content { parts }],
        generation_config: WireGenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
        },
    }
}

/// `candidates[0].content.parts[0].text`, trimmed, or empty.
fn extract_text(data: &serde_json::Value) -> String {
    data["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("")
        .trim()
        .to_string()
}

pub struct GeminiGateway {
    api_key: Option<String>,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiGateway {
    pub fn new(config: &GeminiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key: config.resolve_api_key(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ModelGateway for GeminiGateway {
    async fn infer(&self, parts: &[Part], options: GenerationOptions) -> Result<String, GatewayError> {
        let Some(key) = self.api_key.as_deref() else {
            return Err(GatewayError::Configuration(
                "missing Gemini API key (set gemini.api_key or GEMINI_API_KEY)".into(),
            ));
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request(parts, options);
        debug!(
            "Sending {} part(s) to Gemini model '{}' (temperature={}, max_tokens={})",
            parts.len(),
            self.model,
            options.temperature,
            options.max_output_tokens
        );

        let resp = self
            .client
            .post(&url)
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let text = extract_text(&data);
        debug!("Gemini output: '{text}'");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OPTIONS: GenerationOptions = GenerationOptions {
        temperature: 0.3,
        max_output_tokens: 60,
    };

    fn gateway(base_url: &str, key: Option<&str>) -> GeminiGateway {
        GeminiGateway::new(&GeminiConfig {
            api_key: key.map(String::from),
            api_key_env: "DAILY_SNAP_TEST_UNSET_VAR".into(),
            base_url: base_url.into(),
            ..GeminiConfig::default()
        })
    }

    #[test]
    fn image_parts_are_base64_inline_data() {
        let parts = [Part::image("image/png", vec![1, 2, 3]), Part::text("describe")];
        let value = serde_json::to_value(build_request(&parts, OPTIONS)).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{ "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "AQID" } },
                    { "text": "describe" }
                ]}],
                "generationConfig": { "temperature": 0.3, "maxOutputTokens": 60 }
            })
        );
    }

    #[test]
    fn extract_text_tolerates_missing_fields() {
        assert_eq!(extract_text(&json!({})), "");
        assert_eq!(extract_text(&json!({ "candidates": [] })), "");
        assert_eq!(
            extract_text(&json!({
                "candidates": [{ "content": { "parts": [{ "text": "  Golden hour \n" }] } }]
            })),
            "Golden hour"
        );
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway(&server.uri(), None)
            .infer(&[Part::text("hi")], OPTIONS)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }

    #[tokio::test]
    async fn returns_first_text_part() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "generationConfig": { "maxOutputTokens": 60 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [
                    { "text": " Something tiny " },
                    { "text": "ignored" }
                ]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = gateway(&server.uri(), Some("test-key"))
            .infer(&[Part::text("prompt")], OPTIONS)
            .await
            .unwrap();
        assert_eq!(text, "Something tiny");
    }

    #[tokio::test]
    async fn empty_candidates_is_empty_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let text = gateway(&server.uri(), Some("k"))
            .infer(&[Part::text("prompt")], OPTIONS)
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn non_success_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = gateway(&server.uri(), Some("k"))
            .infer(&[Part::text("prompt")], OPTIONS)
            .await
            .unwrap_err();
        match err {
            GatewayError::Transport { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
