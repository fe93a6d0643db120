//! Google Gemini API client.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ai::provider::{AiError, ContentPart, GenerateRequest, LlmClient};
use crate::config::AiConfig;

pub struct GeminiClient {
    api_key: String,
    model: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    // The credential travels as a query-string parameter.
    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }

    pub fn build_body(request: &GenerateRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({"text": text}),
                ContentPart::InlineImage { mime_type, data } => json!({
                    "inline_data": {"mime_type": mime_type, "data": data}
                }),
            })
            .collect();

        json!({
            "contents": [{"parts": parts}],
            "generationConfig": &request.config,
            "safetySettings": &request.safety,
        })
    }

    pub fn parse_response(json: &Value) -> Result<String, AiError> {
        if let Some(text) = json
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
        {
            return Ok(text.to_string());
        }

        if let Some(reason) = json
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(AiError::ResponseMalformed(format!(
                "blocked by safety filter: {}",
                reason
            )));
        }

        Err(AiError::ResponseMalformed(
            "missing candidates[0].content.parts[0].text".to_string(),
        ))
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String, AiError> {
        let body = Self::build_body(&request);

        let response = self
            .client
            .post(self.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::RequestFailed {
                status: None,
                message: format!("gemini: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies carry a human-readable message; fall back to the
            // status reason when they do not decode.
            let detail = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(AiError::RequestFailed {
                status: Some(status.as_u16()),
                message: format!("Gemini API error: {} - {}", status.as_u16(), detail),
            });
        }

        let json: Value = response.json().await.map_err(|e| AiError::RequestFailed {
            status: Some(status.as_u16()),
            message: format!("invalid JSON from Gemini: {}", e),
        })?;

        Self::parse_response(&json)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
