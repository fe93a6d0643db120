//! Text-generation provider contract and error type.

use async_trait::async_trait;
use serde::Serialize;

/// Errors from generative-AI calls. Neither variant is retried here; the
/// caller owns any retry affordance.
#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// Network failure, non-2xx status, or an undecodable response body.
    /// `status` is the upstream HTTP status when one was received.
    #[error("AI request failed: {message}")]
    RequestFailed { status: Option<u16>, message: String },
    /// A 2xx response with no usable candidate (empty, or blocked by the
    /// safety filter).
    #[error("malformed AI response: {0}")]
    ResponseMalformed(String),
}

/// One ordered piece of request content.
#[derive(Clone, Debug)]
pub enum ContentPart {
    Text(String),
    /// Base64-encoded image payload for image-analysis prompts.
    InlineImage { mime_type: String, data: String },
}

/// Generation knobs forwarded to the model.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
    pub candidate_count: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 2048,
            candidate_count: 1,
        }
    }
}

/// Content-safety threshold for one harm category.
#[derive(Clone, Debug, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// The four harm categories, all blocked at medium and above.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .iter()
    .map(|category| SafetySetting {
        category: category.to_string(),
        threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
    })
    .collect()
}

/// One generation request: ordered content parts plus the configuration
/// blocks every call sends.
#[derive(Clone, Debug)]
pub struct GenerateRequest {
    pub parts: Vec<ContentPart>,
    pub config: GenerationConfig,
    pub safety: Vec<SafetySetting>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![ContentPart::Text(prompt.into())],
            config: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }

    pub fn with_image(mut self, mime_type: &str, data_base64: &str) -> Self {
        self.parts.push(ContentPart::InlineImage {
            mime_type: mime_type.to_string(),
            data: data_base64.to_string(),
        });
        self
    }
}

/// A provider that turns a request into generated text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Runs one generation. The returned string is the first candidate's
    /// text, verbatim.
    async fn generate(&self, request: GenerateRequest) -> Result<String, AiError>;

    /// Human-readable provider name (e.g. "gemini").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLlm {
        response: String,
    }

    #[async_trait]
    impl LlmClient for MockLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, AiError> {
            Ok(self.response.clone())
        }
        fn name(&self) -> &str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_llm_client_trait() {
        let llm = MockLlm {
            response: "summary text".to_string(),
        };
        let result = llm.generate(GenerateRequest::text("hello")).await.unwrap();
        assert_eq!(result, "summary text");
        assert_eq!(llm.name(), "mock");
    }

    #[test]
    fn test_default_safety_covers_four_categories() {
        let settings = default_safety_settings();
        assert_eq!(settings.len(), 4);
        assert!(settings
            .iter()
            .all(|s| s.threshold == "BLOCK_MEDIUM_AND_ABOVE"));
    }

    #[test]
    fn test_ai_error_display_carries_message() {
        let e = AiError::RequestFailed {
            status: Some(503),
            message: "Gemini API error: 503 - overloaded".to_string(),
        };
        assert!(e.to_string().contains("overloaded"));
    }
}
