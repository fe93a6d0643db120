//! AI Module - Clinical summaries, chat, and symptom assessment
//!
//! Builds bounded prompts from a patient's record and forwards them to a
//! generative-AI provider. Nothing here persists its own output; writing a
//! narrative back into the patient record is the caller's decision, made
//! through the repository.

pub mod chat;
pub mod context;
pub mod gemini;
pub mod provider;

use std::sync::Arc;

use chrono::Utc;

use crate::records::{Patient, RecordBundle, ReportedSymptom, SymptomAssessment};
pub use chat::{ChatMessage, ChatRole, ChatSessions};
pub use gemini::GeminiClient;
pub use provider::{AiError, GenerateRequest, LlmClient};

/// The summary/chat client: one provider, per-patient chat sessions, and a
/// default per-category record cap.
pub struct AiService {
    llm: Arc<dyn LlmClient>,
    chats: ChatSessions,
    record_limit: usize,
}

impl AiService {
    pub fn new(llm: Arc<dyn LlmClient>, record_limit: usize) -> Self {
        Self {
            llm,
            chats: ChatSessions::new(),
            record_limit,
        }
    }

    fn limit_or_default(&self, limit: Option<usize>) -> usize {
        limit.unwrap_or(self.record_limit).max(1)
    }

    /// One-shot clinical summary over the top-N records per category.
    pub async fn summarize(
        &self,
        patient: &Patient,
        bundle: &RecordBundle,
        limit: Option<usize>,
    ) -> Result<String, AiError> {
        let prompt = context::summary_prompt(patient, bundle, self.limit_or_default(limit));
        self.llm.generate(GenerateRequest::text(prompt)).await
    }

    /// Chat turn: records the question, asks the provider, records and
    /// returns the reply. A failed call leaves the question in the history
    /// and surfaces the error for the caller's retry affordance.
    pub async fn chat(
        &self,
        patient: &Patient,
        bundle: &RecordBundle,
        question: &str,
        limit: Option<usize>,
    ) -> Result<String, AiError> {
        self.chats.push(&patient.id, ChatRole::User, question);

        let prompt =
            context::chat_prompt(patient, bundle, self.limit_or_default(limit), question);
        let reply = self.llm.generate(GenerateRequest::text(prompt)).await?;

        self.chats.push(&patient.id, ChatRole::Assistant, reply.clone());
        Ok(reply)
    }

    pub fn chat_history(&self, patient_id: &str) -> Vec<ChatMessage> {
        self.chats.history(patient_id)
    }

    pub fn clear_chat(&self, patient_id: &str) {
        self.chats.clear(patient_id);
    }

    /// Preliminary symptom assessment. Returns the narrative plus a filled
    /// [`SymptomAssessment`] the caller may store on the patient record.
    pub async fn assess_symptoms(
        &self,
        patient: &Patient,
        symptoms: &[ReportedSymptom],
        additional_info: Option<&str>,
    ) -> Result<SymptomAssessment, AiError> {
        let prompt = context::symptom_prompt(
            &patient.full_name(),
            &patient.age_display(),
            patient.gender.as_deref().unwrap_or("Not specified"),
            symptoms,
            additional_info,
        );
        let analysis = self.llm.generate(GenerateRequest::text(prompt)).await?;

        Ok(SymptomAssessment {
            symptoms: symptoms.to_vec(),
            additional_info: additional_info.map(str::to_string),
            ai_analysis: Some(analysis),
            assessed_at: Some(Utc::now().to_rfc3339()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedLlm {
        reply: Result<String, fn() -> AiError>,
        calls: AtomicUsize,
    }

    impl ScriptedLlm {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(|| AiError::RequestFailed {
                    status: Some(500),
                    message: "Gemini API error: 500 - boom".to_string(),
                }),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn generate(&self, _request: GenerateRequest) -> Result<String, AiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn patient() -> Patient {
        Patient {
            id: "p1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_chat_records_both_sides_of_the_turn() {
        let service = AiService::new(Arc::new(ScriptedLlm::ok("the answer")), 5);
        let reply = service
            .chat(&patient(), &RecordBundle::default(), "a question", None)
            .await
            .unwrap();
        assert_eq!(reply, "the answer");

        let history = service.chat_history("p1");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "a question");
        assert_eq!(history[1].content, "the answer");

        service.clear_chat("p1");
        assert!(service.chat_history("p1").is_empty());
    }

    #[tokio::test]
    async fn test_failed_chat_keeps_question_and_surfaces_error() {
        let service = AiService::new(Arc::new(ScriptedLlm::failing()), 5);
        let err = service
            .chat(&patient(), &RecordBundle::default(), "a question", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::RequestFailed { status: Some(500), .. }));

        let history = service.chat_history("p1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_no_retry_on_failure() {
        let llm = Arc::new(ScriptedLlm::failing());
        let service = AiService::new(llm.clone(), 5);
        let _ = service
            .summarize(&patient(), &RecordBundle::default(), None)
            .await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_symptom_assessment_fills_narrative_and_stamp() {
        let service = AiService::new(Arc::new(ScriptedLlm::ok("assessment text")), 5);
        let symptoms = vec![ReportedSymptom {
            symptom: "cough".to_string(),
            duration: None,
            severity: None,
        }];
        let assessment = service
            .assess_symptoms(&patient(), &symptoms, Some("smoker"))
            .await
            .unwrap();

        assert_eq!(assessment.ai_analysis.as_deref(), Some("assessment text"));
        assert_eq!(assessment.symptoms.len(), 1);
        assert_eq!(assessment.additional_info.as_deref(), Some("smoker"));
        assert!(assessment.assessed_at.is_some());
    }
}
