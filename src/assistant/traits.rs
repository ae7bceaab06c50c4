//! Assistant trait definitions
//!
//! The assistant is an external collaborator. Nothing in the profile engine
//! depends on it; callers go through [`super::guarded`] so a failure ends up
//! as a notice on screen rather than an error in the engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::persona::KnowledgeSource;

use super::types::{
    DocumentDraft, EmailDrafts, EngineeringSolution, GradingRequest, GradingResult,
    GroundedText, ResearchDomain, StudyNotes, TransactionAnalysis,
};

// ─────────────────────────────────────────────────────────────────
// Assistant Trait
// ─────────────────────────────────────────────────────────────────

/// Generative assistant operations.
///
/// Object-safe so the CLI can pick an implementation from configuration.
#[async_trait]
pub trait Assistant: Send + Sync {
    /// Implementation name (e.g., "offline", "openai")
    fn name(&self) -> &'static str;

    // ─────────────────────────────────────────────────────────────
    // Grounded text
    // ─────────────────────────────────────────────────────────────

    /// Answer a research question as a domain expert.
    async fn research(&self, domain: ResearchDomain, query: &str) -> Result<GroundedText>;

    /// Chat against the user's knowledge sources.
    async fn notebook_chat(&self, query: &str, sources: &[KnowledgeSource]) -> Result<GroundedText>;

    // ─────────────────────────────────────────────────────────────
    // Structured payloads
    // ─────────────────────────────────────────────────────────────

    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult> {
        let _ = request;
        Err(self.unsupported("grading"))
    }

    async fn summarize(&self, text: &str, subject: &str) -> Result<StudyNotes> {
        let _ = (text, subject);
        Err(self.unsupported("summaries"))
    }

    async fn analyze_transaction(&self, description: &str) -> Result<TransactionAnalysis> {
        let _ = description;
        Err(self.unsupported("transaction analysis"))
    }

    async fn solve_engineering(&self, problem: &str) -> Result<EngineeringSolution> {
        let _ = problem;
        Err(self.unsupported("engineering problems"))
    }

    async fn draft_document(&self, topic: &str, field: &str, kind: &str) -> Result<DocumentDraft> {
        let _ = (topic, field, kind);
        Err(self.unsupported("document drafting"))
    }

    async fn generate_email(&self, goal: &str, context: &str) -> Result<EmailDrafts> {
        let _ = (goal, context);
        Err(self.unsupported("email drafting"))
    }

    /// Read the text out of an image.
    async fn read_image(&self, image: &[u8]) -> Result<String> {
        let _ = image;
        Err(self.unsupported("image reading"))
    }

    #[doc(hidden)]
    fn unsupported(&self, what: &str) -> Error {
        Error::NotSupported(format!("Assistant '{}' does not support {}", self.name(), what))
    }
}

/// Type alias for a shared assistant reference
pub type SharedAssistant = Arc<dyn Assistant>;

#[cfg(test)]
mod tests {
    use super::*;

    struct ResearchOnly;

    #[async_trait]
    impl Assistant for ResearchOnly {
        fn name(&self) -> &'static str {
            "research-only"
        }

        async fn research(&self, _domain: ResearchDomain, query: &str) -> Result<GroundedText> {
            Ok(GroundedText {
                text: query.to_string(),
                citations: Vec::new(),
            })
        }

        async fn notebook_chat(&self, query: &str, _sources: &[KnowledgeSource]) -> Result<GroundedText> {
            self.research(ResearchDomain::Scientific, query).await
        }
    }

    #[tokio::test]
    async fn test_default_operations_are_not_supported() {
        let assistant: SharedAssistant = Arc::new(ResearchOnly);
        let err = assistant.summarize("text", "Biology").await.unwrap_err();
        assert!(matches!(err, Error::NotSupported(_)));
        assert!(err.to_string().contains("research-only"));

        let ok = assistant.research(ResearchDomain::Legal, "tort").await.unwrap();
        assert_eq!(ok.text, "tort");
    }
}
