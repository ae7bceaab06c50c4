//! OpenAI-compatible API assistant
//!
//! Implements [`Assistant`] by calling the chat completions endpoint of any
//! OpenAI-compatible server (OpenAI, Ollama, vLLM, LM Studio, etc.).
//! Structured operations run in JSON mode and are parsed into the payload
//! types from [`super::types`].

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AssistantSettings;
use crate::error::{Error, Result};
use crate::persona::KnowledgeSource;

use super::traits::Assistant;
use super::types::{
    Citation, DocumentDraft, EmailDrafts, EngineeringSolution, GradingRequest, GradingResult,
    GroundedText, ResearchDomain, StudyNotes, TransactionAnalysis,
};

// ─────────────────────────────────────────────────────────────────
// OpenAI API types (request/response)
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

impl ChatMessage {
    fn system(text: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: MessageContent::Text(text.into()),
        }
    }

    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: MessageContent::Text(text.into()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    total_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────
// OpenAI Assistant
// ─────────────────────────────────────────────────────────────────

pub struct OpenAiAssistant {
    settings: AssistantSettings,
    client: Client,
    total_requests: RwLock<u64>,
    total_tokens: RwLock<u64>,
}

impl OpenAiAssistant {
    pub fn new(settings: AssistantSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            base_url = %settings.base_url,
            model = %settings.model,
            "OpenAI-compatible assistant created"
        );

        Ok(Self {
            settings,
            client,
            total_requests: RwLock::new(0),
            total_tokens: RwLock::new(0),
        })
    }

    /// Requests that reached the API and parsed successfully
    pub fn total_requests(&self) -> u64 {
        *self.total_requests.read()
    }

    pub fn total_tokens(&self) -> u64 {
        *self.total_tokens.read()
    }

    /// Build the authorization header value (if API key is set)
    fn auth_header(&self) -> Option<String> {
        if self.settings.api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", self.settings.api_key))
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    /// Make a chat completion request with retry logic
    async fn chat_completion(
        &self,
        operation: &str,
        messages: Vec<ChatMessage>,
        json_mode: bool,
    ) -> Result<String> {
        let request_body = ChatCompletionRequest {
            model: self.settings.model.clone(),
            messages,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
            temperature: Some(0.2),
        };

        let url = self.endpoint();
        let mut last_error: Option<Error> = None;

        for attempt in 0..=self.settings.max_retries {
            if attempt > 0 {
                let backoff = self.settings.retry_backoff(attempt);
                debug!(operation, attempt, ?backoff, "Retrying after error");
                tokio::time::sleep(backoff).await;
            }

            let mut req = self.client.post(&url).json(&request_body);
            if let Some(ref auth) = self.auth_header() {
                req = req.header("Authorization", auth);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        match response.json::<ChatCompletionResponse>().await {
                            Ok(parsed) => {
                                *self.total_requests.write() += 1;
                                if let Some(usage) = parsed.usage {
                                    *self.total_tokens.write() += usage.total_tokens as u64;
                                }

                                let choice = parsed.choices.into_iter().next().ok_or_else(|| {
                                    Error::assistant_response(operation, "no choices in API response")
                                })?;
                                return Ok(choice.message.content.unwrap_or_default());
                            }
                            Err(e) => {
                                last_error = Some(Error::assistant_response(
                                    operation,
                                    format!("failed to parse API response: {}", e),
                                ));
                            }
                        }
                    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::AssistantAuth {
                            message: format!("{}: {}", status, body),
                        });
                    } else if status == StatusCode::TOO_MANY_REQUESTS {
                        warn!(operation, attempt, "Assistant rate limited");
                        last_error = Some(Error::AssistantRateLimited);
                    } else if status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        warn!(operation, status = %status, attempt, "Retryable API error: {}", body);
                        last_error = Some(Error::assistant_request(
                            operation,
                            format!("API error {}: {}", status, body),
                        ));
                    } else {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::assistant_request(
                            operation,
                            format!("API error {}: {}", status, body),
                        ));
                    }
                }
                Err(e) if e.is_timeout() => {
                    warn!(operation, attempt, "Assistant request timed out");
                    last_error = Some(Error::AssistantTimeout {
                        operation: operation.to_string(),
                        timeout_secs: self.settings.timeout_secs,
                    });
                }
                Err(e) if e.is_connect() => {
                    warn!(operation, attempt, error = %e, "Retryable connection error");
                    last_error = Some(Error::assistant_request(operation, format!("connection error: {}", e)));
                }
                Err(e) => {
                    return Err(Error::assistant_request(operation, format!("request error: {}", e)));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::assistant_request(operation, "all retry attempts exhausted")))
    }

    /// Run a JSON-mode request and parse the reply into `T`.
    async fn structured<T: DeserializeOwned>(
        &self,
        operation: &str,
        shape: &str,
        prompt: String,
    ) -> Result<T> {
        let messages = vec![
            ChatMessage::system(format!(
                "Reply with a single JSON object and nothing else. Shape: {}",
                shape
            )),
            ChatMessage::user(prompt),
        ];
        let text = self.chat_completion(operation, messages, true).await?;
        serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            Error::assistant_response(operation, format!("reply did not match the expected shape: {}", e))
        })
    }
}

/// Some servers wrap JSON-mode output in a markdown fence anyway.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn source_context(sources: &[KnowledgeSource]) -> String {
    sources
        .iter()
        .map(|s| format!("SOURCE [{}]: {}", s.title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn research(&self, domain: ResearchDomain, query: &str) -> Result<GroundedText> {
        let messages = vec![ChatMessage::system(domain.persona()), ChatMessage::user(query)];
        let text = self.chat_completion("research", messages, false).await?;
        Ok(GroundedText {
            text,
            citations: Vec::new(),
        })
    }

    async fn notebook_chat(&self, query: &str, sources: &[KnowledgeSource]) -> Result<GroundedText> {
        let messages = vec![
            ChatMessage::system(
                "Answer using the user's notebook sources below. Name the source titles you rely on.",
            ),
            ChatMessage::user(format!("{}\n\nQuery: {}", source_context(sources), query)),
        ];
        let text = self.chat_completion("notebook_chat", messages, false).await?;
        let citations = sources
            .iter()
            .filter(|s| text.contains(&s.title))
            .map(|s| Citation {
                title: s.title.clone(),
                uri: None,
            })
            .collect();
        Ok(GroundedText { text, citations })
    }

    async fn grade(&self, request: &GradingRequest) -> Result<GradingResult> {
        self.structured(
            "grade",
            r#"{"score": string, "feedback": string, "criteriaMet": [string]}"#,
            format!(
                "Grade this {} {}. Rubric: {}. Submission: {}",
                request.subject, request.assignment_type, request.rubric, request.submission
            ),
        )
        .await
    }

    async fn summarize(&self, text: &str, subject: &str) -> Result<StudyNotes> {
        self.structured(
            "summarize",
            r#"{"summary": string, "notes": string, "flashcards": [{"question": string, "answer": string}]}"#,
            format!("Summarize this {} material into study notes: {}", subject, text),
        )
        .await
    }

    async fn analyze_transaction(&self, description: &str) -> Result<TransactionAnalysis> {
        self.structured(
            "analyze_transaction",
            r#"{"analysis": string, "financialImpact": string, "entries": [{"account": string, "type": "debit"|"credit", "amount": string, "reason": string}]}"#,
            format!("Accounting analysis with journal entries: {}", description),
        )
        .await
    }

    async fn solve_engineering(&self, problem: &str) -> Result<EngineeringSolution> {
        self.structured(
            "solve_engineering",
            r#"{"solution": string, "finalResult": string, "principles": [string], "visualDescription": string}"#,
            format!("Solve this engineering problem step by step: {}", problem),
        )
        .await
    }

    async fn draft_document(&self, topic: &str, field: &str, kind: &str) -> Result<DocumentDraft> {
        self.structured(
            "draft_document",
            r#"{"title": string, "summary": string, "outline": [string]}"#,
            format!("Draft a {} for {} on {}", kind, field, topic),
        )
        .await
    }

    async fn generate_email(&self, goal: &str, context: &str) -> Result<EmailDrafts> {
        self.structured(
            "generate_email",
            r#"{"variations": [{"label": string, "subject": string, "body": string}]}"#,
            format!("Email goal: {}. Context: {}", goal, context),
        )
        .await
    }

    async fn read_image(&self, image: &[u8]) -> Result<String> {
        if image.is_empty() {
            return Err(Error::invalid_input("image", "image is empty"));
        }
        let encoded = base64::engine::general_purpose::STANDARD.encode(image);
        let messages = vec![ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/jpeg;base64,{}", encoded),
                    },
                },
                ContentPart::Text {
                    text: "Read the text in this image.".to_string(),
                },
            ]),
        }];
        self.chat_completion("read_image", messages, false).await
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> AssistantSettings {
        AssistantSettings {
            provider: crate::config::AssistantProvider::OpenAi,
            ..Default::default()
        }
    }

    #[test]
    fn test_assistant_name() {
        let assistant = OpenAiAssistant::new(settings()).unwrap();
        assert_eq!(assistant.name(), "openai");
        assert_eq!(assistant.total_requests(), 0);
    }

    #[test]
    fn test_auth_header() {
        let assistant = OpenAiAssistant::new(AssistantSettings {
            api_key: "sk-test-123".to_string(),
            ..settings()
        })
        .unwrap();
        assert_eq!(assistant.auth_header(), Some("Bearer sk-test-123".to_string()));

        let no_key = OpenAiAssistant::new(settings()).unwrap();
        assert_eq!(no_key.auth_header(), None);
    }

    #[test]
    fn test_endpoint_ignores_trailing_slash() {
        let assistant = OpenAiAssistant::new(AssistantSettings {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..settings()
        })
        .unwrap();
        assert_eq!(assistant.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    }

    #[test]
    fn test_image_request_shape() {
        let message = ChatMessage {
            role: "user",
            content: MessageContent::Parts(vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: "data:image/jpeg;base64,AAAA".into(),
                    },
                },
                ContentPart::Text { text: "Read".into() },
            ]),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["content"][0]["type"], "image_url");
        assert_eq!(value["content"][0]["image_url"]["url"], "data:image/jpeg;base64,AAAA");
        assert_eq!(value["content"][1]["type"], "text");

        let plain = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(plain["content"], "hi");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_request_error() {
        let assistant = OpenAiAssistant::new(AssistantSettings {
            base_url: "http://127.0.0.1:9/v1".to_string(),
            max_retries: 0,
            timeout_secs: 5,
            ..settings()
        })
        .unwrap();
        let err = assistant.research(ResearchDomain::Legal, "tort").await.unwrap_err();
        assert!(
            matches!(err, Error::AssistantRequest { .. } | Error::AssistantTimeout { .. }),
            "unexpected error: {err}"
        );
    }
}
