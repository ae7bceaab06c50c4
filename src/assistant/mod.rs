//! Generative assistant collaborator
//!
//! Feature screens call the assistant for research, grading, summaries and
//! drafting. The profile engine never waits on it: every call goes through
//! [`guarded`], which turns a failure or timeout into a [`Notice`].

mod mock;
mod openai;
mod traits;
mod types;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{AssistantProvider, AssistantSettings};
use crate::error::{Error, Result};

pub use mock::{MockAssistant, MockConfig};
pub use openai::OpenAiAssistant;
pub use traits::*;
pub use types::*;

/// Build the assistant selected by configuration.
pub fn create_assistant(settings: &AssistantSettings) -> Result<SharedAssistant> {
    if !settings.enabled {
        return Err(Error::AssistantDisabled);
    }
    match settings.provider {
        AssistantProvider::Offline => Ok(Arc::new(MockAssistant::new())),
        AssistantProvider::OpenAi => Ok(Arc::new(OpenAiAssistant::new(settings.clone())?)),
    }
}

// ─────────────────────────────────────────────────────────────────
// Notices
// ─────────────────────────────────────────────────────────────────

/// User-visible message for a failed assistant call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub operation: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl Notice {
    pub fn from_error(operation: &str, error: &Error) -> Self {
        Self {
            operation: operation.to_string(),
            message: error.to_string(),
            hint: error.suggestion().map(str::to_string),
            retryable: error.is_retryable(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable: {}", self.operation, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " ({})", hint)?;
        }
        Ok(())
    }
}

/// Run an assistant call with a deadline, converting any failure into a notice.
pub async fn guarded<T, F>(operation: &str, timeout: Duration, call: F) -> std::result::Result<T, Notice>
where
    F: Future<Output = Result<T>>,
{
    let error = match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => {
            debug!(operation, "Assistant call completed");
            return Ok(value);
        }
        Ok(Err(e)) => e,
        Err(_) => Error::AssistantTimeout {
            operation: operation.to_string(),
            timeout_secs: timeout.as_secs(),
        },
    };

    warn!(operation, error = %error.format_for_log(), "Assistant call failed");
    Err(Notice::from_error(operation, &error))
}
