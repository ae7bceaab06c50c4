//! Request and response payloads exchanged with the assistant.
//!
//! Structured responses are JSON objects with camelCase keys; the HTTP
//! implementation asks the model for exactly these shapes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Research
// ─────────────────────────────────────────────────────────────────

/// Expert persona used for grounded research questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchDomain {
    Legal,
    Scientific,
    Psychology,
    Marketing,
    Business,
    Tech,
    Gaap,
}

impl ResearchDomain {
    pub fn all() -> &'static [ResearchDomain] {
        &[
            ResearchDomain::Legal,
            ResearchDomain::Scientific,
            ResearchDomain::Psychology,
            ResearchDomain::Marketing,
            ResearchDomain::Business,
            ResearchDomain::Tech,
            ResearchDomain::Gaap,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ResearchDomain::Legal => "legal",
            ResearchDomain::Scientific => "scientific",
            ResearchDomain::Psychology => "psychology",
            ResearchDomain::Marketing => "marketing",
            ResearchDomain::Business => "business",
            ResearchDomain::Tech => "tech",
            ResearchDomain::Gaap => "gaap",
        }
    }

    /// System prompt framing the model as a domain expert.
    pub fn persona(&self) -> &'static str {
        match self {
            ResearchDomain::Legal => {
                "You are a high-level legal researcher. Cover precedent, statutes and \
                 common law principles, cite sources where possible and summarize legal risk."
            }
            ResearchDomain::Scientific => {
                "You are a senior research scientist. Report peer-reviewed findings and \
                 experimental methodology, focusing on empirical evidence."
            }
            ResearchDomain::Psychology => {
                "You are a clinical psychologist. Explain concepts and therapeutic methods \
                 with reference to DSM-5 or ICD-11 where appropriate."
            }
            ResearchDomain::Marketing => {
                "You are a chief marketing officer. Produce strategy, audience personas or \
                 campaign briefs grounded in current market trends."
            }
            ResearchDomain::Business => {
                "You are a business strategist. Provide a SWOT analysis and market trend report."
            }
            ResearchDomain::Tech => {
                "You are a systems architect. Recommend a stack, describe data flow and \
                 call out scaling bottlenecks."
            }
            ResearchDomain::Gaap => {
                "You are a certified accountant. Explain the applicable GAAP rule and cite the codification."
            }
        }
    }
}

impl fmt::Display for ResearchDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ResearchDomain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        ResearchDomain::all()
            .iter()
            .copied()
            .find(|d| d.slug() == wanted)
            .ok_or_else(|| {
                Error::invalid_input(
                    "domain",
                    format!(
                        "unknown research domain '{}' (expected one of: {})",
                        s,
                        ResearchDomain::all()
                            .iter()
                            .map(|d| d.slug())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })
    }
}

/// Free text plus the sources it was grounded on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedText {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Grading
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRequest {
    pub subject: String,
    pub assignment_type: String,
    pub rubric: String,
    pub submission: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: String,
    pub feedback: String,
    #[serde(default)]
    pub criteria_met: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────
// Study notes
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyNotes {
    pub summary: String,
    pub notes: String,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
}

// ─────────────────────────────────────────────────────────────────
// Accounting
// ─────────────────────────────────────────────────────────────────

/// One line of a double-entry journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub account: String,
    /// "debit" or "credit"
    #[serde(rename = "type")]
    pub side: String,
    pub amount: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionAnalysis {
    pub analysis: String,
    pub financial_impact: String,
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

// ─────────────────────────────────────────────────────────────────
// Engineering
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineeringSolution {
    pub solution: String,
    pub final_result: String,
    #[serde(default)]
    pub principles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_description: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Drafting
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub outline: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVariation {
    pub label: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDrafts {
    #[serde(default)]
    pub variations: Vec<EmailVariation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse() {
        assert_eq!("GAAP".parse::<ResearchDomain>().unwrap(), ResearchDomain::Gaap);
        assert_eq!(" legal ".parse::<ResearchDomain>().unwrap(), ResearchDomain::Legal);
        assert!("astrology".parse::<ResearchDomain>().is_err());
    }

    #[test]
    fn test_payload_keys_are_camel_case() {
        let json = r#"{
            "analysis": "Cash sale",
            "financialImpact": "Assets up",
            "entries": [{"account": "Cash", "type": "debit", "amount": "100"}]
        }"#;
        let parsed: TransactionAnalysis = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entries[0].side, "debit");
        assert_eq!(parsed.entries[0].reason, "");

        let grading = GradingResult {
            score: "A".into(),
            feedback: "Good".into(),
            criteria_met: vec!["Thesis".into()],
        };
        let value = serde_json::to_value(&grading).unwrap();
        assert!(value.get("criteriaMet").is_some());
    }
}
