//! Navigable dashboard surfaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A screen or card the dashboard can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceId {
    // Professional
    #[serde(rename = "accountingHQ")]
    AccountingHq,
    #[serde(rename = "engineeringHQ")]
    EngineeringHq,
    #[serde(rename = "healthHQ")]
    HealthHq,
    #[serde(rename = "legalHQ")]
    LegalHq,
    #[serde(rename = "creativeHQ")]
    CreativeHq,
    #[serde(rename = "techHQ")]
    TechHq,
    #[serde(rename = "businessHQ")]
    BusinessHq,
    #[serde(rename = "scientificHQ")]
    ScientificHq,
    #[serde(rename = "psychologyHQ")]
    PsychologyHq,
    #[serde(rename = "marketingHQ")]
    MarketingHq,
    #[serde(rename = "emailStudio")]
    EmailStudio,
    #[serde(rename = "docDrafter")]
    DocDrafter,

    // Academic
    #[serde(rename = "taSuite")]
    TaSuite,
    #[serde(rename = "studyLab")]
    StudyLab,
    #[serde(rename = "knowledgeVault")]
    KnowledgeVault,

    // Personal
    #[serde(rename = "budget")]
    Budget,
    #[serde(rename = "fitness")]
    Fitness,
    #[serde(rename = "nutrition")]
    Nutrition,
    #[serde(rename = "calendar")]
    Calendar,
    #[serde(rename = "utilities")]
    Utilities,

    // Accessibility
    #[serde(rename = "visionAide")]
    VisionAide,
    #[serde(rename = "hearingAide")]
    HearingAide,
    #[serde(rename = "cognitiveAide")]
    CognitiveAide,
}

impl SurfaceId {
    pub fn all() -> &'static [SurfaceId] {
        use SurfaceId::*;
        &[
            AccountingHq,
            EngineeringHq,
            HealthHq,
            LegalHq,
            CreativeHq,
            TechHq,
            BusinessHq,
            ScientificHq,
            PsychologyHq,
            MarketingHq,
            EmailStudio,
            DocDrafter,
            TaSuite,
            StudyLab,
            KnowledgeVault,
            Budget,
            Fitness,
            Nutrition,
            Calendar,
            Utilities,
            VisionAide,
            HearingAide,
            CognitiveAide,
        ]
    }

    /// Stable key, matching the serialized form.
    pub fn key(&self) -> &'static str {
        use SurfaceId::*;
        match self {
            AccountingHq => "accountingHQ",
            EngineeringHq => "engineeringHQ",
            HealthHq => "healthHQ",
            LegalHq => "legalHQ",
            CreativeHq => "creativeHQ",
            TechHq => "techHQ",
            BusinessHq => "businessHQ",
            ScientificHq => "scientificHQ",
            PsychologyHq => "psychologyHQ",
            MarketingHq => "marketingHQ",
            EmailStudio => "emailStudio",
            DocDrafter => "docDrafter",
            TaSuite => "taSuite",
            StudyLab => "studyLab",
            KnowledgeVault => "knowledgeVault",
            Budget => "budget",
            Fitness => "fitness",
            Nutrition => "nutrition",
            Calendar => "calendar",
            Utilities => "utilities",
            VisionAide => "visionAide",
            HearingAide => "hearingAide",
            CognitiveAide => "cognitiveAide",
        }
    }

    /// Default display title. Some titles are personalised by the
    /// navigation composer.
    pub fn title(&self) -> &'static str {
        use SurfaceId::*;
        match self {
            AccountingHq => "Accounting HQ",
            EngineeringHq => "Engineering HQ",
            HealthHq => "Health HQ",
            LegalHq => "Legal HQ",
            CreativeHq => "Creative HQ",
            TechHq => "Tech HQ",
            BusinessHq => "Business HQ",
            ScientificHq => "Scientific HQ",
            PsychologyHq => "Psychology HQ",
            MarketingHq => "Marketing HQ",
            EmailStudio => "Email Studio",
            DocDrafter => "Doc Drafter",
            TaSuite => "TA / RA Suite",
            StudyLab => "Study Lab",
            KnowledgeVault => "Knowledge Vault",
            Budget => "Budget",
            Fitness => "Fitness",
            Nutrition => "Nutrition",
            Calendar => "Calendar",
            Utilities => "Utilities",
            VisionAide => "Vision Assistant",
            HearingAide => "Hearing Aide",
            CognitiveAide => "Cognitive Aide",
        }
    }

    /// Route the surface lives at.
    pub fn route(&self) -> &'static str {
        use SurfaceId::*;
        match self {
            AccountingHq => "/accounting",
            EngineeringHq => "/engineering",
            HealthHq => "/health",
            LegalHq => "/legal",
            CreativeHq => "/creative",
            TechHq => "/tech",
            BusinessHq => "/business",
            ScientificHq => "/scientific",
            PsychologyHq => "/psychology",
            MarketingHq => "/marketing",
            EmailStudio => "/email",
            DocDrafter => "/drafter",
            TaSuite => "/grading",
            StudyLab => "/study",
            KnowledgeVault => "/vault",
            Budget => "/budget",
            Fitness => "/fitness",
            Nutrition => "/nutrition",
            Calendar => "/calendar",
            Utilities => "/utilities",
            VisionAide => "/vision",
            HearingAide => "/hearing",
            CognitiveAide => "/cognitive",
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SurfaceId {
    type Err = Error;

    /// Case-insensitive on the surface key.
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        SurfaceId::all()
            .iter()
            .copied()
            .find(|surface| surface.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_input("surface", format!("unknown surface '{}'", s)))
    }
}
