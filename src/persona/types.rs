//! Core types for the persisted user profile.
//!
//! The profile is the only aggregate the hub persists. Everything a view
//! shows is derived from it on read.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Schema version written by this build.
pub const PROFILE_SCHEMA_VERSION: u32 = 1;

/// Majors offered by the settings screen.
pub const MAJOR_OPTIONS: &[&str] = &[
    "Psychology",
    "Accounting",
    "Electrical Engineering",
    "Mechanical Engineering",
    "STEM",
    "Healthcare",
    "Economics",
    "Literature",
    "Civil Engineering",
    "Finance",
    "Marketing",
    "Education",
    "Law",
    "Arts",
    "Business",
    "Computer Science",
    "Physics",
];

/// Careers offered by the settings screen.
pub const CAREER_OPTIONS: &[&str] = &[
    "Accountant",
    "Researcher",
    "Electrical Engineer",
    "Mechanical Engineer",
    "Healthcare Professional",
    "Software Developer",
    "Lawyer",
    "Professor",
    "Designer",
    "Business Analyst",
];

// ─────────────────────────────────────────────────────────────────
// Role / Theme
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Student,
    Worker,
}

impl Role {
    pub fn slug(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "worker" => Ok(Role::Worker),
            _ => Err(Error::UnknownRole { name: s.to_string() }),
        }
    }
}

/// Colour theme for the dashboard chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Pink,
    Rose,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Purple,
    Default,
}

impl ThemeMode {
    pub fn all() -> &'static [ThemeMode] {
        &[
            ThemeMode::Pink,
            ThemeMode::Rose,
            ThemeMode::Orange,
            ThemeMode::Yellow,
            ThemeMode::Green,
            ThemeMode::Blue,
            ThemeMode::Indigo,
            ThemeMode::Purple,
            ThemeMode::Default,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ThemeMode::Pink => "pink",
            ThemeMode::Rose => "rose",
            ThemeMode::Orange => "orange",
            ThemeMode::Yellow => "yellow",
            ThemeMode::Green => "green",
            ThemeMode::Blue => "blue",
            ThemeMode::Indigo => "indigo",
            ThemeMode::Purple => "purple",
            ThemeMode::Default => "default",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ThemeMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ThemeMode::all()
            .iter()
            .copied()
            .find(|t| t.slug().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownTheme { name: s.to_string() })
    }
}

// ─────────────────────────────────────────────────────────────────
// Module Flags
// ─────────────────────────────────────────────────────────────────

/// One named boolean in `moduleVisibility`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleFlag {
    Accounting,
    Psychology,
    Personal,
    Budget,
    Fitness,
    Nutrition,
    Calendar,
    Utilities,
    EmailEditor,
    DocDrafter,
    StudentMode,
    CareerMode,
    TaMode,
    VisionAide,
    HearingAide,
    CognitiveAide,
    HealthHq,
    LegalHq,
    CreativeHq,
    TechHq,
    EngineeringHq,
    BusinessHq,
    ScientificHq,
    PsychologyHq,
    MarketingHq,
    DyslexiaMode,
    ColorFilters,
    ScreenReaderOpt,
}

impl ModuleFlag {
    /// Every flag, in persisted key order.
    pub fn all() -> &'static [ModuleFlag] {
        use ModuleFlag::*;
        &[
            Accounting,
            Psychology,
            Personal,
            Budget,
            Fitness,
            Nutrition,
            Calendar,
            Utilities,
            EmailEditor,
            DocDrafter,
            StudentMode,
            CareerMode,
            TaMode,
            VisionAide,
            HearingAide,
            CognitiveAide,
            HealthHq,
            LegalHq,
            CreativeHq,
            TechHq,
            EngineeringHq,
            BusinessHq,
            ScientificHq,
            PsychologyHq,
            MarketingHq,
            DyslexiaMode,
            ColorFilters,
            ScreenReaderOpt,
        ]
    }

    /// Key used in the persisted record.
    pub fn key(&self) -> &'static str {
        use ModuleFlag::*;
        match self {
            Accounting => "accounting",
            Psychology => "psychology",
            Personal => "personal",
            Budget => "budget",
            Fitness => "fitness",
            Nutrition => "nutrition",
            Calendar => "calendar",
            Utilities => "utilities",
            EmailEditor => "emailEditor",
            DocDrafter => "docDrafter",
            StudentMode => "studentMode",
            CareerMode => "careerMode",
            TaMode => "taMode",
            VisionAide => "visionAide",
            HearingAide => "hearingAide",
            CognitiveAide => "cognitiveAide",
            HealthHq => "healthHQ",
            LegalHq => "legalHQ",
            CreativeHq => "creativeHQ",
            TechHq => "techHQ",
            EngineeringHq => "engineeringHQ",
            BusinessHq => "businessHQ",
            ScientificHq => "scientificHQ",
            PsychologyHq => "psychologyHQ",
            MarketingHq => "marketingHQ",
            DyslexiaMode => "dyslexiaMode",
            ColorFilters => "colorFilters",
            ScreenReaderOpt => "screenReaderOpt",
        }
    }

    /// Value used when the flag is missing from a stored record.
    pub fn backfill_default(&self) -> bool {
        matches!(
            self,
            ModuleFlag::StudentMode
                | ModuleFlag::CareerMode
                | ModuleFlag::Calendar
                | ModuleFlag::Budget
                | ModuleFlag::Fitness
                | ModuleFlag::Nutrition
                | ModuleFlag::VisionAide
        )
    }
}

impl fmt::Display for ModuleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ModuleFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ModuleFlag::all()
            .iter()
            .copied()
            .find(|flag| flag.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownFlag { name: s.to_string() })
    }
}

/// The full set of visibility flags. Missing keys deserialize to their
/// backfill default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleVisibility {
    pub accounting: bool,
    pub psychology: bool,
    pub personal: bool,
    pub budget: bool,
    pub fitness: bool,
    pub nutrition: bool,
    pub calendar: bool,
    pub utilities: bool,
    pub email_editor: bool,
    pub doc_drafter: bool,
    pub student_mode: bool,
    pub career_mode: bool,
    pub ta_mode: bool,
    pub vision_aide: bool,
    pub hearing_aide: bool,
    pub cognitive_aide: bool,
    #[serde(rename = "healthHQ")]
    pub health_hq: bool,
    #[serde(rename = "legalHQ")]
    pub legal_hq: bool,
    #[serde(rename = "creativeHQ")]
    pub creative_hq: bool,
    #[serde(rename = "techHQ")]
    pub tech_hq: bool,
    #[serde(rename = "engineeringHQ")]
    pub engineering_hq: bool,
    #[serde(rename = "businessHQ")]
    pub business_hq: bool,
    #[serde(rename = "scientificHQ")]
    pub scientific_hq: bool,
    #[serde(rename = "psychologyHQ")]
    pub psychology_hq: bool,
    #[serde(rename = "marketingHQ")]
    pub marketing_hq: bool,
    pub dyslexia_mode: bool,
    pub color_filters: bool,
    pub screen_reader_opt: bool,
}

impl Default for ModuleVisibility {
    fn default() -> Self {
        let mut visibility = Self::all_off();
        for flag in ModuleFlag::all() {
            visibility.set(*flag, flag.backfill_default());
        }
        visibility
    }
}

impl ModuleVisibility {
    /// Every flag switched off.
    pub fn all_off() -> Self {
        Self {
            accounting: false,
            psychology: false,
            personal: false,
            budget: false,
            fitness: false,
            nutrition: false,
            calendar: false,
            utilities: false,
            email_editor: false,
            doc_drafter: false,
            student_mode: false,
            career_mode: false,
            ta_mode: false,
            vision_aide: false,
            hearing_aide: false,
            cognitive_aide: false,
            health_hq: false,
            legal_hq: false,
            creative_hq: false,
            tech_hq: false,
            engineering_hq: false,
            business_hq: false,
            scientific_hq: false,
            psychology_hq: false,
            marketing_hq: false,
            dyslexia_mode: false,
            color_filters: false,
            screen_reader_opt: false,
        }
    }

    pub fn get(&self, flag: ModuleFlag) -> bool {
        *self.slot(flag)
    }

    pub fn set(&mut self, flag: ModuleFlag, value: bool) {
        *self.slot_mut(flag) = value;
    }

    /// Flip a flag and return its new value.
    pub fn toggle(&mut self, flag: ModuleFlag) -> bool {
        let slot = self.slot_mut(flag);
        *slot = !*slot;
        *slot
    }

    /// Flags that are currently on, in key order.
    pub fn enabled(&self) -> Vec<ModuleFlag> {
        ModuleFlag::all()
            .iter()
            .copied()
            .filter(|flag| self.get(*flag))
            .collect()
    }

    fn slot(&self, flag: ModuleFlag) -> &bool {
        use ModuleFlag::*;
        match flag {
            Accounting => &self.accounting,
            Psychology => &self.psychology,
            Personal => &self.personal,
            Budget => &self.budget,
            Fitness => &self.fitness,
            Nutrition => &self.nutrition,
            Calendar => &self.calendar,
            Utilities => &self.utilities,
            EmailEditor => &self.email_editor,
            DocDrafter => &self.doc_drafter,
            StudentMode => &self.student_mode,
            CareerMode => &self.career_mode,
            TaMode => &self.ta_mode,
            VisionAide => &self.vision_aide,
            HearingAide => &self.hearing_aide,
            CognitiveAide => &self.cognitive_aide,
            HealthHq => &self.health_hq,
            LegalHq => &self.legal_hq,
            CreativeHq => &self.creative_hq,
            TechHq => &self.tech_hq,
            EngineeringHq => &self.engineering_hq,
            BusinessHq => &self.business_hq,
            ScientificHq => &self.scientific_hq,
            PsychologyHq => &self.psychology_hq,
            MarketingHq => &self.marketing_hq,
            DyslexiaMode => &self.dyslexia_mode,
            ColorFilters => &self.color_filters,
            ScreenReaderOpt => &self.screen_reader_opt,
        }
    }

    fn slot_mut(&mut self, flag: ModuleFlag) -> &mut bool {
        use ModuleFlag::*;
        match flag {
            Accounting => &mut self.accounting,
            Psychology => &mut self.psychology,
            Personal => &mut self.personal,
            Budget => &mut self.budget,
            Fitness => &mut self.fitness,
            Nutrition => &mut self.nutrition,
            Calendar => &mut self.calendar,
            Utilities => &mut self.utilities,
            EmailEditor => &mut self.email_editor,
            DocDrafter => &mut self.doc_drafter,
            StudentMode => &mut self.student_mode,
            CareerMode => &mut self.career_mode,
            TaMode => &mut self.ta_mode,
            VisionAide => &mut self.vision_aide,
            HearingAide => &mut self.hearing_aide,
            CognitiveAide => &mut self.cognitive_aide,
            HealthHq => &mut self.health_hq,
            LegalHq => &mut self.legal_hq,
            CreativeHq => &mut self.creative_hq,
            TechHq => &mut self.tech_hq,
            EngineeringHq => &mut self.engineering_hq,
            BusinessHq => &mut self.business_hq,
            ScientificHq => &mut self.scientific_hq,
            PsychologyHq => &mut self.psychology_hq,
            MarketingHq => &mut self.marketing_hq,
            DyslexiaMode => &mut self.dyslexia_mode,
            ColorFilters => &mut self.color_filters,
            ScreenReaderOpt => &mut self.screen_reader_opt,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Label Sets
// ─────────────────────────────────────────────────────────────────

/// Insertion-ordered set of free-text labels (majors or careers).
///
/// Duplicates are dropped when a stored list is read back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LabelSet(Vec<String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label. Returns false if it was already present.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        let label = label.into();
        if self.contains(&label) {
            return false;
        }
        self.0.push(label);
        true
    }

    /// Remove a label. Returns false if it was absent.
    pub fn remove(&mut self, label: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|l| l != label);
        self.0.len() != before
    }

    /// Flip membership. Returns true if the label is now present.
    pub fn toggle(&mut self, label: &str) -> bool {
        if self.remove(label) {
            false
        } else {
            self.insert(label)
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.iter().any(|l| l == label)
    }

    /// True if any label contains `needle` as a case-sensitive substring.
    pub fn any_contains(&self, needle: &str) -> bool {
        self.0.iter().any(|l| l.contains(needle))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for LabelSet {
    fn from(labels: Vec<String>) -> Self {
        let mut set = LabelSet::new();
        for label in labels {
            set.insert(label);
        }
        set
    }
}

impl From<LabelSet> for Vec<String> {
    fn from(set: LabelSet) -> Self {
        set.0
    }
}

impl<'a> FromIterator<&'a str> for LabelSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect::<Vec<_>>().into()
    }
}

/// Which label set a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelGroup {
    Majors,
    Careers,
}

impl LabelGroup {
    pub fn noun(&self) -> &'static str {
        match self {
            LabelGroup::Majors => "major",
            LabelGroup::Careers => "career",
        }
    }

    pub fn options(&self) -> &'static [&'static str] {
        match self {
            LabelGroup::Majors => MAJOR_OPTIONS,
            LabelGroup::Careers => CAREER_OPTIONS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Knowledge Sources / Linked Apps
// ─────────────────────────────────────────────────────────────────

/// A user-supplied reference document for the notebook assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSource {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkedApps {
    pub calendar: bool,
    pub keep: bool,
}

// ─────────────────────────────────────────────────────────────────
// User Profile
// ─────────────────────────────────────────────────────────────────

/// The persisted profile record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub schema_version: u32,

    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub is_logged_in: bool,

    #[serde(default)]
    pub theme: ThemeMode,
    pub role: Role,
    #[serde(default)]
    pub field: String,

    #[serde(default)]
    pub selected_majors: LabelSet,
    #[serde(default)]
    pub selected_careers: LabelSet,

    #[serde(default, alias = "customTASubject")]
    pub custom_subject: String,
    #[serde(default, alias = "taKnowledgeBase")]
    pub knowledge_sources: Vec<KnowledgeSource>,
    #[serde(default)]
    pub next_source_id: u64,

    #[serde(default)]
    pub linked_apps: LinkedApps,
    #[serde(default)]
    pub module_visibility: ModuleVisibility,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_order: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// The profile created the first time the hub runs.
    pub fn first_run() -> Self {
        let mut module_visibility = ModuleVisibility::default();
        for flag in [
            ModuleFlag::Accounting,
            ModuleFlag::Psychology,
            ModuleFlag::Personal,
            ModuleFlag::Utilities,
            ModuleFlag::TaMode,
        ] {
            module_visibility.set(flag, true);
        }

        Self {
            schema_version: PROFILE_SCHEMA_VERSION,
            name: "Nexus User".to_string(),
            email: String::new(),
            picture: "https://api.dicebear.com/7.x/avataaars/svg?seed=Nexus".to_string(),
            is_logged_in: true,
            theme: ThemeMode::Pink,
            role: Role::Student,
            field: "Accounting".to_string(),
            selected_majors: ["Accounting"].into_iter().collect(),
            selected_careers: ["Teaching Assistant"].into_iter().collect(),
            custom_subject: "Psychology".to_string(),
            knowledge_sources: Vec::new(),
            next_source_id: 1,
            linked_apps: LinkedApps::default(),
            module_visibility,
            dashboard_order: None,
            updated_at: None,
        }
    }

    pub fn labels(&self, group: LabelGroup) -> &LabelSet {
        match group {
            LabelGroup::Majors => &self.selected_majors,
            LabelGroup::Careers => &self.selected_careers,
        }
    }

    pub fn labels_mut(&mut self, group: LabelGroup) -> &mut LabelSet {
        match group {
            LabelGroup::Majors => &mut self.selected_majors,
            LabelGroup::Careers => &mut self.selected_careers,
        }
    }

    /// Append a knowledge source and return its id.
    pub fn add_source(&mut self, title: impl Into<String>, content: impl Into<String>) -> u64 {
        let taken: BTreeSet<u64> = self.knowledge_sources.iter().map(|s| s.id).collect();
        let floor = taken.iter().next_back().map_or(1, |max| max.saturating_add(1));
        let id = free_source_id(&taken, self.next_source_id.max(floor));
        self.next_source_id = id.saturating_add(1);
        self.knowledge_sources.push(KnowledgeSource {
            id,
            title: title.into(),
            content: content.into(),
            added_at: Some(Utc::now()),
        });
        id
    }

    /// Remove a knowledge source. Returns false if no source had that id.
    pub fn remove_source(&mut self, id: u64) -> bool {
        let before = self.knowledge_sources.len();
        self.knowledge_sources.retain(|s| s.id != id);
        self.knowledge_sources.len() != before
    }

    /// Subject used to label the teaching-assistant suite.
    pub fn subject_or_default(&self) -> &str {
        let subject = self.custom_subject.trim();
        if subject.is_empty() {
            "Psychology"
        } else {
            subject
        }
    }
}

/// Lowest unused source id at or above `start`, wrapping to 1 at the top.
///
/// `u64::MAX` is never handed out so the counter can always advance past it.
pub(crate) fn free_source_id(taken: &BTreeSet<u64>, start: u64) -> u64 {
    let mut candidate = start.max(1);
    while candidate == u64::MAX || taken.contains(&candidate) {
        candidate = if candidate >= u64::MAX - 1 { 1 } else { candidate + 1 };
    }
    candidate
}
