//! Navigation composition.
//!
//! Turns a profile, its resolved visibility and a section order into the
//! sidebar entries and dashboard cards a view renders.

use serde::Serialize;

use crate::dashboard::SectionId;
use crate::persona::UserProfile;
use crate::visibility::{ResolvedVisibility, SurfaceId};

// ─────────────────────────────────────────────────────────────────
// Placement
// ─────────────────────────────────────────────────────────────────

/// Surfaces each section holds, in render order.
pub fn section_surfaces(section: SectionId) -> &'static [SurfaceId] {
    use SurfaceId::*;
    match section {
        SectionId::Professional => &[
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
        ],
        SectionId::Academic => &[TaSuite, StudyLab, KnowledgeVault],
        SectionId::Personal => &[Calendar, Budget, Fitness, Nutrition, Utilities],
        SectionId::Accessibility => &[VisionAide, HearingAide, CognitiveAide],
    }
}

// ─────────────────────────────────────────────────────────────────
// Output Types
// ─────────────────────────────────────────────────────────────────

/// One navigation entry or dashboard card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub id: String,
    pub label: String,
    pub route: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionId>,
    pub enabled: bool,
}

/// A dashboard section with its visible cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSection {
    pub id: SectionId,
    pub title: &'static str,
    pub cards: Vec<NavEntry>,
}

/// Everything a view renders for navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    /// Sidebar: always-on entries, then each section's cards. The
    /// accessibility section contributes its single hub entry instead.
    pub entries: Vec<NavEntry>,
    pub sections: Vec<DashboardSection>,
}

impl Navigation {
    /// Ids of the sidebar entries, in order.
    pub fn entry_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.id.as_str()).collect()
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id).collect()
    }
}

// ─────────────────────────────────────────────────────────────────
// Composition
// ─────────────────────────────────────────────────────────────────

/// Entries shown regardless of profile.
pub fn always_on() -> Vec<NavEntry> {
    vec![
        NavEntry {
            id: "home".to_string(),
            label: "My Universe".to_string(),
            route: "/",
            section: None,
            enabled: true,
        },
        NavEntry {
            id: "settings".to_string(),
            label: "Settings".to_string(),
            route: "/settings",
            section: None,
            enabled: true,
        },
    ]
}

/// Compose navigation for one render.
///
/// Sections follow `order`; repeated ids are rendered once. A section is
/// omitted if its hub is off or it has no visible cards.
pub fn compose(
    profile: &UserProfile,
    resolved: &ResolvedVisibility,
    order: &[SectionId],
) -> Navigation {
    let mut sections: Vec<DashboardSection> = Vec::new();

    for &section in order {
        if sections.iter().any(|s| s.id == section) || !resolved.section_enabled(section) {
            continue;
        }

        let cards: Vec<NavEntry> = section_cards(profile, resolved, section)
            .into_iter()
            .filter(|card| card.enabled)
            .collect();
        if cards.is_empty() {
            continue;
        }

        sections.push(DashboardSection {
            id: section,
            title: section.title(),
            cards,
        });
    }

    let mut entries = always_on();
    for section in &sections {
        if section.id == SectionId::Accessibility {
            entries.push(accessibility_hub(resolved));
        } else {
            entries.extend(section.cards.iter().cloned());
        }
    }

    Navigation { entries, sections }
}

/// Every entry with its `enabled` answer, unfiltered, in default section
/// order. Used by the settings screen.
pub fn catalog(profile: &UserProfile, resolved: &ResolvedVisibility) -> Vec<NavEntry> {
    let mut entries = always_on();
    for &section in SectionId::all() {
        if section == SectionId::Accessibility {
            entries.push(accessibility_hub(resolved));
        }
        entries.extend(section_cards(profile, resolved, section));
    }
    entries
}

/// The one sidebar entry standing for every enabled aide.
fn accessibility_hub(resolved: &ResolvedVisibility) -> NavEntry {
    NavEntry {
        id: "accessibilityHub".to_string(),
        label: resolved.aides.hub_label().to_string(),
        route: "/accessibility",
        section: Some(SectionId::Accessibility),
        enabled: resolved.section_enabled(SectionId::Accessibility),
    }
}

fn section_cards(
    profile: &UserProfile,
    resolved: &ResolvedVisibility,
    section: SectionId,
) -> Vec<NavEntry> {
    let hub_on = resolved.section_enabled(section);
    section_surfaces(section)
        .iter()
        .map(|&surface| NavEntry {
            id: surface.key().to_string(),
            label: surface_label(profile, surface),
            route: surface.route(),
            section: Some(section),
            enabled: hub_on && resolved.is_visible(surface),
        })
        .collect()
}

fn surface_label(profile: &UserProfile, surface: SurfaceId) -> String {
    match surface {
        SurfaceId::TaSuite => format!("{} TA / RA", profile.subject_or_default()),
        other => other.title().to_string(),
    }
}
