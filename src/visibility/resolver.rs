//! Visibility resolution.
//!
//! `resolve` is a pure function of the profile: it reads nothing else and
//! has no side effects, so every view derives the same answer from the same
//! record.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::dashboard::SectionId;
use crate::persona::{lenient_profile, ModuleFlag, UserProfile};

use super::rules::{hq_rule, DIRECT_RULES, HQ_RULES};
use super::surface::SurfaceId;

/// Accessibility aides and display modes the user has switched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aides {
    pub vision: bool,
    pub hearing: bool,
    pub cognitive: bool,
    pub dyslexia_font: bool,
    pub color_filters: bool,
    pub screen_reader: bool,
}

impl Aides {
    /// Whether any aide with its own surface is on.
    pub fn any_surface(&self) -> bool {
        self.vision || self.hearing || self.cognitive
    }

    /// Label for the combined accessibility entry.
    pub fn hub_label(&self) -> &'static str {
        match (self.vision, self.hearing, self.cognitive) {
            (false, true, false) => "Hearing Aide",
            (true, false, false) => "Vision Assistant",
            _ => "Aide Suite",
        }
    }
}

/// Derived visibility for one profile. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVisibility {
    surfaces: BTreeMap<SurfaceId, bool>,
    sections: BTreeMap<SectionId, bool>,
    pub aides: Aides,
}

impl ResolvedVisibility {
    pub fn is_visible(&self, surface: SurfaceId) -> bool {
        self.surfaces.get(&surface).copied().unwrap_or(false)
    }

    /// Whether a dashboard section's hub is switched on.
    pub fn section_enabled(&self, section: SectionId) -> bool {
        self.sections.get(&section).copied().unwrap_or(false)
    }

    /// Visible surfaces, in `SurfaceId::all()` order.
    pub fn visible(&self) -> Vec<SurfaceId> {
        SurfaceId::all()
            .iter()
            .copied()
            .filter(|s| self.is_visible(*s))
            .collect()
    }
}

/// Derive visibility from a profile.
pub fn resolve(profile: &UserProfile) -> ResolvedVisibility {
    let flags = &profile.module_visibility;

    let mut surfaces = BTreeMap::new();
    for rule in DIRECT_RULES {
        surfaces.insert(rule.surface, flags.get(rule.flag));
    }
    for rule in HQ_RULES {
        surfaces.insert(rule.surface, rule.matches(profile));
    }

    let aides = Aides {
        vision: flags.vision_aide,
        hearing: flags.hearing_aide,
        cognitive: flags.cognitive_aide,
        dyslexia_font: flags.dyslexia_mode,
        color_filters: flags.color_filters,
        screen_reader: flags.screen_reader_opt,
    };

    let sections = BTreeMap::from([
        (SectionId::Professional, flags.get(ModuleFlag::CareerMode)),
        (SectionId::Academic, flags.get(ModuleFlag::StudentMode)),
        (SectionId::Personal, flags.get(ModuleFlag::Personal)),
        (SectionId::Accessibility, aides.any_surface()),
    ]);

    ResolvedVisibility {
        surfaces,
        sections,
        aides,
    }
}

/// Derive visibility from a raw, possibly partial, record.
///
/// Missing keys take the same defaults as a backfilled profile.
pub fn resolve_value(record: &Value) -> ResolvedVisibility {
    resolve(&lenient_profile(record))
}

/// Why a surface is or is not visible, for the `visibility` command.
pub fn explain(profile: &UserProfile, surface: SurfaceId) -> String {
    if let Some(rule) = hq_rule(surface) {
        let flag_on = profile.module_visibility.get(rule.flag);
        return match (flag_on, rule.matching_label(profile)) {
            (true, Some(label)) => format!("{} on, matched \"{}\"", rule.flag, label),
            (true, None) => format!("{} on, no matching major or career", rule.flag),
            (false, _) => format!("{} off", rule.flag),
        };
    }

    DIRECT_RULES
        .iter()
        .find(|rule| rule.surface == surface)
        .map(|rule| {
            let state = if profile.module_visibility.get(rule.flag) { "on" } else { "off" };
            format!("{} {}", rule.flag, state)
        })
        .unwrap_or_default()
}
