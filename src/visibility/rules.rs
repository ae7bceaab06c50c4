//! Visibility rule tables.
//!
//! Direct rules map one flag to one surface. HQ rules additionally require a
//! selected major or career to mention one of the HQ's keywords. Keyword
//! matching is a case-sensitive substring test, so "Mechanical Engineering"
//! matches "Engineering" but "engineering" does not.

use crate::persona::{ModuleFlag, UserProfile};

use super::surface::SurfaceId;

/// A surface shown iff its flag is on.
#[derive(Debug, Clone, Copy)]
pub struct DirectRule {
    pub surface: SurfaceId,
    pub flag: ModuleFlag,
}

/// An HQ shown iff its group flag is on and a label matches.
#[derive(Debug, Clone, Copy)]
pub struct HqRule {
    pub surface: SurfaceId,
    pub flag: ModuleFlag,
    pub major_keywords: &'static [&'static str],
    pub career_keywords: &'static [&'static str],
}

impl HqRule {
    /// First selected label that mentions one of this HQ's keywords.
    pub fn matching_label<'a>(&self, profile: &'a UserProfile) -> Option<&'a str> {
        let majors = profile
            .selected_majors
            .iter()
            .find(|label| self.major_keywords.iter().any(|kw| label.contains(kw)));
        majors.or_else(|| {
            profile
                .selected_careers
                .iter()
                .find(|label| self.career_keywords.iter().any(|kw| label.contains(kw)))
        })
    }

    pub fn matches(&self, profile: &UserProfile) -> bool {
        profile.module_visibility.get(self.flag) && self.matching_label(profile).is_some()
    }
}

pub const DIRECT_RULES: &[DirectRule] = &[
    DirectRule { surface: SurfaceId::EmailStudio, flag: ModuleFlag::EmailEditor },
    DirectRule { surface: SurfaceId::DocDrafter, flag: ModuleFlag::DocDrafter },
    DirectRule { surface: SurfaceId::TaSuite, flag: ModuleFlag::TaMode },
    DirectRule { surface: SurfaceId::StudyLab, flag: ModuleFlag::StudentMode },
    DirectRule { surface: SurfaceId::KnowledgeVault, flag: ModuleFlag::StudentMode },
    DirectRule { surface: SurfaceId::Budget, flag: ModuleFlag::Budget },
    DirectRule { surface: SurfaceId::Fitness, flag: ModuleFlag::Fitness },
    DirectRule { surface: SurfaceId::Nutrition, flag: ModuleFlag::Nutrition },
    DirectRule { surface: SurfaceId::Calendar, flag: ModuleFlag::Calendar },
    DirectRule { surface: SurfaceId::Utilities, flag: ModuleFlag::Utilities },
    DirectRule { surface: SurfaceId::VisionAide, flag: ModuleFlag::VisionAide },
    DirectRule { surface: SurfaceId::HearingAide, flag: ModuleFlag::HearingAide },
    DirectRule { surface: SurfaceId::CognitiveAide, flag: ModuleFlag::CognitiveAide },
];

pub const HQ_RULES: &[HqRule] = &[
    HqRule {
        surface: SurfaceId::AccountingHq,
        flag: ModuleFlag::Accounting,
        major_keywords: &["Accounting", "Finance"],
        career_keywords: &["Accountant"],
    },
    HqRule {
        surface: SurfaceId::EngineeringHq,
        flag: ModuleFlag::EngineeringHq,
        major_keywords: &["Engineering", "Architecture", "Physics"],
        career_keywords: &["Engineer"],
    },
    HqRule {
        surface: SurfaceId::HealthHq,
        flag: ModuleFlag::HealthHq,
        major_keywords: &["Healthcare", "Biology"],
        career_keywords: &["Healthcare Professional"],
    },
    HqRule {
        surface: SurfaceId::LegalHq,
        flag: ModuleFlag::LegalHq,
        major_keywords: &["Law"],
        career_keywords: &["Lawyer"],
    },
    HqRule {
        surface: SurfaceId::CreativeHq,
        flag: ModuleFlag::CreativeHq,
        major_keywords: &["Arts", "Creative"],
        career_keywords: &["Designer"],
    },
    HqRule {
        surface: SurfaceId::TechHq,
        flag: ModuleFlag::TechHq,
        major_keywords: &["Computer Science"],
        career_keywords: &["Software Developer"],
    },
    HqRule {
        surface: SurfaceId::BusinessHq,
        flag: ModuleFlag::BusinessHq,
        major_keywords: &["Business"],
        career_keywords: &["Business Analyst", "Professor"],
    },
    HqRule {
        surface: SurfaceId::ScientificHq,
        flag: ModuleFlag::ScientificHq,
        major_keywords: &["STEM", "Physics", "Biology"],
        career_keywords: &[],
    },
    HqRule {
        surface: SurfaceId::PsychologyHq,
        flag: ModuleFlag::PsychologyHq,
        major_keywords: &["Psychology"],
        career_keywords: &["Researcher"],
    },
    HqRule {
        surface: SurfaceId::MarketingHq,
        flag: ModuleFlag::MarketingHq,
        major_keywords: &["Marketing"],
        career_keywords: &["Designer"],
    },
];

/// HQ rule for a surface, if it is an inferred surface.
pub fn hq_rule(surface: SurfaceId) -> Option<&'static HqRule> {
    HQ_RULES.iter().find(|rule| rule.surface == surface)
}

/// Direct rule for a surface, if it is a directly-flagged surface.
pub fn direct_rule(surface: SurfaceId) -> Option<&'static DirectRule> {
    DIRECT_RULES.iter().find(|rule| rule.surface == surface)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_surface_has_exactly_one_rule() {
        for surface in SurfaceId::all() {
            let rules = usize::from(hq_rule(*surface).is_some())
                + usize::from(direct_rule(*surface).is_some());
            assert_eq!(rules, 1, "{}", surface);
        }
    }

    #[test]
    fn test_matching_label_prefers_majors() {
        let mut profile = UserProfile::first_run();
        profile.selected_majors = ["Civil Engineering"].into_iter().collect();
        profile.selected_careers = ["Mechanical Engineer"].into_iter().collect();

        let rule = hq_rule(SurfaceId::EngineeringHq).unwrap();
        assert_eq!(rule.matching_label(&profile), Some("Civil Engineering"));
    }

    #[test]
    fn test_career_keyword_is_substring_match() {
        let mut profile = UserProfile::first_run();
        profile.selected_majors = Default::default();
        profile.selected_careers = ["Senior Software Developer"].into_iter().collect();

        let rule = hq_rule(SurfaceId::TechHq).unwrap();
        assert_eq!(rule.matching_label(&profile), Some("Senior Software Developer"));
    }
}
