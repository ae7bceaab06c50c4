//! Dashboard section vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;
use crate::persona::UserProfile;

/// A reorderable group of dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionId {
    Professional,
    Academic,
    Personal,
    Accessibility,
}

/// Order used when the profile has none.
pub const DEFAULT_ORDER: [SectionId; 4] = [
    SectionId::Professional,
    SectionId::Academic,
    SectionId::Personal,
    SectionId::Accessibility,
];

impl SectionId {
    pub fn all() -> &'static [SectionId] {
        &DEFAULT_ORDER
    }

    /// Id as stored in `dashboardOrder`.
    pub fn key(&self) -> &'static str {
        match self {
            SectionId::Professional => "professional",
            SectionId::Academic => "academic",
            SectionId::Personal => "personal",
            SectionId::Accessibility => "accessibility",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionId::Professional => "Professional Suite",
            SectionId::Academic => "Academic Hub",
            SectionId::Personal => "Personal Life",
            SectionId::Accessibility => "Accessibility",
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SectionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SectionId::all()
            .iter()
            .copied()
            .find(|id| id.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::UnknownSection { name: s.to_string() })
    }
}

/// Section order to render for `profile`.
///
/// Stored ids that are unknown or repeated are skipped. Sections the stored
/// order does not mention follow in default order.
pub fn effective_order(profile: &UserProfile) -> Vec<SectionId> {
    let Some(stored) = profile.dashboard_order.as_ref() else {
        return DEFAULT_ORDER.to_vec();
    };

    let mut order = Vec::with_capacity(DEFAULT_ORDER.len());
    for raw in stored {
        match raw.parse::<SectionId>() {
            Ok(id) if !order.contains(&id) => order.push(id),
            Ok(_) => {}
            Err(_) => debug!(section = %raw, "Ignoring unknown section id"),
        }
    }
    for id in DEFAULT_ORDER {
        if !order.contains(&id) {
            order.push(id);
        }
    }
    order
}

/// Encode an order for storage in the profile.
pub fn to_stored(order: &[SectionId]) -> Vec<String> {
    order.iter().map(|id| id.key().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_order(order: &[&str]) -> UserProfile {
        let mut profile = UserProfile::first_run();
        profile.dashboard_order = Some(order.iter().map(|s| s.to_string()).collect());
        profile
    }

    #[test]
    fn test_absent_order_uses_default() {
        assert_eq!(effective_order(&UserProfile::first_run()), DEFAULT_ORDER.to_vec());
    }

    #[test]
    fn test_stored_order_is_respected() {
        let profile = with_order(&["accessibility", "personal", "academic", "professional"]);
        assert_eq!(
            effective_order(&profile),
            vec![
                SectionId::Accessibility,
                SectionId::Personal,
                SectionId::Academic,
                SectionId::Professional
            ]
        );
    }

    #[test]
    fn test_unknown_and_duplicate_ids_are_ignored() {
        let profile = with_order(&["sidebar", "personal", "personal", "academic"]);
        assert_eq!(
            effective_order(&profile),
            vec![
                SectionId::Personal,
                SectionId::Academic,
                SectionId::Professional,
                SectionId::Accessibility
            ]
        );
    }

    #[test]
    fn test_section_parse() {
        assert_eq!("Academic".parse::<SectionId>().unwrap(), SectionId::Academic);
        assert!("sidebar".parse::<SectionId>().is_err());
    }
}
