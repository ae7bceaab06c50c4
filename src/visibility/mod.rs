//! Visibility resolution: which dashboard surfaces exist for a profile.

pub mod resolver;
pub mod rules;
pub mod surface;

pub use resolver::{explain, resolve, resolve_value, Aides, ResolvedVisibility};
pub use rules::{DirectRule, HqRule, DIRECT_RULES, HQ_RULES};
pub use surface::SurfaceId;
