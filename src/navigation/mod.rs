//! Navigation composition for sidebar and dashboard.

pub mod composer;

pub use composer::{
    always_on, catalog, compose, section_surfaces, DashboardSection, NavEntry, Navigation,
};
