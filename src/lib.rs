//! Nexus Hub
//!
//! The persona engine behind the Nexus assistant dashboard. A single stored
//! profile decides which modules are visible, which navigation entries
//! appear and how dashboard sections are ordered; every open view of that
//! profile converges on the same answer.

pub mod assistant;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod persona;
pub mod sync;
pub mod version;
pub mod visibility;

pub use error::{Error, ErrorCode, Result};
