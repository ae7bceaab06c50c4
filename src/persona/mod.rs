//! Persona system: the persisted user profile, its schema migrations, and
//! the record store it lives in.
//!
//! The profile decides which parts of the dashboard exist. It is stored as
//! a single record and always written whole.

pub mod migrate;
pub mod store;
pub mod types;

pub use migrate::{lenient_profile, migrate_str, migrate_value, Migration};
pub use store::{FileRecordStore, MemoryRecordStore, ProfileStore, RecordKey, RecordStore};
pub use types::{
    KnowledgeSource, LabelGroup, LabelSet, LinkedApps, ModuleFlag, ModuleVisibility, Role,
    ThemeMode, UserProfile, CAREER_OPTIONS, MAJOR_OPTIONS, PROFILE_SCHEMA_VERSION,
};
