//! Profile store: named-record persistence for the profile and its
//! display preferences.
//!
//! Records are whole JSON documents addressed by key. The profile is only
//! ever written in full; partial-field updates are the caller's job
//! (read, modify, write back).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::migrate::migrate_str;
use super::types::{ThemeMode, UserProfile};

// ─────────────────────────────────────────────────────────────────
// Record Keys
// ─────────────────────────────────────────────────────────────────

/// Well-known record names.
///
/// Feature-module lists live under the `module.` prefix, so they can never
/// collide with these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    Profile,
    /// Copy of a record that failed to parse, kept for inspection
    CorruptProfile,
    Theme,
    FontMode,
}

impl RecordKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKey::Profile => "user_profile",
            RecordKey::CorruptProfile => "user_profile.corrupt",
            RecordKey::Theme => "app_theme",
            RecordKey::FontMode => "dyslexic_mode",
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Record Store
// ─────────────────────────────────────────────────────────────────

/// Backend holding named string records.
pub trait RecordStore: Send + Sync {
    /// Read a record. `Ok(None)` if it does not exist.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace a record. Readers see either the old or the new value.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a record. Deleting a missing record is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Where the records live, for log messages.
    fn location(&self) -> String;
}

/// One `<key>.json` file per record in a directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

/// Write `data` to `path` through a temp file in the same directory.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl RecordStore for FileRecordStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(Error::IoRead { path, source }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        atomic_write(&path, value.as_bytes()).map_err(|source| Error::IoWrite {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = value.len(), "Wrote record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(Error::IoWrite { path, source }),
        }
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Records held in process memory. Cloning the `Arc` shares the records
/// between views, the way browser tabs share local storage.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, String>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.records.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records.write().remove(key);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────
// Profile Store
// ─────────────────────────────────────────────────────────────────

/// Reads and writes the profile and preference records.
#[derive(Clone)]
pub struct ProfileStore {
    records: Arc<dyn RecordStore>,
}

impl ProfileStore {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self { records }
    }

    /// Store backed by `<dir>/<key>.json` files.
    pub fn open_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(FileRecordStore::new(dir)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRecordStore::new()))
    }

    /// Underlying record backend.
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    // ─────────────────────────────────────────────────────────────
    // Profile
    // ─────────────────────────────────────────────────────────────

    /// Load the profile. Never fails.
    ///
    /// A missing record is created from the first-run profile. A record that
    /// cannot be parsed is preserved under [`RecordKey::CorruptProfile`] and
    /// replaced. Older or partial records are migrated and written back.
    pub fn load(&self) -> UserProfile {
        let key = RecordKey::Profile.as_str();

        let raw = match self.records.read(key) {
            Ok(raw) => raw,
            Err(e) => {
                // Unreadable is not corrupt: keep the record as is.
                warn!(error = %e.format_for_log(), "Could not read profile; using first-run profile");
                return UserProfile::first_run();
            }
        };

        let Some(raw) = raw else {
            let profile = UserProfile::first_run();
            info!(location = %self.records.location(), "No profile found; creating first-run profile");
            self.persist_quietly(&profile);
            return profile;
        };

        match migrate_str(key, &raw) {
            Ok(migration) => {
                if migration.changed() {
                    info!(
                        from_version = migration.from_version,
                        repairs = migration.repairs.len(),
                        "Migrated profile record"
                    );
                    self.persist_quietly(&migration.profile);
                }
                migration.profile
            }
            Err(e) => {
                warn!(error = %e.format_for_log(), "Profile record is corrupt; replacing with first-run profile");
                if let Err(e) = self.records.write(RecordKey::CorruptProfile.as_str(), &raw) {
                    warn!(error = %e.format_for_log(), "Could not preserve corrupt profile");
                }
                let profile = UserProfile::first_run();
                self.persist_quietly(&profile);
                profile
            }
        }
    }

    /// Overwrite the profile record. Last writer wins.
    pub fn save(&self, profile: &UserProfile) -> Result<()> {
        let key = RecordKey::Profile.as_str();
        let raw = serde_json::to_string_pretty(profile).map_err(|source| Error::RecordSerialize {
            key: key.to_string(),
            source,
        })?;
        self.records.write(key, &raw)
    }

    /// Delete the profile record. The next load starts from scratch.
    pub fn clear(&self) -> Result<()> {
        self.records.remove(RecordKey::Profile.as_str())?;
        info!("Profile cleared");
        Ok(())
    }

    fn persist_quietly(&self, profile: &UserProfile) {
        if let Err(e) = self.save(profile) {
            warn!(error = %e.format_for_log(), "Could not persist profile");
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Preferences
    // ─────────────────────────────────────────────────────────────

    /// Stored theme, or the default theme if unset or unreadable.
    pub fn theme(&self) -> ThemeMode {
        self.read_pref(RecordKey::Theme).unwrap_or_default()
    }

    pub fn set_theme(&self, theme: ThemeMode) -> Result<()> {
        self.write_pref(RecordKey::Theme, &theme)
    }

    /// Whether the dyslexia-friendly font is on.
    pub fn font_mode(&self) -> bool {
        self.read_pref(RecordKey::FontMode).unwrap_or(false)
    }

    pub fn set_font_mode(&self, enabled: bool) -> Result<()> {
        self.write_pref(RecordKey::FontMode, &enabled)
    }

    fn read_pref<T: serde::de::DeserializeOwned>(&self, key: RecordKey) -> Option<T> {
        let raw = self.records.read(key.as_str()).ok().flatten()?;
        match serde_json::from_str(raw.trim()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = key.as_str(), error = %e, "Ignoring unreadable preference");
                None
            }
        }
    }

    fn write_pref<T: serde::Serialize>(&self, key: RecordKey, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value).map_err(|source| Error::RecordSerialize {
            key: key.as_str().to_string(),
            source,
        })?;
        self.records.write(key.as_str(), &raw)
    }
}

impl std::fmt::Debug for ProfileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileStore")
            .field("location", &self.records.location())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::types::{ModuleFlag, PROFILE_SCHEMA_VERSION};
    use tempfile::TempDir;

    fn file_store() -> (TempDir, ProfileStore) {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::open_dir(dir.path());
        (dir, store)
    }

    #[test]
    fn test_first_load_creates_and_persists_default() {
        let (dir, store) = file_store();
        let profile = store.load();
        assert_eq!(profile, UserProfile::first_run());
        assert!(dir.path().join("user_profile.json").exists());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = file_store();
        let mut profile = store.load();
        profile.module_visibility.set(ModuleFlag::TechHq, true);
        profile.selected_majors.insert("Computer Science");
        store.save(&profile).unwrap();

        let loaded = store.load();
        assert!(loaded.module_visibility.tech_hq);
        assert!(loaded.selected_majors.contains("Computer Science"));
    }

    #[test]
    fn test_corrupt_record_recovers_and_is_preserved() {
        let (dir, store) = file_store();
        fs::write(dir.path().join("user_profile.json"), "{\"name\": \"trunc").unwrap();

        let profile = store.load();
        assert_eq!(profile, UserProfile::first_run());

        let kept = fs::read_to_string(dir.path().join("user_profile.corrupt.json")).unwrap();
        assert!(kept.contains("trunc"));

        // The replacement was persisted, so the next load is clean.
        let raw = fs::read_to_string(dir.path().join("user_profile.json")).unwrap();
        assert!(migrate_str("user_profile", &raw).is_ok());
    }

    #[test]
    fn test_load_with_largest_source_id_keeps_sources() {
        let store = ProfileStore::in_memory();
        store
            .records()
            .write(
                "user_profile",
                r#"{"name":"A","role":"student","knowledgeSources":[{"id":18446744073709551615,"title":"t","content":"c"}]}"#,
            )
            .unwrap();

        let mut profile = store.load();
        assert_eq!(profile.name, "A");
        assert_eq!(profile.knowledge_sources.len(), 1);
        assert_ne!(profile.knowledge_sources[0].id, u64::MAX);
        assert_ne!(profile.add_source("next", "d"), profile.knowledge_sources[0].id);
    }

    #[test]
    fn test_partial_record_is_backfilled_and_written_back() {
        let store = ProfileStore::in_memory();
        store
            .records()
            .write("user_profile", r#"{"name":"Ada","role":"worker","moduleVisibility":{}}"#)
            .unwrap();

        let profile = store.load();
        assert_eq!(profile.name, "Ada");
        assert!(profile.module_visibility.career_mode);

        let raw = store.records().read("user_profile").unwrap().unwrap();
        assert!(raw.contains("engineeringHQ"));
        assert!(raw.contains(&format!("\"schemaVersion\": {}", PROFILE_SCHEMA_VERSION)));
    }

    #[test]
    fn test_clear_removes_profile_only() {
        let store = ProfileStore::in_memory();
        store.load();
        store.set_theme(ThemeMode::Indigo).unwrap();

        store.clear().unwrap();
        assert!(store.records().read("user_profile").unwrap().is_none());
        assert_eq!(store.theme(), ThemeMode::Indigo);

        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_preferences_use_separate_records() {
        let (dir, store) = file_store();
        assert_eq!(store.theme(), ThemeMode::Pink);
        assert!(!store.font_mode());

        store.set_theme(ThemeMode::Green).unwrap();
        store.set_font_mode(true).unwrap();

        assert_eq!(store.theme(), ThemeMode::Green);
        assert!(store.font_mode());
        assert_eq!(fs::read_to_string(dir.path().join("app_theme.json")).unwrap(), "\"green\"");
        assert_eq!(fs::read_to_string(dir.path().join("dyslexic_mode.json")).unwrap(), "true");
    }

    #[test]
    fn test_unreadable_preference_falls_back() {
        let store = ProfileStore::in_memory();
        store.records().write("app_theme", "\"neon\"").unwrap();
        assert_eq!(store.theme(), ThemeMode::Pink);
    }

    #[test]
    fn test_file_store_missing_record() {
        let dir = TempDir::new().unwrap();
        let records = FileRecordStore::new(dir.path().join("nested"));
        assert!(records.read("anything").unwrap().is_none());
        records.remove("anything").unwrap();
        records.write("anything", "1").unwrap();
        assert_eq!(records.read("anything").unwrap().as_deref(), Some("1"));
    }
}
