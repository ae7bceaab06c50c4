//! Schema migration and backfill for stored profile records.
//!
//! Every load goes through here: the raw JSON is repaired in place
//! (non-boolean flags dropped, legacy keys renamed, knowledge source ids
//! normalized) and then deserialized into the current [`UserProfile`].

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

use super::types::{free_source_id, ModuleFlag, Role, ThemeMode, UserProfile, PROFILE_SCHEMA_VERSION};

/// Top-level keys a stored record must carry to be trusted.
const REQUIRED_FIELDS: &[&str] = &["name", "role"];

/// Result of migrating one stored record.
#[derive(Debug, Clone)]
pub struct Migration {
    pub profile: UserProfile,
    /// Schema version found in the stored record (0 if absent)
    pub from_version: u32,
    /// Human-readable notes about each repair applied
    pub repairs: Vec<String>,
}

impl Migration {
    /// Whether the stored record differs from what should be written back.
    pub fn changed(&self) -> bool {
        self.from_version != PROFILE_SCHEMA_VERSION || !self.repairs.is_empty()
    }
}

/// Parse and migrate a stored record.
pub fn migrate_str(key: &str, raw: &str) -> Result<Migration> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| Error::record_corrupt(key, e.to_string()))?;
    migrate_value(key, value)
}

/// Migrate an already-parsed record. Fails only if the record is not an
/// object, lacks a required field, or cannot be read after repair.
pub fn migrate_value(key: &str, value: Value) -> Result<Migration> {
    let Value::Object(mut obj) = value else {
        return Err(Error::record_corrupt(key, "record is not a JSON object"));
    };

    for field in REQUIRED_FIELDS {
        if !obj.contains_key(*field) {
            return Err(Error::record_corrupt(key, format!("missing required field '{}'", field)));
        }
    }

    let from_version = obj
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(0);
    if from_version > PROFILE_SCHEMA_VERSION {
        warn!(
            key,
            stored = from_version,
            supported = PROFILE_SCHEMA_VERSION,
            "Profile was written by a newer build; unknown fields will be dropped"
        );
    }

    let mut repairs = Vec::new();
    rename_legacy_keys(&mut obj, &mut repairs);
    repair_identity(&mut obj, &mut repairs);
    repair_visibility(&mut obj, &mut repairs);
    repair_label_list(&mut obj, "selectedMajors", &mut repairs);
    repair_label_list(&mut obj, "selectedCareers", &mut repairs);
    repair_sources(&mut obj, &mut repairs);
    repair_order(&mut obj, &mut repairs);
    obj.insert("schemaVersion".into(), Value::from(PROFILE_SCHEMA_VERSION));

    let profile: UserProfile = serde_json::from_value(Value::Object(obj))
        .map_err(|e| Error::record_corrupt(key, e.to_string()))?;

    for note in &repairs {
        debug!(key, repair = %note, "Repaired profile record");
    }

    Ok(Migration {
        profile,
        from_version,
        repairs,
    })
}

/// Read a possibly partial record without requiring identity fields.
///
/// Anything unusable is replaced by a blank profile with default flags.
pub fn lenient_profile(value: &Value) -> UserProfile {
    let mut value = value.clone();
    if let Value::Object(obj) = &mut value {
        obj.entry("name").or_insert_with(|| Value::from(""));
        obj.entry("role").or_insert_with(|| Value::from(Role::Student.slug()));
    }

    match migrate_value("inline", value) {
        Ok(migration) => migration.profile,
        Err(e) => {
            debug!(error = %e, "Falling back to blank profile");
            UserProfile {
                schema_version: PROFILE_SCHEMA_VERSION,
                ..UserProfile::default()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Repair steps
// ─────────────────────────────────────────────────────────────────

fn rename_legacy_keys(obj: &mut Map<String, Value>, repairs: &mut Vec<String>) {
    for (legacy, current) in [
        ("customTASubject", "customSubject"),
        ("taKnowledgeBase", "knowledgeSources"),
    ] {
        if let Some(value) = obj.remove(legacy) {
            if !obj.contains_key(current) {
                obj.insert(current.to_string(), value);
            }
            repairs.push(format!("renamed '{}' to '{}'", legacy, current));
        }
    }
}

fn repair_identity(obj: &mut Map<String, Value>, repairs: &mut Vec<String>) {
    if !obj.get("name").map(Value::is_string).unwrap_or(false) {
        obj.insert("name".into(), Value::from(""));
        repairs.push("replaced non-string name".to_string());
    }

    let role_ok = obj
        .get("role")
        .and_then(Value::as_str)
        .map(|r| r.parse::<Role>().is_ok())
        .unwrap_or(false);
    if !role_ok {
        obj.insert("role".into(), Value::from(Role::default().slug()));
        repairs.push("reset unknown role to student".to_string());
    }

    if let Some(theme) = obj.get("theme") {
        let theme_ok = theme
            .as_str()
            .map(|t| t.parse::<ThemeMode>().is_ok())
            .unwrap_or(false);
        if !theme_ok {
            obj.remove("theme");
            repairs.push("dropped unknown theme".to_string());
        }
    }

    for key in ["email", "picture", "field", "customSubject"] {
        if obj.get(key).map(|v| !v.is_string()).unwrap_or(false) {
            obj.remove(key);
            repairs.push(format!("dropped non-string '{}'", key));
        }
    }
}

fn repair_visibility(obj: &mut Map<String, Value>, repairs: &mut Vec<String>) {
    if !matches!(obj.get("moduleVisibility"), Some(Value::Object(_))) {
        obj.insert("moduleVisibility".into(), Value::Object(Map::new()));
        repairs.push("backfilled moduleVisibility".to_string());
        return;
    }
    let Some(Value::Object(flags)) = obj.get_mut("moduleVisibility") else {
        return;
    };

    let mut missing = 0usize;
    for flag in ModuleFlag::all() {
        match flags.get(flag.key()).map(Value::is_boolean) {
            Some(true) => {}
            Some(false) => {
                flags.remove(flag.key());
                repairs.push(format!("dropped non-boolean flag '{}'", flag.key()));
            }
            None => missing += 1,
        }
    }

    if missing > 0 {
        repairs.push(format!("backfilled {} missing flag(s)", missing));
    }
}

fn repair_label_list(obj: &mut Map<String, Value>, key: &str, repairs: &mut Vec<String>) {
    let items = match obj.get(key).cloned() {
        None => return,
        Some(Value::Array(items)) => items,
        Some(_) => {
            obj.remove(key);
            repairs.push(format!("dropped non-list '{}'", key));
            return;
        }
    };

    let labels: Vec<Value> = items.iter().filter(|v| v.is_string()).cloned().collect();
    if labels.len() != items.len() {
        repairs.push(format!("dropped non-string entries from '{}'", key));
        obj.insert(key.to_string(), Value::Array(labels));
    }
}

/// Normalize knowledge source ids to unique integers and make sure the id
/// counter sits above every id in use.
fn repair_sources(obj: &mut Map<String, Value>, repairs: &mut Vec<String>) {
    let mut sources = match obj.remove("knowledgeSources") {
        Some(Value::Array(items)) => items,
        Some(_) => {
            repairs.push("dropped non-list 'knowledgeSources'".to_string());
            Vec::new()
        }
        None => Vec::new(),
    };

    sources.retain(|s| {
        s.get("title").is_some_and(Value::is_string) && s.get("content").is_some_and(Value::is_string)
    });

    let mut seen = std::collections::BTreeSet::new();
    let mut pending = Vec::new();
    for (index, source) in sources.iter_mut().enumerate() {
        let id = match source.get("id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        match id {
            Some(id) if id < u64::MAX && seen.insert(id) => {
                source["id"] = Value::from(id);
            }
            _ => pending.push(index),
        }
    }

    let stored_next = obj.get("nextSourceId").and_then(Value::as_u64).unwrap_or(0);
    let mut next = seen.iter().next_back().map_or(1, |max| max + 1).max(stored_next).max(1);

    if !pending.is_empty() {
        repairs.push(format!("assigned ids to {} knowledge source(s)", pending.len()));
    }
    for index in pending {
        let id = free_source_id(&seen, next);
        seen.insert(id);
        sources[index]["id"] = Value::from(id);
        next = next.max(id.saturating_add(1));
    }

    if stored_next != next {
        obj.insert("nextSourceId".into(), Value::from(next));
        if stored_next != 0 {
            repairs.push("advanced nextSourceId".to_string());
        }
    }
    obj.insert("knowledgeSources".into(), Value::Array(sources));
}

fn repair_order(obj: &mut Map<String, Value>, repairs: &mut Vec<String>) {
    let valid = match obj.get("dashboardOrder") {
        None | Some(Value::Null) => return,
        Some(Value::Array(items)) => items.iter().all(Value::is_string),
        Some(_) => false,
    };
    if !valid {
        obj.remove("dashboardOrder");
        repairs.push("dropped malformed dashboardOrder".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_current_record_needs_no_repair() {
        let raw = serde_json::to_string(&UserProfile::first_run()).unwrap();
        let migration = migrate_str("user_profile", &raw).unwrap();
        assert!(!migration.changed(), "repairs: {:?}", migration.repairs);
        assert_eq!(migration.profile.name, "Nexus User");
    }

    #[test]
    fn test_unparseable_json_is_corrupt() {
        let err = migrate_str("user_profile", "{not json").unwrap_err();
        assert!(matches!(err, Error::RecordCorrupt { .. }));
    }

    #[test]
    fn test_non_object_is_corrupt() {
        assert!(migrate_value("user_profile", json!([1, 2, 3])).is_err());
        assert!(migrate_value("user_profile", json!("profile")).is_err());
    }

    #[test]
    fn test_missing_required_field_is_corrupt() {
        let err = migrate_value("user_profile", json!({"name": "A"})).unwrap_err();
        assert!(err.to_string().contains("role"));
    }

    #[test]
    fn test_empty_visibility_backfills_defaults() {
        let migration = migrate_value(
            "user_profile",
            json!({"name": "A", "role": "student", "moduleVisibility": {}}),
        )
        .unwrap();
        let vis = &migration.profile.module_visibility;
        for flag in ModuleFlag::all() {
            assert_eq!(vis.get(*flag), flag.backfill_default(), "{}", flag);
        }
        assert!(migration.changed());
    }

    #[test]
    fn test_non_boolean_flag_treated_as_missing() {
        let migration = migrate_value(
            "user_profile",
            json!({"name": "A", "role": "student",
                   "moduleVisibility": {"studentMode": "yes", "techHQ": 1, "legalHQ": true}}),
        )
        .unwrap();
        let vis = &migration.profile.module_visibility;
        assert!(vis.student_mode, "string flag falls back to default-on");
        assert!(!vis.tech_hq, "number flag falls back to default-off");
        assert!(vis.legal_hq);
    }

    #[test]
    fn test_v0_record_is_upgraded() {
        let migration = migrate_value(
            "user_profile",
            json!({
                "name": "Sam",
                "role": "worker",
                "theme": "neon",
                "customTASubject": "Biology",
                "taKnowledgeBase": [
                    {"id": "1712000000000", "title": "Syllabus", "content": "Week 1"},
                    {"id": "oops", "title": "Rubric", "content": "A-F"}
                ]
            }),
        )
        .unwrap();

        assert_eq!(migration.from_version, 0);
        let profile = migration.profile;
        assert_eq!(profile.schema_version, PROFILE_SCHEMA_VERSION);
        assert_eq!(profile.custom_subject, "Biology");
        assert_eq!(profile.theme, ThemeMode::default());
        assert_eq!(profile.knowledge_sources[0].id, 1_712_000_000_000);
        assert_eq!(profile.knowledge_sources[1].id, 1_712_000_000_001);
        assert_eq!(profile.next_source_id, 1_712_000_000_002);
    }

    #[test]
    fn test_duplicate_source_ids_are_reassigned() {
        let migration = migrate_value(
            "user_profile",
            json!({"name": "A", "role": "student", "knowledgeSources": [
                {"id": 3, "title": "a", "content": "x"},
                {"id": 3, "title": "b", "content": "y"}
            ]}),
        )
        .unwrap();
        let ids: Vec<u64> = migration.profile.knowledge_sources.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(migration.profile.next_source_id, 5);
    }

    #[test]
    fn test_source_id_at_the_top_of_the_range_is_reassigned() {
        let migration = migrate_value(
            "user_profile",
            json!({"name": "A", "role": "student", "knowledgeSources": [
                {"id": 18446744073709551615u64, "title": "a", "content": "x"},
                {"id": 2, "title": "b", "content": "y"}
            ]}),
        )
        .unwrap();
        let ids: Vec<u64> = migration.profile.knowledge_sources.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2]);
        assert_eq!(migration.profile.next_source_id, 4);
    }

    #[test]
    fn test_malformed_order_is_dropped() {
        let migration = migrate_value(
            "user_profile",
            json!({"name": "A", "role": "student", "dashboardOrder": [1, "academic"]}),
        )
        .unwrap();
        assert!(migration.profile.dashboard_order.is_none());
    }

    #[test]
    fn test_lenient_profile_accepts_partial_record() {
        let profile = lenient_profile(&json!({
            "selectedCareers": ["Accountant"],
            "moduleVisibility": {"accounting": true}
        }));
        assert!(profile.selected_careers.contains("Accountant"));
        assert!(profile.module_visibility.accounting);
        assert!(profile.module_visibility.student_mode);
    }

    #[test]
    fn test_lenient_profile_never_fails() {
        let profile = lenient_profile(&json!(42));
        assert_eq!(profile.module_visibility, Default::default());
    }
}
