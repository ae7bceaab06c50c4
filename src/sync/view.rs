//! A single open view of the profile.
//!
//! Each view caches the last profile it saw together with everything derived
//! from it. Mutations are read-modify-write against the store; the mutating
//! view re-derives synchronously, then tells the other views through the
//! [`ChangeBus`]. Views that miss the notification catch up on their next
//! poll (see [`super::poller`]).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::dashboard::{apply_order, effective_order, reorder, DragSession, SectionId};
use crate::error::{Error, Result};
use crate::navigation::{compose, Navigation};
use crate::persona::{LabelGroup, ModuleFlag, ProfileStore, Role, ThemeMode, UserProfile};
use crate::visibility::{resolve, ResolvedVisibility};

use super::bus::{ChangeBus, ChangeCause, ProfileChanged, ViewId};

/// SHA-256 of the serialized profile, hex encoded.
pub fn fingerprint(profile: &UserProfile) -> String {
    let bytes = serde_json::to_vec(profile).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

// ─────────────────────────────────────────────────────────────────
// Snapshot
// ─────────────────────────────────────────────────────────────────

/// Everything a view renders, derived from one profile.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub profile: UserProfile,
    pub visibility: ResolvedVisibility,
    pub order: Vec<SectionId>,
    pub navigation: Navigation,
    pub fingerprint: String,
}

impl ViewSnapshot {
    pub fn derive(profile: UserProfile) -> Self {
        let visibility = resolve(&profile);
        let order = effective_order(&profile);
        let navigation = compose(&profile, &visibility, &order);
        let fingerprint = fingerprint(&profile);
        Self {
            profile,
            visibility,
            order,
            navigation,
            fingerprint,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Profile View
// ─────────────────────────────────────────────────────────────────

/// Callback fired whenever the view adopts a new profile.
pub type ChangeListener = Box<dyn Fn(&ViewSnapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub struct ProfileView {
    id: ViewId,
    store: ProfileStore,
    bus: ChangeBus,
    state: RwLock<ViewSnapshot>,
    drag: Mutex<Option<DragSession>>,
    listeners: RwLock<Vec<(SubscriptionId, ChangeListener)>>,
    next_subscription: AtomicU64,
    refreshing: AtomicBool,
    // Held from load to adopt so a reload cannot land on top of a newer commit.
    commit: Mutex<()>,
}

/// Clears the in-flight refresh flag when dropped, even on unwind.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ProfileView {
    /// Open a view: load the profile and derive its first snapshot.
    pub fn open(store: ProfileStore, bus: ChangeBus) -> Arc<Self> {
        let snapshot = ViewSnapshot::derive(store.load());
        let id = ViewId::new();
        debug!(view = %id, fingerprint = %snapshot.fingerprint, "Opened profile view");

        Arc::new(Self {
            id,
            store,
            bus,
            state: RwLock::new(snapshot),
            drag: Mutex::new(None),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            refreshing: AtomicBool::new(false),
            commit: Mutex::new(()),
        })
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.state.read().clone()
    }

    pub fn profile(&self) -> UserProfile {
        self.state.read().profile.clone()
    }

    pub fn navigation(&self) -> Navigation {
        self.state.read().navigation.clone()
    }

    // ─────────────────────────────────────────────────────────────
    // Observers
    // ─────────────────────────────────────────────────────────────

    /// Register a callback for profile changes from any origin.
    ///
    /// Callbacks run on the thread that detected the change, while the view
    /// holds its commit lock. They must not register or remove listeners or
    /// mutate the view.
    pub fn on_profile_changed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&ViewSnapshot) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Box::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    fn notify(&self, snapshot: &ViewSnapshot) {
        for (_, listener) in self.listeners.read().iter() {
            listener(snapshot);
        }
    }

    /// Replace the cached snapshot. `None` if the fingerprint is unchanged.
    fn adopt(&self, profile: UserProfile) -> Option<ViewSnapshot> {
        let snapshot = ViewSnapshot::derive(profile);
        {
            let mut state = self.state.write();
            if state.fingerprint == snapshot.fingerprint {
                return None;
            }
            *state = snapshot.clone();
        }
        self.notify(&snapshot);
        Some(snapshot)
    }

    // ─────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────

    /// Reload from the store and adopt the result if it differs.
    ///
    /// Returns true if the view changed. A refresh that starts while another
    /// is still running is skipped.
    pub fn refresh(&self) -> bool {
        let Some(_in_flight) = InFlight::begin(&self.refreshing) else {
            debug!(view = %self.id, "Refresh already in flight; skipping");
            return false;
        };

        let changed = {
            let _commit = self.commit.lock();
            self.adopt(self.store.load()).is_some()
        };

        if changed {
            debug!(view = %self.id, "Adopted external profile change");
        }
        changed
    }

    // ─────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────

    /// Read the current record, apply `edit`, and save it back.
    ///
    /// `edit` returns whether it changed anything; if not, nothing is
    /// written or published. Returns the same flag.
    pub fn mutate<F>(&self, cause: ChangeCause, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut UserProfile) -> Result<bool>,
    {
        let _commit = self.commit.lock();
        let mut profile = self.store.load();
        if !edit(&mut profile)? {
            self.adopt(profile);
            return Ok(false);
        }

        profile.updated_at = Some(Utc::now());
        self.store.save(&profile)?;

        let fingerprint = match self.adopt(profile) {
            Some(snapshot) => snapshot.fingerprint,
            None => self.state.read().fingerprint.clone(),
        };
        info!(view = %self.id, cause = %cause, "Profile updated");

        self.bus.publish(ProfileChanged {
            origin: self.id,
            fingerprint,
            cause,
            at: Utc::now(),
        });
        Ok(true)
    }

    /// Set a visibility flag. Returns false if it already had that value.
    pub fn set_flag(&self, flag: ModuleFlag, value: bool) -> Result<bool> {
        let changed = self.mutate(ChangeCause::Flag(flag), |p| {
            let before = p.module_visibility.get(flag);
            p.module_visibility.set(flag, value);
            Ok(before != value)
        })?;
        if flag == ModuleFlag::DyslexiaMode {
            self.store.set_font_mode(value)?;
        }
        Ok(changed)
    }

    /// Flip a visibility flag and return its new value.
    pub fn toggle_flag(&self, flag: ModuleFlag) -> Result<bool> {
        let mut now = false;
        self.mutate(ChangeCause::Flag(flag), |p| {
            now = p.module_visibility.toggle(flag);
            Ok(true)
        })?;
        if flag == ModuleFlag::DyslexiaMode {
            self.store.set_font_mode(now)?;
        }
        Ok(now)
    }

    /// Add a major or career. Adding one already present is a no-op.
    pub fn add_label(&self, group: LabelGroup, label: &str) -> Result<bool> {
        let label = clean_label(group, label)?;
        self.mutate(ChangeCause::Labels(group), |p| Ok(p.labels_mut(group).insert(label)))
    }

    /// Remove a major or career. Removing one that is absent is a no-op.
    pub fn remove_label(&self, group: LabelGroup, label: &str) -> Result<bool> {
        let label = clean_label(group, label)?;
        self.mutate(ChangeCause::Labels(group), |p| Ok(p.labels_mut(group).remove(&label)))
    }

    /// Flip membership of a major or career. Returns true if now selected.
    pub fn toggle_label(&self, group: LabelGroup, label: &str) -> Result<bool> {
        let label = clean_label(group, label)?;
        let mut selected = false;
        self.mutate(ChangeCause::Labels(group), |p| {
            selected = p.labels_mut(group).toggle(&label);
            Ok(true)
        })?;
        Ok(selected)
    }

    pub fn set_subject(&self, subject: &str) -> Result<bool> {
        let subject = subject.trim().to_string();
        self.mutate(ChangeCause::Subject, |p| {
            if p.custom_subject == subject {
                return Ok(false);
            }
            p.custom_subject = subject;
            Ok(true)
        })
    }

    pub fn set_role(&self, role: Role) -> Result<bool> {
        self.mutate(ChangeCause::Role, |p| {
            let changed = p.role != role;
            p.role = role;
            Ok(changed)
        })
    }

    /// Set the theme on the profile and in its own record.
    pub fn set_theme(&self, theme: ThemeMode) -> Result<bool> {
        let changed = self.mutate(ChangeCause::Theme, |p| {
            let changed = p.theme != theme;
            p.theme = theme;
            Ok(changed)
        })?;
        self.store.set_theme(theme)?;
        Ok(changed)
    }

    /// Add a knowledge source and return its id.
    pub fn add_source(&self, title: &str, content: &str) -> Result<u64> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::invalid_input("title", "must not be empty"));
        }

        let mut id = 0;
        self.mutate(ChangeCause::Sources, |p| {
            id = p.add_source(title, content);
            Ok(true)
        })?;
        Ok(id)
    }

    pub fn remove_source(&self, id: u64) -> Result<()> {
        let removed = self.mutate(ChangeCause::Sources, |p| Ok(p.remove_source(id)))?;
        if removed {
            Ok(())
        } else {
            Err(Error::SourceNotFound { id })
        }
    }

    /// Move a section to `target_index` and persist the order.
    pub fn move_section(&self, section: SectionId, target_index: usize) -> Result<Vec<SectionId>> {
        let mut order = Vec::new();
        self.mutate(ChangeCause::Order, |p| {
            let current = effective_order(p);
            order = reorder(&current, section, target_index);
            if p.dashboard_order.is_some() && order == current {
                return Ok(false);
            }
            apply_order(p, &order);
            Ok(true)
        })?;
        Ok(order)
    }

    /// Delete the profile and start over from the first-run profile.
    pub fn reset(&self) -> Result<()> {
        let _commit = self.commit.lock();
        self.store.clear()?;
        let profile = self.store.load();
        let fingerprint = fingerprint(&profile);
        self.adopt(profile);
        self.bus.publish(ProfileChanged {
            origin: self.id,
            fingerprint,
            cause: ChangeCause::Reset,
            at: Utc::now(),
        });
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Drag and drop
    // ─────────────────────────────────────────────────────────────

    /// Start dragging a section. Replaces any unfinished drag.
    pub fn begin_drag(&self, section: SectionId) -> bool {
        let order = self.state.read().order.clone();
        let session = DragSession::begin(&order, section);
        let started = session.is_some();
        *self.drag.lock() = session;
        started
    }

    /// Hover the dragged section over `target_index`; returns the preview.
    pub fn drag_over(&self, target_index: usize) -> Option<Vec<SectionId>> {
        let mut drag = self.drag.lock();
        drag.as_mut().map(|session| session.hover(target_index).to_vec())
    }

    /// Drop the dragged section and commit the previewed order.
    ///
    /// Returns the committed order, or `None` if no drag was active or the
    /// order did not change.
    pub fn end_drag(&self) -> Result<Option<Vec<SectionId>>> {
        let Some(session) = self.drag.lock().take() else {
            return Ok(None);
        };
        if !session.is_dirty() {
            return Ok(None);
        }

        let order = session.finish();
        self.mutate(ChangeCause::Order, |p| {
            apply_order(p, &order);
            Ok(true)
        })?;
        Ok(Some(order))
    }

    pub fn cancel_drag(&self) {
        if self.drag.lock().take().is_some() {
            debug!(view = %self.id, "Drag cancelled");
        }
    }

    /// Order the dashboard should show right now, including drag preview.
    pub fn displayed_order(&self) -> Vec<SectionId> {
        if let Some(session) = self.drag.lock().as_ref() {
            return session.preview().to_vec();
        }
        self.state.read().order.clone()
    }
}

impl std::fmt::Debug for ProfileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileView")
            .field("id", &self.id)
            .field("store", &self.store)
            .finish()
    }
}

fn clean_label(group: LabelGroup, label: &str) -> Result<String> {
    let label = label.trim();
    if label.is_empty() {
        warn!(group = group.noun(), "Rejected empty label");
        return Err(Error::invalid_input(group.noun(), "must not be empty"));
    }
    Ok(label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::{MemoryRecordStore, RecordStore};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::{Duration, Instant};

    /// In-memory records whose profile reads stall once armed.
    #[derive(Default)]
    struct StallingRecords {
        inner: MemoryRecordStore,
        stall: Mutex<Duration>,
    }

    impl StallingRecords {
        fn stall_for(&self, duration: Duration) {
            *self.stall.lock() = duration;
        }
    }

    impl RecordStore for StallingRecords {
        fn read(&self, key: &str) -> Result<Option<String>> {
            let value = self.inner.read(key)?;
            if key == "user_profile" {
                let stall = *self.stall.lock();
                thread::sleep(stall);
            }
            Ok(value)
        }

        fn write(&self, key: &str, value: &str) -> Result<()> {
            self.inner.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }

        fn location(&self) -> String {
            "stalling memory".to_string()
        }
    }

    fn open_pair() -> (Arc<ProfileView>, Arc<ProfileView>) {
        let store = ProfileStore::in_memory();
        let bus = ChangeBus::default();
        (
            ProfileView::open(store.clone(), bus.clone()),
            ProfileView::open(store, bus),
        )
    }

    #[test]
    fn test_mutating_view_rederives_synchronously() {
        let (view, _) = open_pair();
        assert!(!view.snapshot().navigation.entry_ids().contains(&"techHQ"));

        view.set_flag(ModuleFlag::TechHq, true).unwrap();
        view.add_label(LabelGroup::Majors, "Computer Science").unwrap();

        assert!(view.snapshot().navigation.entry_ids().contains(&"techHQ"));
    }

    #[test]
    fn test_other_view_sees_change_after_refresh() {
        let (a, b) = open_pair();
        a.toggle_flag(ModuleFlag::LegalHq).unwrap();

        assert!(!b.profile().module_visibility.legal_hq);
        assert!(b.refresh());
        assert!(b.profile().module_visibility.legal_hq);
        assert!(!b.refresh(), "second refresh finds nothing new");
    }

    #[test]
    fn test_mutation_reads_fresh_record() {
        let (a, b) = open_pair();
        a.add_label(LabelGroup::Careers, "Lawyer").unwrap();
        // b has not refreshed, but its write must not drop a's change
        b.add_label(LabelGroup::Careers, "Designer").unwrap();

        let careers = b.profile().selected_careers;
        assert!(careers.contains("Lawyer"));
        assert!(careers.contains("Designer"));
    }

    #[test]
    fn test_label_set_noops_do_not_write() {
        let (view, _) = open_pair();
        assert!(!view.add_label(LabelGroup::Majors, "Accounting").unwrap());
        assert!(!view.remove_label(LabelGroup::Majors, "Law").unwrap());
        assert!(view.add_label(LabelGroup::Majors, " Law ").unwrap());
        assert!(view.profile().selected_majors.contains("Law"));
        assert!(view.add_label(LabelGroup::Majors, "   ").is_err());
    }

    #[test]
    fn test_listeners_fire_and_unsubscribe() {
        let (a, b) = open_pair();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = b.on_profile_changed(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        a.set_subject("Biology").unwrap();
        b.refresh();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert!(b.unsubscribe(sub));
        assert!(!b.unsubscribe(sub));
        a.set_subject("Physics").unwrap();
        b.refresh();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_in_flight_cannot_undo_own_commit() {
        let records = Arc::new(StallingRecords::default());
        let view = ProfileView::open(ProfileStore::new(records.clone()), ChangeBus::default());
        records.stall_for(Duration::from_millis(300));

        let reader = Arc::clone(&view);
        let refresh = thread::spawn(move || reader.refresh());
        thread::sleep(Duration::from_millis(50));

        view.set_flag(ModuleFlag::TechHq, true).unwrap();
        assert!(view.profile().module_visibility.tech_hq);

        refresh.join().unwrap();
        assert!(view.profile().module_visibility.tech_hq);
        assert!(view.store().load().module_visibility.tech_hq);
    }

    #[test]
    fn test_refresh_skips_while_previous_load_runs() {
        let records = Arc::new(StallingRecords::default());
        let store = ProfileStore::new(records.clone());
        let a = ProfileView::open(store.clone(), ChangeBus::default());
        let b = ProfileView::open(store, ChangeBus::default());
        a.set_flag(ModuleFlag::LegalHq, true).unwrap();
        records.stall_for(Duration::from_millis(300));

        let reader = Arc::clone(&b);
        let first = thread::spawn(move || reader.refresh());
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        assert!(!b.refresh());
        assert!(started.elapsed() < Duration::from_millis(200));

        assert!(first.join().unwrap());
        assert!(b.profile().module_visibility.legal_hq);
    }

    #[test]
    fn test_panicking_listener_does_not_stall_refresh() {
        let (a, b) = open_pair();
        let sub = b.on_profile_changed(|_| panic!("listener failed"));

        a.toggle_flag(ModuleFlag::TechHq).unwrap();
        assert!(catch_unwind(AssertUnwindSafe(|| b.refresh())).is_err());
        assert!(b.unsubscribe(sub));

        a.toggle_flag(ModuleFlag::LegalHq).unwrap();
        assert!(b.refresh());
        assert!(b.profile().module_visibility.tech_hq);
        assert!(b.profile().module_visibility.legal_hq);
    }

    #[test]
    fn test_drag_commits_only_on_drop() {
        let (a, b) = open_pair();
        assert!(a.begin_drag(SectionId::Accessibility));
        let preview = a.drag_over(0).unwrap();
        assert_eq!(preview[0], SectionId::Accessibility);
        assert_eq!(a.displayed_order()[0], SectionId::Accessibility);

        // Nothing persisted yet
        assert!(!b.refresh());
        assert_eq!(a.snapshot().order[0], SectionId::Professional);

        let committed = a.end_drag().unwrap().unwrap();
        assert_eq!(committed, preview);
        assert!(b.refresh());
        assert_eq!(b.snapshot().order, committed);
        assert_eq!(b.snapshot().navigation.section_ids()[0], SectionId::Accessibility);
    }

    #[test]
    fn test_cancelled_drag_persists_nothing() {
        let (a, _) = open_pair();
        a.begin_drag(SectionId::Personal);
        a.drag_over(0);
        a.cancel_drag();
        assert!(a.end_drag().unwrap().is_none());
        assert!(a.profile().dashboard_order.is_none());
    }

    #[test]
    fn test_move_section() {
        let (view, _) = open_pair();
        let order = view.move_section(SectionId::Professional, 3).unwrap();
        assert_eq!(order[3], SectionId::Professional);
        assert_eq!(view.snapshot().order, order);
    }

    #[test]
    fn test_remove_missing_source() {
        let (view, _) = open_pair();
        let id = view.add_source("Syllabus", "Week 1").unwrap();
        view.remove_source(id).unwrap();
        assert!(matches!(view.remove_source(id), Err(Error::SourceNotFound { .. })));
    }

    #[test]
    fn test_dyslexia_flag_mirrors_font_record() {
        let (view, _) = open_pair();
        assert!(view.toggle_flag(ModuleFlag::DyslexiaMode).unwrap());
        assert!(view.store().font_mode());
        view.set_flag(ModuleFlag::DyslexiaMode, false).unwrap();
        assert!(!view.store().font_mode());
    }

    #[test]
    fn test_reset_returns_to_first_run() {
        let (a, b) = open_pair();
        a.set_role(Role::Worker).unwrap();
        b.reset().unwrap();
        assert_eq!(b.profile().role, Role::Student);
        assert!(a.refresh());
        assert_eq!(a.profile().role, Role::Student);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let mut profile = UserProfile::first_run();
        let before = fingerprint(&profile);
        assert_eq!(before.len(), 64);
        assert_eq!(before, fingerprint(&profile));

        profile.selected_majors.insert("Law");
        assert_ne!(before, fingerprint(&profile));
    }
}
