//! Pure reordering plus the commit step that writes an order back.

use tracing::info;

use crate::error::Result;
use crate::persona::{ProfileStore, UserProfile};

use super::sections::{to_stored, SectionId};

/// Move `moved` so that it lands at `target_index`.
///
/// The index is clamped to the end of the list. If `moved` is not in
/// `current` the list is returned unchanged. Never drops or duplicates ids.
pub fn reorder(current: &[SectionId], moved: SectionId, target_index: usize) -> Vec<SectionId> {
    let mut order = current.to_vec();
    let Some(from) = order.iter().position(|id| *id == moved) else {
        return order;
    };

    let id = order.remove(from);
    let to = target_index.min(order.len());
    order.insert(to, id);
    order
}

/// Write `order` into `profile` without saving.
pub fn apply_order(profile: &mut UserProfile, order: &[SectionId]) {
    profile.dashboard_order = Some(to_stored(order));
}

/// Merge `new_order` into `profile` and save the whole record.
pub fn commit(
    store: &ProfileStore,
    profile: &UserProfile,
    new_order: &[SectionId],
) -> Result<UserProfile> {
    let mut updated = profile.clone();
    apply_order(&mut updated, new_order);
    store.save(&updated)?;
    info!(order = ?new_order, "Committed dashboard order");
    Ok(updated)
}
