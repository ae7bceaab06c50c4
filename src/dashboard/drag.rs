//! Two-phase drag protocol for dashboard sections.
//!
//! Hovering only updates a transient preview. Nothing is persisted until
//! the session is dropped onto its final position.

use super::order::reorder;
use super::sections::SectionId;

/// An in-progress drag of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    dragged: SectionId,
    original: Vec<SectionId>,
    preview: Vec<SectionId>,
}

impl DragSession {
    /// Start dragging `dragged`. Returns `None` if it is not in `order`.
    pub fn begin(order: &[SectionId], dragged: SectionId) -> Option<Self> {
        if !order.contains(&dragged) {
            return None;
        }
        Some(Self {
            dragged,
            original: order.to_vec(),
            preview: order.to_vec(),
        })
    }

    pub fn dragged(&self) -> SectionId {
        self.dragged
    }

    /// Current index of the dragged section in the preview.
    pub fn dragged_index(&self) -> usize {
        self.preview
            .iter()
            .position(|id| *id == self.dragged)
            .unwrap_or_default()
    }

    /// Move the dragged section over `target_index` and return the preview.
    pub fn hover(&mut self, target_index: usize) -> &[SectionId] {
        if target_index != self.dragged_index() {
            self.preview = reorder(&self.preview, self.dragged, target_index);
        }
        &self.preview
    }

    pub fn preview(&self) -> &[SectionId] {
        &self.preview
    }

    /// Whether dropping now would change anything.
    pub fn is_dirty(&self) -> bool {
        self.preview != self.original
    }

    /// Finish the drag; the returned order is the one to commit.
    pub fn finish(self) -> Vec<SectionId> {
        self.preview
    }

    /// Abandon the drag and get the order it started from.
    pub fn cancel(self) -> Vec<SectionId> {
        self.original
    }
}
