//! Dashboard section ordering: the fixed section vocabulary, pure reorder
//! logic, the commit step, and the drag protocol that drives it.

pub mod drag;
pub mod order;
pub mod sections;

pub use drag::DragSession;
pub use order::{apply_order, commit, reorder};
pub use sections::{effective_order, SectionId, DEFAULT_ORDER};
