//! Cross-view synchronization.
//!
//! Every open consumer of the profile is a [`ProfileView`]. Views converge
//! through two paths: in-process notifications on the [`ChangeBus`], and a
//! periodic fingerprint poll of the store for writers outside the process.

pub mod bus;
pub mod poller;
pub mod view;

pub use bus::{ChangeBus, ChangeCause, ProfileChanged, ViewId};
pub use poller::{SyncHandle, DEFAULT_POLL_INTERVAL};
pub use view::{fingerprint, ChangeListener, ProfileView, SubscriptionId, ViewSnapshot};
