//! File System Implementations
//!
//! Concrete implementations of the FileHost port plus the virtual output store.

mod local;
mod overlay;
mod virtual_store;

pub use local::LocalFileHost;
pub use overlay::OverlayFileHost;
pub use virtual_store::{StoreListener, SubscriptionId, VirtualOutputStore, VIRTUAL_ROOT_PREFIX};
