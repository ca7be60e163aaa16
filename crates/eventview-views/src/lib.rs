//! Eventview Views: delivery of committed events to view managers.
//!
//! The `Dispatcher` hands every committed batch to the registered view
//! managers, pushing the batch to push managers and telling pull managers how
//! far to catch up. Handlers that need aggregate state load it through the
//! batch's `ViewContext`, which returns read-only `FrozenAggregate`s.

pub mod dispatcher;
pub mod error;
pub mod frozen;
pub mod view_context;
pub mod view_manager;

pub use dispatcher::{Capability, Dispatcher, Operation, ViewFault, ViewManagerId, ViewManagerStatus};
pub use error::ViewManagerError;
pub use frozen::FrozenAggregate;
pub use view_context::ViewContext;
pub use view_manager::{PullViewManager, PushPullViewManager, PushViewManager, ViewManager};
