//! View manager capability traits.
//!
//! A view manager is push-capable, pull-capable, or both. The capability is
//! chosen when the manager is registered with the `Dispatcher`.

use eventview_core::error::DomainError;
use eventview_core::event::StoredEvent;
use eventview_core::repository::EventStore;

use crate::view_context::ViewContext;

/// Behavior shared by every view manager.
pub trait ViewManager: Send {
    /// Name used in logs and fault notifications.
    fn name(&self) -> &str;

    /// Prepares the view, dropping existing view data first when
    /// `purge_existing` is set.
    ///
    /// # Errors
    ///
    /// Any error marks the manager as stopped.
    fn initialize(
        &mut self,
        _context: &ViewContext<'_>,
        _event_store: &dyn EventStore,
        _purge_existing: bool,
    ) -> Result<(), DomainError> {
        Ok(())
    }
}

/// A view manager that is handed each committed batch directly.
pub trait PushViewManager: ViewManager {
    /// Processes `events`, ordered ascending by global sequence number.
    ///
    /// # Errors
    ///
    /// Any error marks the manager as stopped.
    fn dispatch(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        events: &[StoredEvent],
    ) -> Result<(), DomainError>;
}

/// A view manager that fetches events itself once told how far to go.
pub trait PullViewManager: ViewManager {
    /// Brings the view up to at least `global_sequence_number`. The manager
    /// tracks its own position and may read past the target.
    ///
    /// # Errors
    ///
    /// Any error marks the manager as stopped.
    fn catch_up(
        &mut self,
        context: &ViewContext<'_>,
        event_store: &dyn EventStore,
        global_sequence_number: i64,
    ) -> Result<(), DomainError>;
}

/// A view manager with both capabilities. Implemented automatically.
pub trait PushPullViewManager: PushViewManager + PullViewManager {}

impl<T: PushViewManager + PullViewManager + ?Sized> PushPullViewManager for T {}
