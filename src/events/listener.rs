use super::HubEvent;

/// Trait for observing session protocol events.
///
/// Listeners run inline on the request path, so `handle` must return quickly
/// and must not block. It cannot fail: whatever a listener does, the request
/// carries on. A panic inside `handle` is caught and logged by the hub, and
/// later listeners still run. Push slow work (alerts, network calls) onto a
/// channel or task.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use sessionhub::events::{HubEvent, Listener};
///
/// struct ExpiryCounter(AtomicU64);
///
/// impl Listener for ExpiryCounter {
///     fn handle(&self, event: &HubEvent) {
///         if let HubEvent::StoreKeyMissing { .. } = event {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait Listener: Send + Sync + 'static {
    fn handle(&self, event: &HubEvent);
}
