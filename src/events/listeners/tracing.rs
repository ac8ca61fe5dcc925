use crate::events::{HubEvent, Listener};

/// Emits session events as tracing events.
///
/// Requires the `tracing` feature to be enabled.
///
/// # Example
///
/// ```rust,ignore
/// use sessionhub::Hub;
/// use sessionhub::events::listeners::TracingListener;
///
/// let hub = Hub::builder(store, config)
///     .listener(TracingListener)
///     .build()?;
/// ```
pub struct TracingListener;

impl Listener for TracingListener {
    fn handle(&self, event: &HubEvent) {
        match event {
            HubEvent::TokenRejected { .. } => tracing::warn!(
                target: "sessionhub::events",
                event_name = event.name(),
                detail = %event.summary(),
                "session event"
            ),
            _ => tracing::info!(
                target: "sessionhub::events",
                event_name = event.name(),
                detail = %event.summary(),
                "session event"
            ),
        }
    }
}
