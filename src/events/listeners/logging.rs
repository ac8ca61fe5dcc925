use crate::events::{HubEvent, Listener};

/// Logs all session events using the `log` crate.
///
/// # Example
///
/// ```rust,ignore
/// use sessionhub::Hub;
/// use sessionhub::events::listeners::LoggingListener;
///
/// let hub = Hub::builder(store, config)
///     .listener(LoggingListener::new())
///     .build()?;
/// ```
pub struct LoggingListener {
    level: log::Level,
}

impl LoggingListener {
    /// Creates a new logging listener at INFO level.
    pub fn new() -> Self {
        Self {
            level: log::Level::Info,
        }
    }

    /// Creates a new logging listener at the specified level.
    pub fn with_level(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LoggingListener {
    fn default() -> Self {
        Self::new()
    }
}

impl Listener for LoggingListener {
    fn handle(&self, event: &HubEvent) {
        log::log!(
            target: "sessionhub::events",
            self.level,
            "event={} at=\"{}\" {}",
            event.name(),
            event.timestamp().to_rfc3339(),
            event.summary()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_logging_listener_new() {
        let listener = LoggingListener::new();
        assert_eq!(listener.level, log::Level::Info);
    }

    #[test]
    fn test_logging_listener_default() {
        let listener = LoggingListener::default();
        assert_eq!(listener.level, log::Level::Info);
    }

    #[test]
    fn test_logging_listener_with_level() {
        let listener = LoggingListener::with_level(log::Level::Warn);
        assert_eq!(listener.level, log::Level::Warn);
    }

    #[test]
    fn test_logging_listener_handle() {
        let listener = LoggingListener::new();
        let event = HubEvent::StoreKeyMissing {
            session_id: "token".to_owned(),
            store_key: "key".to_owned(),
            at: Utc::now(),
        };

        // should not panic
        listener.handle(&event);
    }
}
