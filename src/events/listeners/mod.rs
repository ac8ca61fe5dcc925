//! Built-in event listeners.
//!
//! Attach them with [`HubBuilder::listener`](crate::HubBuilder::listener).

mod logging;
#[cfg(feature = "tracing")]
mod tracing;

pub use logging::LoggingListener;
#[cfg(feature = "tracing")]
pub use self::tracing::TracingListener;
