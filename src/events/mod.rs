//! Monitoring hooks for the session protocol.
//!
//! Listeners are attached to a hub when it is built. If none are attached,
//! events are silently ignored.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sessionhub::Hub;
//! use sessionhub::events::listeners::LoggingListener;
//!
//! let hub = Hub::builder(store, config)
//!     .listener(LoggingListener::new())
//!     .build()?;
//! ```
//!
//! # Custom Listeners
//!
//! Implement the [`Listener`] trait to react to specific events, e.g. to
//! alert when forged tokens show up:
//!
//! ```rust,ignore
//! use sessionhub::events::{HubEvent, Listener};
//!
//! struct TamperAlert;
//!
//! impl Listener for TamperAlert {
//!     fn handle(&self, event: &HubEvent) {
//!         if let HubEvent::TokenRejected { reason, .. } = event {
//!             // queue an alert
//!         }
//!     }
//! }
//! ```

mod event;
mod listener;

pub mod listeners;

pub use event::HubEvent;
pub(crate) use event::prefix;
pub use listener::Listener;
