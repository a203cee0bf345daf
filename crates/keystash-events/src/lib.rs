//! Keystash Events - notifications emitted by the keystash storage layer.
//!
//! This crate provides:
//! - Event types for storage lifecycle notifications
//! - A broadcast-based event bus for async subscribers
//!
//! The most important event is [`StashEvent::PersistenceUnavailable`]: it is
//! published once when the native storage medium cannot be opened and the
//! adapter falls back to an in-memory substitute. Nothing fails because of
//! the fallback, so subscribing is the only way to learn about it.
//!
//! # Example
//!
//! ```rust
//! use keystash_events::{EventBus, EventMetadata, StashEvent};
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! let mut receiver = bus.subscribe();
//!
//! bus.publish(StashEvent::PersistenceUnavailable {
//!     metadata: EventMetadata::new("storage"),
//!     reason: Some("disk is read-only".to_string()),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.event_type(), "persistence_unavailable");
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{EventMetadata, StashEvent};
