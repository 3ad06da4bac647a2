//! # Event Bus Module
//!
//! Publishes what the leash engine did so that UI, rendering, and logging
//! layers can react without the engine knowing about them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use leashkit_core::event_bus::{EventCategory, EventFilter, LeashEvent, LeashEventBus};
//!
//! let bus = LeashEventBus::new();
//! let subscription = bus.subscribe(
//!     EventFilter::Categories(vec![EventCategory::Movement]),
//!     |event| {
//!         if let LeashEvent::MoveBlocked { entity, .. } = event {
//!             println!("{} hit the end of its leash", entity);
//!         }
//!     },
//! );
//!
//! bus.unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
