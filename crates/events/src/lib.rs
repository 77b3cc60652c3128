//! Hospital Management System Event Fanout
//!
//! Room-based publish/subscribe used to push domain events to the sessions
//! that should see them. The persistence layer never publishes on its own:
//! calling code publishes after a mutation succeeds.
//!
//! - [`Room`] - broadcast groups: one per user, one per role, and `admin`
//! - [`EventBus`] / [`Subscription`] - the bus and a session's view of it
//! - [`rooms_for`] - which rooms a signed-in session joins
//! - [`Notifier`] - persists a Notification and publishes it
//!
//! ```
//! use hms_events::{EventBus, Room};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let bus = EventBus::new();
//! let mut session = bus.subscribe();
//! session.join(&Room::User("65a1f0c2e4b0a1b2c3d4e5f6".into()));
//!
//! let delivered = bus.publish(
//!     &Room::User("65a1f0c2e4b0a1b2c3d4e5f6".into()),
//!     "appointment:confirmed",
//!     json!({"appointmentId": "65a1f0c2e4b0a1b2c3d4e5f7"}),
//! );
//! assert_eq!(delivered, 1);
//! assert_eq!(session.recv().await.unwrap().name, "appointment:confirmed");
//! # });
//! ```

#![warn(missing_docs)]

mod bus;
mod notifier;
mod room;

pub use bus::{Event, EventBus, Subscription, DEFAULT_CAPACITY};
pub use notifier::{NOTIFICATION_EVENT, NewNotification, Notifier};
pub use room::{Room, RoomError, rooms_for};
