//! Entity schema.
//!
//! The document store is schema-less; this module is where the layer keeps
//! what a relational schema would have declared:
//!
//! - [`Entity`] - the eleven collections
//! - [`Relation`], [`RelationKind`] - per-entity relation tables driving the resolver
//! - [`Role`], [`AppointmentStatus`], [`BillStatus`], [`OrderStatus`] - enumerated field domains
//!
//! Unique keys and create-time defaults are declared on [`Entity`] as well.

mod entity;
mod enums;
mod relations;

pub use entity::Entity;
pub use enums::{AppointmentStatus, BillStatus, OrderStatus, Role};
pub use relations::{Relation, RelationKind};
