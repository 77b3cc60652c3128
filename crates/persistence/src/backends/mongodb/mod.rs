//! MongoDB backend.
//!
//! Collections are named after the entities (`User`, `Appointment`, ...).
//! Documents are converted between JSON and BSON at this boundary only:
//! identifiers travel as `{"$oid": ...}` above it and as native ObjectIds
//! below it.
//!
//! String conditions (`contains`, `startsWith`, `endsWith`) become
//! anchored, escaped `$regex` queries; `mode: insensitive` adds the `i`
//! option.

mod query_builder;
mod store;

pub use store::{MongoStore, classify_error};
