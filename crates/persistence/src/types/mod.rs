//! Descriptor types for the query layer.
//!
//! These replace the untyped `where/include/select/orderBy/take` argument
//! objects of a relational mapper with a small closed algebra:
//!
//! - [`Filter`], [`Condition`] - `where` criteria
//! - [`SortDirective`], [`SortDirection`] - `orderBy`
//! - [`FieldMask`] - closed-world `select` projection
//! - [`Include`], [`RelationArgs`] - nested relation descriptors
//! - [`UpdateData`], [`FieldUpdate`] - partial merges
//! - [`FindUniqueArgs`], [`FindManyArgs`], [`CreateArgs`], [`UpdateArgs`] -
//!   per-operation argument bundles
//!
//! # Building a query
//!
//! ```
//! use hms_persistence::types::{FindManyArgs, Filter, Include, RelationArgs, SortDirective};
//!
//! // Five most recent appointments for a doctor, with the patient attached
//! let args = FindManyArgs::new()
//!     .with_filter(Filter::eq("doctorId", "65a1f0c2e4b0a1b2c3d4e5f6"))
//!     .with_sort(SortDirective::desc("startsAt"))
//!     .with_take(5)
//!     .with_include(Include::new().with("patient", RelationArgs::new()));
//!
//! assert_eq!(args.take, Some(5));
//! ```
//!
//! The descriptor types are plain owned trees, so a descriptor can never
//! refer back to itself: recursion depth is bounded by what the caller built.

mod args;
mod filter;
mod include;
mod select;
mod sort;
mod update;

/// A document as exchanged with the store and handed to application code.
pub type Document = serde_json::Map<String, serde_json::Value>;

pub use args::{CreateArgs, FindManyArgs, FindUniqueArgs, Shape, UniqueWhere, UpdateArgs};
pub use filter::{Condition, Filter};
pub use include::{Include, RelationArgs};
pub use select::FieldMask;
pub use sort::{SortDirection, SortDirective};
pub use update::{FieldUpdate, UpdateData};
pub(crate) use update::negate;
