//! Test infrastructure for the persistence layer.
//!
//! Provides a seeded in-memory database and small builders for the
//! hospital fixtures the integration tests share.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;
