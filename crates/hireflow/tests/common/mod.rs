//! Shared test utilities for hireflow integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a service to an on-disk SQLite store in a temp directory
//! - `RecordBuilder` for creating application records programmatically

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
