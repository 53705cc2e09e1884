//! Shared test utilities for homer-aggregator integration tests.
//!
//! Builders for foundation trees, discovered resources and reconcilers so
//! each test only spells out what it asserts on.

pub mod builders;

pub use builders::*;
