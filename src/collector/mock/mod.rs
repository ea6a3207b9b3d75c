//! Mock host implementations for testing.
//!
//! This module provides `MockFs`, `MockHost` and pre-built scenarios for
//! testing collectors without requiring a real Linux `/proc` or `/sys`.

mod filesystem;
mod scenarios;

pub use filesystem::{MockFs, MockHost};
pub use scenarios::{stat_line, status_with_rss};
