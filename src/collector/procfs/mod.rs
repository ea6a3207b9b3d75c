//! Collectors for the Linux `/proc` filesystem.
//!
//! This module provides parsers and collectors for reading system and process
//! information from the `/proc` virtual filesystem.

pub mod parser;
pub mod process;
pub mod system;
pub mod tree;

pub use parser::{ParseError, parse_proc_stat};
pub use process::{CollectError, ProcessCollector};
pub use system::SystemCollector;
pub use tree::ProcessTree;
