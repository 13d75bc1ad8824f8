//! Generic utility primitives with zero domain knowledge.
//!
//! - `files` - Glob matching with escaped base directories
//! - `shell` - Shell quoting and argument-string splitting

pub mod files;
pub mod shell;
