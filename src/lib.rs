//! twentyq: a twenty-questions game backed by a learning binary decision tree.
//!
//! Layers, innermost first:
//! - [`domain`]: node arena, path resolution, text codec, integrity checks
//! - [`application`]: persistence and the interactive query engine
//! - [`infrastructure`]: I/O boundaries and service wiring
//! - [`cli`]: argument parsing and command dispatch

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
