//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, Console)
//! but are themselves concrete structs, not traits.

pub mod query;
mod storage;

pub use query::{compare, describe, teach, Comparison, Description, PlayOutcome, QueryService};
pub use storage::StorageService;
