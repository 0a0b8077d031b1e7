//! Domain layer: the decision tree and its algorithms
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod codec;
pub mod error;
pub mod path;
pub mod render;
pub mod verify;

pub use arena::{DecisionNode, DecisionTree, DEFAULT_MAX_VALUE_LEN};
pub use error::{DomainError, DomainResult};
pub use path::{resolve_path, DecisionPath, Direction, Step};
pub use render::{to_dot, TreeNodeConvert};
pub use verify::verify;
