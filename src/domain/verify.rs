//! Integrity Verifier: read-only consistency check of the node graph.

use tracing::{debug, instrument};

use crate::domain::arena::DecisionTree;
use crate::domain::error::{DomainError, DomainResult};

/// Walk every node reachable from the sentinel and check that
///
/// - each child's parent back-reference points at the node owning it,
/// - each node has zero or two children,
/// - the sentinel has no Yes branch,
/// - the stored node count matches the number of reachable real nodes.
///
/// Returns the first violation found. Never modifies the tree.
#[instrument(level = "debug", skip(tree))]
pub fn verify(tree: &DecisionTree) -> DomainResult<()> {
    let root = tree.root();
    let sentinel = tree.get(root)?;
    if sentinel.right().is_some() {
        return Err(DomainError::Graph {
            node: "<root>".into(),
            reason: "sentinel root has a Yes branch".into(),
        });
    }

    let mut visited = 0usize;
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
        let node = tree.get(idx).map_err(|_| DomainError::Graph {
            node: "<freed>".into(),
            reason: "link points at a freed node".into(),
        })?;
        if idx != root {
            visited += 1;
            if !node.is_leaf() && !node.is_question() {
                return Err(DomainError::Graph {
                    node: node.to_string(),
                    reason: "node has exactly one child".into(),
                });
            }
        }
        for child in [node.right(), node.left()].into_iter().flatten() {
            let back = tree.node(child).and_then(|c| c.parent());
            if back != Some(idx) {
                return Err(DomainError::Graph {
                    node: tree.describe_node(child),
                    reason: format!("parent back-reference does not point at '{node}'"),
                });
            }
            if visited + stack.len() > tree.len() + 1 {
                return Err(DomainError::LostNodes {
                    expected: tree.len(),
                    found: visited + stack.len(),
                });
            }
            stack.push(child);
        }
    }

    if visited != tree.len() {
        return Err(DomainError::LostNodes {
            expected: tree.len(),
            found: visited,
        });
    }
    debug!("verified {} nodes", visited);
    Ok(())
}
