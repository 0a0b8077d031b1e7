//! Human and diagnostic renderings of a decision tree.

use std::fmt::Write as _;

use generational_arena::Index;
use termtree::Tree;

use crate::domain::arena::{DecisionNode, DecisionTree};
use crate::domain::path::Direction;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl TreeNodeConvert for DecisionTree {
    /// Built bottom-up from a post-order walk; finished subtrees wait on a
    /// stack until their parent is reached.
    fn to_tree_string(&self) -> Tree<String> {
        let mut built: Vec<Tree<String>> = Vec::new();
        for (idx, node) in self.iter_postorder() {
            let mut subtree = Tree::new(label(self, idx, node));
            let children = usize::from(node.left().is_some()) + usize::from(node.right().is_some());
            let at = built.len().saturating_sub(children);
            for child in built.drain(at..) {
                subtree.push(child);
            }
            built.push(subtree);
        }
        built
            .pop()
            .unwrap_or_else(|| Tree::new("Empty tree".to_string()))
    }
}

fn label(tree: &DecisionTree, idx: Index, node: &DecisionNode) -> String {
    let prefix = match node.parent() {
        Some(parent) if parent != tree.root() => match tree.direction_of(parent, idx) {
            Some(Direction::No) => "no: ",
            Some(Direction::Yes) => "yes: ",
            None => "",
        },
        _ => "",
    };
    if node.is_question() {
        format!("{prefix}{}", node.as_question())
    } else {
        format!("{prefix}{node}")
    }
}

fn node_id(idx: Index) -> String {
    let (slot, generation) = idx.into_raw_parts();
    format!("node_{slot}_{generation}")
}

fn node_ref(idx: Option<Index>) -> String {
    idx.map(node_id).unwrap_or_else(|| "nil".to_string())
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '<' | '>' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Graphviz description of the full node graph, including the sentinel, each
/// node's identity and its parent/left/right identities, followed by the
/// tree's node count and last error.
pub fn to_dot(tree: &DecisionTree) -> String {
    let mut out = String::from("digraph G {\n    rankdir=TB;\n    node [shape=record];\n\n");

    let mut order = vec![tree.root()];
    order.extend(tree.iter().map(|(idx, _)| idx));

    for &idx in &order {
        if let Some(node) = tree.node(idx) {
            let _ = writeln!(
                out,
                "    {id} [label=\"value = {value}\\nself = {id}\\nparent = {parent}\\nleft = {left}\\nright = {right}\"];",
                id = node_id(idx),
                value = escape(&node.to_string()),
                parent = node_ref(node.parent()),
                left = node_ref(node.left()),
                right = node_ref(node.right()),
            );
        }
    }
    out.push('\n');

    for &idx in &order {
        if let Some(node) = tree.node(idx) {
            let edges = [
                (node.parent(), "parent"),
                (node.left(), "no"),
                (node.right(), "yes"),
            ];
            for (target, label) in edges {
                if let Some(target) = target {
                    let _ = writeln!(
                        out,
                        "    {} -> {} [label = \"{label}\"];",
                        node_id(idx),
                        node_id(target)
                    );
                }
            }
        }
    }

    let last_error = tree
        .last_error()
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string());
    let _ = writeln!(
        out,
        "\n    info [shape=note, label=\"size = {}\\nlast error = {}\"];",
        tree.len(),
        escape(&last_error)
    );
    out.push_str("}\n");
    out
}
