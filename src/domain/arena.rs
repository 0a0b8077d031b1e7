//! Node Store and Tree Container for the decision tree.
//!
//! Nodes live in a generational arena. Child links are exclusive (each node is
//! referenced by at most one parent slot) and the parent back-reference is a
//! plain arena index, so lookups in both directions are O(1) without aliasing.

use std::fmt;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path::Direction;

/// Longest value (in characters) a node may carry unless configured otherwise.
pub const DEFAULT_MAX_VALUE_LEN: usize = 256;

/// Token the persistent format uses for an absent child; never a valid value.
pub const NIL_TOKEN: &str = "nil";

/// A single question or answer in the decision tree.
///
/// Question nodes have both children, leaf (answer) nodes have none.
/// The kind is derived from the links, it is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionNode {
    /// Question text or subject name, None only for the sentinel root
    value: Option<String>,
    /// Index of the parent node in the arena, None when detached or for the sentinel
    parent: Option<Index>,
    /// "No" branch
    left: Option<Index>,
    /// "Yes" branch
    right: Option<Index>,
}

impl DecisionNode {
    fn new(value: Option<String>) -> Self {
        Self {
            value,
            parent: None,
            left: None,
            right: None,
        }
    }

    /// Node text, empty for the sentinel root.
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }

    pub fn parent(&self) -> Option<Index> {
        self.parent
    }

    pub fn left(&self) -> Option<Index> {
        self.left
    }

    pub fn right(&self) -> Option<Index> {
        self.right
    }

    pub fn child(&self, direction: Direction) -> Option<Index> {
        match direction {
            Direction::No => self.left,
            Direction::Yes => self.right,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn is_question(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }

    /// Node text as it is asked, with a single trailing `?`.
    pub fn as_question(&self) -> String {
        let value = self.value();
        if value.ends_with('?') {
            value.to_string()
        } else {
            format!("{value}?")
        }
    }

    fn slot_mut(&mut self, direction: Direction) -> &mut Option<Index> {
        match direction {
            Direction::No => &mut self.left,
            Direction::Yes => &mut self.right,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_parent(&mut self, parent: Option<Index>) {
        self.parent = parent;
    }
}

impl fmt::Display for DecisionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{v}"),
            None => write!(f, "<root>"),
        }
    }
}

/// Arena-backed decision tree with a sentinel root.
///
/// The sentinel's left child is the first real question or answer; its right
/// child is always absent. `len()` counts the real (non-sentinel) nodes.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    arena: Arena<DecisionNode>,
    root: Index,
    size: usize,
    last_error: Option<DomainError>,
    max_value_len: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self::with_max_value_len(DEFAULT_MAX_VALUE_LEN)
    }

    pub fn with_max_value_len(max_value_len: usize) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(DecisionNode::new(None));
        Self {
            arena,
            root,
            size: 0,
            last_error: None,
            max_value_len,
        }
    }

    /// Build a knowledge base holding a single subject.
    pub fn with_subject(subject: &str, max_value_len: usize) -> DomainResult<Self> {
        let mut tree = Self::with_max_value_len(max_value_len);
        let first = tree.create_node(subject)?;
        tree.link(tree.root, Direction::No, Some(first))?;
        Ok(tree)
    }

    pub fn root(&self) -> Index {
        self.root
    }

    /// First real node of the knowledge base.
    pub fn first(&self) -> Option<Index> {
        self.arena.get(self.root).and_then(|n| n.left)
    }

    pub fn node(&self, idx: Index) -> Option<&DecisionNode> {
        self.arena.get(idx)
    }

    #[cfg(test)]
    pub(crate) fn node_mut(&mut self, idx: Index) -> Option<&mut DecisionNode> {
        self.arena.get_mut(idx)
    }

    pub fn get(&self, idx: Index) -> DomainResult<&DecisionNode> {
        self.arena.get(idx).ok_or(DomainError::UnknownNode)
    }

    pub fn value(&self, idx: Index) -> DomainResult<&str> {
        self.get(idx).map(DecisionNode::value)
    }

    pub fn is_leaf(&self, idx: Index) -> DomainResult<bool> {
        self.get(idx).map(DecisionNode::is_leaf)
    }

    /// Number of real nodes owned by the tree.
    pub fn len(&self) -> usize {
        self.size
    }

    /// True when the sentinel has no knowledge base below it.
    pub fn is_empty(&self) -> bool {
        self.first().is_none()
    }

    pub fn max_value_len(&self) -> usize {
        self.max_value_len
    }

    pub fn last_error(&self) -> Option<&DomainError> {
        self.last_error.as_ref()
    }

    /// Store `err` in the last-error slot and hand it back for propagation.
    pub fn record(&mut self, err: DomainError) -> DomainError {
        debug!("tree error recorded: {}", err);
        self.last_error = Some(err.clone());
        err
    }

    /// Check a candidate value and return it in the form it will be stored.
    pub fn validate_value(&self, value: &str) -> DomainResult<String> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DomainError::NodeAlloc("value is empty".into()));
        }
        if value == NIL_TOKEN {
            return Err(DomainError::NodeAlloc(format!(
                "'{NIL_TOKEN}' is reserved"
            )));
        }
        if value.contains(['{', '}', '\n', '\r']) {
            return Err(DomainError::NodeAlloc(format!(
                "value may not contain braces or line breaks: {value:?}"
            )));
        }
        let len = value.chars().count();
        if len > self.max_value_len {
            return Err(DomainError::NodeAlloc(format!(
                "value has {len} characters, limit is {}",
                self.max_value_len
            )));
        }
        Ok(value.to_string())
    }

    /// Allocate a detached node. It counts towards `len()` immediately and
    /// must be linked (or destroyed) by the caller.
    #[instrument(level = "trace", skip(self))]
    pub fn create_node(&mut self, value: &str) -> DomainResult<Index> {
        let value = match self.validate_value(value) {
            Ok(v) => v,
            Err(e) => return Err(self.record(e)),
        };
        let idx = self.arena.insert(DecisionNode::new(Some(value)));
        self.size += 1;
        Ok(idx)
    }

    /// Install `child` in the `direction` slot of `parent`.
    ///
    /// The previous occupant of the slot is detached (its parent cleared), and
    /// `child` is first unhooked from any slot that still owns it, so a node
    /// is never owned twice.
    #[instrument(level = "trace", skip(self))]
    pub fn link(
        &mut self,
        parent: Index,
        direction: Direction,
        child: Option<Index>,
    ) -> DomainResult<()> {
        if !self.arena.contains(parent) || child.is_some_and(|c| !self.arena.contains(c)) {
            return Err(self.record(DomainError::UnknownNode));
        }
        if parent == self.root && direction == Direction::Yes && child.is_some() {
            return Err(self.record(DomainError::Graph {
                node: "<root>".into(),
                reason: "sentinel root has no Yes branch".into(),
            }));
        }
        if child == Some(self.root) {
            return Err(self.record(DomainError::Graph {
                node: "<root>".into(),
                reason: "sentinel root cannot be linked as a child".into(),
            }));
        }
        if child == Some(parent) {
            return Err(self.record(DomainError::Graph {
                node: self.describe_node(parent),
                reason: "node cannot be its own child".into(),
            }));
        }

        if let Some(c) = child {
            self.unhook(c);
        }

        let previous = self
            .arena
            .get_mut(parent)
            .and_then(|p| std::mem::replace(p.slot_mut(direction), child));
        if let Some(old) = previous {
            if let Some(node) = self.arena.get_mut(old) {
                node.parent = None;
            }
        }
        if let Some(c) = child {
            if let Some(node) = self.arena.get_mut(c) {
                node.parent = Some(parent);
            }
        }
        Ok(())
    }

    pub fn link_left(&mut self, parent: Index, child: Option<Index>) -> DomainResult<()> {
        self.link(parent, Direction::No, child)
    }

    pub fn link_right(&mut self, parent: Index, child: Option<Index>) -> DomainResult<()> {
        self.link(parent, Direction::Yes, child)
    }

    /// Clear whichever slot of `child`'s parent still points at it.
    fn unhook(&mut self, child: Index) {
        let Some(parent) = self.arena.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.arena.get_mut(parent) {
            if p.left == Some(child) {
                p.left = None;
            } else if p.right == Some(child) {
                p.right = None;
            }
        }
        if let Some(c) = self.arena.get_mut(child) {
            c.parent = None;
        }
    }

    /// Direction through which `parent` owns `child`, if it does.
    pub fn direction_of(&self, parent: Index, child: Index) -> Option<Direction> {
        let p = self.arena.get(parent)?;
        if p.left == Some(child) {
            Some(Direction::No)
        } else if p.right == Some(child) {
            Some(Direction::Yes)
        } else {
            None
        }
    }

    /// Free `idx` and everything below it, post-order. Returns the number of
    /// nodes removed. The sentinel root cannot be destroyed this way, use
    /// [`DecisionTree::clear`].
    #[instrument(level = "debug", skip(self))]
    pub fn destroy_subtree(&mut self, idx: Index) -> DomainResult<usize> {
        if idx == self.root {
            return Err(self.record(DomainError::Graph {
                node: "<root>".into(),
                reason: "sentinel root is destroyed only with the tree".into(),
            }));
        }
        if !self.arena.contains(idx) {
            return Err(self.record(DomainError::UnknownNode));
        }
        self.unhook(idx);

        let doomed: Vec<Index> = PostOrderIterator::new(self, Some(idx))
            .map(|(i, _)| i)
            .collect();
        for i in &doomed {
            self.arena.remove(*i);
        }
        self.size = self.size.saturating_sub(doomed.len());
        debug!("destroyed {} nodes", doomed.len());
        Ok(doomed.len())
    }

    /// Destroy every node and reinitialise the sentinel.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) {
        let max_value_len = self.max_value_len;
        *self = Self::with_max_value_len(max_value_len);
    }

    /// Pre-order traversal of the real nodes (node, then No, then Yes).
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.first())
    }

    /// Post-order traversal of the real nodes (No, then Yes, then node).
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, self.first())
    }

    /// Leaf indices in left-to-right order.
    pub fn leaves(&self) -> Vec<Index> {
        self.iter()
            .filter(|(_, n)| n.is_leaf())
            .map(|(i, _)| i)
            .collect()
    }

    /// Subject names in left-to-right order.
    pub fn subjects(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, n)| n.is_leaf())
            .map(|(_, n)| n.value())
            .collect()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let Some(first) = self.first() else {
            return 0;
        };
        let mut max = 0;
        let mut stack = vec![(first, 1usize)];
        while let Some((idx, level)) = stack.pop() {
            max = max.max(level);
            if let Some(node) = self.arena.get(idx) {
                stack.extend(node.left.map(|c| (c, level + 1)));
                stack.extend(node.right.map(|c| (c, level + 1)));
            }
        }
        max
    }

    /// Short human label for diagnostics.
    pub fn describe_node(&self, idx: Index) -> String {
        match self.arena.get(idx) {
            Some(node) => node.to_string(),
            None => "<freed>".to_string(),
        }
    }
}

pub struct TreeIterator<'a> {
    tree: &'a DecisionTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a DecisionTree, start: Option<Index>) -> Self {
        Self {
            tree,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a DecisionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                // Yes pushed first so No is visited first
                self.stack.extend(node.right);
                self.stack.extend(node.left);
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a DecisionTree,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a DecisionTree, start: Option<Index>) -> Self {
        Self {
            tree,
            stack: start.map(|s| (s, false)).into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a DecisionNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                self.stack.extend(node.right.map(|c| (c, false)));
                self.stack.extend(node.left.map(|c| (c, false)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whiskers_tree() -> (DecisionTree, Index, Index, Index) {
        let mut tree = DecisionTree::new();
        let q = tree.create_node("has whiskers").unwrap();
        let no = tree.create_node("Nothing").unwrap();
        let yes = tree.create_node("Cat").unwrap();
        tree.link(tree.root(), Direction::No, Some(q)).unwrap();
        tree.link_left(q, Some(no)).unwrap();
        tree.link_right(q, Some(yes)).unwrap();
        (tree, q, no, yes)
    }

    #[test]
    fn given_new_tree_when_created_then_sentinel_is_empty() {
        let tree = DecisionTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.depth(), 0);
        assert!(tree.get(tree.root()).unwrap().is_leaf());
    }

    #[test]
    fn given_links_when_built_then_back_references_point_to_parents() {
        let (tree, q, no, yes) = whiskers_tree();
        assert_eq!(tree.first(), Some(q));
        assert_eq!(tree.get(q).unwrap().parent(), Some(tree.root()));
        assert_eq!(tree.get(no).unwrap().parent(), Some(q));
        assert_eq!(tree.get(yes).unwrap().parent(), Some(q));
        assert!(tree.get(q).unwrap().is_question());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn given_occupied_slot_when_relinking_then_previous_child_is_detached() {
        let (mut tree, q, no, _) = whiskers_tree();
        let dog = tree.create_node("Dog").unwrap();
        tree.link_left(q, Some(dog)).unwrap();

        assert_eq!(tree.get(no).unwrap().parent(), None);
        assert_eq!(tree.get(dog).unwrap().parent(), Some(q));
        assert_eq!(tree.get(q).unwrap().left(), Some(dog));
    }

    #[test]
    fn given_owned_child_when_linked_elsewhere_then_old_slot_is_cleared() {
        let (mut tree, q, no, yes) = whiskers_tree();
        tree.link_right(q, Some(no)).unwrap();

        assert_eq!(tree.get(q).unwrap().left(), None);
        assert_eq!(tree.get(q).unwrap().right(), Some(no));
        assert_eq!(tree.get(yes).unwrap().parent(), None);
    }

    #[test]
    fn given_sentinel_when_linking_yes_branch_then_rejected() {
        let mut tree = DecisionTree::new();
        let n = tree.create_node("Cat").unwrap();
        let root = tree.root();
        let err = tree.link_right(root, Some(n)).unwrap_err();
        assert!(matches!(err, DomainError::Graph { .. }));
        assert_eq!(tree.last_error(), Some(&err));
    }

    #[test]
    fn given_question_values_when_asking_then_one_trailing_mark() {
        let (tree, q, _, _) = whiskers_tree();
        assert_eq!(tree.get(q).unwrap().as_question(), "has whiskers?");

        let mut tree = DecisionTree::new();
        let flies = tree.create_node("Он(а) летает?").unwrap();
        assert_eq!(tree.get(flies).unwrap().as_question(), "Он(а) летает?");
    }

    #[test]
    fn given_invalid_values_when_creating_nodes_then_node_alloc_error() {
        let mut tree = DecisionTree::with_max_value_len(5);
        for bad in ["", "   ", "nil", "a{b", "a}b", "a\nb", "toolong"] {
            let err = tree.create_node(bad).unwrap_err();
            assert!(matches!(err, DomainError::NodeAlloc(_)), "{bad:?}");
        }
        assert_eq!(tree.len(), 0);

        let cat = tree.create_node("  Cat ").unwrap();
        assert_eq!(tree.value(cat).unwrap(), "Cat");
    }

    #[test]
    fn given_subtree_when_destroyed_then_count_and_parent_slot_updated() {
        let (mut tree, q, _, _) = whiskers_tree();
        let removed = tree.destroy_subtree(q).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(tree.len(), 0);
        assert!(tree.is_empty());
        assert!(tree.get(q).is_err());
    }

    #[test]
    fn given_sentinel_when_destroy_subtree_then_rejected() {
        let (mut tree, ..) = whiskers_tree();
        let root = tree.root();
        assert!(tree.destroy_subtree(root).is_err());
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn given_tree_when_iterating_then_preorder_and_postorder_visit_no_first() {
        let (tree, ..) = whiskers_tree();
        let pre: Vec<&str> = tree.iter().map(|(_, n)| n.value()).collect();
        let post: Vec<&str> = tree.iter_postorder().map(|(_, n)| n.value()).collect();
        assert_eq!(pre, vec!["has whiskers", "Nothing", "Cat"]);
        assert_eq!(post, vec!["Nothing", "Cat", "has whiskers"]);
        assert_eq!(tree.subjects(), vec!["Nothing", "Cat"]);
    }

    #[test]
    fn given_populated_tree_when_cleared_then_only_sentinel_remains() {
        let (mut tree, ..) = whiskers_tree();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.max_value_len(), DEFAULT_MAX_VALUE_LEN);
    }
}
