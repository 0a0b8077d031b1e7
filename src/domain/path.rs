//! Decision paths: resolving a subject to its root-to-leaf directions and
//! replaying directions back into the questions they answer.

use std::fmt;

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::DecisionTree;
use crate::domain::error::{DomainError, DomainResult};

/// Binary choice taken at a question node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left branch
    No,
    /// Right branch
    Yes,
}

impl Direction {
    pub fn from_answer(affirmative: bool) -> Self {
        if affirmative {
            Direction::Yes
        } else {
            Direction::No
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::No => write!(f, "no"),
            Direction::Yes => write!(f, "yes"),
        }
    }
}

/// Ordered directions from the first real node down to a leaf.
///
/// An empty path is valid: it names the first node itself, which is the case
/// for a knowledge base holding a single subject.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionPath {
    directions: Vec<Direction>,
}

impl DecisionPath {
    pub fn new(directions: Vec<Direction>) -> Self {
        Self { directions }
    }

    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    /// Number of leading directions both paths share.
    pub fn common_prefix_len(&self, other: &DecisionPath) -> usize {
        self.directions
            .iter()
            .zip(&other.directions)
            .take_while(|(a, b)| a == b)
            .count()
    }
}

impl FromIterator<Direction> for DecisionPath {
    fn from_iter<I: IntoIterator<Item = Direction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A question together with the direction taken at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub question: String,
    pub direction: Direction,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Yes => write!(f, "{}", self.question),
            Direction::No => write!(f, "not {}", self.question),
        }
    }
}

/// Outcome of walking a list of directions through the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    pub steps: Vec<Step>,
    /// Node reached after the last direction
    pub end: Index,
}

/// Leaf named `name`. With duplicate names the last leaf in
/// left-then-right depth-first order wins.
#[instrument(level = "debug", skip(tree))]
pub fn find_leaf(tree: &DecisionTree, name: &str) -> Option<Index> {
    let name = name.trim();
    tree.iter()
        .filter(|(_, node)| node.is_leaf() && node.value() == name)
        .map(|(idx, _)| idx)
        .last()
}

/// Directions leading from the first real node to `idx`, recovered through
/// the parent back-references.
#[instrument(level = "trace", skip(tree))]
pub fn path_to(tree: &DecisionTree, idx: Index) -> DomainResult<DecisionPath> {
    let mut directions = Vec::new();
    let mut current = idx;
    loop {
        let node = tree.get(current)?;
        let Some(parent) = node.parent() else {
            return Err(DomainError::Graph {
                node: tree.describe_node(current),
                reason: "node is detached from the tree".into(),
            });
        };
        if parent == tree.root() {
            break;
        }
        let direction = tree
            .direction_of(parent, current)
            .ok_or_else(|| DomainError::Graph {
                node: tree.describe_node(current),
                reason: "parent does not own this node".into(),
            })?;
        directions.push(direction);
        if directions.len() > tree.len() {
            return Err(DomainError::Graph {
                node: tree.describe_node(idx),
                reason: "parent chain does not terminate".into(),
            });
        }
        current = parent;
    }
    directions.reverse();
    Ok(DecisionPath::new(directions))
}

/// Path Resolver: the decision path naming `name`, or None when no leaf has
/// that name.
pub fn resolve_path(tree: &DecisionTree, name: &str) -> DomainResult<Option<DecisionPath>> {
    match find_leaf(tree, name) {
        Some(leaf) => {
            let path = path_to(tree, leaf)?;
            debug!("resolved {:?} to {} steps", name, path.len());
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

/// Follow `directions` from `from`, collecting each question passed.
pub fn replay(tree: &DecisionTree, from: Index, directions: &[Direction]) -> DomainResult<Replay> {
    let mut steps = Vec::with_capacity(directions.len());
    let mut current = from;
    for &direction in directions {
        let node = tree.get(current)?;
        let next = node.child(direction).ok_or_else(|| DomainError::Graph {
            node: tree.describe_node(current),
            reason: format!("no {direction} branch to follow"),
        })?;
        steps.push(Step {
            question: node.value().to_string(),
            direction,
        });
        current = next;
    }
    Ok(Replay {
        steps,
        end: current,
    })
}
