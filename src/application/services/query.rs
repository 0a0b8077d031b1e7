//! Query engine: play a guessing round (learning from wrong guesses),
//! describe a subject and compare two subjects.

use std::fmt;
use std::sync::Arc;

use generational_arena::Index;
use itertools::Itertools;
use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::path::{self, Direction, Step};
use crate::domain::{DecisionTree, DomainError};
use crate::infrastructure::traits::Console;

const ARROW: &str = " → ";

/// How a round of play ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The guess was confirmed
    Guessed { subject: String },
    /// The guess was wrong and the tree learned a new subject
    Learned {
        subject: String,
        property: String,
        replaced: String,
    },
    /// The knowledge base was empty and got its first subject
    Seeded { subject: String },
}

/// Defining path of one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    pub subject: String,
    pub steps: Vec<Step>,
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{step}{ARROW}")?;
        }
        write!(f, "{}", self.subject)
    }
}

/// Shared and distinct properties of two subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub first: String,
    pub second: String,
    /// Steps both paths take
    pub common: Vec<Step>,
    /// Remaining steps of the first subject after the shared prefix
    pub first_only: Vec<Step>,
    /// Remaining steps of the second subject after the shared prefix
    pub second_only: Vec<Step>,
}

impl Comparison {
    fn side(f: &mut fmt::Formatter<'_>, name: &str, steps: &[Step]) -> fmt::Result {
        if steps.is_empty() {
            write!(f, "{name}: no differences")
        } else {
            write!(f, "{name}: {}", steps.iter().join(ARROW))
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.common.is_empty() {
            writeln!(f, "{} and {} have nothing in common", self.first, self.second)?;
        } else {
            writeln!(
                f,
                "{} and {} both: {}",
                self.first,
                self.second,
                self.common.iter().join(ARROW)
            )?;
        }
        Self::side(f, &self.first, &self.first_only)?;
        writeln!(f)?;
        Self::side(f, &self.second, &self.second_only)
    }
}

/// Turn `leaf` into a question node: `property` takes the leaf's place, the
/// old leaf becomes its No branch and a new `subject` leaf its Yes branch.
///
/// Both values are validated before anything is linked, so a rejected value
/// leaves the tree untouched. Returns the new subject's node.
#[instrument(level = "debug", skip(tree))]
pub fn teach(
    tree: &mut DecisionTree,
    leaf: Index,
    subject: &str,
    property: &str,
) -> ApplicationResult<Index> {
    let node = tree.get(leaf)?;
    let (is_leaf, parent) = (node.is_leaf(), node.parent());
    if !is_leaf {
        let err = DomainError::Graph {
            node: tree.describe_node(leaf),
            reason: "only a leaf can be split".into(),
        };
        return Err(tree.record(err).into());
    }
    let slot = parent.and_then(|p| tree.direction_of(p, leaf));
    let (Some(parent), Some(slot)) = (parent, slot) else {
        let err = DomainError::Graph {
            node: tree.describe_node(leaf),
            reason: "leaf is not attached to the tree".into(),
        };
        return Err(tree.record(err).into());
    };

    for value in [property, subject] {
        if let Err(e) = tree.validate_value(value) {
            return Err(tree.record(e).into());
        }
    }

    let question = tree.create_node(property)?;
    let answer = tree.create_node(subject)?;
    tree.link(parent, slot, Some(question))?;
    tree.link(question, Direction::No, Some(leaf))?;
    tree.link(question, Direction::Yes, Some(answer))?;
    debug!("split leaf into {:?}", property);
    Ok(answer)
}

/// Describe: the questions answered on the way to `name`.
pub fn describe(tree: &DecisionTree, name: &str) -> ApplicationResult<Description> {
    let (path, first) = resolve(tree, name)?;
    let replay = path::replay(tree, first, path.directions())?;
    Ok(Description {
        subject: tree.value(replay.end)?.to_string(),
        steps: replay.steps,
    })
}

/// Compare: shared prefix of both paths, then each side's remainder replayed
/// from the node where they diverge.
pub fn compare(tree: &DecisionTree, first: &str, second: &str) -> ApplicationResult<Comparison> {
    let (a, start) = resolve(tree, first)?;
    let (b, _) = resolve(tree, second)?;
    let k = a.common_prefix_len(&b);

    let shared = path::replay(tree, start, &a.directions()[..k])?;
    let first_only = path::replay(tree, shared.end, &a.directions()[k..])?;
    let second_only = path::replay(tree, shared.end, &b.directions()[k..])?;

    Ok(Comparison {
        first: first.trim().to_string(),
        second: second.trim().to_string(),
        common: shared.steps,
        first_only: first_only.steps,
        second_only: second_only.steps,
    })
}

fn resolve(tree: &DecisionTree, name: &str) -> ApplicationResult<(path::DecisionPath, Index)> {
    let first = tree
        .first()
        .ok_or(ApplicationError::Domain(DomainError::EmptyKnowledgeBase))?;
    match path::resolve_path(tree, name)? {
        Some(p) => Ok((p, first)),
        None => Err(ApplicationError::UnknownSubject(name.trim().to_string())),
    }
}

/// Service running the interactive operations against a console.
pub struct QueryService {
    console: Arc<dyn Console>,
    settings: Arc<Settings>,
}

impl QueryService {
    /// Create a new query service.
    pub fn new(console: Arc<dyn Console>, settings: Arc<Settings>) -> Self {
        Self { console, settings }
    }

    fn ask(&self, prompt: &str) -> ApplicationResult<String> {
        self.console.ask(prompt).or_console()
    }

    fn say(&self, message: &str) -> ApplicationResult<()> {
        self.console.say(message).or_console()
    }

    fn ask_yes_no(&self, prompt: &str) -> ApplicationResult<bool> {
        let answer = self.ask(prompt)?;
        Ok(self.settings.is_affirmative(&answer))
    }

    /// One guessing round. Walks the questions from the first node, guesses
    /// the leaf it reaches and learns a new subject if the guess is wrong.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn play(&self, tree: &mut DecisionTree) -> ApplicationResult<PlayOutcome> {
        let Some(mut current) = tree.first() else {
            return self.seed(tree);
        };

        loop {
            let node = tree.get(current)?;
            if node.is_leaf() {
                break;
            }
            let question = node.as_question();
            let direction = Direction::from_answer(self.ask_yes_no(&question)?);
            current = node.child(direction).ok_or_else(|| DomainError::Graph {
                node: node.to_string(),
                reason: format!("no {direction} branch to follow"),
            })?;
        }

        let guess = tree.value(current)?.to_string();
        if self.ask_yes_no(&format!("Is it {guess}?"))? {
            self.say("Got it!")?;
            info!("guessed {:?}", guess);
            return Ok(PlayOutcome::Guessed { subject: guess });
        }

        let subject = self.ask("Who or what was it?")?;
        let property = self.ask(&format!(
            "What is true of {} but not of {guess}? It ...",
            subject.trim()
        ))?;
        let answer = teach(tree, current, &subject, &property)?;
        let subject = tree.value(answer)?.to_string();
        self.say(&format!("Thanks, I will remember {subject}!"))?;
        info!("learned {:?}", subject);

        Ok(PlayOutcome::Learned {
            subject,
            property: property.trim().to_string(),
            replaced: guess,
        })
    }

    fn seed(&self, tree: &mut DecisionTree) -> ApplicationResult<PlayOutcome> {
        self.say("I don't know anything yet.")?;
        let subject = self.ask("Who or what are you thinking of?")?;
        let idx = tree.create_node(&subject)?;
        let root = tree.root();
        tree.link(root, Direction::No, Some(idx))?;
        let subject = tree.value(idx)?.to_string();
        self.say(&format!("Thanks, I will remember {subject}!"))?;
        Ok(PlayOutcome::Seeded { subject })
    }
}
