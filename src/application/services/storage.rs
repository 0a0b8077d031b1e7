//! Knowledge base persistence
//!
//! Reads and writes the text format from [`crate::domain::codec`] through the
//! filesystem boundary. The file path is always passed in explicitly.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::codec;
use crate::domain::DecisionTree;
use crate::infrastructure::traits::FileSystem;

/// Service for saving and loading knowledge bases.
pub struct StorageService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl StorageService {
    /// Create a new storage service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    /// An empty tree honouring the configured value limit.
    pub fn new_tree(&self) -> DecisionTree {
        DecisionTree::with_max_value_len(self.settings.max_value_len)
    }

    /// Write `tree` to `path`, replacing any previous content.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn save(&self, tree: &DecisionTree, path: &Path) -> ApplicationResult<()> {
        let text = codec::encode(tree);
        self.fs.ensure_parent(path).or_file_create(path)?;
        self.fs.write(path, &text).or_file_create(path)?;
        info!("saved {} nodes to {}", tree.len(), path.display());
        Ok(())
    }

    /// Replace the contents of `tree` with the knowledge base in `path`.
    ///
    /// A missing or blank file is first seeded with a single default subject.
    /// On any error `tree` keeps its previous contents.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn load(&self, tree: &mut DecisionTree, path: &Path) -> ApplicationResult<()> {
        self.materialize_default(path)?;
        let text = self.fs.read_to_string(path).or_file_open(path)?;
        codec::decode_into(tree, &text)?;
        info!("loaded {} nodes from {}", tree.len(), path.display());
        Ok(())
    }

    /// Convenience: load `path` into a fresh tree.
    pub fn open(&self, path: &Path) -> ApplicationResult<DecisionTree> {
        let mut tree = self.new_tree();
        self.load(&mut tree, path)?;
        Ok(tree)
    }

    fn materialize_default(&self, path: &Path) -> ApplicationResult<()> {
        if self.fs.exists(path) {
            let existing = self.fs.read_to_string(path).or_file_open(path)?;
            if !existing.trim().is_empty() {
                return Ok(());
            }
        }
        debug!(
            "seeding {} with default subject {:?}",
            path.display(),
            self.settings.default_subject
        );
        let seed = DecisionTree::with_subject(&self.settings.default_subject, self.settings.max_value_len)?;
        self.save(&seed, path)
    }
}
