//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/twentyq/twentyq.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `TWENTYQ_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::DEFAULT_MAX_VALUE_LEN;

/// Unified configuration for twentyq.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Knowledge base used when no file is given (default: database.tree)
    pub database_file: PathBuf,
    /// Subject seeded into a new or empty knowledge base
    pub default_subject: String,
    /// Answers counted as "yes"; anything else is "no"
    pub affirmative: Vec<String>,
    /// Longest question or subject, in characters
    pub max_value_len: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_file: PathBuf::from("database.tree"),
            default_subject: "Nothing".into(),
            affirmative: vec!["yes".into(), "y".into()],
            max_value_len: DEFAULT_MAX_VALUE_LEN,
        }
    }
}

/// Raw settings for intermediate parsing (fields are Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database_file: Option<PathBuf>,
    pub default_subject: Option<String>,
    pub affirmative: Option<Vec<String>>,
    pub max_value_len: Option<usize>,
}

/// Expand `~`, `$VAR` and `${VAR}`; leaves the input unchanged if expansion fails.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Get the XDG config directory for twentyq.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "twentyq").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("twentyq.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Classify a console answer.
    pub fn is_affirmative(&self, answer: &str) -> bool {
        let answer = answer.trim().to_lowercase();
        self.affirmative
            .iter()
            .any(|token| token.trim().to_lowercase() == answer)
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.database_file.to_string_lossy().as_ref());
        self.database_file = PathBuf::from(expanded);
    }

    /// Overlay wins field by field where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database_file: overlay
                .database_file
                .clone()
                .unwrap_or_else(|| self.database_file.clone()),
            default_subject: overlay
                .default_subject
                .clone()
                .unwrap_or_else(|| self.default_subject.clone()),
            affirmative: overlay
                .affirmative
                .clone()
                .unwrap_or_else(|| self.affirmative.clone()),
            max_value_len: overlay.max_value_len.unwrap_or(self.max_value_len),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional config file layered over the global one
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(local_path) = local {
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            let raw = load_raw_settings(local_path)?;
            current = current.merge_with(&raw);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply TWENTYQ_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("TWENTYQ")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("affirmative"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("database_file") {
            settings.database_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("default_subject") {
            settings.default_subject = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("affirmative") {
            settings.affirmative = val;
        }
        if let Ok(val) = config.get::<usize>("max_value_len") {
            settings.max_value_len = val;
        }

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ApplicationError> {
        if self.affirmative.iter().all(|t| t.trim().is_empty()) {
            return Err(ApplicationError::Config {
                message: "at least one affirmative answer is required".into(),
            });
        }
        if self.max_value_len == 0 {
            return Err(ApplicationError::Config {
                message: "max_value_len must be positive".into(),
            });
        }
        if self.default_subject.trim().chars().count() > self.max_value_len {
            return Err(ApplicationError::Config {
                message: "default_subject is longer than max_value_len".into(),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# twentyq configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/twentyq/twentyq.toml
#   Local:  file given with --config
#   Env:    TWENTYQ_* environment variables (e.g. TWENTYQ_DATABASE_FILE)

# Knowledge base used when --file is not given and the prompt is left empty
# database_file = "database.tree"

# Subject written into a missing or empty knowledge base
# default_subject = "Nothing"

# Answers counted as "yes" (case-insensitive); anything else means "no"
# affirmative = ["yes", "y"]

# Longest question or subject name, in characters
# max_value_len = 256
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
