//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint};

/// Twenty questions: guesses what you think of and learns from its mistakes
#[derive(Parser, Debug)]
#[command(name = "twentyq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Knowledge base file (prompted for if omitted)
    #[arg(short, long, global = true, env = "TWENTYQ_FILE", value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Config file layered over the global config
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Turn debugging information on (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive menu (default)
    Menu,

    /// Play one round and save what was learned
    Play,

    /// Show the questions leading to a subject
    Describe {
        /// Subject name
        name: String,
    },

    /// Show what two subjects share and where they differ
    Compare {
        /// First subject
        first: String,
        /// Second subject
        second: String,
    },

    /// Show the knowledge base as a tree
    Show,

    /// Write a graphviz dot dump of the node arena
    Dump {
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Check the structural integrity of the knowledge base
    Verify,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print a config template
    Template,

    /// Show config paths
    Path,
}
