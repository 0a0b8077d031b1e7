//! Command dispatch: resolves the knowledge base and runs one command on it

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info, instrument, warn};

use crate::application::services::{compare, describe};
use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::CliResult;
use crate::cli::output;
use crate::config::{global_config_path, Settings};
use crate::domain::{self, to_dot, DecisionTree, DomainError, TreeNodeConvert};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

const MENU: &str = "\n1) Play\n2) Describe\n3) Compare\n4) Show\n5) Quit";

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Some(Commands::Config { command }) => {
            return cmd_config(command, cli.config.as_deref());
        }
        _ => {}
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let container = ServiceContainer::new(settings);
    let path = resolve_database(&container, cli.file.as_deref())?;
    let mut tree = container.storage.open(&path)?;

    match &cli.command {
        None | Some(Commands::Menu) => run_menu(&container, &mut tree, &path),
        Some(Commands::Play) => cmd_play(&container, &mut tree, &path),
        Some(Commands::Describe { name }) => {
            output::info(&describe(&tree, name)?);
            Ok(())
        }
        Some(Commands::Compare { first, second }) => {
            output::info(&compare(&tree, first, second)?);
            Ok(())
        }
        Some(Commands::Show) => {
            output::info(&tree.to_tree_string());
            Ok(())
        }
        Some(Commands::Dump { output }) => cmd_dump(&container, &tree, output.as_deref()),
        Some(Commands::Verify) => cmd_verify(&tree, &path),
        Some(Commands::Config { .. }) | Some(Commands::Completion { .. }) => Ok(()),
    }
}

/// `--file` wins; otherwise ask, with an empty answer meaning the configured default.
pub fn resolve_database(container: &ServiceContainer, file: Option<&Path>) -> CliResult<PathBuf> {
    if let Some(file) = file {
        return Ok(file.to_path_buf());
    }
    let default = &container.settings.database_file;
    let answer = container
        .console
        .ask(&format!("Knowledge base file [{}]:", default.display()))
        .or_console()?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(default.clone())
    } else {
        Ok(PathBuf::from(answer))
    }
}

#[instrument(level = "debug", skip(container, tree))]
fn cmd_play(container: &ServiceContainer, tree: &mut DecisionTree, path: &Path) -> CliResult<()> {
    let outcome = container.query.play(tree)?;
    debug!("play finished: {:?}", outcome);
    container.storage.save(tree, path)?;
    Ok(())
}

fn cmd_dump(container: &ServiceContainer, tree: &DecisionTree, target: Option<&Path>) -> CliResult<()> {
    let dot = to_dot(tree);
    match target {
        Some(target) => {
            container
                .fs
                .write(target, &dot)
                .map_err(|e| InfraError::io(format!("write {}", target.display()), e))?;
            output::action("Wrote", &target.display());
        }
        None => output::info(&dot.trim_end()),
    }
    Ok(())
}

fn cmd_verify(tree: &DecisionTree, path: &Path) -> CliResult<()> {
    domain::verify(tree)?;
    output::success(&format!(
        "{}: {} nodes, {} subjects, consistent",
        path.display(),
        tree.len(),
        tree.subjects().len()
    ));
    Ok(())
}

fn cmd_config(command: &ConfigCommands, local: Option<&Path>) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(p) => output::action("Global", &p.display()),
                None => output::warning("no home directory, global config disabled"),
            }
            if let Some(local) = local {
                output::action("Local", &local.display());
            }
        }
    }
    Ok(())
}

/// Errors a menu session reports and survives.
fn recoverable(err: &ApplicationError) -> bool {
    matches!(
        err,
        ApplicationError::UnknownSubject(_)
            | ApplicationError::Domain(DomainError::EmptyKnowledgeBase)
            | ApplicationError::Domain(DomainError::NodeAlloc(_))
    )
}

fn end_of_input(err: &ApplicationError) -> bool {
    matches!(err, ApplicationError::Console(e) if e.kind() == io::ErrorKind::UnexpectedEof)
}

/// Menu loop until Quit or end of input; the knowledge base is saved on the way out.
#[instrument(level = "debug", skip(container, tree))]
pub fn run_menu(container: &ServiceContainer, tree: &mut DecisionTree, path: &Path) -> CliResult<()> {
    loop {
        match menu_step(container, tree) {
            Ok(true) => continue,
            Ok(false) => break,
            Err(e) if end_of_input(&e) => {
                debug!("input closed, leaving menu");
                break;
            }
            Err(e) if recoverable(&e) => {
                warn!("{}", e);
                container.console.say(&format!("Sorry: {e}")).or_console()?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    container.storage.save(tree, path)?;
    info!("menu session finished");
    Ok(())
}

/// Run one menu choice; `false` means quit.
fn menu_step(container: &ServiceContainer, tree: &mut DecisionTree) -> ApplicationResult<bool> {
    let console = &container.console;
    console.say(MENU).or_console()?;
    let choice = console.ask("Choice:").or_console()?;
    match choice.trim() {
        "1" => {
            container.query.play(tree)?;
        }
        "2" => {
            let name = console.ask("Name?").or_console()?;
            console.say(&describe(tree, &name)?.to_string()).or_console()?;
        }
        "3" => {
            let first = console.ask("First name?").or_console()?;
            let second = console.ask("Second name?").or_console()?;
            console
                .say(&compare(tree, &first, &second)?.to_string())
                .or_console()?;
        }
        "4" => console.say(&tree.to_tree_string().to_string()).or_console()?,
        "5" => return Ok(false),
        other => console
            .say(&format!("Unknown choice {other:?}"))
            .or_console()?,
    }
    Ok(true)
}
