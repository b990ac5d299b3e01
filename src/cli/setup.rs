//! First-run initializer.
//!
//! Runs when the configuration file is missing or cannot be parsed, asks a few
//! questions and writes a fresh file.

use super::editor::available_editors;
use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input, Select};
use giournal::config::{default_journal_path, InitAnswers};
use giournal::{Error, JournalConfiguration};
use std::path::Path;
use tracing::warn;

/// Load the configuration, running the initializer if it is missing or garbled.
pub fn load_or_init(path: &Path) -> Result<JournalConfiguration> {
    match JournalConfiguration::load(path) {
        Ok(config) => Ok(config),
        Err(Error::Config(msg)) => {
            if path.exists() {
                warn!("{}", msg);
                println!(
                    "{}",
                    "Configuration could not be read, running setup again.".yellow()
                );
            }
            initialise(path)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ask the setup questions and write the configuration to `path`.
pub fn initialise(path: &Path) -> Result<JournalConfiguration> {
    println!(
        "{}",
        format!("# Creating journal config at '{}'", path.display())
            .cyan()
            .bold()
    );

    let journal_path: String = Input::new()
        .with_prompt("Journal path")
        .default(default_journal_path().display().to_string())
        .interact_text()?;

    let use_keychain = Confirm::new()
        .with_prompt("Do you want to store your password in your keychain?")
        .default(true)
        .interact()?;

    let sync_to_git = Confirm::new()
        .with_prompt("Do you want to sync your journal to git?")
        .default(true)
        .interact()?;

    let git_remote = if sync_to_git {
        prompt_remote()?
    } else {
        String::new()
    };

    let editor_path = prompt_editor()?;

    let config = InitAnswers {
        journal_path,
        use_keychain,
        sync_to_git,
        git_remote,
        editor_path,
    }
    .into_config();

    if !config.journal_path.exists() {
        println!("Creating path '{}'", config.journal_path.display());
        std::fs::create_dir_all(&config.journal_path).with_context(|| {
            format!("Cannot create journal directory: {}", config.journal_path.display())
        })?;
    }

    config
        .save(path)
        .with_context(|| format!("Cannot write config file: {}", path.display()))?;
    println!("  {} Saved {}", "✓".green(), path.display());

    Ok(config)
}

/// Ask for the remote when syncing is on but none is configured, and remember it.
pub fn ensure_remote(config: &mut JournalConfiguration, path: &Path) -> Result<()> {
    if !config.sync_to_git || config.git_remote.is_some() {
        return Ok(());
    }

    println!("{}", "Git remote not initialised.".yellow());
    let remote = prompt_remote()?;
    if remote.trim().is_empty() {
        return Ok(());
    }
    config.git_remote = Some(remote.trim().to_string());
    config
        .save(path)
        .with_context(|| format!("Cannot write config file: {}", path.display()))?;
    Ok(())
}

fn prompt_remote() -> Result<String> {
    Ok(Input::new()
        .with_prompt("What is your git remote? (e.g. git@github.com:username/repository.git)")
        .allow_empty(true)
        .interact_text()?)
}

fn prompt_editor() -> Result<String> {
    let editors = available_editors();
    let mut items: Vec<String> = editors.iter().map(|(label, _)| label.clone()).collect();
    items.push("type your own".to_string());

    let choice = Select::new()
        .with_prompt("Please pick an editor")
        .items(&items)
        .default(0)
        .interact()?;

    match editors.get(choice) {
        Some((_, command)) => Ok(command.clone()),
        None => Ok(Input::new()
            .with_prompt("Path to your own editor")
            .interact_text()?),
    }
}
