//! Command implementations for the giournal CLI.
//!
//! One invocation runs one action to completion:
//! - list: print every decrypted entry
//! - encrypt / decrypt: bulk transition of all entries
//! - editor / positional text: add one entry

use super::{editor, entry_text, setup, Cli};
use anyhow::{Context, Result};
use colored::Colorize;
use giournal::config::default_config_path;
use giournal::{
    CredentialStore, Journal, JournalConfiguration, KeyringCredentials, PromptCredentials,
};
use tracing::warn;

/// Pick the credential store the configuration asks for
fn credential_store(config: &JournalConfiguration) -> Box<dyn CredentialStore> {
    if !config.use_keychain {
        return Box::new(PromptCredentials::new());
    }
    match KeyringCredentials::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("{}; the password will not be remembered", e);
            Box::new(PromptCredentials::new())
        }
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = setup::load_or_init(&config_path)?;
    setup::ensure_remote(&mut config, &config_path)?;

    let mut journal = Journal::new(&config, credential_store(&config))
        .with_context(|| format!("Cannot open journal at {}", config.journal_path.display()))?;

    if cli.list {
        print!("{}", journal.list_entries()?);
    } else if cli.decrypt {
        let report = journal.decrypt()?;
        println!(
            "  {} Decrypted {} entries into {}",
            "✓".green(),
            report.converted,
            config.journal_path.display()
        );
        println!(
            "{}",
            "Others keep seeing the encrypted versions until you run giournal --encrypt."
                .dimmed()
        );
    } else if cli.encrypt {
        let report = journal.encrypt()?;
        println!("  {} Encrypted {} entries", "✓".green(), report.converted);
    } else if cli.editor {
        let body = editor::compose(&config.editor_path)?;
        add(&mut journal, &body)?;
    } else if let Some(body) = entry_text(&cli.text) {
        add(&mut journal, &body)?;
    } else {
        println!("{}", "Nothing to add. Try --help.".yellow());
    }

    Ok(())
}

fn add(journal: &mut Journal, body: &str) -> Result<()> {
    if body.is_empty() {
        println!("{}", "Empty entry, nothing added.".yellow());
        return Ok(());
    }
    let filename = journal.add_entry(body)?;
    println!("  {} Added {}", "✓".green(), filename.dimmed());
    Ok(())
}
