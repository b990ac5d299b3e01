//! CLI definitions and command implementations for giournal.

pub mod commands;
pub mod editor;
pub mod setup;

use clap::{ArgGroup, Parser};
use giournal::config::CONFIG_ENV;
use std::path::PathBuf;

/// Giournal - encrypted journaling, git backed
#[derive(Parser, Debug)]
#[command(name = "giournal")]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .args(["list", "encrypt", "decrypt", "editor", "text"])
        .multiple(false)
))]
pub struct Cli {
    /// List all the entries
    #[arg(long)]
    pub list: bool,

    /// Encrypt all decrypted entries
    #[arg(long)]
    pub encrypt: bool,

    /// Decrypt all entries for editing
    #[arg(long)]
    pub decrypt: bool,

    /// Write the entry in the configured editor
    #[arg(long)]
    pub editor: bool,

    /// Entry text; words are joined with single spaces
    #[arg(value_name = "TEXT")]
    pub text: Vec<String>,

    /// Configuration file
    #[arg(long, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Join positional words into one entry body; `None` if there is nothing to add.
pub fn entry_text(words: &[String]) -> Option<String> {
    let text = words.join(" ");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
