//! Journal workflows: add, list, decrypt-all, encrypt-all.
//!
//! Each workflow runs `reconcile` first so it sees the latest shared state, and the
//! mutating ones finish with `publish`.

use crate::config::JournalConfiguration;
use crate::credentials::CredentialStore;
use crate::crypto;
use crate::entry::{self, Entry};
use crate::error::Result;
use crate::store::{entry_filename, EntryStore, TransitionReport};
use crate::sync::{SyncEngine, SyncSettings};
use chrono::{DateTime, Local};
use tracing::info;

/// Timestamp format used when listing entries
pub const LIST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `"<created>: <body>\n\n"`
pub fn format_entry(entry: &Entry) -> String {
    format!(
        "{}: {}\n\n",
        entry.created().format(LIST_TIME_FORMAT),
        entry.body()
    )
}

pub struct Journal {
    store: EntryStore,
    sync: SyncEngine,
    credentials: Box<dyn CredentialStore>,
}

impl Journal {
    /// Open the journal described by `config`, creating its directory if needed.
    pub fn new(
        config: &JournalConfiguration,
        credentials: Box<dyn CredentialStore>,
    ) -> Result<Self> {
        if !config.journal_path.exists() {
            info!("Creating journal at {}", config.journal_path.display());
            std::fs::create_dir_all(&config.journal_path)?;
        }

        Ok(Self {
            store: EntryStore::new(&config.journal_path),
            sync: SyncEngine::new(&config.journal_path, SyncSettings::from_config(config)),
            credentials,
        })
    }

    /// Key-derivation work factor for new entries
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.store = self.store.with_iterations(iterations);
        self
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn sync_engine(&mut self) -> &mut SyncEngine {
        &mut self.sync
    }

    /// Add an entry created now. Returns the entry's filename.
    pub fn add_entry(&mut self, body: &str) -> Result<String> {
        self.add_entry_at(body, Local::now())
    }

    /// Add an entry with an explicit creation time.
    pub fn add_entry_at(&mut self, body: &str, created: DateTime<Local>) -> Result<String> {
        self.sync.reconcile()?;

        let entry = Entry::new(body, created);
        let envelope = entry::encode(&entry);
        let password = self.credentials.fetch()?;
        let token = crypto::encrypt(envelope.as_bytes(), &password, self.store.iterations())?;
        let filename = entry_filename(&created);
        self.store.append(&filename, &token)?;
        info!("Added entry {}", filename);

        self.sync.publish()?;
        Ok(filename)
    }

    /// All entries in filename (creation) order.
    pub fn entries(&mut self) -> Result<Vec<Entry>> {
        self.sync.reconcile()?;
        let password = self.credentials.fetch()?;
        self.store.read_and_decrypt_all(&password)
    }

    /// All entries rendered for display.
    pub fn list_entries(&mut self) -> Result<String> {
        Ok(self.entries()?.iter().map(format_entry).collect())
    }

    /// Decrypt every entry for editing.
    pub fn decrypt(&mut self) -> Result<TransitionReport> {
        self.sync.reconcile()?;
        let password = self.credentials.fetch()?;
        let report = self.store.decrypt_all(&password)?;
        info!("Decrypted {} entries", report.converted);
        self.sync.publish()?;
        Ok(report)
    }

    /// Encrypt every decrypted entry again.
    pub fn encrypt(&mut self) -> Result<TransitionReport> {
        self.sync.reconcile()?;
        let password = self.credentials.fetch()?;
        let report = self.store.encrypt_all(&password)?;
        info!("Encrypted {} entries", report.converted);
        self.sync.publish()?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentials;
    use crate::error::Error;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn journal(dir: &TempDir, password: &str) -> Result<Journal> {
        let config = JournalConfiguration::with_journal_path(dir.path().join("journal"));
        Ok(Journal::new(&config, Box::new(MemoryCredentials::new(password)))?.with_iterations(10))
    }

    fn base() -> DateTime<Local> {
        Local.with_ymd_and_hms(2021, 5, 9, 7, 3, 1).unwrap()
    }

    #[test]
    fn test_new_creates_directory() -> Result<()> {
        let dir = TempDir::new()?;
        journal(&dir, "pw")?;
        assert!(dir.path().join("journal").is_dir());
        Ok(())
    }

    #[test]
    fn test_three_entries_list_chronologically() -> Result<()> {
        let dir = TempDir::new()?;
        let mut journal = journal(&dir, "pw")?;

        // Added out of order on purpose
        journal.add_entry_at("c", base() + Duration::seconds(2))?;
        journal.add_entry_at("a", base())?;
        journal.add_entry_at("b", base() + Duration::seconds(1))?;

        assert_eq!(
            journal.list_entries()?,
            "2021-05-09 07:03:01: a\n\n\
             2021-05-09 07:03:02: b\n\n\
             2021-05-09 07:03:03: c\n\n"
        );

        let entries = journal.entries()?;
        assert_eq!(entries[1].created(), base() + Duration::seconds(1));
        assert_eq!(entries[1].last_modified(), entries[1].created());
        Ok(())
    }

    #[test]
    fn test_add_entry_commits() -> Result<()> {
        let dir = TempDir::new()?;
        let mut journal = journal(&dir, "pw")?;

        journal.add_entry("hello")?;
        let repo = journal.sync_engine().ensure()?;
        assert!(!repo.has_changes()?);
        assert_eq!(repo.commit_count(), 1);
        Ok(())
    }

    #[test]
    fn test_encrypt_decrypt_cycle() -> Result<()> {
        let dir = TempDir::new()?;
        let mut journal = journal(&dir, "pw")?;
        journal.add_entry_at("first", base())?;
        journal.add_entry_at("second\nwith lines", base() + Duration::seconds(5))?;
        let before = journal.entries()?;

        let report = journal.decrypt()?;
        assert_eq!(report.converted, 2);
        let report = journal.encrypt()?;
        assert_eq!(report.converted, 2);

        assert_eq!(journal.entries()?, before);
        let names = journal.store().list_entry_filenames()?;
        assert!(names.iter().all(|n| !n.ends_with(".md")));
        Ok(())
    }

    #[test]
    fn test_wrong_password_cannot_list() -> Result<()> {
        let dir = TempDir::new()?;
        journal(&dir, "right")?.add_entry("secret")?;

        let mut intruder = journal(&dir, "wrong")?;
        assert!(matches!(intruder.list_entries(), Err(Error::Authentication)));
        Ok(())
    }

    #[test]
    fn test_format_entry() {
        let entry = Entry::new("body text", base());
        assert_eq!(format_entry(&entry), "2021-05-09 07:03:01: body text\n\n");
    }
}
