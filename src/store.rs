//! On-disk entry files.
//!
//! One file per entry, directly inside the journal directory, named after the
//! creation time (`YYYY_MM_DD-HH_MM_SS`). At rest a file holds a [`CipherToken`];
//! while being edited it holds the plaintext envelope and carries the
//! [`PLAINTEXT_SUFFIX`].
//!
//! Bulk transitions are a sequence of independent per-file steps. Each step writes
//! the destination fully before removing the source, so an interrupted run leaves
//! every file valid and a re-run finishes the job. There is no atomicity across
//! files.

use crate::crypto::{self, CipherToken, DEFAULT_ITERATIONS};
use crate::entry::{self, Entry};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Suffix of entries that are decrypted for editing
pub const PLAINTEXT_SUFFIX: &str = ".md";

/// strftime pattern for entry filenames
pub const FILENAME_FORMAT: &str = "%Y_%m_%d-%H_%M_%S";

/// Filename for an entry created at `created`.
///
/// Two entries created within the same second get the same name and the later one
/// overwrites the earlier.
pub fn entry_filename(created: &DateTime<Local>) -> String {
    created.format(FILENAME_FORMAT).to_string()
}

/// Representation an entry file is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Encrypted,
    Plaintext,
}

impl EntryKind {
    pub fn of(filename: &str) -> Self {
        if filename.ends_with(PLAINTEXT_SUFFIX) {
            EntryKind::Plaintext
        } else {
            EntryKind::Encrypted
        }
    }
}

/// Outcome of a bulk transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionReport {
    /// Files moved to the target representation
    pub converted: usize,
    /// Files already in the target representation
    pub skipped: usize,
}

/// Entry files of one journal directory.
#[derive(Debug, Clone)]
pub struct EntryStore {
    dir: PathBuf,
    iterations: u32,
}

impl EntryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Key-derivation work factor for tokens written from now on.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Non-hidden regular files directly inside the journal directory, sorted by name.
    ///
    /// With the fixed-width filename scheme, name order is creation order.
    pub fn list_entry_filenames(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = dir_entry.file_name().to_str().map(str::to_string) else {
                debug!("Skipping non UTF-8 filename {:?}", dir_entry.file_name());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    /// Write `token` as the sole content of `filename`.
    pub fn append(&self, filename: &str, token: &CipherToken) -> Result<()> {
        self.write_file(filename, token.as_str().as_bytes())?;
        debug!("Wrote entry {}", filename);
        Ok(())
    }

    /// Decrypt every encrypted entry into a `.md` sibling, removing the encrypted file.
    pub fn decrypt_all(&self, password: &str) -> Result<TransitionReport> {
        let mut report = TransitionReport::default();

        for name in self.list_entry_filenames()? {
            if EntryKind::of(&name) == EntryKind::Plaintext {
                report.skipped += 1;
                continue;
            }

            let text = self.decrypt_file(&name, password)?;
            // Refuse to leave an unreadable envelope behind.
            entry::decode(&text)?;

            let target = format!("{}{}", name, PLAINTEXT_SUFFIX);
            self.write_file(&target, text.as_bytes())?;
            fs::remove_file(self.dir.join(&name))?;

            debug!("Decrypted {} -> {}", name, target);
            report.converted += 1;
        }

        Ok(report)
    }

    /// Encrypt every `.md` entry back into its token file, removing the plaintext.
    pub fn encrypt_all(&self, password: &str) -> Result<TransitionReport> {
        let mut report = TransitionReport::default();

        for name in self.list_entry_filenames()? {
            let Some(target) = name.strip_suffix(PLAINTEXT_SUFFIX) else {
                report.skipped += 1;
                continue;
            };

            let text = fs::read_to_string(self.dir.join(&name))?;
            entry::decode(&text)
                .map_err(|e| Error::format(format!("{}: {}", name, e)))?;

            let token = crypto::encrypt(text.as_bytes(), password, self.iterations)?;
            self.write_file(target, token.as_str().as_bytes())?;
            fs::remove_file(self.dir.join(&name))?;

            debug!("Encrypted {} -> {}", name, target);
            report.converted += 1;
        }

        Ok(report)
    }

    /// Read every entry without touching the files.
    ///
    /// A `.md` file whose encrypted counterpart still exists is left over from an
    /// interrupted transition and is not listed twice.
    pub fn read_and_decrypt_all(&self, password: &str) -> Result<Vec<Entry>> {
        let names = self.list_entry_filenames()?;
        let present: HashSet<&str> = names.iter().map(String::as_str).collect();

        let mut entries = Vec::with_capacity(names.len());
        for name in &names {
            let text = match EntryKind::of(name) {
                EntryKind::Encrypted => self.decrypt_file(name, password)?,
                EntryKind::Plaintext => {
                    let stem = &name[..name.len() - PLAINTEXT_SUFFIX.len()];
                    if present.contains(stem) {
                        continue;
                    }
                    fs::read_to_string(self.dir.join(name))?
                }
            };
            let entry = entry::decode(&text)
                .map_err(|e| Error::format(format!("{}: {}", name, e)))?;
            entries.push(entry);
        }

        Ok(entries)
    }

    fn decrypt_file(&self, name: &str, password: &str) -> Result<String> {
        let token = CipherToken::from(fs::read_to_string(self.dir.join(name))?);
        let plaintext = crypto::decrypt(&token, password)?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::format(format!("{}: decrypted entry is not UTF-8", name)))
    }

    /// Write through a hidden temp sibling and rename into place.
    fn write_file(&self, filename: &str, contents: &[u8]) -> Result<()> {
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", filename, uuid::Uuid::new_v4()));
        fs::write(&tmp, contents)?;
        if let Err(e) = fs::rename(&tmp, self.dir.join(filename)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const PW: &str = "correct horse";

    fn store(dir: &TempDir) -> EntryStore {
        EntryStore::new(dir.path()).with_iterations(10)
    }

    fn at(secs: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn add(store: &EntryStore, body: &str, created: DateTime<Local>) -> Result<String> {
        let entry = Entry::new(body, created);
        let token = crypto::encrypt(entry::encode(&entry).as_bytes(), PW, store.iterations())?;
        let name = entry_filename(&created);
        store.append(&name, &token)?;
        Ok(name)
    }

    #[test]
    fn test_entry_filename_format() {
        let created = Local.with_ymd_and_hms(2021, 5, 9, 7, 3, 1).unwrap();
        assert_eq!(entry_filename(&created), "2021_05_09-07_03_01");
    }

    #[test]
    fn test_entry_kind() {
        assert_eq!(EntryKind::of("2021_05_09-07_03_01"), EntryKind::Encrypted);
        assert_eq!(EntryKind::of("2021_05_09-07_03_01.md"), EntryKind::Plaintext);
    }

    #[test]
    fn test_list_skips_hidden_and_dirs() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("b"), "x")?;
        fs::write(dir.path().join("a"), "x")?;
        fs::write(dir.path().join(".gitignore"), "x")?;
        fs::create_dir(dir.path().join("sub"))?;

        assert_eq!(store(&dir).list_entry_filenames()?, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_append_writes_token_only() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        let name = add(&store, "hello", at(0))?;

        let content = fs::read_to_string(dir.path().join(&name))?;
        assert!(!content.contains("hello"));
        assert!(crypto::TokenHeader::parse(&CipherToken::from(content)).is_ok());
        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_same_second_overwrites() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        add(&store, "first", at(0))?;
        add(&store, "second", at(0))?;

        let entries = store.read_and_decrypt_all(PW)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].body(), "second");
        Ok(())
    }

    #[test]
    fn test_read_and_decrypt_all_is_read_only() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        add(&store, "one", at(0))?;
        add(&store, "two", at(1))?;
        let before = store.list_entry_filenames()?;

        let entries = store.read_and_decrypt_all(PW)?;
        let bodies: Vec<&str> = entries.iter().map(Entry::body).collect();
        assert_eq!(bodies, vec!["one", "two"]);
        assert_eq!(store.list_entry_filenames()?, before);
        Ok(())
    }

    #[test]
    fn test_wrong_password_is_authentication_error() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        add(&store, "secret", at(0))?;

        assert!(matches!(
            store.read_and_decrypt_all("nope"),
            Err(Error::Authentication)
        ));
        Ok(())
    }

    #[test]
    fn test_decrypt_then_encrypt_restores_entries() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        add(&store, "a", at(0))?;
        add(&store, "b\n---\nstill b", at(1))?;
        let original = store.read_and_decrypt_all(PW)?;

        let report = store.decrypt_all(PW)?;
        assert_eq!(report.converted, 2);
        let names = store.list_entry_filenames()?;
        assert!(names.iter().all(|n| EntryKind::of(n) == EntryKind::Plaintext));
        assert_eq!(store.read_and_decrypt_all(PW)?, original);

        let report = store.encrypt_all(PW)?;
        assert_eq!(report.converted, 2);
        let names = store.list_entry_filenames()?;
        assert!(names.iter().all(|n| EntryKind::of(n) == EntryKind::Encrypted));
        assert_eq!(store.read_and_decrypt_all(PW)?, original);
        Ok(())
    }

    #[test]
    fn test_transitions_are_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        add(&store, "a", at(0))?;

        store.decrypt_all(PW)?;
        let again = store.decrypt_all(PW)?;
        assert_eq!(again, TransitionReport { converted: 0, skipped: 1 });

        store.encrypt_all(PW)?;
        let again = store.encrypt_all(PW)?;
        assert_eq!(again, TransitionReport { converted: 0, skipped: 1 });
        Ok(())
    }

    #[test]
    fn test_interrupted_decrypt_resumes() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        let name = add(&store, "a", at(0))?;
        add(&store, "b", at(1))?;

        // Simulate a crash after the plaintext was written but before the
        // encrypted original was removed.
        let text = store.decrypt_file(&name, PW)?;
        fs::write(dir.path().join(format!("{}.md", name)), &text)?;

        // Listing does not show the entry twice.
        assert_eq!(store.read_and_decrypt_all(PW)?.len(), 2);

        store.decrypt_all(PW)?;
        let names = store.list_entry_filenames()?;
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(PLAINTEXT_SUFFIX)));
        Ok(())
    }

    #[test]
    fn test_encrypt_all_rejects_broken_envelope() -> Result<()> {
        let dir = TempDir::new()?;
        let store = store(&dir);
        fs::write(dir.path().join("2021_01_01-00_00_00.md"), "no header here")?;

        assert!(matches!(store.encrypt_all(PW), Err(Error::Format(_))));
        // The plaintext is kept so nothing is lost.
        assert!(dir.path().join("2021_01_01-00_00_00.md").exists());
        Ok(())
    }
}
