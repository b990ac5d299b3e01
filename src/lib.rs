//! Giournal core library
//!
//! Encrypted, git-backed personal journal. Provides:
//! - Password-based AES-256-GCM tokens with the KDF parameters embedded
//! - A plaintext entry envelope (TOML header + verbatim body)
//! - One-file-per-entry storage with resumable bulk encrypt/decrypt
//! - Git synchronization as an explicit reconcile/publish state machine
//!
//! Principle: entries are only ever committed in encrypted form.

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod journal;
pub mod store;
pub mod sync;

// Re-export main types
pub use config::JournalConfiguration;
pub use credentials::{CredentialStore, KeyringCredentials, MemoryCredentials, PromptCredentials};
pub use crypto::CipherToken;
pub use entry::Entry;
pub use error::{Error, Result};
pub use journal::Journal;
pub use store::{EntryStore, TransitionReport};
pub use sync::{PublishOutcome, ReconcileOutcome, RepositoryState, SyncEngine, SyncSettings};
