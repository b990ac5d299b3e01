//! Sync module - keeps the journal directory under git.
//!
//! This module contains:
//! - GitRepo: local git operations plus pull/push
//! - SyncEngine: the reconcile/publish state machine used by the journal

pub mod engine;
pub mod git;

pub use engine::{
    PublishOutcome, ReconcileOutcome, RepositoryState, SyncEngine, SyncSettings, COMMIT_MESSAGE,
    REMOTE_NAME,
};
pub use git::GitRepo;
