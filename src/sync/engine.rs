//! Sync engine: the journal directory as an explicit git state machine.
//!
//! ```text
//! NoRepository --ensure--> Repository --reconcile--> (pulled) --mutate--> dirty --publish--> clean
//! ```
//!
//! Every mutating journal operation is bracketed by [`SyncEngine::reconcile`] before
//! and [`SyncEngine::publish`] after. All transitions are idempotent.

use super::git::GitRepo;
use crate::config::JournalConfiguration;
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::{debug, info};

/// Name of the tracked remote
pub const REMOTE_NAME: &str = "origin";

/// Message of every journal commit
pub const COMMIT_MESSAGE: &str = "update journal";

/// Remote synchronization settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSettings {
    /// Pull and push
    pub enabled: bool,
    /// URL used when the remote has to be created
    pub remote_url: Option<String>,
}

impl SyncSettings {
    pub fn from_config(config: &JournalConfiguration) -> Self {
        Self {
            enabled: config.sync_to_git,
            remote_url: config.sync_remote().map(str::to_string),
        }
    }

    /// Commit locally, never touch the network
    pub fn local() -> Self {
        Self::default()
    }
}

/// Where the journal directory stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryState {
    NoRepository,
    Repository,
}

/// Result of [`SyncEngine::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Sync disabled, no network operation
    Skipped,
    UpToDate,
    Pulled,
}

/// Result of [`SyncEngine::publish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub committed: bool,
    pub pushed: bool,
}

pub struct SyncEngine {
    workdir: PathBuf,
    settings: SyncSettings,
    repo: Option<GitRepo>,
}

impl SyncEngine {
    pub fn new(workdir: impl Into<PathBuf>, settings: SyncSettings) -> Self {
        let workdir = workdir.into();
        let repo = if GitRepo::exists(&workdir) {
            GitRepo::open(&workdir).ok()
        } else {
            None
        };
        Self {
            workdir,
            settings,
            repo,
        }
    }

    pub fn state(&self) -> RepositoryState {
        match self.repo {
            Some(_) => RepositoryState::Repository,
            None => RepositoryState::NoRepository,
        }
    }

    /// NoRepository -> Repository.
    ///
    /// Opens or initializes the working tree, keeps decrypted entries excluded (also
    /// in clones made with plain git) and, when syncing, makes sure the remote exists
    /// and the current branch tracks it.
    pub fn ensure(&mut self) -> Result<&GitRepo> {
        let repo = match self.repo.take() {
            Some(repo) => repo,
            None => {
                if !GitRepo::exists(&self.workdir) {
                    info!("[sync] Creating git repository in {}", self.workdir.display());
                }
                GitRepo::open_or_init(&self.workdir)?
            }
        };
        repo.ensure_excludes()?;

        if self.settings.enabled && !repo.has_remote(REMOTE_NAME) {
            let url = self.settings.remote_url.as_deref().ok_or_else(|| {
                Error::sync("git sync is enabled but no remote URL is configured")
            })?;
            repo.add_remote(REMOTE_NAME, url)?;
            repo.set_upstream(REMOTE_NAME, &repo.branch_name())?;
            info!("[sync] Added remote {} -> {}", REMOTE_NAME, url);
        }

        Ok(self.repo.insert(repo))
    }

    /// Pull from the tracked remote when syncing is enabled.
    ///
    /// Must run before any read or write that should see the latest shared state.
    pub fn reconcile(&mut self) -> Result<ReconcileOutcome> {
        let enabled = self.settings.enabled;
        let repo = self.ensure()?;

        if !enabled {
            debug!("[sync] Remote sync disabled, skipping pull");
            return Ok(ReconcileOutcome::Skipped);
        }

        let branch = repo.branch_name();
        if repo.pull(REMOTE_NAME, &branch)? {
            info!("[sync] Pulled {}/{}", REMOTE_NAME, branch);
            Ok(ReconcileOutcome::Pulled)
        } else {
            debug!("[sync] Already up to date");
            Ok(ReconcileOutcome::UpToDate)
        }
    }

    /// Commit pending changes and push unpublished commits.
    ///
    /// A clean tree with nothing ahead of the remote does neither.
    pub fn publish(&mut self) -> Result<PublishOutcome> {
        let enabled = self.settings.enabled;
        let repo = self.ensure()?;
        let mut outcome = PublishOutcome::default();

        if repo.has_changes()? {
            repo.stage_all()?;
            let oid = repo.commit(COMMIT_MESSAGE)?;
            info!("[sync] Committed {}", oid);
            outcome.committed = true;
        }

        if enabled {
            let branch = repo.branch_name();
            let (ahead, _) = repo.ahead_behind(REMOTE_NAME, &branch)?;
            if ahead > 0 {
                repo.push(REMOTE_NAME, &branch)?;
                info!("[sync] Pushed {} commit(s) to {}/{}", ahead, REMOTE_NAME, branch);
                outcome.pushed = true;
            }
        }

        Ok(outcome)
    }
}
