//! Git operations for the journal directory.
//!
//! Uses libgit2 (via the git2 crate) for local work:
//! - Open / init the repository
//! - Remotes and upstream tracking
//! - Status, staging and commits
//!
//! Pull and push shell out to the `git` CLI so the user's SSH agent and credential
//! helpers apply unchanged.

use crate::error::{Error, Result};
use crate::store::PLAINTEXT_SUFFIX;
use git2::{
    Commit, IndexAddOption, IndexMatchedPath, Repository, RepositoryInitOptions, Signature,
    StatusOptions,
};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Branch used for new repositories
pub const DEFAULT_BRANCH: &str = "main";

/// Local exclusions, kept in `.git/info/exclude` so every clone carries its own
const EXCLUDES: &[&str] = &["*.md", ".*.tmp"];

/// Git working tree of a journal
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Workdir path
    pub fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::sync("repository has no working tree"))
    }

    /// Open an existing repository rooted exactly at `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        let repo = Repository::open(dir).map_err(|e| {
            Error::sync(format!("cannot open git repository {}: {}", dir.display(), e))
        })?;
        Ok(Self { repo })
    }

    /// Initialize a new repository in place
    pub fn init(dir: &Path) -> Result<Self> {
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head(DEFAULT_BRANCH);

        let repo = Repository::init_opts(dir, &opts).map_err(|e| {
            Error::sync(format!("cannot init git repository {}: {}", dir.display(), e))
        })?;

        let git_repo = Self { repo };
        git_repo.ensure_excludes()?;
        Ok(git_repo)
    }

    /// Keep decrypted entries and temp files out of every commit.
    pub fn ensure_excludes(&self) -> Result<()> {
        let info_dir = self.repo.path().join("info");
        std::fs::create_dir_all(&info_dir)?;
        let exclude_path = info_dir.join("exclude");

        let mut content = std::fs::read_to_string(&exclude_path).unwrap_or_default();
        let missing: Vec<&str> = EXCLUDES
            .iter()
            .copied()
            .filter(|pattern| !content.lines().any(|line| line.trim() == *pattern))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str("# giournal: decrypted entries and in-flight writes stay local\n");
        for pattern in missing {
            content.push_str(pattern);
            content.push('\n');
        }
        std::fs::write(&exclude_path, content)?;
        debug!("[git] Updated {}", exclude_path.display());
        Ok(())
    }

    /// Whether `dir` is itself the root of a working tree
    pub fn exists(dir: &Path) -> bool {
        dir.join(".git").exists()
    }

    /// Open or init the repository
    pub fn open_or_init(dir: &Path) -> Result<Self> {
        if Self::exists(dir) {
            let repo = Self::open(dir)?;
            repo.ensure_excludes()?;
            Ok(repo)
        } else {
            Self::init(dir)
        }
    }

    /// Current branch, also for an unborn HEAD
    pub fn branch_name(&self) -> String {
        self.repo
            .find_reference("HEAD")
            .ok()
            .and_then(|head| {
                head.symbolic_target()
                    .map(|t| t.trim_start_matches("refs/heads/").to_string())
            })
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }

    /// Check whether a remote exists
    pub fn has_remote(&self, name: &str) -> bool {
        self.repo.find_remote(name).is_ok()
    }

    /// Remote URL
    pub fn remote_url(&self, name: &str) -> Result<String> {
        let remote = self.repo.find_remote(name)?;
        remote
            .url()
            .map(str::to_string)
            .ok_or_else(|| Error::sync(format!("remote '{}' has no URL", name)))
    }

    /// Add a remote
    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.repo
            .remote(name, url)
            .map_err(|e| Error::sync(format!("cannot add remote '{}': {}", name, e)))?;
        Ok(())
    }

    /// Make `branch` track `remote/branch`.
    ///
    /// Written as plain config so it also works before the first commit.
    pub fn set_upstream(&self, remote: &str, branch: &str) -> Result<()> {
        let mut config = self.repo.config()?;
        config.set_str(&format!("branch.{}.remote", branch), remote)?;
        config.set_str(
            &format!("branch.{}.merge", branch),
            &format!("refs/heads/{}", branch),
        )?;
        Ok(())
    }

    /// Whether a change to `path` (relative to the working tree) must stay uncommitted.
    ///
    /// Decrypted entries never leave the machine, whatever the exclude file says. An
    /// entry that is gone while its decrypted sibling exists is being edited, so its
    /// removal is held back until it is encrypted again.
    fn is_local_only(&self, path: &Path) -> bool {
        let name = path.to_string_lossy();
        if name.ends_with(PLAINTEXT_SUFFIX) {
            return true;
        }
        match self.repo.workdir() {
            Some(workdir) => {
                !workdir.join(path).exists()
                    && workdir.join(format!("{}{}", name, PLAINTEXT_SUFFIX)).exists()
            }
            None => false,
        }
    }

    /// Uncommitted changes worth publishing, untracked files included, ignored and
    /// local-only files excluded
    pub fn has_changes(&self) -> Result<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses.iter().any(|entry| match entry.path() {
            Some(path) => !self.is_local_only(Path::new(path)),
            None => true,
        }))
    }

    /// Stage all changes, deletions included, skipping local-only paths
    pub fn stage_all(&self) -> Result<()> {
        let mut index = self.repo.index()?;
        // The git CLI may have rewritten the index during a pull
        index.read(false)?;

        let mut skip_local = |path: &Path, _matched: &[u8]| -> i32 {
            if self.is_local_only(path) {
                debug!("[git] Not staging {}", path.display());
                1
            } else {
                0
            }
        };
        index.add_all(
            ["*"].iter(),
            IndexAddOption::DEFAULT,
            Some(&mut skip_local as &mut IndexMatchedPath),
        )?;
        index.update_all(["*"].iter(), Some(&mut skip_local as &mut IndexMatchedPath))?;
        index.write()?;
        Ok(())
    }

    /// Create a commit from the index
    pub fn commit(&self, message: &str) -> Result<git2::Oid> {
        // Signature from git config, or a fixed fallback
        let sig = self
            .repo
            .signature()
            .or_else(|_| Signature::now("Giournal", "giournal@local"))?;

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let commit_id = match self.head_commit() {
            Some(parent) => {
                self.repo
                    .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&parent])?
            }
            None => self
                .repo
                .commit(Some("HEAD"), &sig, &sig, message, &tree, &[])?,
        };

        Ok(commit_id)
    }

    /// HEAD commit, if any
    fn head_commit(&self) -> Option<Commit<'_>> {
        self.repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok())
    }

    /// Commits ahead/behind compared to the remote-tracking branch
    pub fn ahead_behind(&self, remote_name: &str, branch: &str) -> Result<(usize, usize)> {
        let local_ref = format!("refs/heads/{}", branch);
        let remote_ref = format!("refs/remotes/{}/{}", remote_name, branch);

        let local_oid = self
            .repo
            .find_reference(&local_ref)
            .ok()
            .and_then(|r| r.target());

        let remote_oid = self
            .repo
            .find_reference(&remote_ref)
            .ok()
            .and_then(|r| r.target());

        match (local_oid, remote_oid) {
            (Some(local), Some(remote)) => Ok(self.repo.graph_ahead_behind(local, remote)?),
            // Remote has no such branch: every local commit is ahead
            (Some(_), None) => Ok((self.count_commits()?, 0)),
            // No local commits yet
            (None, _) => Ok((0, 0)),
        }
    }

    /// Count commits reachable from HEAD
    fn count_commits(&self) -> Result<usize> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        Ok(revwalk.count())
    }

    /// Run the git CLI inside the working tree.
    ///
    /// Output is parsed below, so git must not translate its messages.
    fn git(&self, args: &[&str]) -> Result<Output> {
        let workdir = self.workdir()?;
        debug!("[git] git {}", args.join(" "));
        Command::new("git")
            .current_dir(&workdir)
            .env("LC_ALL", "C")
            .args(args)
            .output()
            .map_err(|e| Error::sync(format!("cannot execute git: {}", e)))
    }

    /// Pull (fetch + merge, never rebase).
    ///
    /// Returns Ok(true) if anything was pulled, Ok(false) if already up to date or the
    /// remote has no such branch yet.
    pub fn pull(&self, remote_name: &str, branch: &str) -> Result<bool> {
        let output = self.git(&["pull", "--no-rebase", remote_name, branch])?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if output.status.success() {
            if stdout.contains("Already up to date") || stdout.contains("Already up-to-date") {
                return Ok(false);
            }
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);

        // Freshly created remote without any commits
        if stderr.contains("couldn't find remote ref")
            || stderr.contains("Couldn't find remote ref")
        {
            return Ok(false);
        }

        if stderr.contains("refusing to merge unrelated histories") {
            return Err(Error::sync(
                "cannot merge: local journal and remote have unrelated histories.\n\
                 This usually happens when the remote was initialized with a README.\n\
                 Resolve manually with: git pull --allow-unrelated-histories",
            ));
        }

        // Merge results go to stdout, transport errors to stderr
        let merge_failed = |text: &str| {
            text.contains("CONFLICT") || text.contains("Automatic merge failed")
        };
        if merge_failed(&stdout) || merge_failed(&stderr) {
            return Err(Error::sync(format!(
                "merge conflict detected. Please resolve manually:\n\
                 1. cd {}\n\
                 2. Resolve conflicts in affected files\n\
                 3. git add . && git commit\n\
                 4. Run giournal again",
                self.workdir()?.display()
            )));
        }

        Err(Error::sync(format!(
            "git pull failed: {}",
            format!("{}\n{}", stdout.trim(), stderr.trim()).trim()
        )))
    }

    /// Push `branch` and set its upstream
    pub fn push(&self, remote_name: &str, branch: &str) -> Result<()> {
        let output = self.git(&["push", "-u", remote_name, branch])?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::sync(format!("git push failed: {}", stderr.trim())));
        }

        Ok(())
    }

    /// Number of commits on HEAD (0 for an unborn branch)
    pub fn commit_count(&self) -> usize {
        if self.head_commit().is_none() {
            return 0;
        }
        self.count_commits().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_repo_and_excludes() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(!GitRepo::exists(dir.path()));

        let repo = GitRepo::init(dir.path())?;
        assert!(GitRepo::exists(dir.path()));
        assert_eq!(repo.branch_name(), DEFAULT_BRANCH);
        // Nothing tracked-to-be, so a fresh clone can pull cleanly.
        assert!(!repo.has_changes()?);

        let exclude = std::fs::read_to_string(dir.path().join(".git/info/exclude"))?;
        assert!(exclude.lines().any(|l| l == "*.md"));
        Ok(())
    }

    #[test]
    fn test_ensure_excludes_is_idempotent() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        repo.ensure_excludes()?;
        GitRepo::open_or_init(dir.path())?;

        let exclude = std::fs::read_to_string(dir.path().join(".git/info/exclude"))?;
        assert_eq!(exclude.lines().filter(|l| *l == "*.md").count(), 1);
        Ok(())
    }

    #[test]
    fn test_open_or_init_keeps_existing() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        std::fs::write(dir.path().join("entry"), "token")?;
        repo.stage_all()?;
        repo.commit("first")?;

        let reopened = GitRepo::open_or_init(dir.path())?;
        assert_eq!(reopened.commit_count(), 1);
        Ok(())
    }

    #[test]
    fn test_stage_and_commit() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        assert!(!repo.has_changes()?);

        std::fs::write(dir.path().join("entry"), "token")?;
        repo.stage_all()?;
        repo.commit("add entry")?;
        assert!(!repo.has_changes()?);

        std::fs::remove_file(dir.path().join("entry"))?;
        assert!(repo.has_changes()?);
        repo.stage_all()?;
        repo.commit("remove entry")?;
        assert!(!repo.has_changes()?);
        assert_eq!(repo.commit_count(), 2);
        Ok(())
    }

    #[test]
    fn test_plaintext_entries_are_ignored() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        repo.stage_all()?;
        repo.commit("init")?;

        std::fs::write(dir.path().join("2021_01_01-00_00_00.md"), "secret")?;
        assert!(!repo.has_changes()?);
        Ok(())
    }

    #[test]
    fn test_plaintext_never_staged_without_excludes() -> Result<()> {
        let dir = TempDir::new()?;
        // Repository created elsewhere, no exclude entries
        Repository::init(dir.path())?;
        let repo = GitRepo::open(dir.path())?;

        std::fs::write(dir.path().join("2021_01_01-00_00_00.md"), "secret")?;
        assert!(!repo.has_changes()?);

        std::fs::write(dir.path().join("2021_01_01-00_00_01"), "token")?;
        assert!(repo.has_changes()?);
        repo.stage_all()?;
        repo.commit("add entry")?;

        let tree = repo.head_commit().expect("head").tree()?;
        let names: Vec<String> = tree
            .iter()
            .filter_map(|e| e.name().map(str::to_string))
            .collect();
        assert_eq!(names, vec!["2021_01_01-00_00_01"]);
        assert!(!repo.has_changes()?);
        Ok(())
    }

    #[test]
    fn test_deletion_held_back_while_decrypted() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        let entry = dir.path().join("2021_01_01-00_00_00");
        std::fs::write(&entry, "token")?;
        repo.stage_all()?;
        repo.commit("add entry")?;

        // Decrypted for editing
        std::fs::remove_file(&entry)?;
        std::fs::write(dir.path().join("2021_01_01-00_00_00.md"), "plaintext")?;
        assert!(!repo.has_changes()?);
        repo.stage_all()?;
        assert!(repo.repo.index()?.get_path(Path::new("2021_01_01-00_00_00"), 0).is_some());

        // Encrypted again with a fresh token
        std::fs::remove_file(dir.path().join("2021_01_01-00_00_00.md"))?;
        std::fs::write(&entry, "new token")?;
        assert!(repo.has_changes()?);

        // A plain removal is still published
        std::fs::remove_file(&entry)?;
        assert!(repo.has_changes()?);
        Ok(())
    }

    #[test]
    fn test_remote_and_upstream() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        assert!(!repo.has_remote("origin"));

        repo.add_remote("origin", "git@example.com:user/journal.git")?;
        repo.set_upstream("origin", "main")?;

        assert!(repo.has_remote("origin"));
        assert_eq!(repo.remote_url("origin")?, "git@example.com:user/journal.git");
        let config = repo.repo.config()?;
        assert_eq!(config.get_string("branch.main.remote")?, "origin");
        assert_eq!(config.get_string("branch.main.merge")?, "refs/heads/main");
        Ok(())
    }

    #[test]
    fn test_ahead_without_remote_branch() -> Result<()> {
        let dir = TempDir::new()?;
        let repo = GitRepo::init(dir.path())?;
        assert_eq!(repo.ahead_behind("origin", "main")?, (0, 0));

        repo.stage_all()?;
        repo.commit("init")?;
        assert_eq!(repo.ahead_behind("origin", "main")?, (1, 0));
        Ok(())
    }
}
