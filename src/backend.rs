//! The version-control capability the interaction core talks to.
//!
//! Everything here is blocking; callers run it on `spawn_blocking`.

use std::path::{Path, PathBuf};

use crate::branch::{BranchItem, TagItem};
use crate::cache::HeadState;
use crate::files::FileItem;
use crate::git_ops;
use crate::log::CommitItem;
use crate::operation::{OperationError, OperationKind, OperationOutput};
use crate::remotes::RemoteItem;

/// Read-only text shown in the Detail pane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetailQuery {
    Commit { hash: String },
    FileDiff { path: String, staged: bool, untracked: bool },
    Conflict { path: String },
}

impl DetailQuery {
    pub fn title(&self) -> String {
        match self {
            DetailQuery::Commit { hash } => format!("commit {}", crate::operation::short_rev(hash)),
            DetailQuery::FileDiff { path, staged: true, .. } => format!("{} (staged)", path),
            DetailQuery::FileDiff { path, .. } => path.clone(),
            DetailQuery::Conflict { path } => format!("{} (conflicts)", path),
        }
    }
}

pub trait Backend: Send + Sync {
    /// Execute one mutating operation.
    fn run(&self, op: &OperationKind) -> Result<OperationOutput, OperationError>;

    fn query_head(&self) -> Result<HeadState, String>;
    fn query_branches(&self) -> Result<Vec<BranchItem>, String>;
    fn query_tags(&self) -> Result<Vec<TagItem>, String>;
    fn query_log(&self, limit: usize) -> Result<Vec<CommitItem>, String>;
    fn query_status(&self) -> Result<Vec<FileItem>, String>;
    fn query_remotes(&self) -> Result<Vec<RemoteItem>, String>;

    fn load_detail(&self, query: &DetailQuery) -> Result<Vec<String>, String>;
}

/// Backend driving the `git` executable.
pub struct GitCli {
    repo_root: PathBuf,
}

impl GitCli {
    /// Locate the repository containing `path`.
    pub fn discover(path: &Path) -> Result<Self, String> {
        let repo_root = git_ops::discover_repo_root(path)?;
        Ok(Self { repo_root })
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }
}

impl Backend for GitCli {
    fn run(&self, op: &OperationKind) -> Result<OperationOutput, OperationError> {
        let root = self.repo_root.as_path();
        match op {
            OperationKind::Checkout { target, strategy } => git_ops::checkout(root, target, *strategy),
            OperationKind::CreateBranch { name } => git_ops::create_branch(root, name),
            OperationKind::DeleteBranch { name } => git_ops::delete_branch(root, name),
            OperationKind::Merge { branch } => git_ops::merge(root, branch),
            OperationKind::MergeAbort => git_ops::merge_abort(root),
            OperationKind::RevertAbort => git_ops::revert_abort(root),
            OperationKind::Fetch { remote } => git_ops::fetch(root, remote),
            OperationKind::Pull => git_ops::pull(root),
            OperationKind::PullBranch { branch, upstream } => {
                git_ops::pull_branch(root, branch, upstream)
            }
            OperationKind::Push => git_ops::push(root),
            OperationKind::Revert { hash, parent_count } => {
                git_ops::revert_no_commit(root, hash, *parent_count)
            }
            OperationKind::Stage { path } => git_ops::stage_path(root, path),
            OperationKind::Unstage { path } => git_ops::unstage_path(root, path),
            OperationKind::StageAll { paths } => git_ops::stage_paths(root, paths),
            OperationKind::UnstageAll { paths } => git_ops::unstage_paths(root, paths),
            OperationKind::Commit { message } => git_ops::commit_message(root, message),
            OperationKind::AddRemote { name, url } => git_ops::add_remote(root, name, url),
            OperationKind::RemoveRemote { name } => git_ops::remove_remote(root, name),
        }
    }

    fn query_head(&self) -> Result<HeadState, String> {
        git_ops::head_state(&self.repo_root)
    }

    fn query_branches(&self) -> Result<Vec<BranchItem>, String> {
        git_ops::list_branches(&self.repo_root)
    }

    fn query_tags(&self) -> Result<Vec<TagItem>, String> {
        git_ops::list_tags(&self.repo_root)
    }

    fn query_log(&self, limit: usize) -> Result<Vec<CommitItem>, String> {
        git_ops::list_history(&self.repo_root, limit)
    }

    fn query_status(&self) -> Result<Vec<FileItem>, String> {
        git_ops::list_status(&self.repo_root)
    }

    fn query_remotes(&self) -> Result<Vec<RemoteItem>, String> {
        git_ops::list_remotes(&self.repo_root)
    }

    fn load_detail(&self, query: &DetailQuery) -> Result<Vec<String>, String> {
        match query {
            DetailQuery::Commit { hash } => git_ops::show_commit(&self.repo_root, hash),
            DetailQuery::FileDiff {
                path,
                staged,
                untracked,
            } => git_ops::file_diff_lines(&self.repo_root, path, *staged, *untracked),
            DetailQuery::Conflict { path } => git_ops::conflict_lines(&self.repo_root, path),
        }
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory repository used by runner and app tests.

    use std::collections::{HashMap, HashSet};

    use parking_lot::Mutex;

    use super::*;
    use crate::files::FileStatus;
    use crate::operation::{CheckoutStrategy, CheckoutTarget};

    #[derive(Debug, Default)]
    pub struct FakeRepo {
        pub head: String,
        pub detached: Option<String>,
        pub branches: Vec<BranchItem>,
        pub tags: Vec<TagItem>,
        pub commits: Vec<CommitItem>,
        pub files: Vec<FileItem>,
        pub remotes: Vec<RemoteItem>,
        /// A safe checkout fails as if these paths had local changes.
        pub dirty: Vec<String>,
        /// `git add`/`restore` on these paths fails.
        pub locked_paths: HashSet<String>,
        /// Merging any branch conflicts in these paths.
        pub merge_conflicts: Vec<String>,
        pub push_rejected: bool,
        /// Next result for an operation label, consumed on use.
        pub scripted: HashMap<&'static str, OperationError>,
        pub calls: Vec<OperationKind>,
        pub pulls: usize,
        next_commit: usize,
    }

    pub struct FakeBackend {
        pub repo: Mutex<FakeRepo>,
    }

    pub fn commit(hash: &str, summary: &str) -> CommitItem {
        CommitItem {
            hash: hash.to_string(),
            short: hash.chars().take(7).collect(),
            summary: summary.to_string(),
            author: "Test".to_string(),
            date: "2024-01-01".to_string(),
            parent_count: 1,
        }
    }

    impl FakeBackend {
        /// `main` and `dev`, `origin` remote with `origin/main`, two commits.
        pub fn new() -> Self {
            let mut origin_main = BranchItem::local("origin/main");
            origin_main.is_remote = true;
            let mut main = BranchItem::local("main");
            main.upstream = Some("origin/main".to_string());
            let repo = FakeRepo {
                head: "main".to_string(),
                branches: vec![main, BranchItem::local("dev"), origin_main],
                tags: vec![TagItem {
                    name: "v1.0".to_string(),
                    target: "c1".to_string(),
                }],
                commits: vec![commit("c2", "Add parser"), commit("c1", "Initial import")],
                remotes: vec![RemoteItem {
                    name: "origin".to_string(),
                    url: "https://example.com/repo.git".to_string(),
                }],
                next_commit: 3,
                ..FakeRepo::default()
            };
            Self {
                repo: Mutex::new(repo),
            }
        }

        pub fn with_files(self, files: Vec<FileItem>) -> Self {
            self.repo.lock().files = files;
            self
        }

        pub fn calls(&self) -> Vec<OperationKind> {
            self.repo.lock().calls.clone()
        }

        pub fn script(&self, label: &'static str, err: OperationError) {
            self.repo.lock().scripted.insert(label, err);
        }
    }

    fn set_staged(repo: &mut FakeRepo, path: &str, staged: bool) -> Result<(), OperationError> {
        if repo.locked_paths.contains(path) {
            return Err(OperationError::Backend(format!(
                "unable to index file '{}': Permission denied",
                path
            )));
        }
        let Some(status) = repo.files.iter().find(|f| f.path == path).map(|f| f.status) else {
            return Err(OperationError::Backend(format!(
                "pathspec '{}' did not match any files",
                path
            )));
        };
        repo.files.retain(|f| f.path != path);
        repo.files.push(FileItem::new(path, staged, status));
        Ok(())
    }

    fn set_all(repo: &mut FakeRepo, paths: &[String], staged: bool) -> Result<(), OperationError> {
        let mut failed = Vec::new();
        let mut succeeded = 0;
        for path in paths {
            match set_staged(repo, path, staged) {
                Ok(()) => succeeded += 1,
                Err(e) => failed.push((path.clone(), e.to_string())),
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(OperationError::PartialFailure { failed, succeeded })
        }
    }

    impl Backend for FakeBackend {
        fn run(&self, op: &OperationKind) -> Result<OperationOutput, OperationError> {
            let mut repo = self.repo.lock();
            repo.calls.push(op.clone());
            if let Some(err) = repo.scripted.remove(op.label()) {
                return Err(err);
            }

            match op {
                OperationKind::Checkout { target, strategy } => {
                    if *strategy == CheckoutStrategy::Safe && !repo.dirty.is_empty() {
                        return Err(OperationError::DirtyWorkingTree {
                            paths: repo.dirty.clone(),
                        });
                    }
                    repo.dirty.clear();
                    match target {
                        CheckoutTarget::Branch(name) => {
                            if !repo.branches.iter().any(|b| !b.is_remote && &b.name == name) {
                                return Err(OperationError::Backend(format!(
                                    "pathspec '{}' did not match",
                                    name
                                )));
                            }
                            repo.head = name.clone();
                            repo.detached = None;
                        }
                        CheckoutTarget::RemoteBranch(remote) => {
                            let local = remote.split_once('/').map(|(_, r)| r).unwrap_or(remote);
                            let mut item = BranchItem::local(local);
                            item.upstream = Some(remote.clone());
                            repo.branches.push(item);
                            repo.head = local.to_string();
                            repo.detached = None;
                        }
                        CheckoutTarget::Detached(rev) => repo.detached = Some(rev.clone()),
                    }
                    Ok(OperationOutput::with_message(format!("Switched to {}", target.label())))
                }
                OperationKind::CreateBranch { name } => {
                    repo.branches.push(BranchItem::local(name.as_str()));
                    Ok(OperationOutput::with_message(format!("Created branch {}", name)))
                }
                OperationKind::DeleteBranch { name } => {
                    if repo.detached.is_none() && &repo.head == name {
                        return Err(OperationError::InvalidOperation(
                            "cannot delete the checked-out branch".to_string(),
                        ));
                    }
                    repo.branches.retain(|b| b.is_remote || &b.name != name);
                    Ok(OperationOutput::default())
                }
                OperationKind::Merge { .. } => {
                    if repo.merge_conflicts.is_empty() {
                        return Ok(OperationOutput::with_message("Merge made"));
                    }
                    let paths = repo.merge_conflicts.clone();
                    for p in &paths {
                        repo.files.push(FileItem::new(p.as_str(), false, FileStatus::Conflicted));
                    }
                    Err(OperationError::MergeConflict {
                        paths,
                        detail: "Automatic merge failed".to_string(),
                    })
                }
                OperationKind::MergeAbort | OperationKind::RevertAbort => {
                    repo.files.retain(|f| !f.is_conflicted());
                    Ok(OperationOutput::default())
                }
                OperationKind::Fetch { remote } => {
                    if repo.remotes.iter().any(|r| &r.name == remote) {
                        Ok(OperationOutput::default())
                    } else {
                        Err(OperationError::InvalidOperation(format!("no remote named '{}'", remote)))
                    }
                }
                OperationKind::Pull | OperationKind::PullBranch { .. } => {
                    repo.pulls += 1;
                    let n = repo.pulls;
                    Ok(OperationOutput::with_message(format!("pull #{}", n)))
                }
                OperationKind::Push => {
                    if repo.push_rejected {
                        Err(OperationError::NonFastForward("fetch first".to_string()))
                    } else {
                        Ok(OperationOutput::default())
                    }
                }
                OperationKind::Revert { hash, .. } => {
                    let path = format!("reverted-{}.txt", hash);
                    repo.files.push(FileItem::new(path, true, FileStatus::Modified));
                    Ok(OperationOutput::default())
                }
                OperationKind::Stage { path } => {
                    set_staged(&mut repo, path, true).map(|_| OperationOutput::default())
                }
                OperationKind::Unstage { path } => {
                    set_staged(&mut repo, path, false).map(|_| OperationOutput::default())
                }
                OperationKind::StageAll { paths } => {
                    set_all(&mut repo, paths, true).map(|_| OperationOutput::default())
                }
                OperationKind::UnstageAll { paths } => {
                    set_all(&mut repo, paths, false).map(|_| OperationOutput::default())
                }
                OperationKind::Commit { message } => {
                    if !repo.files.iter().any(|f| f.staged) {
                        return Err(OperationError::InvalidOperation(
                            "nothing to commit".to_string(),
                        ));
                    }
                    repo.files.retain(|f| !f.staged);
                    let hash = format!("c{}", repo.next_commit);
                    repo.next_commit += 1;
                    let created = commit(&hash, message.lines().next().unwrap_or(""));
                    repo.commits.insert(0, created.clone());
                    Ok(OperationOutput {
                        message: Some(format!("Committed {}", hash)),
                        commit: Some(created),
                    })
                }
                OperationKind::AddRemote { name, url } => {
                    repo.remotes.push(RemoteItem {
                        name: name.clone(),
                        url: url.clone(),
                    });
                    Ok(OperationOutput::default())
                }
                OperationKind::RemoveRemote { name } => {
                    repo.remotes.retain(|r| &r.name != name);
                    Ok(OperationOutput::default())
                }
            }
        }

        fn query_head(&self) -> Result<HeadState, String> {
            let repo = self.repo.lock();
            Ok(match &repo.detached {
                Some(rev) => HeadState::Detached(rev.clone()),
                None => HeadState::Branch(repo.head.clone()),
            })
        }

        fn query_branches(&self) -> Result<Vec<BranchItem>, String> {
            Ok(self.repo.lock().branches.clone())
        }

        fn query_tags(&self) -> Result<Vec<TagItem>, String> {
            Ok(self.repo.lock().tags.clone())
        }

        fn query_log(&self, limit: usize) -> Result<Vec<CommitItem>, String> {
            Ok(self.repo.lock().commits.iter().take(limit).cloned().collect())
        }

        fn query_status(&self) -> Result<Vec<FileItem>, String> {
            Ok(self.repo.lock().files.clone())
        }

        fn query_remotes(&self) -> Result<Vec<RemoteItem>, String> {
            Ok(self.repo.lock().remotes.clone())
        }

        fn load_detail(&self, query: &DetailQuery) -> Result<Vec<String>, String> {
            Ok(vec![query.title(), "fake detail".to_string()])
        }
    }
}
