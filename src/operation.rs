//! Requests sent to the operation runner and the results it posts back.
//!
//! Every mutation of the repository is described by an [`OperationKind`],
//! wrapped in an [`OperationRequest`] that remembers which pane asked for it
//! and what the event loop should do once the backend answers.

use thiserror::Error;

use crate::cache::RefreshScope;
use crate::log::CommitItem;
use crate::pane::PaneId;

pub type RequestId = u64;

/// What to do with local changes that block a checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckoutStrategy {
    /// Plain checkout; fails with `DirtyWorkingTree` when changes would be lost.
    Safe,
    /// Stash local changes (including untracked files) first.
    Stash,
    /// Throw local changes away.
    Discard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutTarget {
    /// A local branch.
    Branch(String),
    /// A remote-tracking branch such as `origin/feature`; a local tracking
    /// branch with the same short name is created.
    RemoteBranch(String),
    /// Any revision (commit hash, tag); leaves HEAD detached.
    Detached(String),
}

impl CheckoutTarget {
    pub fn label(&self) -> &str {
        match self {
            CheckoutTarget::Branch(name) => name,
            CheckoutTarget::RemoteBranch(name) => name,
            CheckoutTarget::Detached(rev) => short_rev(rev),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Checkout {
        target: CheckoutTarget,
        strategy: CheckoutStrategy,
    },
    CreateBranch {
        name: String,
    },
    DeleteBranch {
        name: String,
    },
    Merge {
        branch: String,
    },
    MergeAbort,
    RevertAbort,
    Fetch {
        remote: String,
    },
    /// Pull into the checked-out branch.
    Pull,
    /// Fast-forward a branch that is not checked out from its upstream.
    PullBranch {
        branch: String,
        upstream: String,
    },
    Push,
    /// Revert without committing; changes land in the index and worktree.
    Revert {
        hash: String,
        parent_count: usize,
    },
    Stage {
        path: String,
    },
    Unstage {
        path: String,
    },
    StageAll {
        paths: Vec<String>,
    },
    UnstageAll {
        paths: Vec<String>,
    },
    Commit {
        message: String,
    },
    AddRemote {
        name: String,
        url: String,
    },
    RemoveRemote {
        name: String,
    },
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Checkout { .. } => "checkout",
            OperationKind::CreateBranch { .. } => "new branch",
            OperationKind::DeleteBranch { .. } => "delete branch",
            OperationKind::Merge { .. } => "merge",
            OperationKind::MergeAbort => "merge --abort",
            OperationKind::RevertAbort => "revert --abort",
            OperationKind::Fetch { .. } => "fetch",
            OperationKind::Pull => "pull",
            OperationKind::PullBranch { .. } => "pull branch",
            OperationKind::Push => "push",
            OperationKind::Revert { .. } => "revert",
            OperationKind::Stage { .. } => "stage",
            OperationKind::Unstage { .. } => "unstage",
            OperationKind::StageAll { .. } => "stage all",
            OperationKind::UnstageAll { .. } => "unstage all",
            OperationKind::Commit { .. } => "commit",
            OperationKind::AddRemote { .. } => "add remote",
            OperationKind::RemoveRemote { .. } => "remove remote",
        }
    }

    /// Human readable description used in the status line.
    pub fn describe(&self) -> String {
        match self {
            OperationKind::Checkout { target, .. } => format!("checkout {}", target.label()),
            OperationKind::CreateBranch { name } => format!("branch {}", name),
            OperationKind::DeleteBranch { name } => format!("branch -d {}", name),
            OperationKind::Merge { branch } => format!("merge {}", branch),
            OperationKind::Fetch { remote } => format!("fetch {}", remote),
            OperationKind::PullBranch { branch, upstream } => {
                format!("pull {} into {}", upstream, branch)
            }
            OperationKind::Revert { hash, .. } => format!("revert --no-commit {}", short_rev(hash)),
            OperationKind::Stage { path } => format!("stage {}", path),
            OperationKind::Unstage { path } => format!("unstage {}", path),
            OperationKind::StageAll { paths } => format!("stage {} file(s)", paths.len()),
            OperationKind::UnstageAll { paths } => format!("unstage {} file(s)", paths.len()),
            OperationKind::AddRemote { name, .. } => format!("remote add {}", name),
            OperationKind::RemoveRemote { name } => format!("remote remove {}", name),
            other => other.label().to_string(),
        }
    }
}

/// What the event loop does with a finished operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// Re-query the given parts of the repository.
    Refresh(RefreshScope),
    /// Full refresh and put the Branches cursor on the checked-out branch.
    ShowCheckedOut,
    /// Full refresh and warn that HEAD is detached.
    ShowDetached,
    /// Refresh branches and select the named local branch.
    SelectBranch(String),
    /// Prepend the new commit to the log when the backend reported it.
    CommitCreated,
    /// Refresh the status and move focus to Files.
    ShowWorkingTree,
}

impl Continuation {
    pub fn refresh_scope(&self) -> RefreshScope {
        match self {
            Continuation::Refresh(scope) => *scope,
            Continuation::ShowCheckedOut | Continuation::ShowDetached => RefreshScope::ALL,
            Continuation::SelectBranch(_) => RefreshScope::BRANCHES,
            Continuation::CommitCreated => RefreshScope::ALL,
            Continuation::ShowWorkingTree => RefreshScope::STATUS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationRequest {
    pub id: RequestId,
    pub kind: OperationKind,
    pub origin: PaneId,
    pub continuation: Continuation,
}

/// Successful backend answer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationOutput {
    pub message: Option<String>,
    /// Metadata of a commit created by the operation, if the backend knows it.
    pub commit: Option<CommitItem>,
}

impl OperationOutput {
    pub fn with_message<S: Into<String>>(msg: S) -> Self {
        let msg = msg.into();
        Self {
            message: (!msg.trim().is_empty()).then_some(msg),
            commit: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationResult {
    pub request: OperationRequest,
    pub outcome: Result<OperationOutput, OperationError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidOperation,
    MergeConflict,
    NonFastForward,
    AuthenticationRequired,
    NetworkUnavailable,
    DirtyWorkingTree,
    PartialFailure,
    BackendError,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::MergeConflict => "merge conflict",
            ErrorKind::NonFastForward => "non-fast-forward",
            ErrorKind::AuthenticationRequired => "authentication required",
            ErrorKind::NetworkUnavailable => "network unavailable",
            ErrorKind::DirtyWorkingTree => "uncommitted changes",
            ErrorKind::PartialFailure => "partial failure",
            ErrorKind::BackendError => "git error",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("{0}")]
    InvalidOperation(String),
    #[error("conflicts in {} file(s)", .paths.len())]
    MergeConflict { paths: Vec<String>, detail: String },
    #[error("remote has diverged; fetch and merge before pushing")]
    NonFastForward(String),
    #[error("remote requires authentication")]
    AuthenticationRequired(String),
    #[error("remote is unreachable")]
    NetworkUnavailable(String),
    #[error("local changes would be overwritten")]
    DirtyWorkingTree { paths: Vec<String> },
    #[error("{} path(s) failed, {succeeded} succeeded", .failed.len())]
    PartialFailure {
        failed: Vec<(String, String)>,
        succeeded: usize,
    },
    #[error("{0}")]
    Backend(String),
}

impl OperationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OperationError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            OperationError::MergeConflict { .. } => ErrorKind::MergeConflict,
            OperationError::NonFastForward(_) => ErrorKind::NonFastForward,
            OperationError::AuthenticationRequired(_) => ErrorKind::AuthenticationRequired,
            OperationError::NetworkUnavailable(_) => ErrorKind::NetworkUnavailable,
            OperationError::DirtyWorkingTree { .. } => ErrorKind::DirtyWorkingTree,
            OperationError::PartialFailure { .. } => ErrorKind::PartialFailure,
            OperationError::Backend(_) => ErrorKind::BackendError,
        }
    }

    /// Append context to the failure text. Kinds without free text fall
    /// back to `Backend` so the note is not lost.
    pub fn with_note(self, note: &str) -> Self {
        match self {
            OperationError::InvalidOperation(msg) => {
                OperationError::InvalidOperation(format!("{}; {}", msg, note))
            }
            OperationError::Backend(msg) => OperationError::Backend(format!("{}; {}", msg, note)),
            OperationError::MergeConflict { paths, detail } => OperationError::MergeConflict {
                paths,
                detail: format!("{}\n{}", detail, note),
            },
            OperationError::NonFastForward(detail) => {
                OperationError::NonFastForward(format!("{}\n{}", detail, note))
            }
            OperationError::AuthenticationRequired(detail) => {
                OperationError::AuthenticationRequired(format!("{}\n{}", detail, note))
            }
            OperationError::NetworkUnavailable(detail) => {
                OperationError::NetworkUnavailable(format!("{}\n{}", detail, note))
            }
            other => OperationError::Backend(format!("{}; {}", other, note)),
        }
    }

    /// Lines shown in the Detail pane when the failure is reported.
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}: {}", self.kind().label(), self), String::new()];
        match self {
            OperationError::MergeConflict { paths, detail } => {
                lines.push("Conflicted files:".to_string());
                lines.extend(paths.iter().map(|p| format!("  {}", p)));
                lines.push(String::new());
                lines.extend(detail.lines().map(str::to_string));
            }
            OperationError::DirtyWorkingTree { paths } => {
                lines.push("Files with local changes:".to_string());
                lines.extend(paths.iter().map(|p| format!("  {}", p)));
            }
            OperationError::PartialFailure { failed, .. } => {
                for (path, why) in failed {
                    lines.push(format!("  {}: {}", path, why));
                }
            }
            OperationError::NonFastForward(detail)
            | OperationError::AuthenticationRequired(detail)
            | OperationError::NetworkUnavailable(detail) => {
                lines.extend(detail.lines().map(str::to_string));
            }
            OperationError::InvalidOperation(_) | OperationError::Backend(_) => {}
        }
        while lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        lines
    }
}

pub fn short_rev(rev: &str) -> &str {
    if rev.len() == 40 && rev.chars().all(|c| c.is_ascii_hexdigit()) {
        &rev[..7]
    } else {
        rev
    }
}
