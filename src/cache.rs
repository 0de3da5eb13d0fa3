//! Last known repository state. Every pane renders from here and nothing
//! else writes to it; snapshots are applied wholesale, one part at a time.

use crate::backend::Backend;
use crate::branch::{BranchItem, TagItem};
use crate::files::FileItem;
use crate::log::CommitItem;
use crate::remotes::RemoteItem;

/// Which parts of the repository a refresh re-queries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshScope {
    /// HEAD, local and remote branches, tags.
    pub branches: bool,
    pub status: bool,
    pub log: bool,
    pub remotes: bool,
}

impl RefreshScope {
    pub const ALL: RefreshScope = RefreshScope {
        branches: true,
        status: true,
        log: true,
        remotes: true,
    };
    pub const BRANCHES: RefreshScope = RefreshScope {
        branches: true,
        status: false,
        log: false,
        remotes: false,
    };
    pub const STATUS: RefreshScope = RefreshScope {
        branches: false,
        status: true,
        log: false,
        remotes: false,
    };
    pub const REMOTES: RefreshScope = RefreshScope {
        branches: false,
        status: false,
        log: false,
        remotes: true,
    };
    /// What the background timer keeps fresh.
    pub const PASSIVE: RefreshScope = RefreshScope {
        branches: true,
        status: true,
        log: false,
        remotes: false,
    };

    pub fn union(self, other: RefreshScope) -> RefreshScope {
        RefreshScope {
            branches: self.branches || other.branches,
            status: self.status || other.status,
            log: self.log || other.log,
            remotes: self.remotes || other.remotes,
        }
    }

    pub fn is_empty(self) -> bool {
        self == RefreshScope::default()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadState {
    Branch(String),
    /// Detached at the given commit.
    Detached(String),
    /// A branch with no commits yet.
    Unborn(String),
}

impl HeadState {
    pub fn branch_name(&self) -> Option<&str> {
        match self {
            HeadState::Branch(name) | HeadState::Unborn(name) => Some(name),
            HeadState::Detached(_) => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, HeadState::Detached(_))
    }
}

/// Result of querying the backend. `None` parts were not queried.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepoSnapshot {
    pub head: Option<HeadState>,
    pub branches: Option<Vec<BranchItem>>,
    pub tags: Option<Vec<TagItem>>,
    pub commits: Option<Vec<CommitItem>>,
    pub files: Option<Vec<FileItem>>,
    pub remotes: Option<Vec<RemoteItem>>,
}

impl RepoSnapshot {
    /// Query every part named by `scope`. Runs on a blocking thread.
    pub fn load(
        backend: &dyn Backend,
        scope: RefreshScope,
        log_limit: usize,
    ) -> Result<RepoSnapshot, String> {
        let mut snap = RepoSnapshot::default();
        if scope.branches {
            snap.head = Some(backend.query_head()?);
            snap.branches = Some(backend.query_branches()?);
            snap.tags = Some(backend.query_tags()?);
        }
        if scope.status {
            snap.files = Some(backend.query_status()?);
        }
        if scope.log {
            snap.commits = Some(backend.query_log(log_limit)?);
        }
        if scope.remotes {
            snap.remotes = Some(backend.query_remotes()?);
        }
        Ok(snap)
    }
}

const PART_BRANCHES: usize = 0;
const PART_STATUS: usize = 1;
const PART_LOG: usize = 2;
const PART_REMOTES: usize = 3;

#[derive(Clone, Debug, Default)]
pub struct RepoCache {
    pub head: Option<HeadState>,
    pub branches: Vec<BranchItem>,
    pub tags: Vec<TagItem>,
    pub commits: Vec<CommitItem>,
    pub files: Vec<FileItem>,
    pub remotes: Vec<RemoteItem>,
    applied: [u64; 4],
}

impl RepoCache {
    /// Apply the parts of `snap` that are newer than what the cache holds.
    /// Returns the scope that was actually replaced.
    pub fn apply(&mut self, seq: u64, snap: RepoSnapshot) -> RefreshScope {
        let mut changed = RefreshScope::default();

        if (snap.head.is_some() || snap.branches.is_some() || snap.tags.is_some())
            && self.accept(PART_BRANCHES, seq)
        {
            if let Some(head) = snap.head {
                self.head = Some(head);
            }
            if let Some(branches) = snap.branches {
                self.branches = branches;
            }
            if let Some(tags) = snap.tags {
                self.tags = tags;
            }
            self.normalize_branches();
            changed.branches = true;
        }

        if let Some(files) = snap.files
            && self.accept(PART_STATUS, seq)
        {
            self.files = files;
            self.files.sort_by_key(file_rank);
            changed.status = true;
        }

        if let Some(commits) = snap.commits
            && self.accept(PART_LOG, seq)
        {
            self.commits = commits;
            changed.log = true;
        }

        if let Some(remotes) = snap.remotes
            && self.accept(PART_REMOTES, seq)
        {
            self.remotes = remotes;
            changed.remotes = true;
        }

        changed
    }

    fn accept(&mut self, part: usize, seq: u64) -> bool {
        if seq < self.applied[part] {
            tracing::debug!(part, seq, newest = self.applied[part], "dropping stale refresh");
            return false;
        }
        self.applied[part] = seq;
        true
    }

    /// Exactly the local branch HEAD points at is current, and it sorts first.
    fn normalize_branches(&mut self) {
        let head = self
            .head
            .as_ref()
            .and_then(HeadState::branch_name)
            .map(str::to_string);
        for b in &mut self.branches {
            b.is_current = !b.is_remote && head.as_deref() == Some(b.name.as_str());
        }
        self.branches.sort_by_key(|b| !b.is_current);
    }

    /// Put a freshly created commit at the top of the log.
    pub fn prepend_commit(&mut self, commit: CommitItem) -> bool {
        if self.commits.iter().any(|c| c.hash == commit.hash) {
            return false;
        }
        self.commits.insert(0, commit);
        true
    }

    pub fn current_branch(&self) -> Option<&BranchItem> {
        self.branches.iter().find(|b| b.is_current)
    }

    pub fn local_branch(&self, name: &str) -> Option<&BranchItem> {
        self.branches.iter().find(|b| !b.is_remote && b.name == name)
    }

    pub fn conflicted_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.is_conflicted())
            .map(|f| f.path.clone())
            .collect()
    }
}

fn file_rank(f: &FileItem) -> u8 {
    if f.is_conflicted() {
        0
    } else if f.staged {
        1
    } else {
        2
    }
}
