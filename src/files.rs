use crate::cache::RepoCache;
use crate::pane::{Binding, FILE_BINDINGS, ListCursor, PaneController};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Untracked,
    Conflicted,
}

impl FileStatus {
    pub fn marker(self) -> char {
        match self {
            FileStatus::Modified => 'M',
            FileStatus::Added => 'A',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
            FileStatus::Untracked => '?',
            FileStatus::Conflicted => 'U',
        }
    }

    /// Map one column of `git status --porcelain` to a status.
    pub fn from_porcelain(c: char) -> Option<FileStatus> {
        match c {
            'M' | 'T' => Some(FileStatus::Modified),
            'A' | 'C' => Some(FileStatus::Added),
            'D' => Some(FileStatus::Deleted),
            'R' => Some(FileStatus::Renamed),
            '?' => Some(FileStatus::Untracked),
            'U' => Some(FileStatus::Conflicted),
            _ => None,
        }
    }
}

/// One row of the Files pane. A path with both staged and unstaged changes
/// shows up twice, once per side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileItem {
    pub path: String,
    pub staged: bool,
    pub status: FileStatus,
    pub renamed_from: Option<String>,
}

impl FileItem {
    pub fn new<S: Into<String>>(path: S, staged: bool, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            staged,
            status,
            renamed_from: None,
        }
    }

    pub fn is_conflicted(&self) -> bool {
        self.status == FileStatus::Conflicted
    }
}

pub type FileKey = (String, bool);

#[derive(Clone, Debug, Default)]
pub struct FilesPane {
    cursor: ListCursor,
}

impl FilesPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected<'a>(&self, cache: &'a RepoCache) -> Option<&'a FileItem> {
        cache.files.get(self.cursor.selected()?)
    }

    pub fn selection_key(&self, cache: &RepoCache) -> Option<FileKey> {
        self.selected(cache).map(|f| (f.path.clone(), f.staged))
    }

    /// Paths that `a` would stage.
    pub fn unstaged_paths(cache: &RepoCache) -> Vec<String> {
        dedup_paths(cache.files.iter().filter(|f| !f.staged))
    }

    /// Paths that `A` would unstage.
    pub fn staged_paths(cache: &RepoCache) -> Vec<String> {
        dedup_paths(cache.files.iter().filter(|f| f.staged))
    }

    pub fn reconcile(&mut self, cache: &RepoCache, key: Option<FileKey>, first_conflict: bool) {
        let len = cache.files.len();
        if first_conflict
            && let Some(idx) = cache.files.iter().position(FileItem::is_conflicted)
        {
            self.cursor.select(Some(idx), len);
            return;
        }

        let found = key.and_then(|(path, staged)| {
            let exact = cache
                .files
                .iter()
                .position(|f| f.path == path && f.staged == staged);
            exact.or_else(|| cache.files.iter().position(|f| f.path == path))
        });
        match found {
            Some(idx) => self.cursor.select(Some(idx), len),
            None => self.cursor.clamp(len),
        }
    }
}

fn dedup_paths<'a>(items: impl Iterator<Item = &'a FileItem>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item.path) {
            out.push(item.path.clone());
        }
    }
    out
}

impl PaneController for FilesPane {
    fn len(&self, cache: &RepoCache) -> usize {
        cache.files.len()
    }

    fn cursor(&self) -> &ListCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        &mut self.cursor
    }

    fn bindings(&self) -> &'static [Binding] {
        FILE_BINDINGS
    }
}
