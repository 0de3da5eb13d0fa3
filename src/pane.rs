//! Pieces shared by every pane controller: identity, the clamped list
//! cursor, and the key binding tables.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::cache::RepoCache;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaneId {
    Branches,
    Files,
    Log,
    Remotes,
    Detail,
}

impl PaneId {
    pub const ALL: [PaneId; 5] = [
        PaneId::Branches,
        PaneId::Files,
        PaneId::Log,
        PaneId::Remotes,
        PaneId::Detail,
    ];

    /// Pane selected by the digit keys `1`..`5`.
    pub fn from_digit(ch: char) -> Option<PaneId> {
        let idx = ch.to_digit(10)? as usize;
        idx.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn number(self) -> usize {
        match self {
            PaneId::Branches => 1,
            PaneId::Files => 2,
            PaneId::Log => 3,
            PaneId::Remotes => 4,
            PaneId::Detail => 5,
        }
    }
}

/// Cursor and scroll offset over a list whose length can change under it.
///
/// `selected` is `None` exactly when the list is empty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListCursor {
    selected: Option<usize>,
    offset: usize,
}

impl ListCursor {
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Move by `delta`, clamped to `[0, len - 1]`.
    pub fn move_by(&mut self, delta: i32, len: usize) {
        if len == 0 {
            self.selected = None;
            self.offset = 0;
            return;
        }
        let cur = self.selected.unwrap_or(0) as i64;
        let next = (cur + delta as i64).clamp(0, len as i64 - 1);
        self.selected = Some(next as usize);
    }

    pub fn select(&mut self, index: Option<usize>, len: usize) {
        self.selected = match index {
            _ if len == 0 => None,
            Some(i) => Some(i.min(len - 1)),
            None => Some(0),
        };
        if len == 0 {
            self.offset = 0;
        }
    }

    pub fn select_last(&mut self, len: usize) {
        self.select(len.checked_sub(1), len);
    }

    /// Re-establish the bounds after the list changed length.
    pub fn clamp(&mut self, len: usize) {
        self.select(self.selected, len);
        if len > 0 {
            self.offset = self.offset.min(len - 1);
        }
    }

    /// Adjust the scroll offset so the cursor is inside a viewport of `height` rows.
    pub fn scroll_into_view(&mut self, height: usize) {
        let Some(sel) = self.selected else {
            self.offset = 0;
            return;
        };
        if height == 0 {
            return;
        }
        if sel < self.offset {
            self.offset = sel;
        } else if sel >= self.offset + height {
            self.offset = sel + 1 - height;
        }
    }
}

/// Pane-level actions reachable from a binding table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaneAction {
    CheckoutBranch,
    DeleteBranch,
    NewBranch,
    MergeBranch,
    FetchOrigin,
    PullCurrent,
    PullSelected,
    PrevBranchTab,
    NextBranchTab,

    StageFile,
    UnstageFile,
    StageAll,
    UnstageAll,
    OpenCommit,
    CommitInEditor,
    Push,
    ShowFileDiff,

    ShowCommit,
    CheckoutCommit,
    RevertCommit,
    FindCommit,
    CopyHash,

    AddRemote,
    RemoveRemote,
    ShowRemote,

    ScrollTop,
    ScrollBottom,
    Back,
}

#[derive(Clone, Copy, Debug)]
pub struct Binding {
    pub code: KeyCode,
    pub action: PaneAction,
    pub hint: &'static str,
}

const fn bind(ch: char, action: PaneAction, hint: &'static str) -> Binding {
    Binding {
        code: KeyCode::Char(ch),
        action,
        hint,
    }
}

pub const BRANCH_BINDINGS: &[Binding] = &[
    bind('c', PaneAction::CheckoutBranch, "checkout"),
    bind('d', PaneAction::DeleteBranch, "delete"),
    bind('n', PaneAction::NewBranch, "new"),
    bind('m', PaneAction::MergeBranch, "merge"),
    bind('f', PaneAction::FetchOrigin, "fetch origin"),
    bind('p', PaneAction::PullCurrent, "pull"),
    bind('P', PaneAction::PullSelected, "pull selected"),
    bind('h', PaneAction::PrevBranchTab, "prev tab"),
    bind('l', PaneAction::NextBranchTab, "next tab"),
];

pub const FILE_BINDINGS: &[Binding] = &[
    bind('s', PaneAction::StageFile, "stage"),
    bind('u', PaneAction::UnstageFile, "unstage"),
    bind('a', PaneAction::StageAll, "stage all"),
    bind('A', PaneAction::UnstageAll, "unstage all"),
    bind('c', PaneAction::OpenCommit, "commit"),
    bind('C', PaneAction::CommitInEditor, "commit in editor"),
    bind('p', PaneAction::Push, "push"),
    Binding {
        code: KeyCode::Enter,
        action: PaneAction::ShowFileDiff,
        hint: "diff",
    },
];

pub const LOG_BINDINGS: &[Binding] = &[
    Binding {
        code: KeyCode::Enter,
        action: PaneAction::ShowCommit,
        hint: "details",
    },
    bind('c', PaneAction::CheckoutCommit, "checkout"),
    bind('r', PaneAction::RevertCommit, "revert"),
    bind('/', PaneAction::FindCommit, "find"),
    bind('y', PaneAction::CopyHash, "copy hash"),
];

pub const REMOTE_BINDINGS: &[Binding] = &[
    bind('a', PaneAction::AddRemote, "add"),
    bind('d', PaneAction::RemoveRemote, "remove"),
    Binding {
        code: KeyCode::Enter,
        action: PaneAction::ShowRemote,
        hint: "details",
    },
];

pub const DETAIL_BINDINGS: &[Binding] = &[
    bind('g', PaneAction::ScrollTop, "top"),
    bind('G', PaneAction::ScrollBottom, "bottom"),
    Binding {
        code: KeyCode::Backspace,
        action: PaneAction::Back,
        hint: "back",
    },
];

/// Find the action bound to `key`. Control and Alt chords never match.
pub fn lookup(bindings: &[Binding], key: &KeyEvent) -> Option<PaneAction> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    bindings
        .iter()
        .find(|b| b.code == key.code)
        .map(|b| b.action)
}

/// Common surface of the five pane controllers.
pub trait PaneController {
    /// Number of rows currently visible, as derived from the cache.
    fn len(&self, cache: &RepoCache) -> usize;

    fn cursor(&self) -> &ListCursor;

    fn cursor_mut(&mut self) -> &mut ListCursor;

    fn bindings(&self) -> &'static [Binding];

    /// Called right after the pane takes focus.
    fn on_focus_gained(&mut self, _cache: &RepoCache) {}

    /// Called before focus moves away; drops state that only makes sense
    /// while the pane is focused.
    fn on_focus_lost(&mut self, _cache: &RepoCache) {}

    fn move_cursor(&mut self, delta: i32, cache: &RepoCache) {
        let len = self.len(cache);
        self.cursor_mut().move_by(delta, len);
    }
}
