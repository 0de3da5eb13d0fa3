use crate::cache::RepoCache;
use crate::pane::{BRANCH_BINDINGS, Binding, ListCursor, PaneController};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchItem {
    pub name: String,
    pub is_current: bool,
    pub is_remote: bool,
    pub upstream: Option<String>,
    pub ahead: u32,
    pub behind: u32,
}

impl BranchItem {
    #[cfg(test)]
    pub fn local<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            is_current: false,
            is_remote: false,
            upstream: None,
            ahead: 0,
            behind: 0,
        }
    }

    /// `origin/feature/x` -> `feature/x`.
    pub fn short_name(&self) -> &str {
        if !self.is_remote {
            return self.name.as_str();
        }
        self.name
            .split_once('/')
            .map(|(_, rest)| rest)
            .unwrap_or(self.name.as_str())
    }

    pub fn remote_name(&self) -> Option<&str> {
        if !self.is_remote {
            return None;
        }
        self.name.split_once('/').map(|(remote, _)| remote)
    }

    /// Ahead/behind marker in the usual `↑1 ↓2` form, empty when in sync.
    pub fn track_label(&self) -> String {
        let mut out = String::new();
        if self.ahead > 0 {
            out.push_str(&format!("↑{}", self.ahead));
        }
        if self.behind > 0 {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&format!("↓{}", self.behind));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagItem {
    pub name: String,
    pub target: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchTab {
    Local,
    Remote,
    Tags,
}

impl BranchTab {
    const ORDER: [BranchTab; 3] = [BranchTab::Local, BranchTab::Remote, BranchTab::Tags];

    fn index(self) -> usize {
        match self {
            BranchTab::Local => 0,
            BranchTab::Remote => 1,
            BranchTab::Tags => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BranchTab::Local => "Local",
            BranchTab::Remote => "Remote",
            BranchTab::Tags => "Tags",
        }
    }

    pub fn all() -> [BranchTab; 3] {
        Self::ORDER
    }
}

/// Row under the cursor, resolved against the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchRow<'a> {
    Branch(&'a BranchItem),
    Tag(&'a TagItem),
}

impl BranchRow<'_> {
    pub fn name(&self) -> &str {
        match self {
            BranchRow::Branch(b) => b.name.as_str(),
            BranchRow::Tag(t) => t.name.as_str(),
        }
    }
}

/// Where the cursor should land after the next branch refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchSelect {
    CheckedOut,
    Local(String),
}

#[derive(Clone, Debug)]
pub struct BranchesPane {
    pub tab: BranchTab,
    cursors: [ListCursor; 3],
}

impl BranchesPane {
    pub fn new() -> Self {
        Self {
            tab: BranchTab::Local,
            cursors: [ListCursor::default(); 3],
        }
    }

    /// Rotate the sub-tab; each tab keeps its own cursor.
    pub fn cycle_tab(&mut self, delta: i32, cache: &RepoCache) {
        let cur = self.tab.index() as i32;
        let next = (cur + delta).rem_euclid(BranchTab::ORDER.len() as i32) as usize;
        self.tab = BranchTab::ORDER[next];
        let len = rows_len(self.tab, cache);
        self.cursors[next].clamp(len);
    }

    pub fn rows<'a>(&self, cache: &'a RepoCache) -> Vec<BranchRow<'a>> {
        rows(self.tab, cache)
    }

    pub fn selected<'a>(&self, cache: &'a RepoCache) -> Option<BranchRow<'a>> {
        let sel = self.cursors[self.tab.index()].selected()?;
        rows(self.tab, cache).into_iter().nth(sel)
    }

    pub fn selected_branch<'a>(&self, cache: &'a RepoCache) -> Option<&'a BranchItem> {
        match self.selected(cache)? {
            BranchRow::Branch(b) => Some(b),
            BranchRow::Tag(_) => None,
        }
    }

    /// Names under each tab's cursor, used to re-find the rows after a refresh.
    pub fn selection_keys(&self, cache: &RepoCache) -> [Option<String>; 3] {
        BranchTab::ORDER.map(|tab| {
            let sel = self.cursors[tab.index()].selected()?;
            rows(tab, cache)
                .into_iter()
                .nth(sel)
                .map(|r| r.name().to_string())
        })
    }

    pub fn reconcile(
        &mut self,
        cache: &RepoCache,
        keys: &[Option<String>; 3],
        pending: Option<BranchSelect>,
    ) {
        for tab in BranchTab::ORDER {
            let rows = rows(tab, cache);
            let cursor = &mut self.cursors[tab.index()];
            let found = keys[tab.index()]
                .as_deref()
                .and_then(|key| rows.iter().position(|r| r.name() == key));
            match found {
                Some(idx) => cursor.select(Some(idx), rows.len()),
                None => cursor.clamp(rows.len()),
            }
        }

        let Some(pending) = pending else {
            return;
        };
        let locals = rows(BranchTab::Local, cache);
        let idx = match &pending {
            BranchSelect::CheckedOut => locals
                .iter()
                .position(|r| matches!(r, BranchRow::Branch(b) if b.is_current)),
            BranchSelect::Local(name) => locals.iter().position(|r| r.name() == name),
        };
        if let Some(idx) = idx {
            self.tab = BranchTab::Local;
            self.cursors[BranchTab::Local.index()].select(Some(idx), locals.len());
        }
    }
}

fn rows(tab: BranchTab, cache: &RepoCache) -> Vec<BranchRow<'_>> {
    match tab {
        BranchTab::Local => cache
            .branches
            .iter()
            .filter(|b| !b.is_remote)
            .map(BranchRow::Branch)
            .collect(),
        BranchTab::Remote => cache
            .branches
            .iter()
            .filter(|b| b.is_remote)
            .map(BranchRow::Branch)
            .collect(),
        BranchTab::Tags => cache.tags.iter().map(BranchRow::Tag).collect(),
    }
}

fn rows_len(tab: BranchTab, cache: &RepoCache) -> usize {
    match tab {
        BranchTab::Local => cache.branches.iter().filter(|b| !b.is_remote).count(),
        BranchTab::Remote => cache.branches.iter().filter(|b| b.is_remote).count(),
        BranchTab::Tags => cache.tags.len(),
    }
}

impl PaneController for BranchesPane {
    fn len(&self, cache: &RepoCache) -> usize {
        rows_len(self.tab, cache)
    }

    fn cursor(&self) -> &ListCursor {
        &self.cursors[self.tab.index()]
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        &mut self.cursors[self.tab.index()]
    }

    fn bindings(&self) -> &'static [Binding] {
        BRANCH_BINDINGS
    }
}
