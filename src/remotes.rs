use crate::cache::RepoCache;
use crate::pane::{Binding, ListCursor, PaneController, REMOTE_BINDINGS};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteItem {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Debug, Default)]
pub struct RemotesPane {
    cursor: ListCursor,
}

impl RemotesPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected<'a>(&self, cache: &'a RepoCache) -> Option<&'a RemoteItem> {
        cache.remotes.get(self.cursor.selected()?)
    }

    pub fn selection_key(&self, cache: &RepoCache) -> Option<String> {
        self.selected(cache).map(|r| r.name.clone())
    }

    pub fn reconcile(&mut self, cache: &RepoCache, key: Option<String>) {
        let len = cache.remotes.len();
        match key.and_then(|name| cache.remotes.iter().position(|r| r.name == name)) {
            Some(idx) => self.cursor.select(Some(idx), len),
            None => self.cursor.clamp(len),
        }
    }

    /// Lines for the Detail pane: name, URL and the remote-tracking branches.
    pub fn detail_lines(remote: &RemoteItem, cache: &RepoCache) -> Vec<String> {
        let mut lines = vec![
            format!("Remote: {}", remote.name),
            format!("URL:    {}", remote.url),
            String::new(),
        ];
        let branches: Vec<&str> = cache
            .branches
            .iter()
            .filter(|b| b.remote_name() == Some(remote.name.as_str()))
            .map(|b| b.name.as_str())
            .collect();
        if branches.is_empty() {
            lines.push("No remote branches fetched.".to_string());
        } else {
            lines.push(format!("Branches ({}):", branches.len()));
            lines.extend(branches.into_iter().map(|b| format!("  {}", b)));
        }
        lines
    }
}

impl PaneController for RemotesPane {
    fn len(&self, cache: &RepoCache) -> usize {
        cache.remotes.len()
    }

    fn cursor(&self) -> &ListCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        &mut self.cursor
    }

    fn bindings(&self) -> &'static [Binding] {
        REMOTE_BINDINGS
    }
}
