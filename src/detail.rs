use crate::cache::RepoCache;
use crate::pane::{Binding, DETAIL_BINDINGS, ListCursor, PaneController, PaneId};

/// Read-only text view. The cursor is the top visible line.
#[derive(Clone, Debug)]
pub struct DetailPane {
    title: String,
    lines: Vec<String>,
    cursor: ListCursor,
    return_to: Option<PaneId>,
    loading: Option<u64>,
}

impl Default for DetailPane {
    fn default() -> Self {
        Self {
            title: "Detail".to_string(),
            lines: Vec::new(),
            cursor: ListCursor::default(),
            return_to: None,
            loading: None,
        }
    }
}

impl DetailPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn show<S: Into<String>>(&mut self, title: S, lines: Vec<String>) {
        self.title = title.into();
        self.lines = lines;
        self.loading = None;
        self.cursor = ListCursor::default();
        self.cursor.clamp(self.lines.len());
    }

    /// Show a placeholder until the load tagged `token` arrives.
    pub fn begin_loading<S: Into<String>>(&mut self, title: S, token: u64) {
        self.show(title, vec!["Loading…".to_string()]);
        self.loading = Some(token);
    }

    /// Apply a finished load. Returns false for a result that was superseded.
    pub fn finish_loading(&mut self, token: u64, lines: Vec<String>) -> bool {
        if self.loading != Some(token) {
            return false;
        }
        let title = std::mem::take(&mut self.title);
        self.show(title, lines);
        true
    }

    pub fn set_return_to(&mut self, pane: PaneId) {
        if pane != PaneId::Detail {
            self.return_to = Some(pane);
        }
    }

    pub fn return_to(&self) -> Option<PaneId> {
        self.return_to
    }

    pub fn scroll_top(&mut self) {
        self.cursor.select(Some(0), self.lines.len());
    }

    pub fn scroll_bottom(&mut self) {
        self.cursor.select_last(self.lines.len());
    }
}

impl PaneController for DetailPane {
    fn len(&self, _cache: &RepoCache) -> usize {
        self.lines.len()
    }

    fn cursor(&self) -> &ListCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        &mut self.cursor
    }

    fn bindings(&self) -> &'static [Binding] {
        DETAIL_BINDINGS
    }
}
