use crate::cache::RepoCache;
use crate::pane::{Binding, LOG_BINDINGS, ListCursor, PaneController};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitItem {
    pub hash: String,
    pub short: String,
    pub summary: String,
    pub author: String,
    pub date: String,
    pub parent_count: usize,
}

impl CommitItem {
    pub fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Active fuzzy filter: the query and the matching commit indices, best first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub query: String,
    pub matches: Vec<usize>,
}

/// Log pane state captured when the find box opens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOrigin {
    pub cursor: ListCursor,
}

#[derive(Clone, Debug, Default)]
pub struct LogPane {
    cursor: ListCursor,
    filter: Option<LogFilter>,
}

impl LogPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> Option<&LogFilter> {
        self.filter.as_ref()
    }

    pub fn items<'a>(&self, cache: &'a RepoCache) -> Vec<&'a CommitItem> {
        match &self.filter {
            Some(f) => f
                .matches
                .iter()
                .filter_map(|&i| cache.commits.get(i))
                .collect(),
            None => cache.commits.iter().collect(),
        }
    }

    fn commit_index(&self, row: usize) -> Option<usize> {
        match &self.filter {
            Some(f) => f.matches.get(row).copied(),
            None => Some(row),
        }
    }

    pub fn selected<'a>(&self, cache: &'a RepoCache) -> Option<&'a CommitItem> {
        let idx = self.commit_index(self.cursor.selected()?)?;
        cache.commits.get(idx)
    }

    pub fn selection_key(&self, cache: &RepoCache) -> Option<String> {
        self.selected(cache).map(|c| c.hash.clone())
    }

    /// Start filtering. With an empty query every commit matches in order,
    /// so the cursor keeps pointing at the same commit.
    pub fn begin_filter(&mut self, cache: &RepoCache) -> FilterOrigin {
        let origin = FilterOrigin {
            cursor: self.cursor,
        };
        self.filter = Some(LogFilter {
            query: String::new(),
            matches: (0..cache.commits.len()).collect(),
        });
        origin
    }

    pub fn set_query(&mut self, query: &str, cache: &RepoCache, origin: &FilterOrigin) {
        let matches = filter_commits(&cache.commits, query);
        let len = matches.len();
        self.filter = Some(LogFilter {
            query: query.to_string(),
            matches,
        });
        if query.trim().is_empty() {
            self.cursor = origin.cursor;
            self.cursor.clamp(len);
        } else {
            self.cursor.select(Some(0), len);
        }
    }

    /// Drop the filter. The cursor lands on the commit that was selected in
    /// the filtered view, or on the first row if nothing was selected.
    pub fn end_filter(&mut self, cache: &RepoCache, origin: &FilterOrigin) {
        let chosen = self
            .cursor
            .selected()
            .and_then(|row| self.commit_index(row));
        self.filter = None;
        let len = cache.commits.len();

        match chosen {
            Some(idx) if origin.cursor.selected() == Some(idx) => {
                self.cursor = origin.cursor;
                self.cursor.clamp(len);
            }
            Some(idx) => self.cursor.select(Some(idx), len),
            None => self.cursor.select(Some(0), len),
        }
    }

    pub fn reconcile(&mut self, cache: &RepoCache, key: Option<String>) {
        if let Some(f) = &mut self.filter {
            f.matches = filter_commits(&cache.commits, &f.query);
        }
        let len = self.len(cache);
        let found = key.and_then(|hash| {
            (0..len).find(|&row| {
                self.commit_index(row)
                    .and_then(|i| cache.commits.get(i))
                    .is_some_and(|c| c.hash == hash)
            })
        });
        match found {
            Some(row) => self.cursor.select(Some(row), len),
            None => self.cursor.clamp(len),
        }
    }
}

impl PaneController for LogPane {
    fn len(&self, cache: &RepoCache) -> usize {
        match &self.filter {
            Some(f) => f.matches.len(),
            None => cache.commits.len(),
        }
    }

    fn cursor(&self) -> &ListCursor {
        &self.cursor
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        &mut self.cursor
    }

    fn bindings(&self) -> &'static [Binding] {
        LOG_BINDINGS
    }

    /// A filter left behind by the find box resolves to the commit it selected.
    fn on_focus_lost(&mut self, cache: &RepoCache) {
        if self.filter.is_some() {
            let origin = FilterOrigin {
                cursor: ListCursor::default(),
            };
            self.end_filter(cache, &origin);
        }
    }
}

/// Indices of commits whose summary fuzzily matches `query`, best first.
/// Ties keep history order, so newer commits win.
pub fn filter_commits(commits: &[CommitItem], query: &str) -> Vec<usize> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return (0..commits.len()).collect();
    }

    let mut scored: Vec<(i32, usize)> = commits
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            let score = fuzzy_score(&c.summary.to_lowercase(), &q)?;
            Some((score + recency_bonus(i), i))
        })
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, i)| i).collect()
}

fn recency_bonus(index: usize) -> i32 {
    (20 - (index / 10) as i32).max(0)
}

/// Subsequence match. Consecutive hits score higher, gaps cost points and
/// an early first hit earns a bonus.
pub fn fuzzy_score(haystack: &str, needle: &str) -> Option<i32> {
    let n = needle.trim();
    if n.is_empty() {
        return Some(0);
    }

    let mut score: i32 = 0;
    let mut last_match: Option<usize> = None;
    let mut pos = 0usize;

    for ch in n.chars() {
        let idx = haystack[pos..]
            .char_indices()
            .find(|&(_, hc)| hc == ch)
            .map(|(i, _)| pos + i)?;

        score += 10;
        if let Some(prev) = last_match {
            if idx == prev + 1 {
                score += 15;
            } else {
                let gap = idx.saturating_sub(prev + 1) as i32;
                score -= gap.min(30);
            }
        } else {
            score += (30 - idx as i32).max(0);
        }

        last_match = Some(idx);
        pos = idx + ch.len_utf8();
    }

    Some(score)
}
