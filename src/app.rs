//! Application state. Only the event loop holds a `&mut App`; background
//! work reaches it exclusively through [`crate::events::AppEvent`]s.

use std::time::Instant;

use crate::backend::DetailQuery;
use crate::branch::{BranchRow, BranchSelect, BranchesPane};
use crate::cache::{RefreshScope, RepoCache, RepoSnapshot};
use crate::detail::DetailPane;
use crate::editor::EditorError;
use crate::files::{FileStatus, FilesPane};
use crate::log::LogPane;
use crate::operation::{
    CheckoutStrategy, CheckoutTarget, Continuation, OperationError, OperationKind,
    OperationOutput, OperationRequest, OperationResult, RequestId,
};
use crate::overlay::{ConfirmAction, ConfirmPrompt, Overlay, OverlayStack};
use crate::pane::{PaneController, PaneId};
use crate::remotes::RemotesPane;
use crate::runner::OperationRunner;
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug)]
pub struct StatusLine {
    pub text: String,
    pub level: StatusLevel,
    pub at: Instant,
}

pub struct App {
    pub focus: PaneId,
    pub overlays: OverlayStack,
    pub cache: RepoCache,
    pub branches: BranchesPane,
    pub files: FilesPane,
    pub log: LogPane,
    pub remotes: RemotesPane,
    pub detail: DetailPane,
    pub theme: Theme,
    pub status: Option<StatusLine>,
    pub needs_full_redraw: bool,
    /// Set by `C` in Files; the event loop hands the terminal to the editor.
    pub editor_requested: bool,
    runner: OperationRunner,
    busy: [usize; 5],
    pending_branch: Option<BranchSelect>,
    reveal_conflicts: bool,
    pending_refreshes: usize,
}

impl App {
    pub fn new(runner: OperationRunner, theme: Theme) -> Self {
        Self {
            focus: PaneId::Branches,
            overlays: OverlayStack::default(),
            cache: RepoCache::default(),
            branches: BranchesPane::new(),
            files: FilesPane::new(),
            log: LogPane::new(),
            remotes: RemotesPane::new(),
            detail: DetailPane::new(),
            theme,
            status: None,
            needs_full_redraw: false,
            editor_requested: false,
            runner,
            busy: [0; 5],
            pending_branch: Some(BranchSelect::CheckedOut),
            reveal_conflicts: false,
            pending_refreshes: 0,
        }
    }

    /// Initial load of every part of the repository.
    pub fn start(&mut self) {
        self.request_refresh(RefreshScope::ALL);
    }

    pub fn pane(&self, id: PaneId) -> &dyn PaneController {
        match id {
            PaneId::Branches => &self.branches,
            PaneId::Files => &self.files,
            PaneId::Log => &self.log,
            PaneId::Remotes => &self.remotes,
            PaneId::Detail => &self.detail,
        }
    }

    pub fn pane_mut(&mut self, id: PaneId) -> &mut dyn PaneController {
        match id {
            PaneId::Branches => &mut self.branches,
            PaneId::Files => &mut self.files,
            PaneId::Log => &mut self.log,
            PaneId::Remotes => &mut self.remotes,
            PaneId::Detail => &mut self.detail,
        }
    }

    pub fn set_focus(&mut self, pane: PaneId) {
        if pane == self.focus {
            return;
        }
        let previous = self.focus;
        if previous == PaneId::Log {
            self.overlays.take_find();
        }
        self.focus_hook(previous, false);
        if pane == PaneId::Detail {
            self.detail.set_return_to(previous);
        }
        self.focus = pane;
        self.focus_hook(pane, true);
        tracing::debug!(from = ?previous, to = ?pane, "focus changed");
    }

    fn focus_hook(&mut self, pane: PaneId, gained: bool) {
        let cache = &self.cache;
        let target: &mut dyn PaneController = match pane {
            PaneId::Branches => &mut self.branches,
            PaneId::Files => &mut self.files,
            PaneId::Log => &mut self.log,
            PaneId::Remotes => &mut self.remotes,
            PaneId::Detail => &mut self.detail,
        };
        if gained {
            target.on_focus_gained(cache);
        } else {
            target.on_focus_lost(cache);
        }
    }

    pub fn move_cursor(&mut self, delta: i32) {
        let cache = &self.cache;
        match self.focus {
            PaneId::Branches => self.branches.move_cursor(delta, cache),
            PaneId::Files => self.files.move_cursor(delta, cache),
            PaneId::Log => self.log.move_cursor(delta, cache),
            PaneId::Remotes => self.remotes.move_cursor(delta, cache),
            PaneId::Detail => self.detail.move_cursor(delta, cache),
        }
    }

    /// Operations started from `pane` that have not reported back yet.
    pub fn busy(&self, pane: PaneId) -> usize {
        self.busy[pane.number() - 1]
    }

    pub fn set_status<S: Into<String>>(&mut self, text: S, level: StatusLevel) {
        self.status = Some(StatusLine {
            text: text.into(),
            level,
            at: Instant::now(),
        });
    }

    pub fn submit(
        &mut self,
        kind: OperationKind,
        origin: PaneId,
        continuation: Continuation,
    ) -> RequestId {
        self.set_status(format!("Running {}…", kind.describe()), StatusLevel::Info);
        self.busy[origin.number() - 1] += 1;
        self.runner.submit(kind, origin, continuation)
    }

    pub fn request_refresh(&mut self, scope: RefreshScope) {
        if scope.is_empty() {
            return;
        }
        self.pending_refreshes += 1;
        self.runner.refresh(scope);
    }

    /// Fetch text for the Detail pane off-thread and focus it.
    pub fn open_detail(&mut self, query: DetailQuery) {
        let title = query.title();
        let token = self.runner.load_detail(query);
        self.detail.begin_loading(title, token);
        self.set_focus(PaneId::Detail);
    }

    /// Show a failure that was detected before reaching the backend.
    pub fn report_invalid<S: Into<String>>(&mut self, msg: S) {
        let err = OperationError::InvalidOperation(msg.into());
        self.set_status(format!("{}: {}", err.kind().label(), err), StatusLevel::Error);
        self.detail.show("Not possible", err.report_lines());
    }

    pub fn push_overlay(&mut self, overlay: Overlay) {
        self.overlays.push(overlay);
    }

    /// Pop the top overlay, undoing any state it was previewing.
    pub fn close_overlay(&mut self) {
        if let Some(Overlay::FuzzyFind(find)) = self.overlays.pop() {
            self.log.end_filter(&self.cache, &find.origin);
        }
    }

    pub fn checkout_selected_branch(&mut self) {
        let (target, continuation) = match self.branches.selected(&self.cache) {
            None => return,
            Some(BranchRow::Branch(b)) if b.is_current => {
                let msg = format!("Already on {}", b.name);
                self.set_status(msg, StatusLevel::Info);
                return;
            }
            // A remote branch that is already tracked locally switches to the local one.
            Some(BranchRow::Branch(b)) if b.is_remote => {
                let target = match self.cache.local_branch(b.short_name()) {
                    Some(local) if local.is_current => {
                        let msg = format!("Already on {}", local.name);
                        self.set_status(msg, StatusLevel::Info);
                        return;
                    }
                    Some(local) => CheckoutTarget::Branch(local.name.clone()),
                    None => CheckoutTarget::RemoteBranch(b.name.clone()),
                };
                (target, Continuation::ShowCheckedOut)
            }
            Some(BranchRow::Branch(b)) => (
                CheckoutTarget::Branch(b.name.clone()),
                Continuation::ShowCheckedOut,
            ),
            Some(BranchRow::Tag(t)) => (
                CheckoutTarget::Detached(t.name.clone()),
                Continuation::ShowDetached,
            ),
        };
        self.checkout(target, CheckoutStrategy::Safe, continuation);
    }

    pub fn checkout(
        &mut self,
        target: CheckoutTarget,
        strategy: CheckoutStrategy,
        continuation: Continuation,
    ) {
        let origin = match target {
            CheckoutTarget::Detached(_) if self.focus == PaneId::Log => PaneId::Log,
            _ => PaneId::Branches,
        };
        self.submit(OperationKind::Checkout { target, strategy }, origin, continuation);
    }

    pub fn delete_selected_branch(&mut self) {
        let Some(row) = self.branches.selected(&self.cache) else {
            return;
        };
        let name = match row {
            BranchRow::Branch(b) if b.is_current => {
                let msg = format!("cannot delete {}: it is checked out", b.name);
                return self.report_invalid(msg);
            }
            BranchRow::Branch(b) if !b.is_remote => b.name.clone(),
            other => {
                let msg = format!("{} is not a local branch", other.name());
                return self.report_invalid(msg);
            }
        };
        let lines = vec![format!("Delete local branch {}?", name)];
        self.push_overlay(Overlay::Confirm(ConfirmPrompt::new(
            "Delete branch",
            lines,
            ConfirmAction::DeleteBranch(name),
        )));
    }

    pub fn merge_selected_branch(&mut self) {
        let Some(row) = self.branches.selected(&self.cache) else {
            return;
        };
        if let BranchRow::Branch(b) = &row
            && b.is_current
        {
            let msg = format!("cannot merge {} into itself", b.name);
            return self.report_invalid(msg);
        }
        let branch = row.name().to_string();
        self.submit(
            OperationKind::Merge { branch },
            PaneId::Branches,
            Continuation::Refresh(RefreshScope::ALL),
        );
    }

    /// `P`: bring the selected local branch up to date without switching to it.
    pub fn pull_selected_branch(&mut self) {
        let Some(b) = self.branches.selected_branch(&self.cache) else {
            return self.report_invalid("select a local branch to pull");
        };
        if b.is_remote {
            let msg = format!("{} is a remote branch; fetch updates it", b.name);
            return self.report_invalid(msg);
        }
        if b.is_current {
            self.submit(
                OperationKind::Pull,
                PaneId::Branches,
                Continuation::Refresh(RefreshScope::ALL),
            );
            return;
        }
        let Some(upstream) = b.upstream.clone() else {
            let msg = format!("{} has no upstream branch", b.name);
            return self.report_invalid(msg);
        };
        let branch = b.name.clone();
        self.submit(
            OperationKind::PullBranch { branch, upstream },
            PaneId::Branches,
            Continuation::Refresh(RefreshScope::BRANCHES),
        );
    }

    pub fn show_selected_file(&mut self) {
        let Some(file) = self.files.selected(&self.cache) else {
            return;
        };
        let query = if file.is_conflicted() {
            DetailQuery::Conflict {
                path: file.path.clone(),
            }
        } else {
            DetailQuery::FileDiff {
                path: file.path.clone(),
                staged: file.staged,
                untracked: file.status == FileStatus::Untracked,
            }
        };
        self.open_detail(query);
    }

    pub fn copy_selected_hash(&mut self) {
        let Some(hash) = self.log.selection_key(&self.cache) else {
            return;
        };
        match try_set_system_clipboard(&hash) {
            Ok(()) => self.set_status(format!("Copied {}", hash), StatusLevel::Info),
            Err(e) => self.set_status(format!("Clipboard unavailable: {}", e), StatusLevel::Warn),
        }
    }

    pub fn on_operation(&mut self, result: OperationResult) {
        let OperationResult { request, outcome } = result;
        let slot = &mut self.busy[request.origin.number() - 1];
        *slot = slot.saturating_sub(1);
        match outcome {
            Ok(output) => self.on_success(request, output),
            Err(err) => self.on_failure(request, err),
        }
    }

    fn on_success(&mut self, request: OperationRequest, output: OperationOutput) {
        let message = output
            .message
            .clone()
            .unwrap_or_else(|| format!("{} done", request.kind.describe()));
        self.set_status(message, StatusLevel::Info);
        if matches!(request.kind, OperationKind::MergeAbort | OperationKind::RevertAbort) {
            self.reveal_conflicts = false;
        }

        match request.continuation {
            Continuation::Refresh(scope) => self.request_refresh(scope),
            Continuation::ShowCheckedOut => {
                self.pending_branch = Some(BranchSelect::CheckedOut);
                self.request_refresh(RefreshScope::ALL);
            }
            Continuation::ShowDetached => {
                let at = match &request.kind {
                    OperationKind::Checkout { target, .. } => target.label().to_string(),
                    _ => "HEAD".to_string(),
                };
                self.set_status(
                    format!("HEAD detached at {}; new commits will not be on any branch", at),
                    StatusLevel::Warn,
                );
                self.request_refresh(RefreshScope::ALL);
            }
            Continuation::SelectBranch(name) => {
                self.pending_branch = Some(BranchSelect::Local(name));
                self.request_refresh(RefreshScope::BRANCHES);
            }
            Continuation::CommitCreated => match output.commit {
                Some(commit) => {
                    let key = self.log.selection_key(&self.cache);
                    if self.cache.prepend_commit(commit) {
                        self.log.reconcile(&self.cache, key);
                    }
                    self.request_refresh(RefreshScope::STATUS.union(RefreshScope::BRANCHES));
                }
                None => self.request_refresh(RefreshScope::ALL),
            },
            Continuation::ShowWorkingTree => {
                self.set_focus(PaneId::Files);
                self.request_refresh(RefreshScope::STATUS);
            }
        }
    }

    fn on_failure(&mut self, request: OperationRequest, err: OperationError) {
        tracing::warn!(id = request.id, op = %request.kind.describe(), error = %err, "operation failed");
        self.set_status(format!("{}: {}", err.kind().label(), err), StatusLevel::Error);

        match (&err, &request.kind) {
            (
                OperationError::DirtyWorkingTree { paths },
                OperationKind::Checkout {
                    target,
                    strategy: CheckoutStrategy::Safe,
                },
            ) => {
                let mut lines = vec![format!(
                    "Checking out {} would overwrite local changes:",
                    target.label()
                )];
                lines.extend(paths.iter().map(|p| format!("  {}", p)));
                self.push_overlay(Overlay::Confirm(ConfirmPrompt::new(
                    "Uncommitted changes",
                    lines,
                    ConfirmAction::DirtyCheckout(target.clone()),
                )));
                self.request_refresh(RefreshScope::STATUS);
                return;
            }
            (OperationError::MergeConflict { paths, .. }, kind) => {
                let revert = matches!(kind, OperationKind::Revert { .. });
                self.reveal_conflicts = true;
                self.detail
                    .show(format!("{} conflicts", request.kind.label()), err.report_lines());
                self.set_focus(PaneId::Files);
                let lines = vec![
                    format!("{} file(s) have conflicts.", paths.len()),
                    "Resolve them in the Files pane, or abort.".to_string(),
                ];
                let title = if revert { "Revert conflicts" } else { "Merge conflicts" };
                self.push_overlay(Overlay::Confirm(ConfirmPrompt::new(
                    title,
                    lines,
                    ConfirmAction::Conflict { revert },
                )));
                self.request_refresh(RefreshScope::ALL);
                return;
            }
            _ => {}
        }

        self.detail
            .show(format!("{} failed", request.kind.label()), err.report_lines());
        self.request_refresh(request.continuation.refresh_scope());
    }

    pub fn on_refreshed(&mut self, seq: u64, result: Result<RepoSnapshot, String>) {
        self.pending_refreshes = self.pending_refreshes.saturating_sub(1);
        let snap = match result {
            Ok(snap) => snap,
            Err(e) => {
                tracing::warn!(seq, error = %e, "refresh failed");
                self.set_status(format!("Refresh failed: {}", e), StatusLevel::Warn);
                return;
            }
        };

        let branch_keys = self.branches.selection_keys(&self.cache);
        let file_key = self.files.selection_key(&self.cache);
        let log_key = self.log.selection_key(&self.cache);
        let remote_key = self.remotes.selection_key(&self.cache);

        let changed = self.cache.apply(seq, snap);

        if changed.branches {
            let pending = self.pending_branch.take();
            self.branches.reconcile(&self.cache, &branch_keys, pending);
        }
        if changed.status {
            let reveal = self.reveal_conflicts && self.cache.files.iter().any(|f| f.is_conflicted());
            if reveal {
                self.reveal_conflicts = false;
            }
            self.files.reconcile(&self.cache, file_key, reveal);
        }
        if changed.log {
            self.log.reconcile(&self.cache, log_key);
        }
        if changed.remotes {
            self.remotes.reconcile(&self.cache, remote_key);
        }
    }

    pub fn on_detail_loaded(&mut self, token: u64, result: Result<Vec<String>, String>) {
        let lines = result.unwrap_or_else(|e| vec![format!("Could not load: {}", e)]);
        if !self.detail.finish_loading(token, lines) {
            tracing::debug!(token, "dropping superseded detail");
        }
    }

    /// Passive refresh; skipped while another refresh is in flight.
    pub fn on_tick(&mut self) {
        if self.pending_refreshes == 0 {
            self.request_refresh(RefreshScope::PASSIVE);
        }
    }

    pub fn finish_editor(&mut self, result: Result<Option<String>, EditorError>) {
        self.needs_full_redraw = true;
        match result {
            Ok(Some(message)) => {
                self.submit(
                    OperationKind::Commit { message },
                    PaneId::Files,
                    Continuation::CommitCreated,
                );
            }
            Ok(None) => self.set_status("Commit aborted: empty message", StatusLevel::Warn),
            Err(e) => self.set_status(format!("Editor failed: {}", e), StatusLevel::Error),
        }
    }
}

fn try_set_system_clipboard(text: &str) -> Result<(), String> {
    let mut cb = arboard::Clipboard::new().map_err(|e| e.to_string())?;
    cb.set_text(text.to_string()).map_err(|e| e.to_string())
}
