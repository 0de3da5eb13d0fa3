//! Event handling for the main loop.
//!
//! Terminal keys and background completions both end up here, one at a
//! time, on the thread that owns the [`App`].

use std::time::Duration;

use crossterm::event::KeyEvent;
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use crate::app::{App, StatusLevel};
use crate::backend::DetailQuery;
use crate::cache::{RefreshScope, RepoSnapshot};
use crate::focus::{Dispatch, route};
use crate::operation::{
    CheckoutStrategy, CheckoutTarget, Continuation, OperationKind, OperationResult,
};
use crate::overlay::{
    ConfirmAction, ConfirmChoice, ConfirmPrompt, Overlay, OverlayOutcome, OverlaySubmit,
    RemoteField,
};
use crate::pane::{PaneAction, PaneController, PaneId};
use crate::remotes::RemotesPane;

/// Everything the event loop reacts to besides terminal input.
#[derive(Debug)]
pub enum AppEvent {
    Operation(OperationResult),
    Refreshed {
        seq: u64,
        result: Result<RepoSnapshot, String>,
    },
    DetailLoaded {
        token: u64,
        result: Result<Vec<String>, String>,
    },
    Tick,
}

/// Result of handling a key event.
#[derive(Debug, PartialEq, Eq)]
pub enum KeyEventResult {
    /// Continue the event loop normally
    Continue,
    /// Should quit the application
    Quit,
}

/// Handle a key press event.
///
/// Returns `KeyEventResult::Quit` if the application should exit.
pub fn handle_key_event(app: &mut App, key: &KeyEvent) -> KeyEventResult {
    let bindings = app.pane(app.focus).bindings();
    let dispatch = route(app.overlays.top_kind(), bindings, key);
    tracing::trace!(?key.code, ?dispatch, "key routed");

    match dispatch {
        Dispatch::Quit => return KeyEventResult::Quit,
        Dispatch::Overlay => handle_overlay_key(app, key),
        Dispatch::Focus(pane) => app.set_focus(pane),
        Dispatch::Move(delta) => app.move_cursor(delta),
        Dispatch::Pane(action) => handle_pane_action(app, action),
        Dispatch::Ignore => {}
    }
    KeyEventResult::Continue
}

pub fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Operation(result) => app.on_operation(result),
        AppEvent::Refreshed { seq, result } => app.on_refreshed(seq, result),
        AppEvent::DetailLoaded { token, result } => app.on_detail_loaded(token, result),
        AppEvent::Tick => app.on_tick(),
    }
}

fn handle_pane_action(app: &mut App, action: PaneAction) {
    match action {
        PaneAction::CheckoutBranch => app.checkout_selected_branch(),
        PaneAction::DeleteBranch => app.delete_selected_branch(),
        PaneAction::NewBranch => app.push_overlay(Overlay::new_branch()),
        PaneAction::MergeBranch => app.merge_selected_branch(),
        PaneAction::FetchOrigin => {
            app.submit(
                OperationKind::Fetch {
                    remote: "origin".to_string(),
                },
                PaneId::Branches,
                Continuation::Refresh(RefreshScope::BRANCHES),
            );
        }
        PaneAction::PullCurrent => {
            app.submit(
                OperationKind::Pull,
                PaneId::Branches,
                Continuation::Refresh(RefreshScope::ALL),
            );
        }
        PaneAction::PullSelected => app.pull_selected_branch(),
        PaneAction::PrevBranchTab => app.branches.cycle_tab(-1, &app.cache),
        PaneAction::NextBranchTab => app.branches.cycle_tab(1, &app.cache),

        PaneAction::StageFile | PaneAction::UnstageFile => {
            let Some(file) = app.files.selected(&app.cache) else {
                return;
            };
            let path = file.path.clone();
            let kind = if action == PaneAction::StageFile {
                OperationKind::Stage { path }
            } else {
                OperationKind::Unstage { path }
            };
            app.submit(kind, PaneId::Files, Continuation::Refresh(RefreshScope::STATUS));
        }
        PaneAction::StageAll => {
            let paths = crate::files::FilesPane::unstaged_paths(&app.cache);
            if paths.is_empty() {
                app.set_status("Nothing to stage", StatusLevel::Info);
                return;
            }
            app.submit(
                OperationKind::StageAll { paths },
                PaneId::Files,
                Continuation::Refresh(RefreshScope::STATUS),
            );
        }
        PaneAction::UnstageAll => {
            let paths = crate::files::FilesPane::staged_paths(&app.cache);
            if paths.is_empty() {
                app.set_status("Nothing to unstage", StatusLevel::Info);
                return;
            }
            app.submit(
                OperationKind::UnstageAll { paths },
                PaneId::Files,
                Continuation::Refresh(RefreshScope::STATUS),
            );
        }
        PaneAction::OpenCommit => app.push_overlay(Overlay::commit_message()),
        PaneAction::CommitInEditor => app.editor_requested = true,
        PaneAction::Push => {
            app.submit(
                OperationKind::Push,
                PaneId::Files,
                Continuation::Refresh(RefreshScope::BRANCHES),
            );
        }
        PaneAction::ShowFileDiff => app.show_selected_file(),

        PaneAction::ShowCommit => {
            if let Some(hash) = app.log.selection_key(&app.cache) {
                app.open_detail(DetailQuery::Commit { hash });
            }
        }
        PaneAction::CheckoutCommit => {
            if let Some(hash) = app.log.selection_key(&app.cache) {
                app.checkout(
                    CheckoutTarget::Detached(hash),
                    CheckoutStrategy::Safe,
                    Continuation::ShowDetached,
                );
            }
        }
        PaneAction::RevertCommit => {
            let Some(commit) = app.log.selected(&app.cache) else {
                return;
            };
            let kind = OperationKind::Revert {
                hash: commit.hash.clone(),
                parent_count: commit.parent_count,
            };
            app.submit(kind, PaneId::Log, Continuation::ShowWorkingTree);
        }
        PaneAction::FindCommit => {
            let origin = app.log.begin_filter(&app.cache);
            app.push_overlay(Overlay::fuzzy_find(origin));
        }
        PaneAction::CopyHash => app.copy_selected_hash(),

        PaneAction::AddRemote => app.push_overlay(Overlay::add_remote()),
        PaneAction::RemoveRemote => {
            let Some(remote) = app.remotes.selected(&app.cache) else {
                return;
            };
            let name = remote.name.clone();
            let lines = vec![
                format!("Remove remote {} ({})?", name, remote.url),
                "Its remote-tracking branches are deleted too.".to_string(),
            ];
            app.push_overlay(Overlay::Confirm(ConfirmPrompt::new(
                "Remove remote",
                lines,
                ConfirmAction::RemoveRemote(name),
            )));
        }
        PaneAction::ShowRemote => {
            let Some(remote) = app.remotes.selected(&app.cache) else {
                return;
            };
            let title = format!("remote {}", remote.name);
            let lines = RemotesPane::detail_lines(remote, &app.cache);
            app.detail.show(title, lines);
            app.set_focus(PaneId::Detail);
        }

        PaneAction::ScrollTop => app.detail.scroll_top(),
        PaneAction::ScrollBottom => app.detail.scroll_bottom(),
        PaneAction::Back => {
            if let Some(pane) = app.detail.return_to() {
                app.set_focus(pane);
            }
        }
    }
}

fn handle_overlay_key(app: &mut App, key: &KeyEvent) {
    let Some(top) = app.overlays.top_mut() else {
        return;
    };
    match top.handle_key(key) {
        OverlayOutcome::Consumed => {}
        OverlayOutcome::Cancelled => app.close_overlay(),
        OverlayOutcome::QueryChanged(query) => {
            if let Some(Overlay::FuzzyFind(find)) = app.overlays.top() {
                app.log.set_query(&query, &app.cache, &find.origin);
            }
        }
        OverlayOutcome::FindMove(delta) => app.log.move_cursor(delta, &app.cache),
        OverlayOutcome::Submit(submit) => handle_overlay_submit(app, submit),
    }
}

fn handle_overlay_submit(app: &mut App, submit: OverlaySubmit) {
    match submit {
        OverlaySubmit::Commit(message) => {
            app.close_overlay();
            app.submit(
                OperationKind::Commit { message },
                PaneId::Files,
                Continuation::CommitCreated,
            );
        }
        OverlaySubmit::NewBranch(name) => {
            if app.cache.local_branch(&name).is_some() {
                if let Some(Overlay::NewBranch(o)) = app.overlays.top_mut() {
                    o.error = Some(format!("branch {} already exists", name));
                }
                return;
            }
            app.close_overlay();
            app.submit(
                OperationKind::CreateBranch { name: name.clone() },
                PaneId::Branches,
                Continuation::SelectBranch(name),
            );
        }
        OverlaySubmit::AddRemote { name, url } => {
            if app.cache.remotes.iter().any(|r| r.name == name) {
                if let Some(Overlay::AddRemote(form)) = app.overlays.top_mut() {
                    form.focus = RemoteField::Name;
                    form.error = Some(format!("remote {} already exists", name));
                }
                return;
            }
            app.close_overlay();
            app.submit(
                OperationKind::AddRemote { name, url },
                PaneId::Remotes,
                Continuation::Refresh(RefreshScope::REMOTES),
            );
        }
        OverlaySubmit::Confirm(action, choice) => {
            app.close_overlay();
            confirm(app, action, choice);
        }
        OverlaySubmit::FindAccept => app.close_overlay(),
    }
}

fn confirm(app: &mut App, action: ConfirmAction, choice: ConfirmChoice) {
    match (action, choice) {
        (ConfirmAction::DeleteBranch(name), ConfirmChoice::Yes) => {
            app.submit(
                OperationKind::DeleteBranch { name },
                PaneId::Branches,
                Continuation::Refresh(RefreshScope::BRANCHES),
            );
        }
        (ConfirmAction::RemoveRemote(name), ConfirmChoice::Yes) => {
            app.submit(
                OperationKind::RemoveRemote { name },
                PaneId::Remotes,
                Continuation::Refresh(RefreshScope::REMOTES.union(RefreshScope::BRANCHES)),
            );
        }
        (ConfirmAction::DirtyCheckout(target), choice @ (ConfirmChoice::Stash | ConfirmChoice::Discard)) => {
            let strategy = if choice == ConfirmChoice::Stash {
                CheckoutStrategy::Stash
            } else {
                CheckoutStrategy::Discard
            };
            let continuation = match target {
                CheckoutTarget::Detached(_) => Continuation::ShowDetached,
                _ => Continuation::ShowCheckedOut,
            };
            app.checkout(target, strategy, continuation);
        }
        (ConfirmAction::Conflict { revert }, ConfirmChoice::Abort) => {
            let kind = if revert {
                OperationKind::RevertAbort
            } else {
                OperationKind::MergeAbort
            };
            app.submit(kind, PaneId::Files, Continuation::Refresh(RefreshScope::ALL));
        }
        (action, choice) => {
            tracing::debug!(?action, ?choice, "confirmation without effect");
        }
    }
}

/// Post [`AppEvent::Tick`] every `interval` until `cancel` fires.
pub fn spawn_refresh_timer(
    tx: UnboundedSender<AppEvent>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately; startup already refreshed.
        timer.tick().await;
        let mut ticks = IntervalStream::new(timer);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                Some(_) = ticks.next() => {
                    if tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossterm::event::{KeyCode, KeyModifiers};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::cache::HeadState;
    use crate::detail_cache::DetailCache;
    use crate::files::{FileItem, FileStatus};
    use crate::overlay::OverlayKind;
    use crate::runner::OperationRunner;
    use crate::theme::Theme;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, code: KeyCode) -> KeyEventResult {
        handle_key_event(app, &key(code))
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            press(app, KeyCode::Char(ch));
        }
    }

    async fn setup(fake: FakeBackend) -> (App, Arc<FakeBackend>, UnboundedReceiver<AppEvent>) {
        let fake = Arc::new(fake);
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = OperationRunner::new(fake.clone(), tx, Arc::new(DetailCache::default()), 50);
        let mut app = App::new(runner, Theme::Mocha);
        app.start();
        let mut rx = rx;
        settle(&mut app, &mut rx).await;
        (app, fake, rx)
    }

    /// Apply events until the queue stays quiet.
    async fn settle(app: &mut App, rx: &mut UnboundedReceiver<AppEvent>) {
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), rx.recv()).await
        {
            handle_app_event(app, event);
        }
    }

    fn unstaged(paths: &[&str]) -> Vec<FileItem> {
        paths
            .iter()
            .map(|p| FileItem::new(*p, false, FileStatus::Modified))
            .collect()
    }

    #[tokio::test]
    async fn cursor_never_leaves_the_list() {
        let (mut app, _fake, _rx) = setup(FakeBackend::new()).await;
        for pane in ['1', '2', '3', '4', '5'] {
            press(&mut app, KeyCode::Char(pane));
            for code in [
                KeyCode::Char('j'),
                KeyCode::Char('j'),
                KeyCode::Char('j'),
                KeyCode::PageDown,
                KeyCode::Char('k'),
                KeyCode::PageUp,
                KeyCode::Char('k'),
            ] {
                press(&mut app, code);
                let pane = app.pane(app.focus);
                let len = pane.len(&app.cache);
                match pane.cursor().selected() {
                    Some(sel) => assert!(sel < len),
                    None => assert_eq!(len, 0),
                }
            }
        }
    }

    #[tokio::test]
    async fn overlay_swallows_pane_bindings() {
        let (mut app, fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.overlays.top_kind(), Some(OverlayKind::NewBranch));

        type_text(&mut app, "cdm2");
        assert_eq!(app.focus, PaneId::Branches);
        assert!(fake.calls().is_empty());
        let Some(Overlay::NewBranch(o)) = app.overlays.top() else {
            panic!("new branch overlay should still be open");
        };
        assert_eq!(o.input.text(), "cdm2");
    }

    #[tokio::test]
    async fn open_then_escape_leaves_pane_untouched() {
        let (mut app, _fake, _rx) = setup(FakeBackend::new()).await;
        let openers = [
            ('1', KeyCode::Char('n')),
            ('2', KeyCode::Char('c')),
            ('3', KeyCode::Char('/')),
            ('4', KeyCode::Char('a')),
        ];
        for (pane, opener) in openers {
            press(&mut app, KeyCode::Char(pane));
            press(&mut app, KeyCode::Char('j'));
            let focus = app.focus;
            let before = *app.pane(focus).cursor();
            let rows = app.pane(focus).len(&app.cache);

            press(&mut app, opener);
            assert!(!app.overlays.is_empty());
            press(&mut app, KeyCode::Esc);

            assert!(app.overlays.is_empty());
            assert_eq!(app.focus, focus);
            assert_eq!(*app.pane(focus).cursor(), before);
            assert_eq!(app.pane(focus).len(&app.cache), rows);
        }
        assert!(app.log.filter().is_none());
    }

    #[tokio::test]
    async fn escape_at_top_level_quits() {
        let (mut app, _fake, _rx) = setup(FakeBackend::new()).await;
        assert_eq!(press(&mut app, KeyCode::Esc), KeyEventResult::Quit);
    }

    #[tokio::test]
    async fn fuzzy_find_round_trip() {
        let (mut app, _fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.log.selection_key(&app.cache).as_deref(), Some("c2"));

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "import");
        assert_eq!(app.log.items(&app.cache).len(), 1);
        assert_eq!(app.log.selection_key(&app.cache).as_deref(), Some("c1"));

        press(&mut app, KeyCode::Esc);
        assert!(app.overlays.is_empty());
        assert_eq!(app.log.items(&app.cache).len(), 2);
        assert_eq!(app.log.selection_key(&app.cache).as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn stage_all_then_unstage_all_round_trips() {
        let fake = FakeBackend::new().with_files(unstaged(&["a.rs", "b.rs", "c.rs"]));
        let (mut app, fake, mut rx) = setup(fake).await;
        press(&mut app, KeyCode::Char('2'));

        press(&mut app, KeyCode::Char('a'));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.cache.files.len(), 3);
        assert!(app.cache.files.iter().all(|f| f.staged));

        press(&mut app, KeyCode::Char('A'));
        settle(&mut app, &mut rx).await;
        assert_eq!(app.cache.files.len(), 3);
        assert!(app.cache.files.iter().all(|f| !f.staged));
        assert_eq!(fake.calls().len(), 2);
    }

    #[tokio::test]
    async fn stage_all_reports_the_paths_that_failed() {
        let fake = FakeBackend::new().with_files(unstaged(&["a.rs", "locked.rs", "c.rs"]));
        fake.repo.lock().locked_paths.insert("locked.rs".to_string());
        let (mut app, _fake, mut rx) = setup(fake).await;
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('a'));
        settle(&mut app, &mut rx).await;

        let staged: Vec<_> = app
            .cache
            .files
            .iter()
            .filter(|f| f.staged)
            .map(|f| f.path.as_str())
            .collect();
        assert_eq!(staged.len(), 2);
        assert!(app.detail.lines().iter().any(|l| l.contains("locked.rs")));
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.starts_with("partial failure"));
    }

    #[tokio::test]
    async fn add_remote_with_empty_url_stays_local() {
        let (mut app, fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "origin");
        press(&mut app, KeyCode::Enter);

        assert!(fake.calls().is_empty());
        let Some(Overlay::AddRemote(form)) = app.overlays.top() else {
            panic!("form should stay open");
        };
        assert_eq!(form.focus, RemoteField::Url);
        assert!(form.error.is_some());
    }

    #[tokio::test]
    async fn add_remote_submits_both_fields() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('4'));
        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "upstream");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "https://example.com/up.git");
        press(&mut app, KeyCode::Enter);
        assert!(app.overlays.is_empty());
        settle(&mut app, &mut rx).await;

        assert_eq!(fake.calls().len(), 1);
        assert!(app.cache.remotes.iter().any(|r| r.name == "upstream"));
    }

    #[tokio::test]
    async fn double_pull_runs_twice() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('p'));
        press(&mut app, KeyCode::Char('p'));
        assert_eq!(app.busy(PaneId::Branches), 2);

        settle(&mut app, &mut rx).await;
        assert_eq!(fake.repo.lock().pulls, 2);
        assert_eq!(app.busy(PaneId::Branches), 0);
        assert_eq!(app.cache.branches.iter().filter(|b| b.is_current).count(), 1);
    }

    #[tokio::test]
    async fn checkout_moves_the_current_marker() {
        let (mut app, _fake, mut rx) = setup(FakeBackend::new()).await;
        assert_eq!(app.cache.current_branch().map(|b| b.name.as_str()), Some("main"));

        press(&mut app, KeyCode::Char('j'));
        assert_eq!(
            app.branches.selected_branch(&app.cache).map(|b| b.name.as_str()),
            Some("dev")
        );
        press(&mut app, KeyCode::Char('c'));
        settle(&mut app, &mut rx).await;

        let current: Vec<_> = app.cache.branches.iter().filter(|b| b.is_current).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].name, "dev");
        assert_eq!(
            app.branches.selected_branch(&app.cache).map(|b| b.name.as_str()),
            Some("dev")
        );
    }

    #[tokio::test]
    async fn remote_branch_tracked_by_current_branch_stays_put() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(
            app.branches.selected_branch(&app.cache).map(|b| b.name.as_str()),
            Some("origin/main")
        );
        press(&mut app, KeyCode::Char('c'));
        settle(&mut app, &mut rx).await;

        assert!(fake.calls().is_empty());
        let status = app.status.as_ref().map(|s| s.text.as_str());
        assert_eq!(status, Some("Already on main"));
    }

    #[tokio::test]
    async fn dirty_checkout_offers_stash() {
        let fake = FakeBackend::new();
        fake.repo.lock().dirty = vec!["README.md".to_string()];
        let (mut app, fake, mut rx) = setup(fake).await;

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('c'));
        settle(&mut app, &mut rx).await;
        let Some(Overlay::Confirm(prompt)) = app.overlays.top() else {
            panic!("expected a confirmation prompt");
        };
        assert_eq!(
            prompt.action,
            ConfirmAction::DirtyCheckout(CheckoutTarget::Branch("dev".to_string()))
        );

        press(&mut app, KeyCode::Char('s'));
        settle(&mut app, &mut rx).await;
        assert!(app.overlays.is_empty());
        assert!(matches!(
            fake.calls().last(),
            Some(OperationKind::Checkout {
                strategy: CheckoutStrategy::Stash,
                ..
            })
        ));
        assert_eq!(app.cache.current_branch().map(|b| b.name.as_str()), Some("dev"));
    }

    #[tokio::test]
    async fn merge_conflict_moves_focus_to_files() {
        let fake = FakeBackend::new();
        fake.repo.lock().merge_conflicts = vec!["src/lib.rs".to_string()];
        let fake = fake.with_files(unstaged(&["notes.txt"]));
        let (mut app, fake, mut rx) = setup(fake).await;

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('m'));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.focus, PaneId::Files);
        let selected = app.files.selected(&app.cache).unwrap();
        assert!(selected.is_conflicted());
        assert_eq!(selected.path, "src/lib.rs");
        let Some(Overlay::Confirm(prompt)) = app.overlays.top() else {
            panic!("expected the conflict prompt");
        };
        assert_eq!(prompt.action, ConfirmAction::Conflict { revert: false });

        press(&mut app, KeyCode::Char('a'));
        settle(&mut app, &mut rx).await;
        assert_eq!(fake.calls().last(), Some(&OperationKind::MergeAbort));
        assert!(app.cache.conflicted_paths().is_empty());
    }

    #[tokio::test]
    async fn deleting_the_current_branch_is_refused_locally() {
        let (mut app, fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('d'));
        assert!(app.overlays.is_empty());
        assert!(fake.calls().is_empty());
        let status = app.status.as_ref().unwrap();
        assert!(status.text.starts_with("invalid operation"));
    }

    #[tokio::test]
    async fn delete_asks_before_running() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.overlays.top_kind(), Some(OverlayKind::Confirm));
        assert!(fake.calls().is_empty());

        press(&mut app, KeyCode::Char('y'));
        settle(&mut app, &mut rx).await;
        assert!(app.cache.local_branch("dev").is_none());
    }

    #[tokio::test]
    async fn commit_prepends_to_the_log() {
        let files = vec![FileItem::new("a.rs", true, FileStatus::Modified)];
        let (mut app, _fake, mut rx) = setup(FakeBackend::new().with_files(files)).await;
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('c'));
        press(&mut app, KeyCode::Enter);
        assert!(!app.overlays.is_empty(), "empty message is rejected locally");

        type_text(&mut app, "Fix typo");
        press(&mut app, KeyCode::Enter);
        assert!(app.overlays.is_empty());
        settle(&mut app, &mut rx).await;

        assert_eq!(app.cache.commits[0].hash, "c3");
        assert_eq!(app.cache.commits[0].summary, "Fix typo");
        assert!(app.cache.files.is_empty());
    }

    #[tokio::test]
    async fn rejected_push_is_reported() {
        let fake = FakeBackend::new();
        fake.repo.lock().push_rejected = true;
        let (mut app, _fake, mut rx) = setup(fake).await;
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('p'));
        settle(&mut app, &mut rx).await;

        let status = app.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Error);
        assert!(status.text.starts_with("non-fast-forward"));
        assert_eq!(app.detail.title(), "push failed");
    }

    #[tokio::test]
    async fn revert_lands_in_files() {
        let (mut app, _fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('r'));
        settle(&mut app, &mut rx).await;

        assert_eq!(app.focus, PaneId::Files);
        assert!(app.cache.files.iter().any(|f| f.path == "reverted-c2.txt" && f.staged));
        assert_eq!(app.cache.commits.len(), 2);
    }

    #[tokio::test]
    async fn pull_selected_needs_an_upstream() {
        let (mut app, fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('P'));
        assert!(fake.calls().is_empty());
        assert!(app.status.as_ref().unwrap().text.contains("no upstream"));
    }

    #[tokio::test]
    async fn pull_selected_updates_the_branch_without_checkout() {
        let fake = FakeBackend::new();
        fake.repo.lock().branches[1].upstream = Some("origin/main".to_string());
        let (mut app, fake, mut rx) = setup(fake).await;

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('P'));
        settle(&mut app, &mut rx).await;

        assert_eq!(
            fake.calls(),
            vec![OperationKind::PullBranch {
                branch: "dev".to_string(),
                upstream: "origin/main".to_string(),
            }]
        );
        assert_eq!(app.cache.head, Some(HeadState::Branch("main".to_string())));
        assert_eq!(app.cache.current_branch().map(|b| b.name.as_str()), Some("main"));
    }

    #[tokio::test]
    async fn fetch_always_targets_origin() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('f'));
        settle(&mut app, &mut rx).await;

        assert_eq!(
            fake.calls(),
            vec![OperationKind::Fetch {
                remote: "origin".to_string(),
            }]
        );
        assert_eq!(app.busy(PaneId::Branches), 0);
    }

    #[tokio::test]
    async fn commit_checkout_warns_about_detached_head() {
        let (mut app, fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('c'));
        settle(&mut app, &mut rx).await;

        assert!(matches!(
            fake.calls().as_slice(),
            [OperationKind::Checkout {
                target: CheckoutTarget::Detached(rev),
                ..
            }] if rev == "c1"
        ));
        assert_eq!(app.cache.head, Some(HeadState::Detached("c1".to_string())));
        assert!(app.cache.branches.iter().all(|b| !b.is_current));
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.level, StatusLevel::Warn);
        assert!(status.text.starts_with("HEAD detached at c1"));
    }

    #[tokio::test]
    async fn leaving_the_log_mid_search_keeps_the_found_commit() {
        let (mut app, _fake, _rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "import");
        assert_eq!(app.log.items(&app.cache).len(), 1);

        // A completion handler can move focus while the find box is open.
        app.set_focus(PaneId::Files);

        assert!(app.overlays.is_empty());
        assert!(app.log.filter().is_none());
        assert_eq!(app.log.items(&app.cache).len(), 2);
        assert_eq!(app.log.selection_key(&app.cache).as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn detail_back_returns_to_origin() {
        let (mut app, _fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.focus, PaneId::Detail);
        settle(&mut app, &mut rx).await;
        assert!(!app.detail.is_loading());
        assert_eq!(app.detail.lines()[1], "fake detail");

        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.focus, PaneId::Log);
    }

    fn render_to_string(app: &mut App, width: u16, height: u16) -> String {
        use ratatui::backend::TestBackend;
        let mut terminal = ratatui::Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| crate::ui::render(app, f)).unwrap();
        let buf = terminal.backend().buffer();
        let mut lines = Vec::new();
        for y in 0..buf.area.height {
            let line: String = (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect();
            lines.push(line.trim_end().to_string());
        }
        lines.join("\n")
    }

    #[tokio::test]
    async fn detail_pane_draws_loaded_lines() {
        let (mut app, _fake, mut rx) = setup(FakeBackend::new()).await;
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Enter);
        settle(&mut app, &mut rx).await;

        let screen = render_to_string(&mut app, 120, 40);
        assert!(screen.contains("fake detail"));
    }

    #[tokio::test]
    async fn timer_ticks_until_cancelled() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let handle = spawn_refresh_timer(tx, Duration::from_millis(10), cancel.clone());
        assert!(matches!(rx.recv().await, Some(AppEvent::Tick)));
        cancel.cancel();
        handle.await.unwrap();
    }
}
