//! Off-thread execution of backend work.
//!
//! Each call spawns a tokio task that runs the blocking backend call on
//! `spawn_blocking` and posts exactly one [`AppEvent`] back on the queue,
//! whether the call succeeded, failed or panicked. Nothing here touches
//! application state.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{Backend, DetailQuery};
use crate::cache::{RefreshScope, RepoSnapshot};
use crate::detail_cache::DetailCache;
use crate::events::AppEvent;
use crate::operation::{
    Continuation, OperationError, OperationKind, OperationRequest, OperationResult, RequestId,
};
use crate::pane::PaneId;

pub struct OperationRunner {
    backend: Arc<dyn Backend>,
    tx: UnboundedSender<AppEvent>,
    details: Arc<DetailCache>,
    log_limit: usize,
    next_request: RequestId,
    next_seq: u64,
    next_token: u64,
}

impl OperationRunner {
    pub fn new(
        backend: Arc<dyn Backend>,
        tx: UnboundedSender<AppEvent>,
        details: Arc<DetailCache>,
        log_limit: usize,
    ) -> Self {
        Self {
            backend,
            tx,
            details,
            log_limit,
            next_request: 1,
            next_seq: 1,
            next_token: 1,
        }
    }

    /// Dispatch an operation. Identical requests are never merged.
    pub fn submit(
        &mut self,
        kind: OperationKind,
        origin: PaneId,
        continuation: Continuation,
    ) -> RequestId {
        let id = self.next_request;
        self.next_request += 1;

        let request = OperationRequest {
            id,
            kind,
            origin,
            continuation,
        };
        tracing::info!(id, origin = ?origin, op = %request.kind.describe(), "submitting operation");

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let kind = request.kind.clone();
            let outcome = match tokio::task::spawn_blocking(move || backend.run(&kind)).await {
                Ok(outcome) => outcome,
                Err(e) => Err(OperationError::Backend(format!("operation task failed: {}", e))),
            };
            match &outcome {
                Ok(_) => tracing::info!(id = request.id, "operation finished"),
                Err(e) => {
                    tracing::warn!(id = request.id, kind = ?e.kind(), error = %e, "operation failed")
                }
            }
            let _ = tx.send(AppEvent::Operation(OperationResult { request, outcome }));
        });
        id
    }

    /// Re-query `scope`. Returns the sequence number the result will carry.
    pub fn refresh(&mut self, scope: RefreshScope) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        tracing::debug!(seq, ?scope, "refresh requested");

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let limit = self.log_limit;
        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                RepoSnapshot::load(backend.as_ref(), scope, limit)
            })
            .await
            .unwrap_or_else(|e| Err(format!("refresh task failed: {}", e)));
            let _ = tx.send(AppEvent::Refreshed { seq, result });
        });
        seq
    }

    /// Load text for the Detail pane. Commit details go through the LRU.
    pub fn load_detail(&mut self, query: DetailQuery) -> u64 {
        let token = self.next_token;
        self.next_token += 1;

        let backend = Arc::clone(&self.backend);
        let details = Arc::clone(&self.details);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let q = query;
            let result = tokio::task::spawn_blocking(move || -> Result<Vec<String>, String> {
                if let DetailQuery::Commit { hash } = &q
                    && let Some(lines) = details.get(hash)
                {
                    return Ok(lines);
                }
                let lines = backend.load_detail(&q)?;
                if let DetailQuery::Commit { hash } = &q {
                    details.insert(hash.clone(), lines.clone());
                }
                Ok(lines)
            })
            .await
            .unwrap_or_else(|e| Err(format!("detail task failed: {}", e)));
            let _ = tx.send(AppEvent::DetailLoaded { token, result });
        });
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::branch::{BranchItem, TagItem};
    use crate::cache::HeadState;
    use crate::files::FileItem;
    use crate::log::CommitItem;
    use crate::operation::{ErrorKind, OperationOutput};
    use crate::remotes::RemoteItem;
    use tokio::sync::mpsc;

    struct PanickingBackend;

    impl Backend for PanickingBackend {
        fn run(&self, _op: &OperationKind) -> Result<OperationOutput, OperationError> {
            panic!("backend blew up")
        }
        fn query_head(&self) -> Result<HeadState, String> {
            Err("no repo".to_string())
        }
        fn query_branches(&self) -> Result<Vec<BranchItem>, String> {
            Ok(Vec::new())
        }
        fn query_tags(&self) -> Result<Vec<TagItem>, String> {
            Ok(Vec::new())
        }
        fn query_log(&self, _limit: usize) -> Result<Vec<CommitItem>, String> {
            Ok(Vec::new())
        }
        fn query_status(&self) -> Result<Vec<FileItem>, String> {
            Ok(Vec::new())
        }
        fn query_remotes(&self) -> Result<Vec<RemoteItem>, String> {
            Ok(Vec::new())
        }
        fn load_detail(&self, _query: &DetailQuery) -> Result<Vec<String>, String> {
            Ok(Vec::new())
        }
    }

    fn runner(backend: Arc<dyn Backend>) -> (OperationRunner, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = OperationRunner::new(backend, tx, Arc::new(DetailCache::default()), 50);
        (runner, rx)
    }

    #[tokio::test]
    async fn identical_requests_run_independently() {
        let fake = Arc::new(FakeBackend::new());
        let (mut runner, mut rx) = runner(fake.clone());
        let cont = Continuation::Refresh(RefreshScope::ALL);
        let a = runner.submit(OperationKind::Pull, PaneId::Branches, cont.clone());
        let b = runner.submit(OperationKind::Pull, PaneId::Branches, cont);
        assert_ne!(a, b);

        let mut seen = Vec::new();
        for _ in 0..2 {
            match rx.recv().await {
                Some(AppEvent::Operation(result)) => {
                    assert!(result.outcome.is_ok());
                    seen.push(result.request.id);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        seen.sort();
        assert_eq!(seen, vec![a, b]);
        assert_eq!(fake.repo.lock().pulls, 2);
    }

    #[tokio::test]
    async fn panicking_backend_still_reports_once() {
        let (mut runner, mut rx) = runner(Arc::new(PanickingBackend));
        let id = runner.submit(
            OperationKind::Push,
            PaneId::Files,
            Continuation::Refresh(RefreshScope::BRANCHES),
        );
        let Some(AppEvent::Operation(result)) = rx.recv().await else {
            panic!("expected an operation result");
        };
        assert_eq!(result.request.id, id);
        assert_eq!(result.outcome.unwrap_err().kind(), ErrorKind::BackendError);

        drop(runner);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn refresh_sequence_numbers_increase() {
        let (mut runner, mut rx) = runner(Arc::new(FakeBackend::new()));
        let first = runner.refresh(RefreshScope::ALL);
        let second = runner.refresh(RefreshScope::STATUS);
        assert!(second > first);

        for _ in 0..2 {
            let Some(AppEvent::Refreshed { seq, result }) = rx.recv().await else {
                panic!("expected a refresh");
            };
            let snap = result.unwrap();
            if seq == first {
                assert!(snap.branches.is_some() && snap.commits.is_some());
            } else {
                assert!(snap.branches.is_none() && snap.files.is_some());
            }
        }
    }

    #[tokio::test]
    async fn commit_details_are_cached() {
        let details = Arc::new(DetailCache::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut runner = OperationRunner::new(Arc::new(FakeBackend::new()), tx, details.clone(), 50);
        let token = runner.load_detail(DetailQuery::Commit {
            hash: "c2".to_string(),
        });
        let Some(AppEvent::DetailLoaded { token: got, result }) = rx.recv().await else {
            panic!("expected detail");
        };
        assert_eq!(got, token);
        assert!(result.is_ok());
        assert!(details.get("c2").is_some());
    }
}
