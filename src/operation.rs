//! Plumbing shared by the controllers: the cancellation scope that owns a
//! controller's worker task, completion handles for queued operations, and
//! the failure signal surfaced to the display.

use std::{fmt, future::Future};

use serde::Serialize;
use tokio::{sync::oneshot, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Initialize,
    Start,
    Stop,
    Clear,
    Rate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Initialize => "initialize",
            Operation::Start => "start",
            Operation::Stop => "stop",
            Operation::Clear => "clear",
            Operation::Rate => "rate",
        };
        f.write_str(name)
    }
}

/// A store operation failed because the medium was unavailable.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreFailure {
    pub operation: Operation,
    pub message: String,
}

/// Resolves once a queued operation has run.
///
/// Dropping it does not cancel anything; the display layer usually ignores it.
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Completion {
    /// `true` when the operation ran to the end (including a reported store
    /// failure), `false` when it was abandoned by teardown.
    pub async fn wait(self) -> bool {
        self.rx.await.is_ok()
    }
}

pub(crate) type Done = oneshot::Sender<()>;

pub(crate) fn completion() -> (Done, Completion) {
    let (tx, rx) = oneshot::channel();
    (tx, Completion { rx })
}

/// Races a store call against the scope's cancellation. A cancelled call is
/// dropped mid-flight and reported as [`StoreError::Cancelled`].
pub(crate) async fn guarded<T, F>(token: &CancellationToken, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StoreError::Cancelled),
        result = call => result,
    }
}

/// Owns a controller's worker task. Cancelling the parent token passed at
/// construction tears down every scope derived from it.
pub(crate) struct ControllerScope {
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl ControllerScope {
    pub(crate) fn spawn<F, Fut>(parent: &CancellationToken, worker: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let handle = tokio::spawn(worker(token.clone()));
        Self {
            token,
            worker: Some(handle),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the worker and waits for it to exit.
    pub(crate) async fn shutdown(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.worker.take() {
            if let Err(err) = handle.await {
                log::error!("controller worker failed to join: {err}");
            }
        }
    }
}

impl Drop for ControllerScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
