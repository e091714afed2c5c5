//! Consent and file-pick prompts raised by tools and answered by the host.
//!
//! A tool calls [`InteractionBroker::request_approval`] or
//! [`InteractionBroker::request_file_pick`] and blocks until the host answers
//! through `respond_*` or the configured timeout elapses. Unanswered prompts
//! resolve as denied / canceled. Prompts abandoned by an aborted invocation
//! are withdrawn when the waiting future is dropped.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    serde::{Deserialize, Serialize},
    tokio::sync::oneshot,
    tracing::{debug, warn},
};

/// Outcome of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Denied,
    Timeout,
}

impl ApprovalDecision {
    #[must_use]
    pub fn is_approved(self) -> bool {
        self == Self::Approved
    }
}

/// Outcome of a file pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePick {
    Picked(PathBuf),
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub id: String,
    pub tool: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingFilePick {
    pub id: String,
    pub tool: String,
    pub purpose: String,
}

struct Waiter<P, T> {
    seq: u64,
    info: P,
    tx: oneshot::Sender<T>,
}

type Table<P, T> = Mutex<HashMap<String, Waiter<P, T>>>;

fn lock<P, T>(table: &Table<P, T>) -> MutexGuard<'_, HashMap<String, Waiter<P, T>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a prompt from its table when the waiting side goes away.
struct Withdraw<'a, P, T> {
    table: &'a Table<P, T>,
    id: String,
}

impl<P, T> Drop for Withdraw<'_, P, T> {
    fn drop(&mut self) {
        lock(self.table).remove(&self.id);
    }
}

pub struct InteractionBroker {
    timeout: Duration,
    seq: AtomicU64,
    approvals: Table<PendingApproval, bool>,
    file_picks: Table<PendingFilePick, Option<PathBuf>>,
}

impl Default for InteractionBroker {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl InteractionBroker {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            seq: AtomicU64::new(0),
            approvals: Mutex::new(HashMap::new()),
            file_picks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn shared(timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Raise an approval prompt and wait for the answer.
    pub async fn request_approval(&self, tool: &str, summary: &str) -> ApprovalDecision {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        let info = PendingApproval {
            id: id.clone(),
            tool: tool.to_string(),
            summary: summary.to_string(),
        };
        lock(&self.approvals).insert(id.clone(), Waiter {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            info,
            tx,
        });
        debug!(id = %id, tool, "approval request created");
        let _withdraw = Withdraw {
            table: &self.approvals,
            id,
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(true)) => ApprovalDecision::Approved,
            Ok(Ok(false)) => ApprovalDecision::Denied,
            Ok(Err(_)) => {
                warn!(tool, "approval channel closed");
                ApprovalDecision::Denied
            },
            Err(_) => {
                warn!(tool, "approval timed out");
                ApprovalDecision::Timeout
            },
        }
    }

    /// Ask the host to pick a file and wait for the answer.
    pub async fn request_file_pick(&self, tool: &str, purpose: &str) -> FilePick {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        let info = PendingFilePick {
            id: id.clone(),
            tool: tool.to_string(),
            purpose: purpose.to_string(),
        };
        lock(&self.file_picks).insert(id.clone(), Waiter {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            info,
            tx,
        });
        debug!(id = %id, tool, "file pick request created");
        let _withdraw = Withdraw {
            table: &self.file_picks,
            id,
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Some(path))) => FilePick::Picked(path),
            Ok(Ok(None)) | Ok(Err(_)) => FilePick::Canceled,
            Err(_) => {
                warn!(tool, "file pick timed out");
                FilePick::Canceled
            },
        }
    }

    /// Outstanding approval prompts, oldest first.
    pub fn pending_approvals(&self) -> Vec<PendingApproval> {
        let table = lock(&self.approvals);
        let mut waiters: Vec<_> = table.values().collect();
        waiters.sort_by_key(|w| w.seq);
        waiters.into_iter().map(|w| w.info.clone()).collect()
    }

    /// Answer an approval prompt. Returns `false` if no such prompt exists.
    pub fn respond_approval(&self, id: &str, granted: bool) -> bool {
        let Some(waiter) = lock(&self.approvals).remove(id) else {
            warn!(id, "approval response: no pending request");
            return false;
        };
        debug!(id, granted, "approval resolved");
        let _ = waiter.tx.send(granted);
        true
    }

    /// Outstanding file picks, oldest first.
    pub fn pending_file_picks(&self) -> Vec<PendingFilePick> {
        let table = lock(&self.file_picks);
        let mut waiters: Vec<_> = table.values().collect();
        waiters.sort_by_key(|w| w.seq);
        waiters.into_iter().map(|w| w.info.clone()).collect()
    }

    /// Answer a file pick; `None` cancels it.
    pub fn respond_file_pick(&self, id: &str, path: Option<PathBuf>) -> bool {
        let Some(waiter) = lock(&self.file_picks).remove(id) else {
            warn!(id, "file pick response: no pending request");
            return false;
        };
        debug!(id, picked = path.is_some(), "file pick resolved");
        let _ = waiter.tx.send(path);
        true
    }
}
