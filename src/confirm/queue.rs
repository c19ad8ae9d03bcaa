//! Approval prompts parked until a human answers them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::{Answer, ApprovalPrompt, Confirmer};
use crate::error::ShellBridgeError;
use crate::host::OutputSink;
use crate::Result;

/// A prompt waiting for an answer.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    pub id: u64,
    #[serde(flatten)]
    pub prompt: ApprovalPrompt,
}

struct Entry {
    prompt: ApprovalPrompt,
    reply: oneshot::Sender<Answer>,
}

/// Confirmer that queues prompts for an external UI.
///
/// Each call to [`Confirmer::ask`] registers a pending approval and waits
/// on its reply channel. [`ApprovalQueue::respond`] delivers the answer.
/// If the queue is dropped with prompts still pending, those prompts are
/// abandoned and their callers see [`ShellBridgeError::ConfirmationAborted`].
#[derive(Default)]
pub struct ApprovalQueue {
    next_id: AtomicU64,
    pending: Mutex<HashMap<u64, Entry>>,
    notify: Option<std::sync::Arc<dyn OutputSink>>,
}

impl ApprovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce every new prompt on `sink`.
    pub fn with_notifier(mut self, sink: std::sync::Arc<dyn OutputSink>) -> Self {
        self.notify = Some(sink);
        self
    }

    /// Prompts still waiting, oldest first.
    pub fn list(&self) -> Result<Vec<PendingApproval>> {
        let pending = self
            .pending
            .lock()
            .map_err(|_| ShellBridgeError::LockPoisoned)?;
        let mut list: Vec<PendingApproval> = pending
            .iter()
            .map(|(id, entry)| PendingApproval {
                id: *id,
                prompt: entry.prompt.clone(),
            })
            .collect();
        list.sort_by_key(|p| p.id);
        Ok(list)
    }

    /// Answer pending approval `id`.
    pub fn respond(&self, id: u64, answer: Answer) -> Result<()> {
        let entry = self
            .pending
            .lock()
            .map_err(|_| ShellBridgeError::LockPoisoned)?
            .remove(&id)
            .ok_or_else(|| ShellBridgeError::ApprovalNotFound(id.to_string()))?;

        debug!(id, "approval answered");
        // The asker may have gone away; nothing left to do then.
        let _ = entry.reply.send(answer);
        Ok(())
    }

    /// Number of prompts waiting.
    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn register(&self, prompt: &ApprovalPrompt) -> Result<(u64, oneshot::Receiver<Answer>)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (reply, rx) = oneshot::channel();
        self.pending
            .lock()
            .map_err(|_| ShellBridgeError::LockPoisoned)?
            .insert(
                id,
                Entry {
                    prompt: prompt.clone(),
                    reply,
                },
            );
        Ok((id, rx))
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }
}

#[async_trait]
impl Confirmer for ApprovalQueue {
    async fn ask(&self, prompt: &ApprovalPrompt) -> Result<Answer> {
        let (id, rx) = self.register(prompt)?;
        info!(id, command = %prompt.body, "approval required");
        if let Some(sink) = &self.notify {
            sink.warn(&format!(
                "Approval {} required: {} ({} / {})",
                id, prompt.body, prompt.approve_label, prompt.deny_label
            ));
        }

        // Unregister if the asking request is dropped mid-wait.
        let cleanup = Cleanup { queue: self, id };
        let answer = rx.await.map_err(|_| ShellBridgeError::ConfirmationAborted);
        drop(cleanup);
        answer
    }
}

struct Cleanup<'a> {
    queue: &'a ApprovalQueue,
    id: u64,
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        self.queue.forget(self.id);
    }
}
