//! Human confirmation before commands run.
//!
//! [`should_confirm`] is the pure policy. [`ConfirmationGate`] asks a
//! [`Confirmer`] (the approval UI) and turns its answer into a
//! [`Decision`]. Two confirmers ship with the crate: [`ApprovalQueue`],
//! which parks prompts until someone answers them over HTTP, and
//! [`AutoApprove`].

mod queue;

pub use queue::{ApprovalQueue, PendingApproval};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ShellBridgeError;
use crate::Result;

/// Label of the action that lets a command run.
pub const APPROVE_LABEL: &str = "Run";
/// Label of the action that refuses a command.
pub const DENY_LABEL: &str = "Reject";

/// Whether a command needs a human's approval before it runs.
pub fn should_confirm(modify_something: bool, confirm_non_destructive: bool) -> bool {
    modify_something || confirm_non_destructive
}

/// Outcome of a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
    /// The human typed a reply instead of picking an action.
    Feedback(String),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approve)
    }
}

/// What the approval UI shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalPrompt {
    pub title: String,
    pub body: String,
    pub approve_label: String,
    pub deny_label: String,
}

impl ApprovalPrompt {
    /// Prompt asking whether to run `command`.
    pub fn for_command(command: &str) -> Self {
        Self {
            title: "Run this command?".to_string(),
            body: command.to_string(),
            approve_label: APPROVE_LABEL.to_string(),
            deny_label: DENY_LABEL.to_string(),
        }
    }
}

/// What the human answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    /// One of the prompt's action labels.
    Action(String),
    /// Free-text reply.
    Feedback(String),
}

/// The human-approval UI.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Show `prompt` and wait for an answer. No timeout.
    ///
    /// Returns [`ShellBridgeError::ConfirmationAborted`] if the prompt was
    /// abandoned without an answer.
    async fn ask(&self, prompt: &ApprovalPrompt) -> Result<Answer>;
}

/// Approves every command without asking.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

#[async_trait]
impl Confirmer for AutoApprove {
    async fn ask(&self, prompt: &ApprovalPrompt) -> Result<Answer> {
        Ok(Answer::Action(prompt.approve_label.clone()))
    }
}

/// Asks the confirmer and maps its answer to a decision.
#[derive(Clone)]
pub struct ConfirmationGate {
    confirmer: Arc<dyn Confirmer>,
}

impl ConfirmationGate {
    pub fn new(confirmer: Arc<dyn Confirmer>) -> Self {
        Self { confirmer }
    }

    /// Ask whether `command` may run. Suspends until answered.
    pub async fn confirm(&self, command: &str) -> Result<Decision> {
        let prompt = ApprovalPrompt::for_command(command);
        debug!(command, "awaiting confirmation");

        let decision = match self.confirmer.ask(&prompt).await {
            Ok(answer) => Self::decide(&prompt, answer),
            Err(ShellBridgeError::ConfirmationAborted) => Decision::Deny,
            Err(e) => return Err(e),
        };

        info!(command, approved = decision.is_approved(), "confirmation answered");
        Ok(decision)
    }

    fn decide(prompt: &ApprovalPrompt, answer: Answer) -> Decision {
        match answer {
            Answer::Action(label) if label == prompt.approve_label => Decision::Approve,
            Answer::Action(label) if label == prompt.deny_label => Decision::Deny,
            Answer::Action(text) | Answer::Feedback(text) => {
                if text.trim().is_empty() {
                    Decision::Deny
                } else {
                    Decision::Feedback(text)
                }
            }
        }
    }
}

impl std::fmt::Debug for ConfirmationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Result<Answer>);

    #[async_trait]
    impl Confirmer for Scripted {
        async fn ask(&self, _prompt: &ApprovalPrompt) -> Result<Answer> {
            match &self.0 {
                Ok(answer) => Ok(answer.clone()),
                Err(ShellBridgeError::ConfirmationAborted) => {
                    Err(ShellBridgeError::ConfirmationAborted)
                }
                Err(_) => Err(ShellBridgeError::ChannelClosed),
            }
        }
    }

    fn gate(answer: Result<Answer>) -> ConfirmationGate {
        ConfirmationGate::new(Arc::new(Scripted(answer)))
    }

    #[test]
    fn test_should_confirm_truth_table() {
        assert!(!should_confirm(false, false));
        assert!(should_confirm(false, true));
        assert!(should_confirm(true, false));
        assert!(should_confirm(true, true));
    }

    #[test]
    fn test_prompt_for_command() {
        let prompt = ApprovalPrompt::for_command("rm -rf tmp");
        assert_eq!(prompt.body, "rm -rf tmp");
        assert_eq!(prompt.approve_label, APPROVE_LABEL);
        assert_eq!(prompt.deny_label, DENY_LABEL);
    }

    #[tokio::test]
    async fn test_approve_label() {
        let decision = gate(Ok(Answer::Action(APPROVE_LABEL.into())))
            .confirm("ls")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Approve);
    }

    #[tokio::test]
    async fn test_deny_label() {
        let decision = gate(Ok(Answer::Action(DENY_LABEL.into())))
            .confirm("ls")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);
    }

    #[tokio::test]
    async fn test_feedback_text() {
        let decision = gate(Ok(Answer::Feedback("too risky".into())))
            .confirm("rm -rf tmp")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Feedback("too risky".into()));
    }

    #[tokio::test]
    async fn test_unknown_action_is_feedback() {
        let decision = gate(Ok(Answer::Action("use git clean".into())))
            .confirm("rm -rf tmp")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Feedback("use git clean".into()));
    }

    #[tokio::test]
    async fn test_blank_feedback_is_deny() {
        let decision = gate(Ok(Answer::Feedback("  ".into())))
            .confirm("ls")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);
    }

    #[tokio::test]
    async fn test_aborted_is_deny() {
        let decision = gate(Err(ShellBridgeError::ConfirmationAborted))
            .confirm("ls")
            .await
            .unwrap();
        assert_eq!(decision, Decision::Deny);
    }

    #[tokio::test]
    async fn test_other_errors_propagate() {
        let result = gate(Err(ShellBridgeError::ChannelClosed)).confirm("ls").await;
        assert!(matches!(result, Err(ShellBridgeError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let gate = ConfirmationGate::new(Arc::new(AutoApprove));
        assert_eq!(gate.confirm("anything").await.unwrap(), Decision::Approve);
    }
}
