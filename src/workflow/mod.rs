//! The review workflow: which labels a pull request gets and which reviews are requested
//! as it moves through review.
use axum::async_trait;

use crate::github::PullRequestId;

pub mod event;
mod handlers;
pub mod labels;
pub mod transition;

pub use event::{classify, EventKind, WorkflowEvent};
pub use handlers::{handle_workflow_event, WorkflowActionError, WorkflowStep};
pub use labels::{LabelSet, WorkflowLabel};
pub use transition::{transition, Transition, WorkflowAction};

/// Provides functionality for modifying pull requests on the remote repository.
#[async_trait]
pub trait RepositoryClient {
    /// Remove a label from a PR.
    /// Removing a label that is not attached to the PR is not an error.
    async fn remove_label(&self, pr: &PullRequestId, label: &str) -> anyhow::Result<()>;

    /// Add a set of labels to a PR.
    async fn add_labels(&self, pr: &PullRequestId, labels: &[String]) -> anyhow::Result<()>;

    /// Request a review of the PR from a team of the repository owner.
    async fn request_team_review(&self, pr: &PullRequestId, team: &str) -> anyhow::Result<()>;

    /// Post a comment to the PR.
    async fn post_comment(&self, pr: &PullRequestId, text: &str) -> anyhow::Result<()>;
}
