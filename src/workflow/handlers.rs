use thiserror::Error;

use crate::github::PullRequestId;
use crate::workflow::event::WorkflowEvent;
use crate::workflow::labels::WorkflowLabel;
use crate::workflow::transition::{transition, WorkflowAction};
use crate::workflow::RepositoryClient;

/// A single call to the remote repository performed as a part of a transition.
#[derive(Debug)]
pub enum WorkflowStep {
    RemoveLabel(WorkflowLabel),
    AddLabels(Vec<WorkflowLabel>),
    Action(WorkflowAction),
}

/// Some of the steps of a transition have failed.
/// The remaining steps were still performed.
#[derive(Error, Debug)]
#[error("{} of {} workflow step(s) failed for {}", .failures.len(), .attempted, .pr)]
pub struct WorkflowActionError {
    pub pr: PullRequestId,
    pub attempted: usize,
    pub failures: Vec<(WorkflowStep, anyhow::Error)>,
}

/// Computes the transition caused by `event` and performs it on the remote repository.
///
/// Labels are removed first, then added, then the review is requested or the comment posted.
/// Each step waits for the previous one, but does not depend on its success.
pub async fn handle_workflow_event<Client: RepositoryClient + ?Sized>(
    client: &Client,
    event: &WorkflowEvent,
) -> anyhow::Result<()> {
    let pr = event.pull_request();
    let transition = transition(&pr.labels, event);
    if transition.is_noop() {
        tracing::debug!("Event does not change PR {}", pr.id);
        return Ok(());
    }

    tracing::info!(
        "Updating PR {}: labels {:?} -> {:?}, action: {:?}",
        pr.id,
        pr.labels,
        transition.apply(&pr.labels),
        transition.action
    );

    let mut attempted = 0;
    let mut failures = vec![];
    let mut check = |step: WorkflowStep, result: anyhow::Result<()>| {
        attempted += 1;
        if let Err(error) = result {
            tracing::warn!("Step {step:?} failed: {error:?}");
            failures.push((step, error));
        }
    };

    for label in &transition.remove {
        tracing::debug!("Removing label {label}");
        let result = client.remove_label(&pr.id, label.as_str()).await;
        check(WorkflowStep::RemoveLabel(*label), result);
    }

    if !transition.add.is_empty() {
        let labels: Vec<String> = transition.add.iter().map(|l| l.to_string()).collect();
        tracing::debug!("Adding label(s) {labels:?}");
        let result = client.add_labels(&pr.id, &labels).await;
        check(WorkflowStep::AddLabels(transition.add.clone()), result);
    }

    if let Some(action) = transition.action {
        let result = match &action {
            WorkflowAction::RequestReview(team) => {
                tracing::debug!("Requesting review from team {team}");
                client.request_team_review(&pr.id, team).await
            }
            WorkflowAction::PostComment(text) => client.post_comment(&pr.id, text).await,
        };
        check(WorkflowStep::Action(action), result);
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(WorkflowActionError {
            pr: pr.id.clone(),
            attempted,
            failures,
        }
        .into())
    }
}
