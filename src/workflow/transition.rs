//! Pure mapping from a workflow event to the label changes and the review action it causes.
//!
//! The workflow, with labels as states:
//!
//! ```text
//! (none) --open--> [review needed] --changes_requested--> [changes requested]
//!        --/done--> [review needed] --approved--> [needs +1] --approved--> [ready to merge]
//! ```
use crate::github::GithubRepoName;
use crate::workflow::event::{PullRequestComment, ReviewSubmitted, ReviewVerdict, WorkflowEvent};
use crate::workflow::labels::{LabelSet, WorkflowLabel};

/// Prefix of the team that reviews pull requests of a repository.
pub const TEAM_PREFIX: &str = "translate-";

/// Comment by which the author marks requested changes as resolved.
pub const DONE_COMMAND: &str = "/done";

pub const CHANGES_REQUESTED_COMMENT: &str = "Please make the requested changes. After it, add a comment \"/done\".  \nThen I'll ask for a new review :ghost:";

/// Action performed on the pull request after its labels were updated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Request a review from the given team.
    RequestReview(String),
    /// Post a comment with the given text.
    PostComment(String),
}

/// Changes of a pull request caused by a single event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transition {
    pub remove: Vec<WorkflowLabel>,
    pub add: Vec<WorkflowLabel>,
    pub action: Option<WorkflowAction>,
}

impl Transition {
    pub fn noop() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty() && self.action.is_none()
    }

    /// Returns the label set that the pull request will have once the transition is performed.
    pub fn apply(&self, labels: &LabelSet) -> LabelSet {
        let mut labels = labels.clone();
        for label in &self.remove {
            labels.remove(*label);
        }
        for label in &self.add {
            labels.insert(*label);
        }
        labels
    }

    /// Only keeps the removals of labels that are actually present.
    fn removing(mut self, labels: &LabelSet, remove: &[WorkflowLabel]) -> Self {
        self.remove = remove
            .iter()
            .copied()
            .filter(|label| labels.contains(*label))
            .collect();
        self
    }

    fn adding(mut self, add: &[WorkflowLabel]) -> Self {
        self.add = add.to_vec();
        self
    }

    fn then(mut self, action: WorkflowAction) -> Self {
        self.action = Some(action);
        self
    }
}

/// Name of the team that reviews pull requests of `repo`.
///
/// `ru.javascript.info` is reviewed by `translate-ru`.
pub fn review_team(repo: &GithubRepoName) -> String {
    let prefix = repo.name().split('.').next().unwrap_or_default();
    format!("{TEAM_PREFIX}{prefix}")
}

/// Decides what should happen to a pull request with `labels` when `event` arrives.
pub fn transition(labels: &LabelSet, event: &WorkflowEvent) -> Transition {
    match event {
        WorkflowEvent::PullRequestOpened(pr) => Transition::noop()
            .adding(&[WorkflowLabel::ReviewNeeded])
            .then(WorkflowAction::RequestReview(review_team(&pr.id.repository))),
        WorkflowEvent::Comment(comment) => on_comment(labels, comment),
        WorkflowEvent::ReviewSubmitted(review) => on_review(labels, review),
    }
}

fn on_comment(labels: &LabelSet, comment: &PullRequestComment) -> Transition {
    if comment.text.trim() != DONE_COMMAND {
        return Transition::noop();
    }
    Transition::noop()
        .removing(labels, &[WorkflowLabel::ChangesRequested])
        .adding(&[WorkflowLabel::ReviewNeeded])
        .then(WorkflowAction::RequestReview(review_team(
            &comment.pull_request.id.repository,
        )))
}

fn on_review(labels: &LabelSet, review: &ReviewSubmitted) -> Transition {
    match &review.verdict {
        ReviewVerdict::ChangesRequested => Transition::noop()
            .removing(labels, &[WorkflowLabel::ReviewNeeded])
            .adding(&[WorkflowLabel::ChangesRequested])
            .then(WorkflowAction::PostComment(
                CHANGES_REQUESTED_COMMENT.to_string(),
            )),
        // First approval, ask for a second one.
        ReviewVerdict::Approved if !labels.contains(WorkflowLabel::NeedsPlusOne) => {
            Transition::noop()
                .removing(
                    labels,
                    &[
                        WorkflowLabel::ChangesRequested,
                        WorkflowLabel::ReviewNeeded,
                    ],
                )
                .adding(&[WorkflowLabel::NeedsPlusOne])
                .then(WorkflowAction::RequestReview(review_team(
                    &review.pull_request.id.repository,
                )))
        }
        // Second approval, merging is left to humans.
        ReviewVerdict::Approved => Transition::noop()
            .removing(
                labels,
                &[WorkflowLabel::ChangesRequested, WorkflowLabel::NeedsPlusOne],
            )
            .adding(&[WorkflowLabel::ReadyToMerge]),
        ReviewVerdict::Other(state) => {
            tracing::debug!("Ignoring review with state {state}");
            Transition::noop()
        }
    }
}
