use crate::github::PullRequestId;
use crate::workflow::labels::LabelSet;

/// Kind of transition that a webhook delivery can trigger, decided only from the event type
/// and its action.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    OnOpen,
    OnReviewSubmitted,
    /// The comment still has to be checked to belong to a pull request.
    OnCommentCreated,
    Ignore,
}

pub fn classify(event_type: &str, action: &str) -> EventKind {
    match (event_type, action) {
        ("pull_request", "opened") => EventKind::OnOpen,
        ("pull_request_review", "submitted") => EventKind::OnReviewSubmitted,
        ("issue_comment", "created") => EventKind::OnCommentCreated,
        _ => EventKind::Ignore,
    }
}

/// Pull request as seen in a webhook payload, together with its labels at the time of the event.
#[derive(Clone, Debug, PartialEq)]
pub struct PullRequestState {
    pub id: PullRequestId,
    pub labels: LabelSet,
}

#[derive(Debug, PartialEq)]
pub enum WorkflowEvent {
    /// A pull request was opened.
    PullRequestOpened(PullRequestState),
    /// A review was submitted on a pull request.
    ReviewSubmitted(ReviewSubmitted),
    /// A comment was posted on a pull request.
    Comment(PullRequestComment),
}

impl WorkflowEvent {
    pub fn pull_request(&self) -> &PullRequestState {
        match self {
            WorkflowEvent::PullRequestOpened(pr) => pr,
            WorkflowEvent::ReviewSubmitted(review) => &review.pull_request,
            WorkflowEvent::Comment(comment) => &comment.pull_request,
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct ReviewSubmitted {
    pub pull_request: PullRequestState,
    pub verdict: ReviewVerdict,
}

#[derive(Debug, PartialEq)]
pub struct PullRequestComment {
    pub pull_request: PullRequestState,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewVerdict {
    Approved,
    ChangesRequested,
    /// `commented`, `dismissed` and anything else GitHub may send.
    Other(String),
}

impl From<&str> for ReviewVerdict {
    fn from(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "approved" => ReviewVerdict::Approved,
            "changes_requested" => ReviewVerdict::ChangesRequested,
            other => ReviewVerdict::Other(other.to_string()),
        }
    }
}
