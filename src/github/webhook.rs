use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use crate::github::server::ServerStateRef;
use crate::github::{GithubRepoName, PullRequestId};
use crate::workflow::event::{
    classify, EventKind, PullRequestComment, PullRequestState, ReviewSubmitted, WorkflowEvent,
};
use crate::workflow::LabelSet;

/// GitHub does not send payloads larger than 25 MB.
const MAX_BODY_SIZE: usize = 25 * 1024 * 1024;

#[derive(serde::Deserialize, Debug)]
struct WebhookUser {
    login: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookRepository {
    name: String,
    owner: WebhookUser,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookLabel {
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequest {
    number: u64,
    #[serde(default)]
    labels: Vec<WebhookLabel>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookIssue {
    number: u64,
    #[serde(default)]
    labels: Vec<WebhookLabel>,
    /// Only present if the issue is a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookReview {
    state: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookComment {
    body: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookAction {
    #[serde(default)]
    action: String,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookPullRequestEvent {
    repository: WebhookRepository,
    pull_request: WebhookPullRequest,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookReviewEvent {
    repository: WebhookRepository,
    pull_request: WebhookPullRequest,
    review: WebhookReview,
}

#[derive(serde::Deserialize, Debug)]
struct WebhookIssueCommentEvent {
    repository: WebhookRepository,
    issue: WebhookIssue,
    comment: WebhookComment,
}

#[derive(Error, Debug)]
pub enum WebhookParseError {
    #[error("Header {0} not found")]
    MissingHeader(&'static str),
    #[error("Header {0} is not valid UTF-8")]
    InvalidHeader(&'static str),
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// A verified webhook delivery that should be handled by the workflow.
#[derive(Debug)]
pub struct WebhookDelivery {
    /// Value of the `X-GitHub-Delivery` header.
    pub id: String,
    pub event: WorkflowEvent,
}

/// axum extractor for GitHub webhook events.
#[derive(Debug)]
pub struct GitHubWebhook(pub WebhookDelivery);

/// Extracts a webhook event from a HTTP request.
///
/// Deliveries that the workflow does not react to are rejected with `200 OK`.
#[async_trait]
impl FromRequest<ServerStateRef> for GitHubWebhook {
    type Rejection = StatusCode;

    async fn from_request(
        request: Request,
        state: &ServerStateRef,
    ) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        // Eagerly load body
        let body: Bytes = axum::body::to_bytes(body, MAX_BODY_SIZE)
            .await
            .map_err(|error| {
                tracing::error!("Parsing webhook body failed: {error:?}");
                StatusCode::BAD_REQUEST
            })?;

        // Verify that the request is valid
        if !verify_gh_signature(&parts.headers, &body, state.get_webhook_secret()) {
            tracing::error!("Webhook request failed, could not authenticate webhook");
            return Err(StatusCode::BAD_REQUEST);
        }

        // Parse webhook content
        match parse_webhook_event(&parts, &body) {
            Ok(Some(delivery)) => Ok(GitHubWebhook(delivery)),
            Ok(None) => Err(StatusCode::OK),
            Err(error) => {
                tracing::error!("Cannot parse webhook event: {error:?}");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    }
}

fn get_header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, WebhookParseError> {
    parts
        .headers
        .get(name)
        .ok_or(WebhookParseError::MissingHeader(name))?
        .to_str()
        .map_err(|_| WebhookParseError::InvalidHeader(name))
}

fn parse_webhook_event(
    parts: &Parts,
    body: &[u8],
) -> Result<Option<WebhookDelivery>, WebhookParseError> {
    let event_type = get_header(parts, "x-github-event")?;
    let id = get_header(parts, "x-github-delivery")?.to_string();

    let WebhookAction { action } = serde_json::from_slice(body)?;
    let event = match classify(event_type, &action) {
        EventKind::OnOpen => {
            let payload: WebhookPullRequestEvent = serde_json::from_slice(body)?;
            Some(WorkflowEvent::PullRequestOpened(parse_pr(
                &payload.repository,
                payload.pull_request,
            )))
        }
        EventKind::OnReviewSubmitted => {
            let payload: WebhookReviewEvent = serde_json::from_slice(body)?;
            Some(WorkflowEvent::ReviewSubmitted(ReviewSubmitted {
                pull_request: parse_pr(&payload.repository, payload.pull_request),
                verdict: payload.review.state.as_str().into(),
            }))
        }
        EventKind::OnCommentCreated => {
            let payload: WebhookIssueCommentEvent = serde_json::from_slice(body)?;
            parse_pr_comment(payload).map(WorkflowEvent::Comment)
        }
        EventKind::Ignore => {
            tracing::debug!("Ignoring event {event_type} with action {action:?}");
            None
        }
    };
    Ok(event.map(|event| WebhookDelivery { id, event }))
}

fn parse_pr(repository: &WebhookRepository, pr: WebhookPullRequest) -> PullRequestState {
    PullRequestState {
        id: PullRequestId::new(parse_repository_name(repository), pr.number.into()),
        labels: parse_labels(pr.labels),
    }
}

fn parse_pr_comment(payload: WebhookIssueCommentEvent) -> Option<PullRequestComment> {
    // We only care about pull request comments
    if payload.issue.pull_request.is_none() {
        tracing::debug!(
            "Ignoring comment on issue {} because it is not a pull request",
            payload.issue.number
        );
        return None;
    }

    Some(PullRequestComment {
        pull_request: PullRequestState {
            id: PullRequestId::new(
                parse_repository_name(&payload.repository),
                payload.issue.number.into(),
            ),
            labels: parse_labels(payload.issue.labels),
        },
        text: payload.comment.body.unwrap_or_default(),
    })
}

fn parse_repository_name(repository: &WebhookRepository) -> GithubRepoName {
    GithubRepoName::new(&repository.owner.login, &repository.name)
}

fn parse_labels(labels: Vec<WebhookLabel>) -> LabelSet {
    labels.into_iter().map(|label| label.name).collect()
}

type HmacSha256 = Hmac<Sha256>;

/// Verifies that the request is properly signed by GitHub with SHA-256 and the passed `secret`.
fn verify_gh_signature(
    headers: &HeaderMap<HeaderValue>,
    body: &[u8],
    secret: &WebhookSecret,
) -> bool {
    let Some(signature) = headers.get("x-hub-signature-256").map(|v| v.as_bytes()) else {
        return false;
    };
    let Some(signature) = signature
        .strip_prefix(b"sha256=")
        .and_then(|v| hex::decode(v).ok())
    else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose().as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Wrapper for a secret which is zeroed on drop and can be exposed only through the [`WebhookSecret::expose`] method.
pub struct WebhookSecret(SecretString);

impl WebhookSecret {
    pub fn new(secret: String) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret().as_str()
    }
}
