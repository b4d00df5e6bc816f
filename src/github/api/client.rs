use anyhow::Context;
use axum::async_trait;
use octocrab::{Error, Octocrab};

use crate::github::PullRequestId;
use crate::workflow::RepositoryClient;

/// Modifies pull requests using the GitHub API.
/// Repository and pull request are taken from each call, a single client serves all repositories
/// that the bot account can access.
pub struct GithubRepositoryClient {
    client: Octocrab,
}

impl GithubRepositoryClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[derive(serde::Serialize)]
struct ReviewRequest<'a> {
    team_reviewers: [&'a str; 1],
}

#[async_trait]
impl RepositoryClient for GithubRepositoryClient {
    async fn remove_label(&self, pr: &PullRequestId, label: &str) -> anyhow::Result<()> {
        let result = self
            .client
            .issues(pr.repository.owner(), pr.repository.name())
            .remove_label(pr.number.0, label)
            .await;
        match result {
            Ok(_) => Ok(()),
            // This error is returned if we try to remove a label that does not exist on the issue.
            // This should be a no-op, rather than an error, therefore we swallow this error.
            Err(Error::GitHub { source, .. })
                if source.message.contains("Label does not exist") =>
            {
                tracing::trace!("Trying to remove label {label} which does not exist on PR {pr}");
                Ok(())
            }
            Err(error) => {
                Err(error).with_context(|| format!("Cannot remove label {label} from PR {pr}"))
            }
        }
    }

    async fn add_labels(&self, pr: &PullRequestId, labels: &[String]) -> anyhow::Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        self.client
            .issues(pr.repository.owner(), pr.repository.name())
            .add_labels(pr.number.0, labels)
            .await
            .with_context(|| format!("Cannot add label(s) {labels:?} to PR {pr}"))?;
        Ok(())
    }

    /// https://docs.github.com/en/rest/pulls/review-requests?apiVersion=2022-11-28#request-reviewers-for-a-pull-request
    async fn request_team_review(&self, pr: &PullRequestId, team: &str) -> anyhow::Result<()> {
        let url = format!(
            "/repos/{}/{}/pulls/{}/requested_reviewers",
            pr.repository.owner(),
            pr.repository.name(),
            pr.number
        );
        let _: serde_json::Value = self
            .client
            .post(
                url,
                Some(&ReviewRequest {
                    team_reviewers: [team],
                }),
            )
            .await
            .with_context(|| format!("Cannot request review from team {team} on PR {pr}"))?;
        Ok(())
    }

    /// The comment will be posted as the bot account.
    async fn post_comment(&self, pr: &PullRequestId, text: &str) -> anyhow::Result<()> {
        self.client
            .issues(pr.repository.owner(), pr.repository.name())
            .create_comment(pr.number.0, text)
            .await
            .with_context(|| format!("Cannot post comment to PR {pr}"))?;
        Ok(())
    }
}
