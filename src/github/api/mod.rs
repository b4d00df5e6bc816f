use anyhow::Context;
use octocrab::Octocrab;
use secrecy::{ExposeSecret, SecretString};

use client::GithubRepositoryClient;

pub mod client;

/// Creates a client that acts on behalf of the bot account owning `token`.
pub async fn create_github_client(token: SecretString) -> anyhow::Result<GithubRepositoryClient> {
    let client = Octocrab::builder()
        .personal_token(token.expose_secret().clone())
        .build()
        .context("Could not create octocrab builder")?;

    let user = client
        .current()
        .user()
        .await
        .context("Could not load the bot account")?;
    tracing::info!("Acting as GitHub user {}", user.login);

    Ok(GithubRepositoryClient::new(client))
}
