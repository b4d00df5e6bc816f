use std::future::Future;
use std::sync::Arc;

use anyhow::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tokio::sync::mpsc;
use tower::limit::ConcurrencyLimitLayer;
use tracing::{Instrument, Span};

use crate::github::webhook::{GitHubWebhook, WebhookDelivery, WebhookSecret};
use crate::workflow::{handle_workflow_event, RepositoryClient};

pub type WebhookSender = mpsc::Sender<WebhookDelivery>;

/// Shared server state for all axum handlers.
pub struct ServerState {
    event_queue: WebhookSender,
    webhook_secret: WebhookSecret,
}

impl ServerState {
    pub fn new(event_queue: WebhookSender, webhook_secret: WebhookSecret) -> Self {
        Self {
            event_queue,
            webhook_secret,
        }
    }

    pub fn get_webhook_secret(&self) -> &WebhookSecret {
        &self.webhook_secret
    }
}

pub type ServerStateRef = Arc<ServerState>;

pub fn create_app(state: ServerState) -> Router {
    Router::new()
        .route("/github", post(github_webhook_handler))
        .route("/health", get(health_handler))
        .layer(ConcurrencyLimitLayer::new(100))
        .with_state(Arc::new(state))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "")
}

/// Axum handler that receives a webhook and sends it to the event queue.
pub async fn github_webhook_handler(
    State(state): State<ServerStateRef>,
    GitHubWebhook(delivery): GitHubWebhook,
) -> impl IntoResponse {
    match state.event_queue.send(delivery).await {
        Ok(_) => (StatusCode::OK, ""),
        Err(err) => {
            tracing::error!("Could not send webhook event: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "")
        }
    }
}

/// Creates a future with a process that receives webhook events and reacts to them.
///
/// Events are handled one at a time, in the order in which they were received, so the same
/// pull request is never modified by two events at once.
/// The process ends once all senders are dropped and the queue is drained.
pub fn create_bot_process<Client>(client: Arc<Client>) -> (WebhookSender, impl Future<Output = ()>)
where
    Client: RepositoryClient + Send + Sync + 'static,
{
    let (tx, mut rx) = mpsc::channel::<WebhookDelivery>(1024);

    let service = async move {
        while let Some(delivery) = rx.recv().await {
            let pr = delivery.event.pull_request();
            let span = tracing::info_span!(
                "WebhookEvent",
                pr = %pr.id,
                delivery = %delivery.id
            );
            tracing::debug!("Received webhook event: {:#?}", delivery.event);

            if let Err(error) = handle_workflow_event(client.as_ref(), &delivery.event)
                .instrument(span.clone())
                .await
            {
                handle_root_error(span, error);
            }
        }
    };
    (tx, service)
}

#[allow(unused_variables)]
fn handle_root_error(span: Span, error: Error) {
    // In tests, we want to panic on all errors.
    #[cfg(test)]
    {
        panic!("Handler failed: {error:?}");
    }
    #[cfg(not(test))]
    {
        span.in_scope(|| {
            tracing::error!("Error: {error:?}");
        });
    }
}
