//! End-to-end tests that send signed webhooks to the web application and check what the bot
//! did on the (mocked) remote repository.
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::task::JoinHandle;
use tower::ServiceExt;

use crate::github::server::{create_app, create_bot_process, ServerState};
use crate::github::WebhookSecret;
use crate::tests::client::{test_client, ClientCall, TestRepositoryClient};
use crate::tests::event::default_pr_number;
use crate::tests::webhook::{
    create_webhook_request, pr_comment, pull_request_opened, review_submitted,
    TEST_WEBHOOK_SECRET,
};
use crate::workflow::transition::CHANGES_REQUESTED_COMMENT;


/// Represents a running bot web application.
///
/// Dropping the application closes the event queue, [`BotTester::finish`] then waits until
/// all received events were handled.
struct BotTester {
    app: Router,
    client: Arc<TestRepositoryClient>,
    process: JoinHandle<()>,
}

impl BotTester {
    fn new(client: Arc<TestRepositoryClient>) -> Self {
        let (tx, process) = create_bot_process(client.clone());
        let app = create_app(ServerState::new(
            tx,
            WebhookSecret::new(TEST_WEBHOOK_SECRET.to_string()),
        ));
        Self {
            app,
            client,
            process: tokio::spawn(process),
        }
    }

    async fn request(&self, request: Request<Body>) -> StatusCode {
        self.app.clone().oneshot(request).await.unwrap().status()
    }

    async fn webhook(&self, event: &str, body: Value) -> StatusCode {
        self.request(create_webhook_request(event, &body.to_string()))
            .await
    }

    async fn finish(self) -> Arc<TestRepositoryClient> {
        drop(self.app);
        self.process.await.unwrap();
        self.client
    }
}

/// Delivers a single webhook and waits until the bot has handled it.
async fn deliver(client: &Arc<TestRepositoryClient>, event: &str, body: Value) -> StatusCode {
    let tester = BotTester::new(client.clone());
    let status = tester.webhook(event, body).await;
    tester.finish().await;
    status
}

fn current_labels(client: &TestRepositoryClient) -> Vec<String> {
    client.get_labels(default_pr_number())
}

#[tokio::test]
async fn health_check() {
    let tester = BotTester::new(Arc::new(test_client()));
    let request = Request::get("/health").body(Body::empty()).unwrap();
    assert_eq!(tester.request(request).await, StatusCode::OK);
    tester.finish().await;
}

#[tokio::test]
async fn open_pull_request() {
    let client = Arc::new(test_client());
    let status = deliver(
        &client,
        "pull_request",
        pull_request_opened(default_pr_number(), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    client.check_calls(&[
        ClientCall::AddLabels(1, vec!["review needed".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
    ]);
}

#[tokio::test]
async fn review_cycle() {
    let client = Arc::new(test_client());

    deliver(
        &client,
        "pull_request",
        pull_request_opened(default_pr_number(), &current_labels(&client)),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["review needed"]);

    deliver(
        &client,
        "pull_request_review",
        review_submitted(
            default_pr_number(),
            &current_labels(&client),
            "changes_requested",
        ),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["changes requested"]);

    // Neither a normal comment nor a non-approving review change anything.
    deliver(
        &client,
        "issue_comment",
        pr_comment(default_pr_number(), &current_labels(&client), "Fixed it"),
    )
    .await;
    deliver(
        &client,
        "pull_request_review",
        review_submitted(default_pr_number(), &current_labels(&client), "commented"),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["changes requested"]);

    deliver(
        &client,
        "issue_comment",
        pr_comment(default_pr_number(), &current_labels(&client), "/done"),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["review needed"]);

    deliver(
        &client,
        "pull_request_review",
        review_submitted(default_pr_number(), &current_labels(&client), "approved"),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["needs +1"]);

    deliver(
        &client,
        "pull_request_review",
        review_submitted(default_pr_number(), &current_labels(&client), "approved"),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["ready to merge"]);

    client.check_calls(&[
        ClientCall::AddLabels(1, vec!["review needed".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
        ClientCall::RemoveLabel(1, "review needed".to_string()),
        ClientCall::AddLabels(1, vec!["changes requested".to_string()]),
        ClientCall::Comment(1, CHANGES_REQUESTED_COMMENT.to_string()),
        ClientCall::RemoveLabel(1, "changes requested".to_string()),
        ClientCall::AddLabels(1, vec!["review needed".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
        ClientCall::RemoveLabel(1, "review needed".to_string()),
        ClientCall::AddLabels(1, vec!["needs +1".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
        ClientCall::RemoveLabel(1, "needs +1".to_string()),
        ClientCall::AddLabels(1, vec!["ready to merge".to_string()]),
    ]);
}

#[tokio::test]
async fn foreign_labels_are_kept() {
    let client = Arc::new(test_client());
    client.set_labels(default_pr_number(), &["documentation", "review needed"]);
    deliver(
        &client,
        "pull_request_review",
        review_submitted(default_pr_number(), &current_labels(&client), "approved"),
    )
    .await;
    assert_eq!(current_labels(&client), vec!["documentation", "needs +1"]);
}

#[tokio::test]
async fn events_are_handled_in_order() {
    let client = Arc::new(test_client());
    let tester = BotTester::new(client.clone());
    tester
        .webhook("pull_request", pull_request_opened(1, &[]))
        .await;
    tester
        .webhook("pull_request", pull_request_opened(2, &[]))
        .await;
    tester
        .webhook(
            "issue_comment",
            pr_comment(1, &["changes requested".to_string()], "/done"),
        )
        .await;
    let client = tester.finish().await;
    client.check_calls(&[
        ClientCall::AddLabels(1, vec!["review needed".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
        ClientCall::AddLabels(2, vec!["review needed".to_string()]),
        ClientCall::RequestReview(2, "translate-foo".to_string()),
        ClientCall::RemoveLabel(1, "changes requested".to_string()),
        ClientCall::AddLabels(1, vec!["review needed".to_string()]),
        ClientCall::RequestReview(1, "translate-foo".to_string()),
    ]);
}

#[tokio::test]
async fn ignored_events_do_nothing() {
    let client = Arc::new(test_client());
    let mut closed = pull_request_opened(default_pr_number(), &[]);
    closed["action"] = "closed".into();
    assert_eq!(deliver(&client, "pull_request", closed).await, StatusCode::OK);

    let mut issue_comment = pr_comment(default_pr_number(), &[], "/done");
    issue_comment["issue"]
        .as_object_mut()
        .unwrap()
        .remove("pull_request");
    assert_eq!(
        deliver(&client, "issue_comment", issue_comment).await,
        StatusCode::OK
    );

    assert_eq!(
        deliver(
            &client,
            "push",
            serde_json::json!({ "ref": "refs/heads/master" })
        )
        .await,
        StatusCode::OK
    );
    client.check_calls(&[]);
}

#[tokio::test]
async fn unsigned_webhook_is_rejected() {
    let client = Arc::new(test_client());
    let tester = BotTester::new(client.clone());
    let mut request = create_webhook_request(
        "pull_request",
        &pull_request_opened(default_pr_number(), &[]).to_string(),
    );
    request.headers_mut().remove("x-hub-signature-256");
    assert_eq!(tester.request(request).await, StatusCode::BAD_REQUEST);
    tester.finish().await.check_calls(&[]);
}
