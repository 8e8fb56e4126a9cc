//! Webhook notifier against a mock receiver.

use std::time::Duration;
use token_rotation::notify::{Notifier, NotifyError, WebhookNotifier};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GUID: &str = "6f9619ff-8b86-d011-b42d-00c04fc964ff";

fn notifier(server: &MockServer, timeout: Duration) -> WebhookNotifier {
    WebhookNotifier::new(format!("{}/warnings", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn test_delivers_json_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/warnings"))
        .and(body_partial_json(serde_json::json!({
            "recipient": GUID,
            "message": "check your account",
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    notifier(&server, Duration::from_secs(5))
        .send(GUID, "check your account")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = notifier(&server, Duration::from_secs(5)).send(GUID, "m").await;
    assert!(matches!(result, Err(NotifyError::Rejected(503))));
}

#[tokio::test]
async fn test_slow_receiver_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let result = notifier(&server, Duration::from_millis(100)).send(GUID, "m").await;
    assert!(matches!(result, Err(NotifyError::Timeout)));
}

#[tokio::test]
async fn test_unreachable_receiver_is_transport_error() {
    let notifier = WebhookNotifier::new("http://127.0.0.1:9/warnings", Duration::from_secs(2)).unwrap();
    let result = notifier.send(GUID, "m").await;
    assert!(matches!(
        result,
        Err(NotifyError::Transport(_) | NotifyError::Timeout)
    ));
}
