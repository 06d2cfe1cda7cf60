//! Black-box tests of the publisher's HTTP contract.

mod common;

use axum::http::StatusCode;
use common::{get_text, post_send, publisher_app};
use relay::broker::MemoryBroker;
use relay::config::DEFAULT_QUEUE;
use relay::publisher::{EMPTY_MESSAGE, INVALID_BODY, MESSAGE_NOT_STRING, MISSING_MESSAGE};
use relay::telemetry;
use serde_json::json;

#[tokio::test]
async fn test_send_relays_trimmed_message() {
    let broker = MemoryBroker::new();
    let mut app = publisher_app(&broker);

    let (status, body) = post_send(&mut app, r#"{"message": "  hola  "}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "Message sent", "message": "hola" }));
    assert_eq!(broker.published(DEFAULT_QUEUE), vec![b"hola".to_vec()]);
}

#[tokio::test]
async fn test_send_declares_queue() {
    let broker = MemoryBroker::new();
    let mut app = publisher_app(&broker);

    post_send(&mut app, r#"{"message": "hola"}"#).await;
    assert!(broker.has_queue(DEFAULT_QUEUE));
}

#[tokio::test]
async fn test_invalid_input_is_rejected_without_touching_broker() {
    let cases = [
        ("not json", INVALID_BODY),
        ("", INVALID_BODY),
        (r#"["hola"]"#, MISSING_MESSAGE),
        (r#"{"texto": "hola"}"#, MISSING_MESSAGE),
        (r#"{"message": null}"#, MISSING_MESSAGE),
        (r#"{"message": 42}"#, MESSAGE_NOT_STRING),
        (r#"{"message": ""}"#, EMPTY_MESSAGE),
        (r#"{"message": "   \n\t "}"#, EMPTY_MESSAGE),
    ];

    for (input, details) in cases {
        let broker = MemoryBroker::new();
        let mut app = publisher_app(&broker);

        let (status, body) = post_send(&mut app, input).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "input: {input}");
        assert_eq!(body, json!({ "status": "Error", "details": details }), "input: {input}");
        assert_eq!(broker.connect_attempts(), 0, "input: {input}");
    }
}

#[tokio::test]
async fn test_send_survives_transient_broker_outage() {
    let broker = MemoryBroker::new();
    broker.fail_next_connects(4);
    let mut app = publisher_app(&broker);

    let (status, _) = post_send(&mut app, r#"{"message": "hola"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(broker.connect_attempts(), 5);
    assert_eq!(broker.published(DEFAULT_QUEUE).len(), 1);
}

#[tokio::test]
async fn test_send_fails_after_five_connect_attempts() {
    let broker = MemoryBroker::new();
    broker.fail_next_connects(5);
    let mut app = publisher_app(&broker);

    let (status, body) = post_send(&mut app, r#"{"message": "hola"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "Error");
    assert!(!body["details"].as_str().unwrap().is_empty());
    assert_eq!(broker.connect_attempts(), 5);
    assert!(broker.published(DEFAULT_QUEUE).is_empty());
}

#[tokio::test]
async fn test_rejected_publish_is_a_server_error() {
    let broker = MemoryBroker::new();
    broker.fail_publishes(true);
    let mut app = publisher_app(&broker);

    let (status, body) = post_send(&mut app, r#"{"message": "hola"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "Error");
    assert_eq!(broker.connect_attempts(), 1);
}

#[tokio::test]
async fn test_each_send_uses_its_own_connection() {
    let broker = MemoryBroker::new();
    let mut app = publisher_app(&broker);

    for message in ["uno", "dos", "tres"] {
        let (status, _) = post_send(&mut app, &json!({ "message": message }).to_string()).await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(broker.connect_attempts(), 3);
    assert_eq!(
        broker.published(DEFAULT_QUEUE),
        vec![b"uno".to_vec(), b"dos".to_vec(), b"tres".to_vec()]
    );
}

#[tokio::test]
async fn test_large_message_is_accepted() {
    let broker = MemoryBroker::new();
    let mut app = publisher_app(&broker);
    let message = "a".repeat(2 * 1024 * 1024);

    let (status, body) = post_send(&mut app, &json!({ "message": message }).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Message sent");
    assert_eq!(body["message"].as_str().unwrap().len(), message.len());
    assert_eq!(broker.published(DEFAULT_QUEUE)[0].len(), message.len());
}

#[tokio::test]
async fn test_metrics_count_sends() {
    let broker = MemoryBroker::new();
    let mut app = publisher_app(&broker);

    let (status, _) = post_send(&mut app, r#"{"message": "hola"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_send(&mut app, r#"{"message": ""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, text) = get_text(&mut app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    for name in [telemetry::MESSAGES_PUBLISHED, telemetry::PUBLISH_FAILURES] {
        assert!(
            text.lines().any(|line| line.starts_with(name)),
            "missing {name} in:\n{text}"
        );
    }
}
