//! Shared helpers for the relay integration tests.
//!
//! Services run against a [`MemoryBroker`] with millisecond retry delays;
//! HTTP servers bind to ephemeral ports on 127.0.0.1.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use relay::broker::MemoryBroker;
use relay::cli::serve::serve_until_cancelled;
use relay::config::DEFAULT_QUEUE;
use relay::consumer::{self, ConsumerState, MessageLog, Subscriber, SubscriberError};
use relay::publisher::{self, PublisherState};
use relay::retry::RetryPolicy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::Service;

/// Same attempt count as production, without the wait.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(10))
}

/// Publisher router relaying to `broker`.
pub fn publisher_app(broker: &MemoryBroker) -> Router {
    publisher::create_router(Arc::new(PublisherState::new(
        Arc::new(broker.clone()),
        DEFAULT_QUEUE,
        fast_policy(),
    )))
}

/// POST `body` to `/send` and return the status and JSON body.
pub async fn post_send(app: &mut Router, body: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/send")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// GET `uri` and return the status and body text.
pub async fn get_text(app: &mut Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.call(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// A consumer subscribed to `broker` and serving HTTP on an ephemeral port.
pub struct RunningConsumer {
    pub addr: SocketAddr,
    pub log: Arc<MessageLog>,
    pub cancel: CancellationToken,
    pub subscription: JoinHandle<Result<(), SubscriberError>>,
    pub server: JoinHandle<std::io::Result<()>>,
}

impl RunningConsumer {
    pub fn report_url(&self) -> String {
        format!("http://{}/reporte", self.addr)
    }

    /// Wait until the log holds `count` messages.
    pub async fn wait_for_messages(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.log.len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("consumer did not receive the expected messages");
    }

    /// Cancel both tasks and wait for them.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.subscription.await;
        let _ = self.server.await;
    }
}

/// Start a consumer and wait until its subscription is active.
pub async fn start_consumer(broker: &MemoryBroker) -> RunningConsumer {
    let log = Arc::new(MessageLog::new());
    let cancel = CancellationToken::new();

    let subscription = Subscriber::new(
        Arc::new(broker.clone()),
        DEFAULT_QUEUE,
        fast_policy(),
        Arc::clone(&log),
    )
    .start(cancel.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = consumer::create_router(Arc::new(ConsumerState::new(Arc::clone(&log))));
    let server = tokio::spawn(serve_until_cancelled(listener, app, cancel.clone()));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !broker.is_consumed(DEFAULT_QUEUE) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("consumer did not subscribe");

    RunningConsumer {
        addr,
        log,
        cancel,
        subscription,
        server,
    }
}
