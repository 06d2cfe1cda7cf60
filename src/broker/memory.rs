//! In-process broker.
//!
//! Behaves like a single RabbitMQ vhost reduced to what the services use:
//! declared queues buffer messages until the (single) consumer subscribes,
//! publishing to an undeclared queue drops the message like the default
//! exchange does, and connection failures can be scripted to exercise the
//! retry paths.

use super::{BrokerError, Connector, Deliveries, Session};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

struct QueueState {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
    published: Vec<Vec<u8>>,
}

impl QueueState {
    fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Some(receiver),
            published: Vec::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    queues: Mutex<HashMap<String, QueueState>>,
    failing_connects: AtomicU32,
    connect_attempts: AtomicU32,
    fail_publish: AtomicBool,
}

/// Shared handle to an in-process broker. Clones see the same queues.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Inner>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls to [`Connector::connect`] fail.
    pub fn fail_next_connects(&self, n: u32) {
        self.inner.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Make every publish fail until reset.
    pub fn fail_publishes(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Total connection attempts seen, successful or not.
    pub fn connect_attempts(&self) -> u32 {
        self.inner.connect_attempts.load(Ordering::SeqCst)
    }

    /// Every payload accepted for `queue`, in publish order.
    pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
        self.queues()
            .get(queue)
            .map(|q| q.published.clone())
            .unwrap_or_default()
    }

    /// Whether `queue` has been declared.
    pub fn has_queue(&self, queue: &str) -> bool {
        self.queues().contains_key(queue)
    }

    /// Whether a consumer has subscribed to `queue`.
    pub fn is_consumed(&self, queue: &str) -> bool {
        self.queues()
            .get(queue)
            .is_some_and(|q| q.receiver.is_none())
    }

    /// Delete `queue`, ending any active subscription on it.
    pub fn delete_queue(&self, queue: &str) {
        self.queues().remove(queue);
    }

    fn queues(&self) -> MutexGuard<'_, HashMap<String, QueueState>> {
        // A panic while holding the lock leaves the map itself intact.
        self.inner
            .queues
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    async fn connect(&self) -> Result<Box<dyn Session>, BrokerError> {
        self.inner.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .inner
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrokerError::Connect("broker unavailable".to_string()));
        }

        Ok(Box::new(MemorySession {
            broker: self.clone(),
        }))
    }

    fn target(&self) -> String {
        "memory".to_string()
    }
}

struct MemorySession {
    broker: MemoryBroker,
}

#[async_trait]
impl Session for MemorySession {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.broker
            .queues()
            .entry(queue.to_string())
            .or_insert_with(QueueState::new);
        Ok(())
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        if self.broker.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(BrokerError::Publish("channel closed by broker".to_string()));
        }

        let mut queues = self.broker.queues();
        if let Some(state) = queues.get_mut(queue) {
            state.published.push(payload.to_vec());
            // Receiver gone means the consumer went away; message is dropped.
            let _ = state.sender.send(payload.to_vec());
        }
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Deliveries, BrokerError> {
        let receiver = self
            .broker
            .queues()
            .get_mut(queue)
            .ok_or_else(|| BrokerError::Consume(format!("no queue '{}'", queue)))?
            .receiver
            .take()
            .ok_or_else(|| BrokerError::Consume(format!("queue '{}' already consumed", queue)))?;

        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|body| (Ok(body), rx))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        Ok(())
    }
}
