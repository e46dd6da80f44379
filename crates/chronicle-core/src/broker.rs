//! Publish/subscribe fan-out of committed events.
//!
//! [`InProcessBroker`] pushes each published record onto a bounded queue
//! drained by a dispatch task. Subscriptions are fixed when the broker is
//! started. Every handler invocation runs on its own task, so a handler that
//! fails or panics affects neither its peers nor the publisher.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::DomainError;
use crate::store::Record;

/// Topic that receives every published event regardless of type.
pub const ALL_TOPICS: &str = "*";

/// Error type returned by event handlers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound side of a broker, as seen by the repository.
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Hands a committed record to the subscribers of its event type.
    ///
    /// Delivery is best-effort and asynchronous: `Ok` means the record was
    /// accepted for dispatch, not that any handler ran.
    async fn publish(&self, record: &Record) -> Result<(), DomainError>;
}

/// A subscriber callback. Receives the JSON-encoded [`Record`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes one message. Errors are logged by the dispatcher.
    async fn handle(&self, message: &[u8]) -> Result<(), HandlerError>;
}

/// Adapter turning an async closure into an [`EventHandler`].
#[derive(Debug, Clone)]
pub struct HandlerFn<F>(F);

/// Wraps `f` as a shareable handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn EventHandler>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    Arc::new(HandlerFn(f))
}

#[async_trait]
impl<F, Fut> EventHandler for HandlerFn<F>
where
    F: Fn(Vec<u8>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send,
{
    async fn handle(&self, message: &[u8]) -> Result<(), HandlerError> {
        (self.0)(message.to_vec()).await
    }
}

/// Broker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Capacity of the dispatch queue; publishing to a full queue fails.
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

type Subscriptions = HashMap<String, Vec<Arc<dyn EventHandler>>>;

/// Collects subscriptions before the broker starts.
pub struct InProcessBrokerBuilder {
    config: BrokerConfig,
    subscriptions: Subscriptions,
}

impl std::fmt::Debug for InProcessBrokerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessBrokerBuilder")
            .field("config", &self.config)
            .field("topics", &self.subscriptions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl InProcessBrokerBuilder {
    /// Registers `handler` for `topic` (an event type tag or [`ALL_TOPICS`]).
    #[must_use]
    pub fn subscribe(mut self, topic: &str, handler: Arc<dyn EventHandler>) -> Self {
        self.subscriptions
            .entry(topic.to_owned())
            .or_default()
            .push(handler);
        self
    }

    /// Spawns the dispatch task and returns the publishing side with its
    /// shutdown handle. Must be called within a Tokio runtime.
    #[must_use]
    pub fn start(self) -> (InProcessBroker, DispatchHandle) {
        let (sender, receiver) = mpsc::channel(self.config.capacity.max(1));
        let shutdown = CancellationToken::new();
        let subscriber_count: usize = self.subscriptions.values().map(Vec::len).sum();
        tracing::info!(
            topics = self.subscriptions.len(),
            subscribers = subscriber_count,
            capacity = self.config.capacity,
            "starting in-process broker"
        );
        let task = tokio::spawn(dispatch(receiver, self.subscriptions, shutdown.clone()));
        (InProcessBroker { sender }, DispatchHandle { shutdown, task })
    }
}

#[derive(Debug)]
struct Message {
    topic: String,
    payload: Arc<[u8]>,
}

/// Publishing side of the in-process broker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InProcessBroker {
    sender: mpsc::Sender<Message>,
}

impl InProcessBroker {
    /// Starts collecting subscriptions for a new broker.
    #[must_use]
    pub fn builder(config: BrokerConfig) -> InProcessBrokerBuilder {
        InProcessBrokerBuilder {
            config,
            subscriptions: HashMap::new(),
        }
    }
}

#[async_trait]
impl MessageBroker for InProcessBroker {
    async fn publish(&self, record: &Record) -> Result<(), DomainError> {
        let payload = serde_json::to_vec(record).map_err(|source| DomainError::Serialization {
            version: record.version,
            source,
        })?;
        let message = Message {
            topic: record.event_type.clone(),
            payload: payload.into(),
        };
        self.sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DomainError::Broker("dispatch queue is full".into()),
            TrySendError::Closed(_) => DomainError::Broker("broker has shut down".into()),
        })
    }
}

/// Controls the lifetime of the dispatch task.
#[derive(Debug)]
pub struct DispatchHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Stops accepting messages, delivers what is already queued, and waits
    /// for in-flight handlers to finish.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "broker dispatch task failed");
        }
    }
}

async fn dispatch(
    mut receiver: mpsc::Receiver<Message>,
    subscriptions: Subscriptions,
    shutdown: CancellationToken,
) {
    let mut in_flight: JoinSet<(String, Result<(), HandlerError>)> = JoinSet::new();

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            received = receiver.recv() => match received {
                Some(message) => fan_out(&subscriptions, &mut in_flight, &message),
                None => break,
            },
            Some(joined) = in_flight.join_next() => report(joined),
        }
    }

    receiver.close();
    while let Some(message) = receiver.recv().await {
        fan_out(&subscriptions, &mut in_flight, &message);
    }
    while let Some(joined) = in_flight.join_next().await {
        report(joined);
    }
    tracing::info!("in-process broker stopped");
}

fn fan_out(
    subscriptions: &Subscriptions,
    in_flight: &mut JoinSet<(String, Result<(), HandlerError>)>,
    message: &Message,
) {
    let handlers = subscriptions
        .get(&message.topic)
        .into_iter()
        .chain(subscriptions.get(ALL_TOPICS))
        .flatten();

    let mut delivered = 0_usize;
    for handler in handlers {
        let handler = Arc::clone(handler);
        let payload = Arc::clone(&message.payload);
        let topic = message.topic.clone();
        in_flight.spawn(async move {
            let outcome = handler.handle(&payload).await;
            (topic, outcome)
        });
        delivered += 1;
    }
    tracing::trace!(topic = %message.topic, handlers = delivered, "message dispatched");
}

fn report(joined: Result<(String, Result<(), HandlerError>), JoinError>) {
    match joined {
        Ok((_, Ok(()))) => {}
        Ok((topic, Err(e))) => {
            tracing::warn!(topic = %topic, error = %e, "event handler failed");
        }
        Err(e) if e.is_panic() => {
            tracing::error!(error = %e, "event handler panicked");
        }
        Err(e) => {
            tracing::warn!(error = %e, "event handler was cancelled");
        }
    }
}
