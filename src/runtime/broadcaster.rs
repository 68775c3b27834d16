//! Per-run registry of live progress subscribers.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::{FlowError, Result, ShareLock, events::ProgressEvent, runtime::RunId, utils};

/// Default buffer of a [`ChannelSubscriber`].
pub const SUBSCRIPTION_BUFFER_SIZE: usize = 1024;

pub type SubscriberId = String;

/// Receives the progress events of the runs it is subscribed to.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Stable id, used to unsubscribe.
    fn id(&self) -> &str;

    /// Delivers one event. An error evicts the subscriber from the run.
    async fn send(
        &self,
        event: &ProgressEvent,
    ) -> Result<()>;
}

/// Fan-out of progress events, keyed by run id.
///
/// Delivery is best effort and isolated per subscriber: a subscriber whose
/// `send` fails is removed and the others still receive the event. Membership
/// may change while a broadcast is in flight; each broadcast delivers to the
/// snapshot taken when it started.
#[derive(Default)]
pub struct Broadcaster {
    subscribers: ShareLock<HashMap<RunId, Vec<Arc<dyn Subscriber>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Adds `subscriber` to the run, replacing one with the same id.
    pub fn subscribe(
        &self,
        run_id: &str,
        subscriber: Arc<dyn Subscriber>,
    ) {
        debug!(run_id, subscriber = subscriber.id(), "subscriber connected");
        let mut subscribers = self.subscribers.write().unwrap();
        let set = subscribers.entry(run_id.to_string()).or_default();
        set.retain(|s| s.id() != subscriber.id());
        set.push(subscriber);
    }

    /// Removes a subscriber. Returns whether it was registered.
    pub fn unsubscribe(
        &self,
        run_id: &str,
        subscriber_id: &str,
    ) -> bool {
        let mut subscribers = self.subscribers.write().unwrap();
        let Some(set) = subscribers.get_mut(run_id) else {
            return false;
        };

        let before = set.len();
        set.retain(|s| s.id() != subscriber_id);
        let removed = set.len() != before;
        if set.is_empty() {
            subscribers.remove(run_id);
        }

        if removed {
            debug!(run_id, subscriber = subscriber_id, "subscriber disconnected");
        }
        removed
    }

    /// Drops every subscriber of the run.
    pub fn close(
        &self,
        run_id: &str,
    ) {
        if let Some(set) = self.subscribers.write().unwrap().remove(run_id) {
            debug!(run_id, count = set.len(), "run subscribers closed");
        }
    }

    pub fn subscriber_count(
        &self,
        run_id: &str,
    ) -> usize {
        self.subscribers.read().unwrap().get(run_id).map(Vec::len).unwrap_or(0)
    }

    /// Delivers `event` to every subscriber of `run_id`, stamping a timestamp if missing.
    ///
    /// Never fails; a no-op when the run has no subscribers.
    pub async fn broadcast(
        &self,
        run_id: &str,
        mut event: ProgressEvent,
    ) {
        let targets = match self.subscribers.read().unwrap().get(run_id) {
            Some(set) if !set.is_empty() => set.clone(),
            _ => {
                trace!(run_id, event = event.kind.str(), "no active subscribers");
                return;
            }
        };

        if event.timestamp.is_none() {
            event.timestamp = Some(utils::time::time_millis());
        }

        let mut evicted = Vec::new();
        for subscriber in targets.iter() {
            if let Err(e) = subscriber.send(&event).await {
                warn!(run_id, subscriber = subscriber.id(), event = event.kind.str(), "failed to deliver event: {}", e);
                evicted.push(subscriber.id().to_string());
            }
        }

        for id in evicted {
            self.unsubscribe(run_id, &id);
        }
    }
}

/// Subscriber backed by a bounded channel; pair of a [`Subscription`].
///
/// A full buffer or a dropped [`Subscription`] counts as a delivery failure.
pub struct ChannelSubscriber {
    id: SubscriberId,
    sender: flume::Sender<ProgressEvent>,
}

impl ChannelSubscriber {
    pub fn new(cap: usize) -> (Arc<Self>, Subscription) {
        let (tx, rx) = flume::bounded(cap);
        let id = utils::longid();

        (
            Arc::new(Self {
                id: id.clone(),
                sender: tx,
            }),
            Subscription {
                id,
                receiver: rx,
            },
        )
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(
        &self,
        event: &ProgressEvent,
    ) -> Result<()> {
        self.sender.try_send(event.clone()).map_err(|e| FlowError::Queue(e.to_string()))
    }
}

/// Receiving end of a [`ChannelSubscriber`]. Ends once the run's subscribers are closed.
pub struct Subscription {
    id: SubscriberId,
    receiver: flume::Receiver<ProgressEvent>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// next event, `None` once the subscriber was removed
    pub async fn next_async(&self) -> Option<ProgressEvent> {
        self.receiver.recv_async().await.ok()
    }

    /// next buffered event without waiting
    pub fn try_next(&self) -> Option<ProgressEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> flume::r#async::RecvStream<'static, ProgressEvent> {
        self.receiver.into_stream()
    }
}

/// Subscriber that hands every event to a closure.
pub struct CallbackSubscriber {
    id: SubscriberId,
    f: Box<dyn Fn(&ProgressEvent) -> Result<()> + Send + Sync>,
}

impl CallbackSubscriber {
    pub fn new(f: impl Fn(&ProgressEvent) -> Result<()> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            id: utils::longid(),
            f: Box::new(f),
        })
    }
}

#[async_trait]
impl Subscriber for CallbackSubscriber {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(
        &self,
        event: &ProgressEvent,
    ) -> Result<()> {
        (self.f)(event)
    }
}
