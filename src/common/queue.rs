//! Bounded message queue for inter-task notifications.

use std::sync::Arc;

use crate::{FlowError, Result};

/// Bounded MPMC (multi-producer, multi-consumer) queue.
///
/// Used for notifications where each message should be consumed by exactly one
/// receiver, such as finished run ids flowing back to the engine.
/// Backed by flume for high-performance message passing.
#[derive(Clone)]
pub struct Queue<T> {
    receiver: Arc<flume::Receiver<T>>,
    sender: Arc<flume::Sender<T>>,
}

#[allow(unused)]
impl<T> Queue<T> {
    /// create a new queue
    pub fn new(cap: usize) -> Arc<Self> {
        let (tx, rx) = flume::bounded(cap);

        Arc::new(Self {
            receiver: Arc::new(rx),
            sender: Arc::new(tx),
        })
    }

    /// receive a message from the queue
    pub fn next(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// send a message to the queue without waiting for capacity
    pub fn send(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.try_send(msg).map_err(|e| FlowError::Queue(e.to_string()))
    }

    /// receive a message from the queue asynchronously
    pub async fn next_async(&self) -> Option<T> {
        self.receiver.recv_async().await.ok()
    }

    /// send a message to the queue asynchronously
    pub async fn send_async(
        &self,
        msg: T,
    ) -> Result<()> {
        self.sender.send_async(msg).await.map_err(|e| FlowError::Queue(e.to_string()))
    }

    /// number of messages waiting in the queue
    pub fn len(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Queue;

    #[test]
    fn test_send_and_receive() {
        let queue = Queue::new(2);
        queue.send("run-1".to_string()).unwrap();
        queue.send("run-2".to_string()).unwrap();
        assert!(queue.send("run-3".to_string()).is_err());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next(), Some("run-1".to_string()));
    }
}
