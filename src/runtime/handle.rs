use std::sync::{Arc, RwLock};

use tracing::info;

use crate::{ShareLock, common::Shutdown, runtime::RunId};

/// Live handle of an in-flight run, kept by the engine until the run finishes.
pub struct RunHandle {
    id: RunId,
    flow_id: String,
    abort: Shutdown,
    reason: ShareLock<Option<String>>,
}

impl RunHandle {
    pub fn new(
        id: &str,
        flow_id: &str,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            flow_id: flow_id.to_string(),
            abort: Shutdown::new(),
            reason: Arc::new(RwLock::new(None)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Asks the run to stop. The node in flight is killed and the run fails with `reason`.
    ///
    /// Only the first reason is kept.
    pub fn abort(
        &self,
        reason: &str,
    ) {
        {
            let mut current = self.reason.write().unwrap();
            if current.is_some() {
                return;
            }
            *current = Some(reason.to_string());
        }
        info!(run_id = %self.id, reason, "abort requested");
        self.abort.shutdown();
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_terminated()
    }

    pub fn abort_reason(&self) -> Option<String> {
        self.reason.read().unwrap().clone()
    }

    /// Resolves once [`abort`](RunHandle::abort) was called.
    pub fn aborted(&self) -> impl Future<Output = ()> + Send + 'static {
        self.abort.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::RunHandle;

    #[tokio::test]
    async fn test_abort_keeps_first_reason() {
        let handle = RunHandle::new("run-1", "flow-1");
        assert!(!handle.is_aborted());

        let waiter = tokio::spawn(handle.aborted());
        handle.abort("engine shut down");
        handle.abort("execution stopped");
        waiter.await.unwrap();

        assert!(handle.is_aborted());
        assert_eq!(handle.abort_reason().as_deref(), Some("engine shut down"));
    }
}
