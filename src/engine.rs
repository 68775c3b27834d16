//! Flow engine - the main entry point for agentflow.
//!
//! The engine owns the runtime, the store and the node executor, and drives
//! every run from `Pending` to a terminal status:
//! - Deploying flow definitions
//! - Starting runs from a deployed flow or a caller-supplied graph
//! - Fanning progress events out to the subscribers of each run
//! - Graceful shutdown of in-flight runs

mod runner;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::{
    Config, EngineBuilder, FlowError, Result,
    agent::AgentRegistry,
    common::{MemCache, Queue, Shutdown},
    dispatcher::{ExecutorMode, NodeExecutor},
    model::{ExecutionRecord, FlowModel, GraphModel},
    runtime::{Broadcaster, ChannelSubscriber, RunHandle, RunId, SUBSCRIPTION_BUFFER_SIZE, Subscriber, Subscription},
    store::{PageData, Store},
};

use runner::{RunSource, Runner};

/// Maximum number of in-flight runs tracked in memory.
const RUN_CACHE_SIZE: usize = 2048;
/// Size of the queue for finished run notifications.
const RUN_COMPLETE_QUEUE_SIZE: usize = 100;

/// Abort reason of runs interrupted by [`Engine::shutdown`].
pub const SHUTDOWN_REASON: &str = "engine shut down";
/// Abort reason of runs interrupted by [`Engine::stop`].
pub const STOP_REASON: &str = "execution stopped";

/// The flow execution engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().config(Config::create("agentflow.toml")?).build()?;
/// engine.launch();
///
/// engine.deploy(&flow)?;
/// let record = engine.run_flow(&flow.id)?;
/// let subscription = engine.subscribe_channel(&record.id);
/// while let Some(event) = subscription.next_async().await {
///     println!("{}", serde_json::to_string(&event)?);
/// }
///
/// engine.shutdown();
/// ```
pub struct Engine {
    /// Flow definitions and execution records.
    store: Arc<Store>,
    /// Live subscribers, per run.
    broadcaster: Arc<Broadcaster>,
    /// Strategy turning one node into a result.
    executor: Arc<dyn NodeExecutor>,
    /// Agent types known to the engine.
    registry: Arc<AgentRegistry>,
    /// Ids of finished runs, drained by the housekeeping task.
    runs_complete_queue: Arc<Queue<RunId>>,
    /// Handles of in-flight runs.
    runs: Arc<MemCache<RunId, Arc<RunHandle>>>,

    running: Arc<AtomicBool>,
    runtime: Arc<Runtime>,
    shutdown: Arc<Shutdown>,
}

impl Engine {
    pub(crate) fn new(
        runtime: Arc<Runtime>,
        store: Arc<Store>,
        registry: Arc<AgentRegistry>,
        executor: Arc<dyn NodeExecutor>,
    ) -> Self {
        Self {
            store,
            broadcaster: Arc::new(Broadcaster::new()),
            executor,
            registry,
            runs_complete_queue: Queue::new(RUN_COMPLETE_QUEUE_SIZE),
            runs: Arc::new(MemCache::new(RUN_CACHE_SIZE)),
            running: Arc::new(AtomicBool::new(false)),
            runtime,
            shutdown: Arc::new(Shutdown::new()),
        }
    }

    /// Creates an engine from configuration alone.
    pub fn new_with_config(config: Config) -> Result<Self> {
        EngineBuilder::new().config(config).build()
    }

    /// Starts the engine. Runs can only be started while it is running.
    pub fn launch(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let runs_complete_queue = self.runs_complete_queue.clone();
        let shutdown = self.shutdown.clone();
        let runs = self.runs.clone();
        self.runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.wait() => break,
                    Some(run_id) = runs_complete_queue.next_async() => {
                        runs.remove(&run_id);
                    }
                }
            }
        });
        info!(mode = self.executor.mode().as_ref(), "engine launched");
    }

    /// Stops accepting runs and aborts every in-flight run.
    ///
    /// Aborted runs kill their current agent and finish as `Failed` with
    /// "engine shut down".
    pub fn shutdown(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        self.shutdown.shutdown();
        let mut aborted = 0;
        for (_, handle) in self.runs.iter() {
            handle.abort(SHUTDOWN_REASON);
            aborted += 1;
        }
        info!(aborted, "engine shut down");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Creates or replaces a flow definition.
    pub fn deploy(
        &self,
        flow: &FlowModel,
    ) -> Result<bool> {
        self.store.deploy(flow)
    }

    /// Starts a run of a caller-supplied graph and returns its `Pending` record.
    ///
    /// Validation happens inside the run: an invalid graph still yields a
    /// record, which goes straight to `Failed`.
    pub fn start_run(
        &self,
        flow_id: &str,
        graph: GraphModel,
    ) -> Result<ExecutionRecord> {
        self.spawn_run(flow_id, RunSource::Graph(graph), None)
    }

    /// Like [`start_run`](Engine::start_run), with `subscriber` registered before the first event.
    pub fn start_run_with(
        &self,
        flow_id: &str,
        graph: GraphModel,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<ExecutionRecord> {
        self.spawn_run(flow_id, RunSource::Graph(graph), Some(subscriber))
    }

    /// Starts a run of the deployed flow `flow_id` and returns its `Pending` record.
    pub fn run_flow(
        &self,
        flow_id: &str,
    ) -> Result<ExecutionRecord> {
        self.spawn_run(flow_id, RunSource::Deployed, None)
    }

    /// Like [`run_flow`](Engine::run_flow), with `subscriber` registered before the first event.
    pub fn run_flow_with(
        &self,
        flow_id: &str,
        subscriber: Arc<dyn Subscriber>,
    ) -> Result<ExecutionRecord> {
        self.spawn_run(flow_id, RunSource::Deployed, Some(subscriber))
    }

    fn spawn_run(
        &self,
        flow_id: &str,
        source: RunSource,
        subscriber: Option<Arc<dyn Subscriber>>,
    ) -> Result<ExecutionRecord> {
        if !self.is_running() {
            return Err(FlowError::Engine("engine is not running".to_string()));
        }

        let record = ExecutionRecord::new(flow_id);
        self.store.save_record(&record)?;

        let handle = RunHandle::new(&record.id, flow_id);
        self.runs.set(record.id.clone(), handle.clone());
        if let Some(subscriber) = subscriber {
            self.broadcaster.subscribe(&record.id, subscriber);
        }
        debug!(run_id = %record.id, flow_id, "run created");

        let runner = Runner::new(self.store.clone(), self.broadcaster.clone(), self.executor.clone(), handle, record.clone());
        let runs_complete_queue = self.runs_complete_queue.clone();
        let runs = self.runs.clone();
        self.runtime.spawn(async move {
            let record = runner.run(source).await;
            if let Err(e) = runs_complete_queue.send(record.id.clone()) {
                warn!(run_id = %record.id, "complete queue unavailable: {}", e);
                runs.remove(&record.id);
            }
        });

        Ok(record)
    }

    /// Aborts an in-flight run; it finishes as `Failed` with "execution stopped".
    pub fn stop(
        &self,
        run_id: &str,
    ) -> Result<()> {
        match self.runs.get(&run_id.to_string()) {
            Some(handle) => {
                handle.abort(STOP_REASON);
                Ok(())
            }
            None => Err(FlowError::ExecutionNotFound(run_id.to_string())),
        }
    }

    /// Reads the persisted record of a run.
    pub fn get_record(
        &self,
        run_id: &str,
    ) -> Result<ExecutionRecord> {
        self.store.record(run_id)
    }

    /// Records of a flow, newest first.
    pub fn history(
        &self,
        flow_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<PageData<ExecutionRecord>> {
        self.store.history(flow_id, limit, offset)
    }

    /// Handle of an in-flight run.
    pub fn get_run(
        &self,
        run_id: &str,
    ) -> Option<Arc<RunHandle>> {
        self.runs.get(&run_id.to_string())
    }

    pub fn subscribe(
        &self,
        run_id: &str,
        subscriber: Arc<dyn Subscriber>,
    ) {
        self.broadcaster.subscribe(run_id, subscriber);
    }

    /// Subscribes a channel to the run. The subscription ends after `execution_complete`.
    pub fn subscribe_channel(
        &self,
        run_id: &str,
    ) -> Subscription {
        let (subscriber, subscription) = ChannelSubscriber::new(SUBSCRIPTION_BUFFER_SIZE);
        self.broadcaster.subscribe(run_id, subscriber);
        subscription
    }

    pub fn unsubscribe(
        &self,
        run_id: &str,
        subscriber_id: &str,
    ) -> bool {
        self.broadcaster.unsubscribe(run_id, subscriber_id)
    }

    pub fn subscriber_count(
        &self,
        run_id: &str,
    ) -> usize {
        self.broadcaster.subscriber_count(run_id)
    }

    pub fn registry(&self) -> Arc<AgentRegistry> {
        self.registry.clone()
    }

    pub fn executor_mode(&self) -> ExecutorMode {
        self.executor.mode()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        path::Path,
        sync::{Arc, Mutex},
        thread,
        time::{Duration, Instant},
    };

    use serde_json::json;

    use super::{Engine, SHUTDOWN_REASON, STOP_REASON};
    use crate::{
        EngineBuilder, FlowError,
        agent::{AgentRegistry, testing::script_agent},
        common::Vars,
        dispatcher::ExecutorMode,
        events::{EventKind, ProgressEvent},
        model::{EdgeModel, ExecutionRecord, ExecutionStatus, FlowModel, GraphModel, NodeModel, NodeStatus},
        runtime::CallbackSubscriber,
    };

    const WAIT: Duration = Duration::from_secs(30);

    type Events = Arc<Mutex<Vec<ProgressEvent>>>;

    fn engine(
        registry: AgentRegistry,
        timeout: Duration,
    ) -> Engine {
        let engine = EngineBuilder::new().async_worker_thread_number(2).registry(Arc::new(registry)).timeout(timeout).build().unwrap();
        engine.launch();
        engine
    }

    fn registry(
        dir: &Path,
        agents: &[(&str, &str)],
    ) -> AgentRegistry {
        let registry = AgentRegistry::new();
        for (agent_type, body) in agents {
            registry.register(script_agent(dir, agent_type, body));
        }
        registry
    }

    fn graph(
        nodes: &[(&str, &str)],
        edges: &[(&str, &str)],
    ) -> GraphModel {
        GraphModel {
            nodes: nodes.iter().map(|(id, agent_type)| NodeModel::new(id, agent_type, Vars::new())).collect(),
            edges: edges.iter().map(|(s, t)| EdgeModel::new(s, t)).collect(),
        }
    }

    fn collector() -> (Arc<CallbackSubscriber>, Events) {
        let events: Events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let subscriber = CallbackSubscriber::new(move |event| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        });
        (subscriber, events)
    }

    /// Waits for `execution_complete`, then returns the events and the persisted record.
    fn wait_complete(
        engine: &Engine,
        run_id: &str,
        events: &Events,
    ) -> (Vec<ProgressEvent>, ExecutionRecord) {
        let started = Instant::now();
        loop {
            let done = events.lock().unwrap().iter().any(ProgressEvent::is_complete);
            if done {
                break;
            }
            assert!(started.elapsed() < WAIT, "run {} did not complete", run_id);
            thread::sleep(Duration::from_millis(20));
        }
        let events = events.lock().unwrap().clone();
        (events, engine.get_record(run_id).unwrap())
    }

    fn wait_terminal(
        engine: &Engine,
        run_id: &str,
    ) -> ExecutionRecord {
        let started = Instant::now();
        loop {
            let record = engine.get_record(run_id).unwrap();
            if record.is_terminal() {
                return record;
            }
            assert!(started.elapsed() < WAIT, "run {} did not finish", run_id);
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn kinds(events: &[ProgressEvent]) -> Vec<&str> {
        events.iter().map(|e| e.kind.str()).collect()
    }

    const EMIT_SIGNAL: &str = "echo 'analyzing'\necho '###RESULT###'\necho '{\"signal\": \"buy\"}'";
    const ECHO_INPUT: &str = "echo '###RESULT###'\ncat \"$2\"";

    #[test]
    fn test_linear_flow_completes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", EMIT_SIGNAL), ("risk", ECHO_INPUT)]), Duration::from_secs(10));
        let (subscriber, events) = collector();

        let pending = engine.start_run_with("flow-1", graph(&[("A", "market"), ("B", "risk")], &[("A", "B")]), subscriber).unwrap();
        assert_eq!(pending.status, ExecutionStatus::Pending);

        let (events, record) = wait_complete(&engine, &pending.id, &events);
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.node_results.len(), 2);
        assert!(record.error.is_none());
        assert!(record.started_at.is_some() && record.ended_at.is_some());
        assert_eq!(record.node_results["A"].output, Some(json!({"signal": "buy"})));
        assert_eq!(record.node_results["B"].output.as_ref().unwrap()["context"], json!({"A": {"signal": "buy"}}));

        assert_eq!(kinds(&events), vec!["node_started", "node_completed", "node_started", "node_completed", "execution_complete"]);
        assert!(events.iter().all(|e| e.timestamp.is_some() && e.run_id == pending.id));
        match &events[0].kind {
            EventKind::NodeStarted(started) => {
                assert_eq!(started.node_id, "A");
                assert_eq!(started.progress, "0/2");
                assert_eq!(started.message, "[1/2] Executing market (A)");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &events[2].kind {
            EventKind::NodeStarted(started) => assert_eq!(started.progress, "1/2"),
            other => panic!("unexpected event {:?}", other),
        }
        match &events[4].kind {
            EventKind::ExecutionComplete(complete) => {
                assert_eq!(complete.status, ExecutionStatus::Completed);
                assert!(complete.failed_nodes.is_empty());
                assert_eq!(complete.node_results.len(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(record.logs[0], "[1/2] Executing market (A)");
        assert!(record.logs[1].starts_with("market completed in "));
        assert_eq!(record.logs[2], "[2/2] Executing risk (B)");
        assert_eq!(engine.subscriber_count(&pending.id), 0);
    }

    #[test]
    fn test_failed_node_does_not_stop_run() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", "echo 'no data' >&2\nexit 1"), ("risk", ECHO_INPUT)]), Duration::from_secs(10));
        let (subscriber, events) = collector();

        let pending = engine.start_run_with("flow-1", graph(&[("A", "market"), ("B", "risk")], &[("A", "B")]), subscriber).unwrap();
        let (events, record) = wait_complete(&engine, &pending.id, &events);

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("Failed nodes: A"));
        assert_eq!(record.error_node_id.as_deref(), Some("A"));
        assert_eq!(record.node_results["A"].status, NodeStatus::Failed);
        assert_eq!(record.node_results["A"].return_code, Some(1));
        assert_eq!(record.node_results["B"].status, NodeStatus::Completed);
        assert_eq!(record.node_results["B"].output.as_ref().unwrap()["context"], json!({}));

        assert_eq!(kinds(&events), vec!["node_started", "node_completed", "node_error", "node_started", "node_completed", "execution_complete"]);
        match &events[5].kind {
            EventKind::ExecutionComplete(complete) => {
                assert_eq!(complete.status, ExecutionStatus::Failed);
                assert_eq!(complete.failed_nodes, vec!["A".to_string()]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(record.logs.iter().any(|l| l == "market failed: agent exited with code 1: no data"));
    }

    #[test]
    fn test_unknown_agent_is_node_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("risk", ECHO_INPUT)]), Duration::from_secs(10));
        let (subscriber, events) = collector();

        let pending = engine.start_run_with("flow-1", graph(&[("A", "missing"), ("B", "risk")], &[("A", "B")]), subscriber).unwrap();
        let (events, record) = wait_complete(&engine, &pending.id, &events);

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.node_results["A"].error.as_deref(), Some("agent not found: missing"));
        assert_eq!(record.node_results["B"].status, NodeStatus::Completed);
        assert_eq!(kinds(&events), vec!["node_started", "node_error", "node_started", "node_completed", "execution_complete"]);
    }

    #[test]
    fn test_dangling_edge_fails_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", "touch spawned")]), Duration::from_secs(10));
        let (subscriber, events) = collector();

        let pending = engine.start_run_with("flow-1", graph(&[("X", "market")], &[("X", "Y")]), subscriber).unwrap();
        let (events, record) = wait_complete(&engine, &pending.id, &events);

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.node_results.is_empty());
        assert!(record.started_at.is_none());
        assert!(record.ended_at.is_some());
        assert_eq!(record.error.as_deref(), Some("edge X -> Y references unknown node Y"));
        assert_eq!(kinds(&events), vec!["execution_error", "execution_complete"]);
        assert!(!dir.path().join("spawned").exists());
    }

    #[test]
    fn test_cycle_fails_before_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", "touch spawned")]), Duration::from_secs(10));
        let (subscriber, events) = collector();

        let pending = engine.start_run_with("flow-1", graph(&[("A", "market"), ("B", "market")], &[("A", "B"), ("B", "A")]), subscriber).unwrap();
        let (events, record) = wait_complete(&engine, &pending.id, &events);

        assert_eq!(record.status, ExecutionStatus::Failed);
        assert!(record.node_results.is_empty());
        assert!(record.error.unwrap().starts_with("cycle detected"));
        assert_eq!(kinds(&events), vec!["execution_error", "execution_complete"]);
        assert!(!dir.path().join("spawned").exists());
    }

    #[test]
    fn test_timeout_continues_with_next_node() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("slow", "exec sleep 30"), ("risk", ECHO_INPUT)]), Duration::from_secs(1));
        let (subscriber, events) = collector();

        let started = Instant::now();
        let pending = engine.start_run_with("flow-1", graph(&[("A", "slow"), ("B", "risk")], &[("A", "B")]), subscriber).unwrap();
        let (events, record) = wait_complete(&engine, &pending.id, &events);

        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.node_results["A"].status, NodeStatus::Failed);
        assert!(record.node_results["A"].error.as_ref().unwrap().contains("timed out"));
        assert_eq!(record.node_results["B"].status, NodeStatus::Completed);
        assert_eq!(kinds(&events), vec!["node_started", "node_error", "node_started", "node_completed", "execution_complete"]);
    }

    #[test]
    fn test_mock_mode() {
        let engine = EngineBuilder::new().async_worker_thread_number(2).registry(Arc::new(AgentRegistry::new())).mode(ExecutorMode::Mock).mock_delay(Duration::from_millis(10)).build().unwrap();
        engine.launch();
        assert_eq!(engine.executor_mode(), ExecutorMode::Mock);

        let pending = engine.start_run("flow-1", graph(&[("A", "market"), ("B", "risk")], &[("A", "B")])).unwrap();
        let record = wait_terminal(&engine, &pending.id);
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.node_results["B"].output, Some(json!({"message": "Mock output from risk"})));
    }

    #[test]
    fn test_run_deployed_flow() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", EMIT_SIGNAL)]), Duration::from_secs(10));
        let flow = FlowModel {
            id: "flow-1".to_string(),
            name: "signals".to_string(),
            definition: graph(&[("A", "market")], &[]),
            ..Default::default()
        };
        assert!(engine.deploy(&flow).unwrap());

        let pending = engine.run_flow("flow-1").unwrap();
        let record = wait_terminal(&engine, &pending.id);
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.flow_id, "flow-1");

        let pending = engine.run_flow("missing").unwrap();
        let record = wait_terminal(&engine, &pending.id);
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error, Some(FlowError::FlowNotFound("missing".to_string()).to_string()));
        assert!(record.node_results.is_empty());
    }

    #[test]
    fn test_history_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("market", EMIT_SIGNAL)]), Duration::from_secs(10));

        let mut ids = Vec::new();
        for _ in 0..3 {
            let pending = engine.start_run("flow-1", graph(&[("A", "market")], &[])).unwrap();
            wait_terminal(&engine, &pending.id);
            ids.push(pending.id);
            thread::sleep(Duration::from_millis(5));
        }
        engine.start_run("flow-2", graph(&[("A", "market")], &[])).unwrap();

        let page = engine.history("flow-1", 2, 0).unwrap();
        assert_eq!(page.count, 3);
        let listed: Vec<&str> = page.rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(listed, vec![ids[2].as_str(), ids[1].as_str()]);
    }

    #[test]
    fn test_stop_and_shutdown_abort_runs() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(registry(dir.path(), &[("slow", "exec sleep 30"), ("market", "touch spawned")]), Duration::from_secs(60));

        let (subscriber, events) = collector();
        let stopped = engine.start_run_with("flow-1", graph(&[("A", "slow")], &[]), subscriber).unwrap();
        thread::sleep(Duration::from_millis(300));
        engine.stop(&stopped.id).unwrap();
        let (events, record) = wait_complete(&engine, &stopped.id, &events);
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some(STOP_REASON));
        assert_eq!(kinds(&events).last(), Some(&"execution_complete"));

        let started = Instant::now();
        let pending = engine.start_run("flow-1", graph(&[("A", "slow"), ("B", "market")], &[("A", "B")])).unwrap();
        thread::sleep(Duration::from_millis(300));
        engine.shutdown();

        let record = wait_terminal(&engine, &pending.id);
        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(record.status, ExecutionStatus::Failed);
        assert_eq!(record.error.as_deref(), Some(SHUTDOWN_REASON));
        assert!(!record.node_results.contains_key("B"));
        assert!(!dir.path().join("spawned").exists());

        assert!(!engine.is_running());
        assert!(matches!(engine.start_run("flow-1", graph(&[("A", "slow")], &[])), Err(FlowError::Engine(_))));
        assert_eq!(engine.stop("unknown"), Err(FlowError::ExecutionNotFound("unknown".to_string())));
    }

    #[test]
    fn test_start_before_launch_fails() {
        let engine = EngineBuilder::new().async_worker_thread_number(1).registry(Arc::new(AgentRegistry::new())).build().unwrap();
        let err = engine.start_run("flow-1", graph(&[("A", "market")], &[])).unwrap_err();
        assert_eq!(err, FlowError::Engine("engine is not running".to_string()));
    }

    #[test]
    fn test_channel_subscription_ends_after_completion() {
        let engine = EngineBuilder::new().async_worker_thread_number(2).registry(Arc::new(AgentRegistry::new())).mode(ExecutorMode::Mock).mock_delay(Duration::from_millis(200)).build().unwrap();
        engine.launch();

        let pending = engine.start_run("flow-1", graph(&[("A", "market")], &[])).unwrap();
        let subscription = engine.subscribe_channel(&pending.id);
        let received: Vec<ProgressEvent> = futures::executor::block_on(async {
            let mut received = Vec::new();
            while let Some(event) = subscription.next_async().await {
                received.push(event);
            }
            received
        });

        assert!(received.last().is_some_and(ProgressEvent::is_complete));
        assert_eq!(engine.subscriber_count(&pending.id), 0);
    }
}
